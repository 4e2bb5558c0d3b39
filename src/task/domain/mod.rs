//! Domain model for task and time tracking.
//!
//! Tasks and time entries start out transient (no id) and become persistent
//! once a repository saves them. Everything here is free of storage
//! concerns: identity keys, tag normalization, the tag edit algorithm, and
//! filter predicates are plain values and pure functions.

mod error;
mod filter;
mod identity;
mod ids;
mod level;
mod tags;
mod task;
mod time_entry;

pub use error::{MalformedFilter, ParseLevelError, TaskDomainError};
pub use filter::{
    Comparison, FieldKind, Filter, FilterField, FilterValue, Filterable, TaskField,
    TimeEntryField,
};
pub use identity::{TaskIdentityKey, null_aware_eq};
pub use ids::{TaskId, TimeEntryId};
pub use level::{Difficulty, Level, Priority};
pub use tags::{TagEdit, apply_tag_edits, normalize_tags};
pub use task::{PersistedTaskData, Task};
pub use time_entry::{PersistedTimeEntryData, TimeEntry, check_storable_timestamp};

/// Predicate over tasks.
pub type TaskFilter = Filter<TaskField>;

/// Predicate over time entries.
pub type TimeEntryFilter = Filter<TimeEntryField>;
