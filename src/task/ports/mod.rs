//! Port contracts for task and time tracking.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod repository;

pub use repository::{
    IdentityConflict, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
    TimeEntryRepository,
};
