//! Identity keys deciding when two task values are the same logical task.

use super::Task;
use serde::{Deserialize, Serialize};

/// Equality for nullable identity columns.
///
/// An absent value matches only another absent value, mirroring SQL
/// `IS` rather than `=`.
#[must_use]
pub fn null_aware_eq<T: PartialEq + ?Sized>(left: Option<&T>, right: Option<&T>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Fields folded into the task identity key besides the always-present
/// `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIdentityKey {
    source_id: bool,
    source_url: bool,
}

impl TaskIdentityKey {
    /// `(name, source_id, source_url)`.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            source_id: true,
            source_url: true,
        }
    }

    /// `(name)` only.
    #[must_use]
    pub const fn name_only() -> Self {
        Self {
            source_id: false,
            source_url: false,
        }
    }

    /// Includes or excludes `source_id`.
    #[must_use]
    pub const fn with_source_id(mut self, include: bool) -> Self {
        self.source_id = include;
        self
    }

    /// Includes or excludes `source_url`.
    #[must_use]
    pub const fn with_source_url(mut self, include: bool) -> Self {
        self.source_url = include;
        self
    }

    /// Whether `source_id` participates in the key.
    #[must_use]
    pub const fn includes_source_id(self) -> bool {
        self.source_id
    }

    /// Whether `source_url` participates in the key.
    #[must_use]
    pub const fn includes_source_url(self) -> bool {
        self.source_url
    }

    /// Returns `true` when both tasks resolve to the same identity.
    #[must_use]
    pub fn matches(self, left: &Task, right: &Task) -> bool {
        left.name() == right.name()
            && (!self.source_id || null_aware_eq(left.source_id(), right.source_id()))
            && (!self.source_url || null_aware_eq(left.source_url(), right.source_url()))
    }
}

impl Default for TaskIdentityKey {
    fn default() -> Self {
        Self::full()
    }
}
