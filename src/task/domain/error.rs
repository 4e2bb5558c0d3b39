//! Error types for task domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// A time entry was closed before it started.
    #[error("time entry end {end} is earlier than its start {start}")]
    EndBeforeStart {
        /// Rendered start timestamp.
        start: String,
        /// Rendered end timestamp.
        end: String,
    },

    /// A timestamp falls outside years 0000 through 9999, which the
    /// fixed-width stored form cannot order.
    #[error("timestamp {timestamp} is outside years 0000-9999")]
    TimestampOutOfRange {
        /// Rendered timestamp.
        timestamp: String,
    },

    /// A priority or difficulty string did not name a known level.
    #[error(transparent)]
    UnknownLevel(#[from] ParseLevelError),

    /// A filter predicate could not be applied.
    #[error(transparent)]
    MalformedFilter(#[from] MalformedFilter),
}

/// Error returned while parsing priority or difficulty levels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} level: {value}")]
pub struct ParseLevelError {
    /// Level family, `priority` or `difficulty`.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

/// Error returned when a filter predicate is structurally invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed filter: {0}")]
pub struct MalformedFilter(pub String);

impl MalformedFilter {
    /// Builds an error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
