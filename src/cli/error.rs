//! Command-layer errors and their process exit codes.

use crate::task::{
    domain::{MalformedFilter, TaskDomainError},
    ports::TaskRepositoryError,
    services::TaskTrackingError,
};
use thiserror::Error;

/// Exit codes for chorez operations.
pub mod exit_codes {
    /// The command succeeded.
    pub const SUCCESS: i32 = 0;
    /// Nothing matched, or the input was rejected by validation.
    pub const NOT_FOUND: i32 = 1;
    /// The command line could not be understood.
    pub const USAGE: i32 = 2;
    /// A save contradicted stored identity or a constraint.
    pub const CONFLICT: i32 = 3;
    /// The database or the output stream failed.
    pub const STORAGE: i32 = 4;
}

/// Error raised while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// An argument value could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A filter-based command matched nothing.
    #[error("no {0} matched")]
    NoMatch(&'static str),

    /// A `--where` condition is malformed.
    #[error(transparent)]
    Filter(#[from] MalformedFilter),

    /// The tracking service rejected the command.
    #[error(transparent)]
    Tracking(#[from] TaskTrackingError),

    /// Writing the result failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Encoding the result as JSON failed.
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<TaskRepositoryError> for CliError {
    fn from(err: TaskRepositoryError) -> Self {
        Self::Tracking(TaskTrackingError::Repository(err))
    }
}

impl CliError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => exit_codes::USAGE,
            Self::NoMatch(_) | Self::Filter(_) => exit_codes::NOT_FOUND,
            Self::Tracking(err) => tracking_exit_code(err),
            Self::Output(_) | Self::Encode(_) => exit_codes::STORAGE,
        }
    }
}

const fn tracking_exit_code(err: &TaskTrackingError) -> i32 {
    match err {
        TaskTrackingError::TaskNotFound(_)
        | TaskTrackingError::TimeEntryNotFound(_)
        | TaskTrackingError::Domain(
            TaskDomainError::EmptyTaskName
            | TaskDomainError::EndBeforeStart { .. }
            | TaskDomainError::TimestampOutOfRange { .. }
            | TaskDomainError::UnknownLevel(_)
            | TaskDomainError::MalformedFilter(_),
        )
        | TaskTrackingError::Repository(TaskRepositoryError::MalformedFilter(_)) => {
            exit_codes::NOT_FOUND
        }
        TaskTrackingError::Repository(
            TaskRepositoryError::IdentityConflict(_) | TaskRepositoryError::ConstraintViolation(_),
        ) => exit_codes::CONFLICT,
        TaskTrackingError::Repository(TaskRepositoryError::Persistence(_)) => exit_codes::STORAGE,
    }
}

/// Result type for command execution.
pub type CliResult<T> = Result<T, CliError>;
