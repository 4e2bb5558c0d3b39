//! Repository ports for task and time entry persistence.
//!
//! Saves are upserts: the repository decides whether a candidate is a new
//! row or an update to an existing one by its identity key, and returns the
//! canonical persisted value. Lookups that match nothing return empty
//! results rather than errors.

use crate::task::domain::{
    MalformedFilter, Task, TaskField, TaskFilter, TaskId, TimeEntry, TimeEntryFilter, TimeEntryId,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts or merges a task by its identity key.
    ///
    /// Tags are normalized before writing. The returned task carries the
    /// assigned or adopted id and its eagerly loaded time entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::IdentityConflict`] when the candidate
    /// claims an id other than the one its identity key resolves to; nothing
    /// is written in that case.
    async fn save_task(&self, task: Task) -> TaskRepositoryResult<Task>;

    /// Lists matching tasks, newest (highest id) first, each with its time
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::MalformedFilter`] for an invalid
    /// predicate.
    async fn list_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Deletes matching tasks and, by cascade, their time entries.
    ///
    /// Returns the number of tasks removed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::MalformedFilter`] for an invalid
    /// predicate.
    async fn delete_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<usize>;

    /// Finds a task by id.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let tasks = self.list_tasks(&TaskFilter::eq(TaskField::Id, id)).await?;
        Ok(tasks.into_iter().next())
    }
}

/// Time entry persistence contract.
#[async_trait]
pub trait TimeEntryRepository: Send + Sync {
    /// Inserts or merges a time entry.
    ///
    /// A stored row matches when its id equals the candidate's id or when
    /// its `(task_id, start)` pair equals the candidate's. The returned
    /// entry carries its owning task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::IdentityConflict`] when the candidate
    /// claims an id other than the matched row's and
    /// [`TaskRepositoryError::ConstraintViolation`] when the owning task does
    /// not exist or a timestamp falls outside years 0000 through 9999.
    async fn save_time_entry(&self, entry: TimeEntry) -> TaskRepositoryResult<TimeEntry>;

    /// Lists matching entries, latest start first, each with its task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::MalformedFilter`] for an invalid
    /// predicate.
    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> TaskRepositoryResult<Vec<TimeEntry>>;

    /// Deletes matching entries and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::MalformedFilter`] for an invalid
    /// predicate.
    async fn delete_time_entries(&self, filter: &TimeEntryFilter) -> TaskRepositoryResult<usize>;
}

/// Why a save was rejected as contradicting stored identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityConflict {
    /// The claimed task id differs from the id the identity key resolves to.
    Task {
        /// Id carried by the candidate.
        claimed: TaskId,
        /// Id of the row sharing the candidate's identity key.
        resolved: TaskId,
    },
    /// The claimed entry id differs from the row sharing `(task_id, start)`.
    TimeEntry {
        /// Id carried by the candidate.
        claimed: TimeEntryId,
        /// Id of the row sharing the candidate's `(task_id, start)`.
        resolved: TimeEntryId,
    },
    /// Another writer inserted a task with the same identity key first.
    ConcurrentTaskInsert {
        /// Name of the contested task.
        name: String,
    },
}

impl fmt::Display for IdentityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task { claimed, resolved } => write!(
                f,
                "task id {claimed} was claimed but its identity belongs to task {resolved}"
            ),
            Self::TimeEntry { claimed, resolved } => write!(
                f,
                "time entry id {claimed} was claimed but its task and start belong to entry {resolved}"
            ),
            Self::ConcurrentTaskInsert { name } => {
                write!(f, "a task named '{name}' with the same source already exists")
            }
        }
    }
}

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// The save contradicts the stored identity of a record.
    #[error("identity conflict: {0}")]
    IdentityConflict(IdentityConflict),

    /// A foreign-key, uniqueness, or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The filter predicate is invalid.
    #[error(transparent)]
    MalformedFilter(#[from] MalformedFilter),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl From<IdentityConflict> for TaskRepositoryError {
    fn from(conflict: IdentityConflict) -> Self {
        Self::IdentityConflict(conflict)
    }
}
