//! Service layer for the task and time tracking commands.

use crate::task::{
    domain::{
        Difficulty, Filter, Priority, Task, TaskDomainError, TaskField, TaskFilter, TaskId,
        TimeEntry, TimeEntryField, TimeEntryFilter, apply_tag_edits,
    },
    ports::{TaskRepository, TaskRepositoryError, TimeEntryRepository},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTaskRequest {
    name: String,
    priority: Priority,
    difficulty: Difficulty,
    tags: Vec<String>,
    desc: String,
}

impl AddTaskRequest {
    /// Creates a request with default priority and difficulty.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::default(),
            difficulty: Difficulty::default(),
            tags: Vec::new(),
            desc: String::new(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the difficulty.
    #[must_use]
    pub const fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }
}

/// Request payload for editing a stored task.
///
/// Unset fields keep their stored value. Tag tokens go through
/// [`apply_tag_edits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTaskRequest {
    task_id: TaskId,
    name: Option<String>,
    desc: Option<String>,
    priority: Option<Priority>,
    difficulty: Option<Difficulty>,
    tag_tokens: Vec<String>,
}

impl EditTaskRequest {
    /// Creates a request that changes nothing yet.
    #[must_use]
    pub const fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            name: None,
            desc: None,
            priority: None,
            difficulty: None,
            tag_tokens: Vec::new(),
        }
    }

    /// Renames the task.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces the difficulty.
    #[must_use]
    pub const fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Sets the `tag`, `+tag`, and `-tag` tokens to apply.
    #[must_use]
    pub fn with_tag_tokens(mut self, tokens: impl IntoIterator<Item = String>) -> Self {
        self.tag_tokens = tokens.into_iter().collect();
        self
    }
}

/// Request payload for logging time against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTimeRequest {
    task_id: TaskId,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl StartTimeRequest {
    /// Starts an open interval now.
    #[must_use]
    pub const fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            start: None,
            end: None,
        }
    }

    /// Starts the interval at `start` instead of now.
    #[must_use]
    pub const fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Records an already closed interval ending at `end`.
    #[must_use]
    pub const fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }
}

/// Service-level errors for tracking operations.
#[derive(Debug, Error)]
pub enum TaskTrackingError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// No task has the requested id.
    #[error("task with id {0} not found")]
    TaskNotFound(TaskId),
    /// No active time entry matched.
    #[error("{}", describe_missing_entry(.0))]
    TimeEntryNotFound(Option<TaskId>),
}

fn describe_missing_entry(task_id: &Option<TaskId>) -> String {
    task_id.map_or_else(
        || "no active time entry".to_owned(),
        |id| format!("no active time entry for task {id}"),
    )
}

/// Result type for tracking service operations.
pub type TaskTrackingResult<T> = Result<T, TaskTrackingError>;

/// Orchestrates task and time entry commands over a repository.
#[derive(Clone)]
pub struct TaskTrackingService<R, C>
where
    R: TaskRepository + TimeEntryRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskTrackingService<R, C>
where
    R: TaskRepository + TimeEntryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new tracking service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a task, or merges it into the stored task with the same
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Domain`] for a blank name and
    /// [`TaskTrackingError::Repository`] when the save is rejected.
    pub async fn add_task(&self, request: AddTaskRequest) -> TaskTrackingResult<Task> {
        let task = Task::new(request.name)?
            .with_priority(request.priority)
            .with_difficulty(request.difficulty)
            .with_tags(request.tags)
            .with_desc(request.desc);
        let saved = self.repository.save_task(task).await?;
        tracing::info!(task_id = ?saved.id(), name = saved.name(), "task saved");
        Ok(saved)
    }

    /// Loads a task with its time entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::TaskNotFound`] when no task has `id`.
    pub async fn find_task(&self, id: TaskId) -> TaskTrackingResult<Task> {
        self.repository
            .find_task(id)
            .await?
            .ok_or(TaskTrackingError::TaskNotFound(id))
    }

    /// Lists matching tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Repository`] for a malformed filter or a
    /// storage failure.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> TaskTrackingResult<Vec<Task>> {
        Ok(self.repository.list_tasks(filter).await?)
    }

    /// Applies an edit to a stored task and saves it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::TaskNotFound`] when the task does not
    /// exist, [`TaskTrackingError::Domain`] for a blank new name, and
    /// [`TaskTrackingError::Repository`] when the rename collides with
    /// another task's identity.
    pub async fn edit_task(&self, request: EditTaskRequest) -> TaskTrackingResult<Task> {
        let mut task = self.find_task(request.task_id).await?;
        if let Some(name) = request.name {
            task.rename(name)?;
        }
        if let Some(desc) = request.desc {
            task.set_desc(desc);
        }
        if let Some(priority) = request.priority {
            task.set_priority(priority);
        }
        if let Some(difficulty) = request.difficulty {
            task.set_difficulty(difficulty);
        }
        if !request.tag_tokens.is_empty() {
            let edited = apply_tag_edits(task.tags(), &request.tag_tokens);
            task.set_tags(edited);
        }

        let saved = self.repository.save_task(task).await?;
        tracing::info!(task_id = %request.task_id, "task edited");
        Ok(saved)
    }

    /// Deletes one task and its time entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::TaskNotFound`] when nothing was deleted.
    pub async fn remove_task(&self, id: TaskId) -> TaskTrackingResult<()> {
        let removed = self
            .repository
            .delete_tasks(&TaskFilter::eq(TaskField::Id, id))
            .await?;
        if removed == 0 {
            return Err(TaskTrackingError::TaskNotFound(id));
        }
        tracing::info!(task_id = %id, "task removed");
        Ok(())
    }

    /// Deletes every matching task and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Repository`] for a malformed filter or a
    /// storage failure.
    pub async fn remove_tasks(&self, filter: &TaskFilter) -> TaskTrackingResult<usize> {
        let removed = self.repository.delete_tasks(filter).await?;
        tracing::info!(removed, "tasks removed");
        Ok(removed)
    }

    /// Logs a time entry against a task, open unless an end is given.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::TaskNotFound`] when the task does not
    /// exist and [`TaskTrackingError::Domain`] when the end precedes the
    /// start or either end falls outside years 0000 through 9999.
    pub async fn start_time(&self, request: StartTimeRequest) -> TaskTrackingResult<TimeEntry> {
        self.find_task(request.task_id).await?;
        let mut entry = match request.start {
            Some(start) => TimeEntry::new(request.task_id, start),
            None => TimeEntry::start_now(request.task_id, &*self.clock),
        };
        if let Some(end) = request.end {
            entry = entry.with_end(end)?;
        }
        entry.check_timestamps()?;

        let saved = self.repository.save_time_entry(entry).await?;
        tracing::info!(
            task_id = %request.task_id,
            entry_id = ?saved.id(),
            active = saved.is_active(),
            "time entry saved"
        );
        Ok(saved)
    }

    /// Closes active entries now, optionally only those of one task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::TimeEntryNotFound`] when nothing is
    /// active.
    pub async fn stop_time(&self, task_id: Option<TaskId>) -> TaskTrackingResult<Vec<TimeEntry>> {
        let active = self.active_entries_for(task_id).await?;
        if active.is_empty() {
            return Err(TaskTrackingError::TimeEntryNotFound(task_id));
        }

        let mut closed = Vec::with_capacity(active.len());
        for entry in active {
            let stopped = entry.close(&*self.clock)?;
            let saved = self.repository.save_time_entry(stopped).await?;
            tracing::info!(entry_id = ?saved.id(), task_id = %saved.task_id(), "time entry closed");
            closed.push(saved);
        }
        Ok(closed)
    }

    /// Lists open intervals, latest start first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Repository`] on storage failure.
    pub async fn active_entries(&self) -> TaskTrackingResult<Vec<TimeEntry>> {
        self.active_entries_for(None).await
    }

    /// Lists matching time entries, latest start first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Repository`] for a malformed filter or a
    /// storage failure.
    pub async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> TaskTrackingResult<Vec<TimeEntry>> {
        Ok(self.repository.list_time_entries(filter).await?)
    }

    /// Lists a task's time entries, latest start first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskTrackingError::Repository`] on storage failure.
    pub async fn task_time_entries(&self, task_id: TaskId) -> TaskTrackingResult<Vec<TimeEntry>> {
        self.list_time_entries(&Filter::eq(TimeEntryField::TaskId, task_id))
            .await
    }

    async fn active_entries_for(
        &self,
        task_id: Option<TaskId>,
    ) -> TaskTrackingResult<Vec<TimeEntry>> {
        let active = TimeEntryFilter::IsNull(TimeEntryField::End);
        let filter = match task_id {
            Some(id) => active.and(Filter::eq(TimeEntryField::TaskId, id)),
            None => active,
        };
        self.list_time_entries(&filter).await
    }
}
