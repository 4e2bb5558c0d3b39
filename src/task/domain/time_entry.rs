//! Time entries: intervals of work logged against a task.

use super::{Task, TaskDomainError, TaskId, TimeEntryId};
use chrono::{DateTime, Datelike, Duration, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Checks that `timestamp` lies in years 0000 through 9999.
///
/// # Errors
///
/// Returns [`TaskDomainError::TimestampOutOfRange`] otherwise.
pub fn check_storable_timestamp(timestamp: DateTime<Utc>) -> Result<(), TaskDomainError> {
    if (0..=9999).contains(&timestamp.year()) {
        Ok(())
    } else {
        Err(TaskDomainError::TimestampOutOfRange {
            timestamp: timestamp.to_rfc3339(),
        })
    }
}

/// An interval logged against a task. Open (active) while `end` is unset.
///
/// Timestamps are kept at microsecond precision so an in-memory value and
/// its stored copy compare equal, which the `(task_id, start)` identity
/// relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    id: Option<TimeEntryId>,
    task_id: TaskId,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task: Option<Box<Task>>,
}

/// Parameter object for reconstructing a persisted time entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTimeEntryData {
    /// Row identifier.
    pub id: TimeEntryId,
    /// Owning task.
    pub task_id: TaskId,
    /// Interval start.
    pub start: DateTime<Utc>,
    /// Interval end, if closed.
    pub end: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// Creates a transient, active entry starting at `start`.
    #[must_use]
    pub fn new(task_id: TaskId, start: DateTime<Utc>) -> Self {
        Self {
            id: None,
            task_id,
            start: start.trunc_subsecs(6),
            end: None,
            task: None,
        }
    }

    /// Creates a transient, active entry starting now.
    #[must_use]
    pub fn start_now(task_id: TaskId, clock: &impl Clock) -> Self {
        Self::new(task_id, clock.utc())
    }

    /// Reconstructs an entry from persisted storage.
    #[must_use]
    pub const fn from_persisted(data: PersistedTimeEntryData) -> Self {
        Self {
            id: Some(data.id),
            task_id: data.task_id,
            start: data.start,
            end: data.end,
            task: None,
        }
    }

    /// Claims an explicit id; saving checks it against the stored rows.
    #[must_use]
    pub const fn with_id(mut self, id: TimeEntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Closes the interval at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EndBeforeStart`] when `end` precedes the
    /// start and [`TaskDomainError::TimestampOutOfRange`] when `end` falls
    /// outside years 0000 through 9999.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Result<Self, TaskDomainError> {
        let closed_at = end.trunc_subsecs(6);
        check_storable_timestamp(closed_at)?;
        if closed_at < self.start {
            return Err(TaskDomainError::EndBeforeStart {
                start: self.start.to_rfc3339(),
                end: closed_at.to_rfc3339(),
            });
        }
        self.end = Some(closed_at);
        Ok(self)
    }

    /// Closes the interval now.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EndBeforeStart`] when the entry starts in
    /// the future.
    pub fn close(self, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        self.with_end(clock.utc())
    }

    /// Checks that both ends of the interval lie in years 0000 through 9999.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TimestampOutOfRange`] for the first
    /// offending timestamp.
    pub fn check_timestamps(&self) -> Result<(), TaskDomainError> {
        check_storable_timestamp(self.start)?;
        self.end.map_or(Ok(()), check_storable_timestamp)
    }

    /// Returns the id, or `None` for a transient entry.
    #[must_use]
    pub const fn id(&self) -> Option<TimeEntryId> {
        self.id
    }

    /// Returns the owning task id.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the interval start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the interval end, if closed.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Returns `true` while the interval is open.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Returns the owning task when it was loaded with the entry.
    #[must_use]
    pub fn task(&self) -> Option<&Task> {
        self.task.as_deref()
    }

    /// Length of the interval; active entries are measured up to `now`.
    #[must_use]
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end.unwrap_or(now);
        (end - self.start).max(Duration::zero())
    }

    pub(crate) const fn assign_id(&mut self, id: TimeEntryId) {
        self.id = Some(id);
    }

    pub(crate) fn attach_task(&mut self, task: Task) {
        self.task = Some(Box::new(task));
    }
}
