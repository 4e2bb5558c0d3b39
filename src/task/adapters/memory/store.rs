//! In-memory task and time entry store for tests and ephemeral use.
//!
//! Mirrors the `SQLite` store's merge rules, ordering, and cascade so that
//! services behave identically against either backend.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        Task, TaskFilter, TaskId, TaskIdentityKey, TimeEntry, TimeEntryFilter, TimeEntryId,
    },
    ports::{
        IdentityConflict, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
        TimeEntryRepository,
    },
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryTaskState>>,
    identity_key: TaskIdentityKey,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: BTreeMap<TaskId, Task>,
    entries: BTreeMap<TimeEntryId, TimeEntry>,
    last_task_id: i64,
    last_entry_id: i64,
}

impl InMemoryTaskStore {
    /// Creates an empty store keyed on `(name, source_id, source_url)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store merging tasks by `identity_key`.
    #[must_use]
    pub fn with_identity_key(identity_key: TaskIdentityKey) -> Self {
        Self {
            state: Arc::default(),
            identity_key,
        }
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl InMemoryTaskState {
    fn next_task_id(&mut self) -> TaskId {
        self.last_task_id += 1;
        TaskId::new(self.last_task_id)
    }

    fn next_entry_id(&mut self) -> TimeEntryId {
        self.last_entry_id += 1;
        TimeEntryId::new(self.last_entry_id)
    }

    /// Enforces the stored uniqueness of `(name, source_id, source_url)`.
    fn check_unique(&self, task: &Task, id: TaskId) -> TaskRepositoryResult<()> {
        let taken = self.tasks.values().any(|stored| {
            stored.id() != Some(id) && TaskIdentityKey::full().matches(stored, task)
        });
        if taken {
            return Err(TaskRepositoryError::ConstraintViolation(format!(
                "a task named '{}' with the same source already exists",
                task.name()
            )));
        }
        Ok(())
    }

    fn insert_task(&mut self, mut task: Task, id: TaskId) -> TaskRepositoryResult<TaskId> {
        if self.check_unique(&task, id).is_err() {
            return Err(IdentityConflict::ConcurrentTaskInsert {
                name: task.name().to_owned(),
            }
            .into());
        }
        self.last_task_id = self.last_task_id.max(id.value());
        task.assign_id(id);
        self.tasks.insert(id, task);
        Ok(id)
    }

    fn replace_task(&mut self, mut task: Task, id: TaskId) -> TaskRepositoryResult<TaskId> {
        self.check_unique(&task, id)?;
        task.assign_id(id);
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Stored entries of `task_id`, latest start first.
    fn entries_of(&self, task_id: TaskId) -> Vec<TimeEntry> {
        let mut entries: Vec<TimeEntry> = self
            .entries
            .values()
            .filter(|entry| entry.task_id() == task_id)
            .cloned()
            .collect();
        sort_latest_first(&mut entries);
        entries
    }

    fn loaded_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.get(&id).map(|stored| {
            let mut task = stored.clone();
            task.attach_time_entries(self.entries_of(id));
            task
        })
    }

    fn loaded_entry(&self, id: TimeEntryId) -> Option<TimeEntry> {
        self.entries.get(&id).map(|stored| {
            let mut entry = stored.clone();
            if let Some(task) = self.tasks.get(&entry.task_id()) {
                entry.attach_task(task.clone());
            }
            entry
        })
    }
}

fn sort_latest_first(entries: &mut [TimeEntry]) {
    entries.sort_by(|left, right| {
        right
            .start()
            .cmp(&left.start())
            .then_with(|| right.id().cmp(&left.id()))
    });
}

fn missing_row() -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other("saved row disappeared"))
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn save_task(&self, task: Task) -> TaskRepositoryResult<Task> {
        let mut candidate = task.without_time_entries();
        candidate.normalize_tags();
        let claimed = candidate.id();

        let mut state = self.write()?;
        let resolved = state
            .tasks
            .values()
            .find(|stored| self.identity_key.matches(stored, &candidate))
            .and_then(Task::id);

        let id = match (resolved, claimed) {
            (Some(resolved_id), Some(claimed_id)) if resolved_id != claimed_id => {
                return Err(IdentityConflict::Task {
                    claimed: claimed_id,
                    resolved: resolved_id,
                }
                .into());
            }
            (Some(resolved_id), _) => state.replace_task(candidate, resolved_id)?,
            (None, Some(claimed_id)) if state.tasks.contains_key(&claimed_id) => {
                state.replace_task(candidate, claimed_id)?
            }
            (None, Some(claimed_id)) => state.insert_task(candidate, claimed_id)?,
            (None, None) => {
                let id = state.next_task_id();
                state.insert_task(candidate, id)?
            }
        };

        state.loaded_task(id).ok_or_else(missing_row)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        filter.validate()?;
        let state = self.read()?;
        Ok(state
            .tasks
            .iter()
            .rev()
            .filter(|(_, task)| filter.matches(*task))
            .filter_map(|(id, _)| state.loaded_task(*id))
            .collect())
    }

    async fn delete_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<usize> {
        filter.validate()?;
        let mut state = self.write()?;
        let doomed: Vec<TaskId> = state
            .tasks
            .iter()
            .filter(|(_, task)| filter.matches(*task))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            state.tasks.remove(id);
        }
        state
            .entries
            .retain(|_, entry| !doomed.contains(&entry.task_id()));
        Ok(doomed.len())
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.loaded_task(id))
    }
}

#[async_trait]
impl TimeEntryRepository for InMemoryTaskStore {
    async fn save_time_entry(&self, entry: TimeEntry) -> TaskRepositoryResult<TimeEntry> {
        entry
            .check_timestamps()
            .map_err(|err| TaskRepositoryError::ConstraintViolation(err.to_string()))?;
        let claimed = entry.id();
        let mut state = self.write()?;

        let matches: Vec<TimeEntryId> = state
            .entries
            .values()
            .filter(|stored| {
                (claimed.is_some() && stored.id() == claimed)
                    || (stored.task_id() == entry.task_id() && stored.start() == entry.start())
            })
            .filter_map(TimeEntry::id)
            .collect();

        if let Some(claimed_id) = claimed
            && let Some(other) = matches.iter().find(|id| **id != claimed_id)
        {
            return Err(IdentityConflict::TimeEntry {
                claimed: claimed_id,
                resolved: *other,
            }
            .into());
        }

        if !state.tasks.contains_key(&entry.task_id()) {
            return Err(TaskRepositoryError::ConstraintViolation(format!(
                "time entry refers to missing task {}",
                entry.task_id()
            )));
        }

        let id = match (matches.first(), claimed) {
            (Some(existing), _) => *existing,
            (None, Some(claimed_id)) => {
                state.last_entry_id = state.last_entry_id.max(claimed_id.value());
                claimed_id
            }
            (None, None) => state.next_entry_id(),
        };

        let mut stored = TimeEntry::new(entry.task_id(), entry.start());
        if let Some(end) = entry.end() {
            stored = stored.with_end(end).map_err(TaskRepositoryError::persistence)?;
        }
        stored.assign_id(id);
        state.entries.insert(id, stored);

        state.loaded_entry(id).ok_or_else(missing_row)
    }

    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> TaskRepositoryResult<Vec<TimeEntry>> {
        filter.validate()?;
        let state = self.read()?;
        let mut entries: Vec<TimeEntry> = state
            .entries
            .iter()
            .filter(|(_, entry)| filter.matches(*entry))
            .filter_map(|(id, _)| state.loaded_entry(*id))
            .collect();
        sort_latest_first(&mut entries);
        Ok(entries)
    }

    async fn delete_time_entries(&self, filter: &TimeEntryFilter) -> TaskRepositoryResult<usize> {
        filter.validate()?;
        let mut state = self.write()?;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !filter.matches(entry));
        Ok(before - state.entries.len())
    }
}
