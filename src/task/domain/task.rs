//! Task entity and its transient/persistent lifecycle.

use super::{Difficulty, Priority, TaskDomainError, TaskId, TimeEntry, normalize_tags};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A tracked work item.
///
/// A task without an id is transient; the repository assigns or adopts an
/// id when it is saved. A task exclusively owns its time entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: Option<TaskId>,
    name: String,
    priority: Priority,
    difficulty: Difficulty,
    tags: Vec<String>,
    desc: String,
    is_imported: bool,
    source_id: Option<String>,
    source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    time_entries: Vec<TimeEntry>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Row identifier.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Stored priority.
    pub priority: Priority,
    /// Stored difficulty.
    pub difficulty: Difficulty,
    /// Stored tags.
    pub tags: Vec<String>,
    /// Free-text description.
    pub desc: String,
    /// Whether an importer created the task.
    pub is_imported: bool,
    /// External provenance identifier.
    pub source_id: Option<String>,
    /// External provenance URL.
    pub source_url: Option<String>,
}

impl Task {
    /// Creates a transient task with default priority and difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when `name` is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, TaskDomainError> {
        Ok(Self {
            id: None,
            name: validated_name(name.into())?,
            priority: Priority::default(),
            difficulty: Difficulty::default(),
            tags: Vec::new(),
            desc: String::new(),
            is_imported: false,
            source_id: None,
            source_url: None,
            time_entries: Vec::new(),
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: Some(data.id),
            name: data.name,
            priority: data.priority,
            difficulty: data.difficulty,
            tags: data.tags,
            desc: data.desc,
            is_imported: data.is_imported,
            source_id: data.source_id,
            source_url: data.source_url,
            time_entries: Vec::new(),
        }
    }

    /// Claims an explicit id; saving checks it against the identity key.
    #[must_use]
    pub const fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
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

    /// Sets the tags as given; normalization happens on save.
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

    /// Marks the task as created by an importer from an external source.
    ///
    /// Blank provenance values are stored as absent.
    #[must_use]
    pub fn imported_from(
        mut self,
        source_id: Option<String>,
        source_url: Option<String>,
    ) -> Self {
        self.is_imported = true;
        self.source_id = non_blank(source_id);
        self.source_url = non_blank(source_url);
        self
    }

    /// Returns the id, or `None` for a transient task.
    #[must_use]
    pub const fn id(&self) -> Option<TaskId> {
        self.id
    }

    /// Returns `true` until the task has been saved.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the description.
    #[must_use]
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Returns `true` for importer-created tasks.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        self.is_imported
    }

    /// Returns the external provenance identifier.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Returns the external provenance URL.
    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Returns the eagerly loaded time entries, newest first.
    #[must_use]
    pub fn time_entries(&self) -> &[TimeEntry] {
        &self.time_entries
    }

    /// Renames the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when `name` is blank.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), TaskDomainError> {
        self.name = validated_name(name.into())?;
        Ok(())
    }

    /// Replaces the priority.
    pub const fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Replaces the difficulty.
    pub const fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Replaces the description.
    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.desc = desc.into();
    }

    /// Replaces the tags as given; normalization happens on save.
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
    }

    /// Sum of all entry durations, measuring active entries up to `now`.
    #[must_use]
    pub fn tracked_time(&self, now: DateTime<Utc>) -> Duration {
        self.time_entries
            .iter()
            .map(|entry| entry.duration(now))
            .fold(Duration::zero(), |total, elapsed| total + elapsed)
    }

    /// Lowercases, sorts, and deduplicates the tags in place.
    pub fn normalize_tags(&mut self) {
        self.tags = normalize_tags(std::mem::take(&mut self.tags));
    }

    pub(crate) const fn assign_id(&mut self, id: TaskId) {
        self.id = Some(id);
    }

    pub(crate) fn attach_time_entries(&mut self, entries: Vec<TimeEntry>) {
        self.time_entries = entries;
    }

    /// Copy of this task without its time entries, used as the back
    /// reference carried by each entry.
    pub(crate) fn without_time_entries(&self) -> Self {
        Self {
            time_entries: Vec::new(),
            ..self.clone()
        }
    }
}

fn validated_name(name: String) -> Result<String, TaskDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyTaskName);
    }
    Ok(trimmed.to_owned())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
