//! Diesel row models and conversions for task persistence.

use super::schema::{tasks, time_entries};
use crate::task::{
    domain::{
        Difficulty, Level, PersistedTaskData, PersistedTimeEntryData, Priority, Task, TaskId,
        TimeEntry, TimeEntryId,
    },
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskRow {
    /// Task identifier.
    pub id: i64,
    /// Task name.
    pub name: String,
    /// Priority level tag.
    pub priority: String,
    /// Difficulty level tag.
    pub difficulty: String,
    /// Tags as a JSON array.
    pub tags: String,
    /// Description.
    pub description: String,
    /// Importer flag.
    pub is_imported: bool,
    /// External provenance identifier.
    pub source_id: Option<String>,
    /// External provenance URL.
    pub source_url: Option<String>,
}

/// Writable task columns, shared by insert and merge.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChanges {
    /// Task name.
    pub name: String,
    /// Priority level tag.
    pub priority: String,
    /// Difficulty level tag.
    pub difficulty: String,
    /// Tags as a JSON array.
    pub tags: String,
    /// Description.
    pub description: String,
    /// Importer flag.
    pub is_imported: bool,
    /// External provenance identifier.
    pub source_id: Option<String>,
    /// External provenance URL.
    pub source_url: Option<String>,
}

/// Query result row for time entry records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = time_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TimeEntryRow {
    /// Entry identifier.
    pub id: i64,
    /// Owning task.
    pub task_id: i64,
    /// Interval start.
    pub start: String,
    /// Interval end.
    pub end_at: Option<String>,
}

/// Writable time entry columns, shared by insert and merge.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = time_entries)]
#[diesel(treat_none_as_null = true)]
pub struct TimeEntryChanges {
    /// Owning task.
    pub task_id: i64,
    /// Interval start.
    pub start: String,
    /// Interval end.
    pub end_at: Option<String>,
}

/// Renders a timestamp in the fixed-width form stored in text columns, so
/// that text comparison orders chronologically.
///
/// The width is fixed only for years 0000 through 9999; saves and filter
/// literals outside that range are rejected before reaching this point.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> TaskRepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(TaskRepositoryError::persistence)
}

/// Builds the writable columns for a task whose tags are already
/// normalized.
pub fn task_changes(task: &Task) -> TaskRepositoryResult<TaskChanges> {
    let tags = serde_json::to_string(task.tags()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskChanges {
        name: task.name().to_owned(),
        priority: task.priority().as_str().to_owned(),
        difficulty: task.difficulty().as_str().to_owned(),
        tags,
        description: task.desc().to_owned(),
        is_imported: task.is_imported(),
        source_id: task.source_id().map(str::to_owned),
        source_url: task.source_url().map(str::to_owned),
    })
}

/// Rebuilds a task from its row; time entries are attached separately.
pub fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        name,
        priority,
        difficulty,
        tags,
        description,
        is_imported,
        source_id,
        source_url,
    } = row;

    let priority = Priority::parse(&priority).map_err(TaskRepositoryError::persistence)?;
    let difficulty = Difficulty::parse(&difficulty).map_err(TaskRepositoryError::persistence)?;
    let tags =
        serde_json::from_str::<Vec<String>>(&tags).map_err(TaskRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::new(id),
        name,
        priority,
        difficulty,
        tags,
        desc: description,
        is_imported,
        source_id,
        source_url,
    }))
}

/// Builds the writable columns for a time entry.
pub fn time_entry_changes(entry: &TimeEntry) -> TimeEntryChanges {
    TimeEntryChanges {
        task_id: entry.task_id().value(),
        start: format_timestamp(entry.start()),
        end_at: entry.end().map(format_timestamp),
    }
}

/// Rebuilds a time entry from its row; the task is attached separately.
pub fn row_to_time_entry(row: TimeEntryRow) -> TaskRepositoryResult<TimeEntry> {
    let start = parse_timestamp(&row.start)?;
    let end = row.end_at.as_deref().map(parse_timestamp).transpose()?;
    Ok(TimeEntry::from_persisted(PersistedTimeEntryData {
        id: TimeEntryId::new(row.id),
        task_id: TaskId::new(row.task_id),
        start,
        end,
    }))
}
