//! `SQLite` repository implementation for tasks and time entries.

use super::{
    filter_sql::translate,
    models::{
        TaskChanges, TaskRow, TimeEntryRow, row_to_task, row_to_time_entry, task_changes,
        time_entry_changes,
    },
    pool::{TaskSqlitePool, open_pool, run_blocking},
    schema::{tasks, time_entries},
};
use crate::config::StoreConfig;
use crate::task::{
    domain::{Task, TaskFilter, TaskId, TaskIdentityKey, TimeEntry, TimeEntryFilter, TimeEntryId},
    ports::{
        IdentityConflict, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
        TimeEntryRepository,
    },
};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::{Sqlite, SqliteConnection};
use std::collections::HashMap;

/// Bound parameters per `IN (...)` batch when loading child rows.
const EAGER_LOAD_CHUNK: usize = 500;

const SELECT_TASKS: &str = concat!(
    "SELECT tasks.id, tasks.name, tasks.priority, tasks.difficulty, tasks.tags, ",
    "tasks.\"desc\" AS description, tasks.is_imported, tasks.source_id, tasks.source_url ",
    "FROM tasks WHERE ",
);

const SELECT_TIME_ENTRIES: &str = concat!(
    "SELECT time_entries.id, time_entries.task_id, time_entries.start, ",
    "time_entries.\"end\" AS end_at FROM time_entries WHERE ",
);

/// `SQLite`-backed task and time entry store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: TaskSqlitePool,
    identity_key: TaskIdentityKey,
}

impl SqliteTaskStore {
    /// Creates a store over an already opened pool.
    #[must_use]
    pub const fn new(pool: TaskSqlitePool, identity_key: TaskIdentityKey) -> Self {
        Self { pool, identity_key }
    }

    /// Opens the database described by `config`, creating the schema if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the database cannot
    /// be opened.
    pub fn connect(config: &StoreConfig) -> TaskRepositoryResult<Self> {
        let pool = open_pool(config)?;
        Ok(Self::new(pool, config.identity_key()))
    }

    /// Returns the identity key used to merge saved tasks.
    #[must_use]
    pub const fn identity_key(&self) -> TaskIdentityKey {
        self.identity_key
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation,
                ref info,
            ) => Self::ConstraintViolation(info.message().to_owned()),
            other => Self::persistence(other),
        }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskStore {
    async fn save_task(&self, task: Task) -> TaskRepositoryResult<Task> {
        let identity_key = self.identity_key;
        run_blocking(&self.pool, move |connection| {
            connection.immediate_transaction(|tx| save_task_in(tx, task, identity_key))
        })
        .await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let predicate = translate(filter)?;
        run_blocking(&self.pool, move |connection| {
            let query = diesel::sql_query(format!(
                "{SELECT_TASKS}{} ORDER BY tasks.id DESC",
                predicate.sql
            ))
            .into_boxed::<Sqlite>();
            let rows = predicate.bind_to(query).load::<TaskRow>(connection)?;
            with_time_entries(connection, rows)
        })
        .await
    }

    async fn delete_tasks(&self, filter: &TaskFilter) -> TaskRepositoryResult<usize> {
        let predicate = translate(filter)?;
        run_blocking(&self.pool, move |connection| {
            let query = diesel::sql_query(format!("DELETE FROM tasks WHERE {}", predicate.sql))
                .into_boxed::<Sqlite>();
            Ok(predicate.bind_to(query).execute(connection)?)
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        run_blocking(&self.pool, move |connection| {
            let row = tasks::table
                .find(id.value())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            let loaded = with_time_entries(connection, row.into_iter().collect())?;
            Ok(loaded.into_iter().next())
        })
        .await
    }
}

#[async_trait]
impl TimeEntryRepository for SqliteTaskStore {
    async fn save_time_entry(&self, entry: TimeEntry) -> TaskRepositoryResult<TimeEntry> {
        run_blocking(&self.pool, move |connection| {
            connection.immediate_transaction(|tx| save_time_entry_in(tx, &entry))
        })
        .await
    }

    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> TaskRepositoryResult<Vec<TimeEntry>> {
        let predicate = translate(filter)?;
        run_blocking(&self.pool, move |connection| {
            let query = diesel::sql_query(format!(
                "{SELECT_TIME_ENTRIES}{} ORDER BY time_entries.start DESC, time_entries.id DESC",
                predicate.sql
            ))
            .into_boxed::<Sqlite>();
            let rows = predicate.bind_to(query).load::<TimeEntryRow>(connection)?;
            with_owning_tasks(connection, rows)
        })
        .await
    }

    async fn delete_time_entries(&self, filter: &TimeEntryFilter) -> TaskRepositoryResult<usize> {
        let predicate = translate(filter)?;
        run_blocking(&self.pool, move |connection| {
            let query =
                diesel::sql_query(format!("DELETE FROM time_entries WHERE {}", predicate.sql))
                    .into_boxed::<Sqlite>();
            Ok(predicate.bind_to(query).execute(connection)?)
        })
        .await
    }
}

fn save_task_in(
    connection: &mut SqliteConnection,
    mut task: Task,
    identity_key: TaskIdentityKey,
) -> TaskRepositoryResult<Task> {
    task.normalize_tags();
    let changes = task_changes(&task)?;
    let claimed = task.id();

    let id = match find_identity_match(connection, &task, identity_key)? {
        Some(resolved) => {
            if let Some(claimed_id) = claimed.filter(|claimed_id| *claimed_id != resolved) {
                return Err(IdentityConflict::Task {
                    claimed: claimed_id,
                    resolved,
                }
                .into());
            }
            diesel::update(tasks::table.find(resolved.value()))
                .set(&changes)
                .execute(connection)?;
            resolved
        }
        None => match claimed {
            Some(claimed_id) => {
                let updated = diesel::update(tasks::table.find(claimed_id.value()))
                    .set(&changes)
                    .execute(connection)?;
                if updated == 0 {
                    diesel::insert_into(tasks::table)
                        .values((tasks::id.eq(claimed_id.value()), &changes))
                        .execute(connection)
                        .map_err(|err| insert_error(err, &changes))?;
                }
                claimed_id
            }
            None => diesel::insert_into(tasks::table)
                .values(&changes)
                .returning(tasks::id)
                .get_result::<i64>(connection)
                .map(TaskId::new)
                .map_err(|err| insert_error(err, &changes))?,
        },
    };

    load_task(connection, id)
}

fn find_identity_match(
    connection: &mut SqliteConnection,
    task: &Task,
    identity_key: TaskIdentityKey,
) -> TaskRepositoryResult<Option<TaskId>> {
    let mut query = tasks::table
        .select(tasks::id)
        .filter(tasks::name.eq(task.name().to_owned()))
        .into_boxed();
    if identity_key.includes_source_id() {
        query = match task.source_id() {
            Some(source_id) => query.filter(tasks::source_id.eq(source_id.to_owned())),
            None => query.filter(tasks::source_id.is_null()),
        };
    }
    if identity_key.includes_source_url() {
        query = match task.source_url() {
            Some(source_url) => query.filter(tasks::source_url.eq(source_url.to_owned())),
            None => query.filter(tasks::source_url.is_null()),
        };
    }
    let id = query
        .order(tasks::id.asc())
        .first::<i64>(connection)
        .optional()?;
    Ok(id.map(TaskId::new))
}

fn insert_error(err: DieselError, changes: &TaskChanges) -> TaskRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            IdentityConflict::ConcurrentTaskInsert {
                name: changes.name.clone(),
            }
            .into()
        }
        other => other.into(),
    }
}

fn load_task(connection: &mut SqliteConnection, id: TaskId) -> TaskRepositoryResult<Task> {
    let row = tasks::table
        .find(id.value())
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)?;
    with_time_entries(connection, vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| TaskRepositoryError::persistence(DieselError::NotFound))
}

/// Converts task rows, attaching each task's entries newest first.
fn with_time_entries(
    connection: &mut SqliteConnection,
    rows: Vec<TaskRow>,
) -> TaskRepositoryResult<Vec<Task>> {
    let task_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut entries_by_task: HashMap<i64, Vec<TimeEntry>> = HashMap::new();
    for chunk in task_ids.chunks(EAGER_LOAD_CHUNK) {
        let entry_rows = time_entries::table
            .filter(time_entries::task_id.eq_any(chunk.to_vec()))
            .order((time_entries::start.desc(), time_entries::id.desc()))
            .select(TimeEntryRow::as_select())
            .load::<TimeEntryRow>(connection)?;
        for entry_row in entry_rows {
            let task_id = entry_row.task_id;
            entries_by_task
                .entry(task_id)
                .or_default()
                .push(row_to_time_entry(entry_row)?);
        }
    }

    rows.into_iter()
        .map(|row| {
            let entries = entries_by_task.remove(&row.id).unwrap_or_default();
            let mut task = row_to_task(row)?;
            task.attach_time_entries(entries);
            Ok(task)
        })
        .collect()
}

/// Converts entry rows, attaching each entry's owning task.
fn with_owning_tasks(
    connection: &mut SqliteConnection,
    rows: Vec<TimeEntryRow>,
) -> TaskRepositoryResult<Vec<TimeEntry>> {
    let mut task_ids: Vec<i64> = rows.iter().map(|row| row.task_id).collect();
    task_ids.sort_unstable();
    task_ids.dedup();

    let mut tasks_by_id: HashMap<i64, Task> = HashMap::new();
    for chunk in task_ids.chunks(EAGER_LOAD_CHUNK) {
        let task_rows = tasks::table
            .filter(tasks::id.eq_any(chunk.to_vec()))
            .select(TaskRow::as_select())
            .load::<TaskRow>(connection)?;
        for task_row in task_rows {
            tasks_by_id.insert(task_row.id, row_to_task(task_row)?);
        }
    }

    rows.into_iter()
        .map(|row| {
            let owner = tasks_by_id.get(&row.task_id).cloned();
            let mut entry = row_to_time_entry(row)?;
            if let Some(task) = owner {
                entry.attach_task(task);
            }
            Ok(entry)
        })
        .collect()
}

fn save_time_entry_in(
    connection: &mut SqliteConnection,
    entry: &TimeEntry,
) -> TaskRepositoryResult<TimeEntry> {
    entry
        .check_timestamps()
        .map_err(|err| TaskRepositoryError::ConstraintViolation(err.to_string()))?;
    let changes = time_entry_changes(entry);
    let claimed = entry.id();

    let mut query = time_entries::table
        .select(time_entries::id)
        .filter(
            time_entries::task_id
                .eq(changes.task_id)
                .and(time_entries::start.eq(changes.start.clone())),
        )
        .into_boxed();
    if let Some(claimed_id) = claimed {
        query = query.or_filter(time_entries::id.eq(claimed_id.value()));
    }
    let matches = query
        .order(time_entries::id.asc())
        .load::<i64>(connection)?;

    if let Some(claimed_id) = claimed
        && let Some(other) = matches.iter().find(|id| **id != claimed_id.value())
    {
        return Err(IdentityConflict::TimeEntry {
            claimed: claimed_id,
            resolved: TimeEntryId::new(*other),
        }
        .into());
    }

    let id = match (matches.first(), claimed) {
        (Some(existing), _) => {
            diesel::update(time_entries::table.find(*existing))
                .set(&changes)
                .execute(connection)?;
            *existing
        }
        (None, Some(claimed_id)) => {
            diesel::insert_into(time_entries::table)
                .values((time_entries::id.eq(claimed_id.value()), &changes))
                .execute(connection)?;
            claimed_id.value()
        }
        (None, None) => diesel::insert_into(time_entries::table)
            .values(&changes)
            .returning(time_entries::id)
            .get_result::<i64>(connection)?,
    };

    let row = time_entries::table
        .find(id)
        .select(TimeEntryRow::as_select())
        .first::<TimeEntryRow>(connection)?;
    with_owning_tasks(connection, vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| TaskRepositoryError::persistence(DieselError::NotFound))
}
