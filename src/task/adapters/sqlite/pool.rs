//! Connection pool setup for the embedded `SQLite` store.
//!
//! Every pooled connection gets foreign-key enforcement and a busy timeout
//! when it is opened, so cascade deletes hold for the connection's whole
//! lifetime. The schema is applied once when the pool is built.

use crate::config::StoreConfig;
use crate::task::ports::{TaskRepositoryError, TaskRepositoryResult};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

/// `SQLite` connection pool type used by task adapters.
pub type TaskSqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Pooled connection type for internal use.
pub(super) type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Schema for tasks and time entries.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-19-000000_create_tasks_and_time_entries/up.sql");

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        connection
            .batch_execute(&format!(
                "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
                self.busy_timeout_ms
            ))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Opens the pool described by `config` and applies the schema.
///
/// An in-memory database is held by a single connection that is never
/// recycled, so its contents live as long as the pool.
///
/// # Errors
///
/// Returns [`TaskRepositoryError::Persistence`] when the database cannot be
/// opened or the schema cannot be applied.
pub fn open_pool(config: &StoreConfig) -> TaskRepositoryResult<TaskSqlitePool> {
    let manager =
        ConnectionManager::<SqliteConnection>::new(config.location().connection_string());
    let pool = Pool::builder()
        .max_size(config.pool_size())
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_customizer(Box::new(ConnectionPragmas {
            busy_timeout_ms: config.busy_timeout_ms(),
        }))
        .build(manager)
        .map_err(TaskRepositoryError::persistence)?;

    let mut connection = get_conn(&pool)?;
    connection
        .batch_execute(CREATE_SCHEMA_SQL)
        .map_err(TaskRepositoryError::persistence)?;
    Ok(pool)
}

/// Obtains a connection from the pool.
pub(super) fn get_conn(pool: &TaskSqlitePool) -> TaskRepositoryResult<PooledConn> {
    pool.get().map_err(TaskRepositoryError::persistence)
}

/// Runs a blocking database operation on a dedicated thread pool.
pub(super) async fn run_blocking<F, T>(pool: &TaskSqlitePool, operation: F) -> TaskRepositoryResult<T>
where
    F: FnOnce(&mut SqliteConnection) -> TaskRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = get_conn(&pool)?;
        operation(&mut connection)
    })
    .await
    .map_err(TaskRepositoryError::persistence)?
}
