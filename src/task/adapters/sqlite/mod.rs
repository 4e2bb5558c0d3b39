//! `SQLite` adapters for task and time entry persistence.

mod filter_sql;
mod models;
mod pool;
mod repository;
mod schema;

pub use filter_sql::{BindValue, SqlColumn, SqlPredicate, translate};
pub use models::format_timestamp;
pub use pool::{CREATE_SCHEMA_SQL, TaskSqlitePool, open_pool};
pub use repository::SqliteTaskStore;
