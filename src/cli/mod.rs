//! Command-line interface for chorez
//!
//! This module defines the CLI structure using clap derive macros. Each
//! command group lives in its own submodule; rendering is in [`output`].

use clap::{Parser, Subcommand};
use mockable::{Clock, DefaultClock};
use std::io::Write;
use std::sync::Arc;

use crate::config::{
    DATABASE_ENV, DEFAULT_DATABASE, DatabaseLocation, POOL_SIZE_ENV, StoreConfig,
};
use crate::task::{
    adapters::sqlite::SqliteTaskStore,
    ports::{TaskRepository, TimeEntryRepository},
    services::TaskTrackingService,
};

mod error;
mod filter_args;
mod output;
mod task;
mod time;

pub use error::{CliError, CliResult, exit_codes};
pub use filter_args::{parse_condition, parse_conditions};
pub use output::{OutputFormat, format_duration};
pub use task::TaskCommands;
pub use time::{TimeCommands, parse_instant};

/// chorez - track tasks and the time spent on them
#[derive(Parser, Debug)]
#[command(name = "chorez")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file, or `:memory:` for a throwaway store
    #[arg(long, global = true, env = DATABASE_ENV, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Maximum number of pooled database connections
    #[arg(long, global = true, env = POOL_SIZE_ENV, default_value_t = 4)]
    pub pool_size: u32,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Time tracking
    #[command(subcommand)]
    Time(TimeCommands),
}

/// Everything a command handler needs.
pub struct Context<R, C>
where
    R: TaskRepository + TimeEntryRepository,
    C: Clock + Send + Sync,
{
    /// Tracking service over the opened store.
    pub service: TaskTrackingService<R, C>,
    /// Clock used for "now" in arguments and durations.
    pub clock: Arc<C>,
    /// Output rendering.
    pub format: OutputFormat,
}

impl<R, C> Context<R, C>
where
    R: TaskRepository + TimeEntryRepository,
    C: Clock + Send + Sync,
{
    /// Builds a context sharing one clock between the service and the
    /// handlers.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, format: OutputFormat) -> Self {
        Self {
            service: TaskTrackingService::new(repository, Arc::clone(&clock)),
            clock,
            format,
        }
    }
}

impl Cli {
    /// Store configuration selected by the global flags.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(DatabaseLocation::parse(&self.database)).with_pool_size(self.pool_size)
    }

    /// Output rendering selected by `--json`.
    #[must_use]
    pub const fn output_format(&self) -> OutputFormat {
        OutputFormat::from_json_flag(self.json)
    }

    /// Opens the configured store and runs the command against it.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when the store cannot be opened, the command is
    /// rejected, or output fails.
    pub async fn run(self, out: &mut impl Write) -> CliResult<()> {
        let config = self.store_config();
        tracing::debug!(database = %config.location().connection_string(), "opening task store");
        let store = SqliteTaskStore::connect(&config)?;
        let format = self.output_format();
        let context = Context::new(Arc::new(store), Arc::new(DefaultClock), format);
        self.command.run(&context, out).await
    }
}

impl Commands {
    /// Dispatches to the command group.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when the command is rejected or output fails.
    pub async fn run<R, C>(self, context: &Context<R, C>, out: &mut impl Write) -> CliResult<()>
    where
        R: TaskRepository + TimeEntryRepository,
        C: Clock + Send + Sync,
    {
        match self {
            Self::Task(command) => command.run(context, out).await,
            Self::Time(command) => command.run(context, out).await,
        }
    }
}
