//! `chorez time` subcommands.

use super::Context;
use super::error::{CliError, CliResult};
use super::filter_args::parse_conditions;
use super::output::write_time_entries;
use crate::task::{
    domain::{TaskId, TimeEntryField, TimeEntryFilter},
    ports::{TaskRepository, TimeEntryRepository},
    services::StartTimeRequest,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Subcommand;
use mockable::Clock;
use std::io::Write;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Time entry subcommands.
#[derive(Subcommand, Debug)]
pub enum TimeCommands {
    /// Start logging time against a task
    Start {
        /// Task id
        task_id: i64,

        /// Start time: `now`, RFC 3339, or `YYYY-MM-DD[ HH:MM[:SS]]` in UTC
        #[arg(short, long, default_value = "now")]
        start: String,

        /// End time, for logging an interval that is already over
        #[arg(short, long)]
        end: Option<String>,
    },

    /// Close active time entries
    Stop {
        /// Only close the entries of this task
        task_id: Option<i64>,
    },

    /// List active time entries
    Active,

    /// List time entries, latest start first
    List {
        /// Only entries of this task
        #[arg(long)]
        task: Option<i64>,

        /// Condition FIELD<OP>VALUE, repeatable (e.g. start>=2024-05-01T00:00:00Z)
        #[arg(short, long = "where", value_name = "CONDITION")]
        conditions: Vec<String>,

        /// Only active entries
        #[arg(long, conflicts_with = "closed")]
        active: bool,

        /// Only closed entries
        #[arg(long)]
        closed: bool,
    },
}

impl TimeCommands {
    /// Runs the subcommand.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when the command is rejected or output fails.
    pub async fn run<R, C>(self, context: &Context<R, C>, out: &mut impl Write) -> CliResult<()>
    where
        R: TaskRepository + TimeEntryRepository,
        C: Clock + Send + Sync,
    {
        let format = context.format;
        let now = context.clock.utc();
        match self {
            Self::Start {
                task_id,
                start,
                end,
            } => {
                let mut request = StartTimeRequest::new(TaskId::new(task_id))
                    .starting_at(parse_instant(&start, now)?);
                if let Some(raw_end) = end {
                    request = request.ending_at(parse_instant(&raw_end, now)?);
                }
                let entry = context.service.start_time(request).await?;
                write_time_entries(out, &[entry], format, now)
            }
            Self::Stop { task_id } => {
                let closed = context.service.stop_time(task_id.map(TaskId::new)).await?;
                write_time_entries(out, &closed, format, now)
            }
            Self::Active => {
                let active = context.service.active_entries().await?;
                write_time_entries(out, &active, format, now)
            }
            Self::List {
                task,
                conditions,
                active,
                closed,
            } => {
                let mut filter = parse_conditions::<TimeEntryField, _>(&conditions)?;
                if let Some(task_id) = task {
                    filter = filter.and(TimeEntryFilter::eq(
                        TimeEntryField::TaskId,
                        TaskId::new(task_id),
                    ));
                }
                if active {
                    filter = filter.and(TimeEntryFilter::IsNull(TimeEntryField::End));
                }
                if closed {
                    filter = filter.and(TimeEntryFilter::IsNotNull(TimeEntryField::End));
                }
                let entries = context.service.list_time_entries(&filter).await?;
                write_time_entries(out, &entries, format, now)
            }
        }
    }
}

/// Parses a command-line instant.
///
/// Accepts `now`, RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, or a bare date meaning
/// midnight; naive values are read as UTC.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] for anything else.
pub fn parse_instant(raw: &str, now: DateTime<Utc>) -> CliResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| CliError::InvalidArgument(format!("invalid date/time '{raw}'")))
}
