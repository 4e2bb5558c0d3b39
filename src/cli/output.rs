//! Presentation of tasks and time entries as text or JSON.

use crate::task::domain::{Level, Priority, Task, TimeEntry};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use super::error::CliResult;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Selects JSON when `json` is set.
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Renders a duration as `1h 05m 09s`, dropping leading zero units.
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = total.div_euclid(3_600);
    let minutes = total.rem_euclid(3_600).div_euclid(60);
    let seconds = total.rem_euclid(60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn id_label<T: ToString>(id: Option<T>) -> String {
    id.map_or_else(|| "-".to_owned(), |value| value.to_string())
}

/// Writes one task summary line.
///
/// # Errors
///
/// Returns an error when writing fails.
pub fn write_task_line(out: &mut impl Write, task: &Task, now: DateTime<Utc>) -> CliResult<()> {
    write!(
        out,
        "#{} [{}/{}] {}",
        id_label(task.id()),
        task.priority(),
        task.difficulty(),
        task.name()
    )?;
    if !task.tags().is_empty() {
        write!(out, " +{}", task.tags().join(" +"))?;
    }
    if !task.time_entries().is_empty() {
        write!(out, " ({} tracked)", format_duration(task.tracked_time(now)))?;
    }
    if task.time_entries().iter().any(TimeEntry::is_active) {
        write!(out, " *active*")?;
    }
    writeln!(out)?;
    if !task.desc().is_empty() {
        writeln!(out, "    {}", task.desc())?;
    }
    Ok(())
}

/// Writes one time entry line, naming its task when it was loaded.
///
/// # Errors
///
/// Returns an error when writing fails.
pub fn write_time_entry_line(
    out: &mut impl Write,
    entry: &TimeEntry,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let task_label = entry.task().map_or_else(
        || format!("task #{}", entry.task_id()),
        |task| format!("task #{} {}", entry.task_id(), task.name()),
    );
    let end = entry
        .end()
        .map_or_else(|| "active".to_owned(), format_instant);
    writeln!(
        out,
        "#{} {task_label}: {} -> {end} ({})",
        id_label(entry.id()),
        format_instant(entry.start()),
        format_duration(entry.duration(now))
    )?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes a task list.
///
/// # Errors
///
/// Returns an error when writing or encoding fails.
pub fn write_tasks(
    out: &mut impl Write,
    tasks: &[Task],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(out, tasks),
        OutputFormat::Text => {
            writeln!(out, "Found {} tasks:", tasks.len())?;
            tasks
                .iter()
                .try_for_each(|task| write_task_line(out, task, now))
        }
    }
}

/// Writes tasks grouped under their priority, most urgent group first.
///
/// Within a group tasks keep their listed order.
///
/// # Errors
///
/// Returns an error when writing or encoding fails.
pub fn write_tasks_by_priority(
    out: &mut impl Write,
    tasks: &[Task],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let mut groups: BTreeMap<Priority, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.priority()).or_default().push(task);
    }

    match format {
        OutputFormat::Json => {
            let keyed: BTreeMap<&str, &Vec<&Task>> = groups
                .iter()
                .map(|(priority, grouped)| (priority.as_str(), grouped))
                .collect();
            write_json(out, &keyed)
        }
        OutputFormat::Text => {
            for (priority, grouped) in groups.iter().rev() {
                writeln!(out, "{priority} ({}):", grouped.len())?;
                for task in grouped {
                    write!(out, "  ")?;
                    write_task_line(out, task, now)?;
                }
            }
            Ok(())
        }
    }
}

/// Writes a single task, including its time entries in text mode.
///
/// # Errors
///
/// Returns an error when writing or encoding fails.
pub fn write_task_detail(
    out: &mut impl Write,
    task: &Task,
    format: OutputFormat,
    now: DateTime<Utc>,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(out, task),
        OutputFormat::Text => {
            write_task_line(out, task, now)?;
            task.time_entries().iter().try_for_each(|entry| {
                write!(out, "  ")?;
                write_time_entry_line(out, entry, now)
            })
        }
    }
}

/// Writes a time entry list.
///
/// # Errors
///
/// Returns an error when writing or encoding fails.
pub fn write_time_entries(
    out: &mut impl Write,
    entries: &[TimeEntry],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(out, entries),
        OutputFormat::Text => entries
            .iter()
            .try_for_each(|entry| write_time_entry_line(out, entry, now)),
    }
}
