//! `chorez task` subcommands.

use super::error::{CliError, CliResult};
use super::filter_args::parse_conditions;
use super::output::{OutputFormat, write_task_detail, write_tasks, write_tasks_by_priority};
use super::Context;
use crate::task::{
    domain::{Difficulty, Priority, TaskField, TaskFilter, TaskId},
    ports::{TaskRepository, TimeEntryRepository},
    services::{AddTaskRequest, EditTaskRequest},
};
use clap::Subcommand;
use mockable::Clock;
use std::io::Write;

/// Task subcommands.
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task, or update the task with the same name and source
    Add {
        /// Task name
        #[arg(required_unless_present = "name_flag", conflicts_with = "name_flag")]
        name: Option<String>,

        /// Task name, as a flag
        #[arg(short = 'n', long = "name")]
        name_flag: Option<String>,

        /// Priority: insignificant, low, medium, high, critical
        #[arg(short, long, default_value_t = Priority::default())]
        priority: Priority,

        /// Difficulty: breeze, easy, medium, hard, challenging
        #[arg(short, long, default_value_t = Difficulty::default())]
        difficulty: Difficulty,

        /// One or more tags
        #[arg(short, long, num_args = 1..)]
        tags: Vec<String>,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        desc: String,
    },

    /// List tasks, newest first, or show one task with its time entries
    Show {
        /// Task id to show in detail
        id: Option<i64>,

        /// Condition FIELD<OP>VALUE, repeatable (e.g. priority>=high, tag=home)
        #[arg(short, long = "where", value_name = "CONDITION")]
        conditions: Vec<String>,

        /// Group the listing by priority
        #[arg(long)]
        by_priority: bool,
    },

    /// Change a task's fields or tags
    Edit {
        /// Task id
        id: i64,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        desc: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// New difficulty
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Tag edit: `-tag` removes, `tag` or `+tag` keeps an existing tag
        #[arg(short = 't', long = "tag", value_name = "TOKEN", allow_hyphen_values = true)]
        tag_tokens: Vec<String>,
    },

    /// Delete tasks and their time entries
    Rm {
        /// Task ids
        ids: Vec<i64>,

        /// Delete every task matching these conditions instead
        #[arg(short, long = "where", value_name = "CONDITION", conflicts_with = "ids")]
        conditions: Vec<String>,
    },
}

impl TaskCommands {
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
            Self::Add {
                name,
                name_flag,
                priority,
                difficulty,
                tags,
                desc,
            } => {
                let task_name = name.or(name_flag).unwrap_or_default();
                let request = AddTaskRequest::new(task_name)
                    .with_priority(priority)
                    .with_difficulty(difficulty)
                    .with_tags(tags)
                    .with_desc(desc);
                let task = context.service.add_task(request).await?;
                write_task_detail(out, &task, format, now)
            }
            Self::Show {
                id: Some(id),
                conditions,
                by_priority,
            } if conditions.is_empty() && !by_priority => {
                let task = context.service.find_task(TaskId::new(id)).await?;
                write_task_detail(out, &task, format, now)
            }
            Self::Show {
                id,
                conditions,
                by_priority,
            } => {
                let mut filter = parse_conditions::<TaskField, _>(&conditions)?;
                if let Some(task_id) = id {
                    filter = filter.and(TaskFilter::eq(TaskField::Id, TaskId::new(task_id)));
                }
                let tasks = context.service.list_tasks(&filter).await?;
                if by_priority {
                    write_tasks_by_priority(out, &tasks, format, now)
                } else {
                    write_tasks(out, &tasks, format, now)
                }
            }
            Self::Edit {
                id,
                name,
                desc,
                priority,
                difficulty,
                tag_tokens,
            } => {
                let mut request =
                    EditTaskRequest::new(TaskId::new(id)).with_tag_tokens(tag_tokens);
                if let Some(new_name) = name {
                    request = request.with_name(new_name);
                }
                if let Some(new_desc) = desc {
                    request = request.with_desc(new_desc);
                }
                if let Some(new_priority) = priority {
                    request = request.with_priority(new_priority);
                }
                if let Some(new_difficulty) = difficulty {
                    request = request.with_difficulty(new_difficulty);
                }
                let task = context.service.edit_task(request).await?;
                write_task_detail(out, &task, format, now)
            }
            Self::Rm { ids, conditions } => {
                let removed = remove(context, &ids, &conditions).await?;
                match format {
                    OutputFormat::Json => {
                        let summary = serde_json::json!({ "removed": removed });
                        serde_json::to_writer(&mut *out, &summary)?;
                        writeln!(out)?;
                    }
                    OutputFormat::Text => writeln!(out, "Removed {removed} tasks")?,
                }
                Ok(())
            }
        }
    }
}

async fn remove<R, C>(
    context: &Context<R, C>,
    ids: &[i64],
    conditions: &[String],
) -> CliResult<usize>
where
    R: TaskRepository + TimeEntryRepository,
    C: Clock + Send + Sync,
{
    if ids.is_empty() && conditions.is_empty() {
        return Err(CliError::InvalidArgument(
            "give task ids or --where conditions".to_owned(),
        ));
    }
    if conditions.is_empty() {
        for id in ids {
            context.service.remove_task(TaskId::new(*id)).await?;
        }
        return Ok(ids.len());
    }

    let filter = parse_conditions::<TaskField, _>(conditions)?;
    let removed = context.service.remove_tasks(&filter).await?;
    if removed == 0 {
        return Err(CliError::NoMatch("tasks"));
    }
    Ok(removed)
}
