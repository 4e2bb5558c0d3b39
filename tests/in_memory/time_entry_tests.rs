//! In-memory integration tests for time entries.

use super::helpers::{may_first, store};
use chorez::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        Comparison, Task, TaskField, TaskFilter, TaskId, TimeEntry, TimeEntryField, TimeEntryFilter,
        TimeEntryId,
    },
    ports::{IdentityConflict, TaskRepository, TaskRepositoryError, TimeEntryRepository},
};
use chrono::{TimeZone, Utc};
use rstest::rstest;

async fn saved_task(store: &InMemoryTaskStore, name: &str) -> Result<TaskId, eyre::Report> {
    store
        .save_task(Task::new(name)?)
        .await?
        .id()
        .ok_or_else(|| eyre::eyre!("save returned a transient task"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_an_entry_moves_it_between_active_and_closed(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "knit scarf").await?;
    let active = TimeEntryFilter::IsNull(TimeEntryField::End);
    let closed = TimeEntryFilter::IsNotNull(TimeEntryField::End);

    let open = store
        .save_time_entry(TimeEntry::new(task_id, may_first(9, 0)?))
        .await?;
    eyre::ensure!(store.list_time_entries(&active).await?.len() == 1, "entry not active");

    let finished = TimeEntry::new(task_id, may_first(9, 0)?).with_end(may_first(10, 15)?)?;
    let resaved = store.save_time_entry(finished).await?;

    eyre::ensure!(resaved.id() == open.id(), "closing created a new row");
    eyre::ensure!(store.list_time_entries(&active).await?.is_empty(), "still active");
    eyre::ensure!(store.list_time_entries(&closed).await?.len() == 1, "not closed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entries_list_latest_start_first_with_their_task(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "practice piano").await?;
    for hour in [8, 14, 11] {
        store
            .save_time_entry(TimeEntry::new(task_id, may_first(hour, 0)?))
            .await?;
    }

    let entries = store.list_time_entries(&TimeEntryFilter::All).await?;

    let starts: Vec<_> = entries.iter().map(TimeEntry::start).collect();
    eyre::ensure!(
        starts == [may_first(14, 0)?, may_first(11, 0)?, may_first(8, 0)?],
        "order was {starts:?}"
    );
    eyre::ensure!(
        entries
            .iter()
            .all(|entry| entry.task().map(Task::name) == Some("practice piano")),
        "entries missing their task"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_task_cascades_to_its_entries(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let doomed = saved_task(&store, "old hobby").await?;
    let kept = saved_task(&store, "new hobby").await?;
    store.save_time_entry(TimeEntry::new(doomed, may_first(9, 0)?)).await?;
    store.save_time_entry(TimeEntry::new(kept, may_first(9, 0)?)).await?;

    let removed = store
        .delete_tasks(&TaskFilter::eq(TaskField::Id, doomed))
        .await?;

    eyre::ensure!(removed == 1, "removed {removed} tasks");
    let remaining = store.list_time_entries(&TimeEntryFilter::All).await?;
    eyre::ensure!(
        remaining.iter().all(|entry| entry.task_id() == kept),
        "orphaned entries survived"
    );
    eyre::ensure!(remaining.len() == 1, "kept task lost its entry");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entries_for_missing_tasks_violate_constraints(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let result = store
        .save_time_entry(TimeEntry::new(TaskId::new(99), may_first(9, 0)?))
        .await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::ConstraintViolation(_))),
        "expected constraint violation, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claimed_entry_id_must_match_task_and_start(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "jog").await?;
    let first = store
        .save_time_entry(TimeEntry::new(task_id, may_first(7, 0)?))
        .await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(18, 0)?))
        .await?;
    let first_id = first.id().ok_or_else(|| eyre::eyre!("transient entry"))?;

    let result = store
        .save_time_entry(TimeEntry::new(task_id, may_first(18, 0)?).with_id(first_id))
        .await;

    eyre::ensure!(
        matches!(
            result,
            Err(TaskRepositoryError::IdentityConflict(IdentityConflict::TimeEntry { claimed, .. }))
                if claimed == first_id
        ),
        "expected entry identity conflict, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_time_entries_counts_removed_rows(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "garden").await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(8, 0)?).with_end(may_first(9, 0)?)?)
        .await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(10, 0)?))
        .await?;

    let removed = store
        .delete_time_entries(&TimeEntryFilter::IsNotNull(TimeEntryField::End))
        .await?;

    eyre::ensure!(removed == 1, "removed {removed} entries");
    let left = store.list_time_entries(&TimeEntryFilter::All).await?;
    eyre::ensure!(
        left.iter().map(TimeEntry::id).collect::<Vec<_>>() == [Some(TimeEntryId::new(2))],
        "wrong entry deleted"
    );
    Ok(())
}

fn end_after_noon() -> Result<TimeEntryFilter, eyre::Report> {
    Ok(TimeEntryFilter::compare(
        TimeEntryField::End,
        Comparison::Gt,
        may_first(12, 0)?,
    ))
}

#[rstest]
#[case::negated_comparison(|after: TimeEntryFilter| after.negate(), vec![false])]
#[case::negated_conjunction(
    |after: TimeEntryFilter| after.and(TimeEntryFilter::IsNotNull(TimeEntryField::End)).negate(),
    vec![true, false]
)]
#[case::negated_disjunction(
    |after: TimeEntryFilter| after.or(TimeEntryFilter::IsNull(TimeEntryField::End)).negate(),
    vec![false]
)]
#[tokio::test(flavor = "multi_thread")]
async fn negated_comparisons_on_an_open_end_follow_sql_nulls(
    store: InMemoryTaskStore,
    #[case] build: fn(TimeEntryFilter) -> TimeEntryFilter,
    #[case] expected_active: Vec<bool>,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "night shift").await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(14, 0)?))
        .await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(9, 0)?).with_end(may_first(11, 0)?)?)
        .await?;

    let listed = store.list_time_entries(&build(end_after_noon()?)).await?;

    let active: Vec<bool> = listed.iter().map(TimeEntry::is_active).collect();
    eyre::ensure!(active == expected_active, "matched entries {active:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn starts_past_year_9999_are_constraint_violations(
    store: InMemoryTaskStore,
) -> Result<(), eyre::Report> {
    let task_id = saved_task(&store, "bury time capsule").await?;
    let far_future = Utc
        .with_ymd_and_hms(10_000, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid instant"))?;

    let result = store
        .save_time_entry(TimeEntry::new(task_id, far_future))
        .await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::ConstraintViolation(_))),
        "expected constraint violation, got {result:?}"
    );
    eyre::ensure!(
        store.list_time_entries(&TimeEntryFilter::All).await?.is_empty(),
        "entry was written"
    );
    Ok(())
}
