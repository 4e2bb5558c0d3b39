//! `SQLite` integration tests for time entries.

use super::helpers::{may_first, saved_task, store};
use chorez::task::{
    adapters::sqlite::SqliteTaskStore,
    domain::{
        Comparison, TaskField, TaskFilter, TaskId, TimeEntry, TimeEntryField, TimeEntryFilter,
    },
    ports::{IdentityConflict, TaskRepository, TaskRepositoryError, TimeEntryRepository},
};
use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

type Opened = Result<SqliteTaskStore, eyre::Report>;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_an_entry_flips_the_active_filter(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let task_id = saved_task(&store, "knit scarf").await?;
    let active = TimeEntryFilter::IsNull(TimeEntryField::End);
    let closed = TimeEntryFilter::IsNotNull(TimeEntryField::End);

    let open = store
        .save_time_entry(TimeEntry::new(task_id, may_first(9, 0)?))
        .await?;
    eyre::ensure!(
        store.list_time_entries(&active).await? == vec![open.clone()],
        "open entry not reported active"
    );

    let finished = TimeEntry::new(task_id, may_first(9, 0)?).with_end(may_first(10, 15)?)?;
    let resaved = store.save_time_entry(finished).await?;

    eyre::ensure!(resaved.id() == open.id(), "closing created a new row");
    eyre::ensure!(resaved.end() == Some(may_first(10, 15)?), "end not stored");
    eyre::ensure!(store.list_time_entries(&active).await?.is_empty(), "still active");
    eyre::ensure!(
        store.list_time_entries(&closed).await? == vec![resaved],
        "closed entry missing"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn timestamps_round_trip_with_microseconds(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let task_id = saved_task(&store, "stretch").await?;
    let start = may_first(6, 30)? + Duration::microseconds(123_456);

    let saved = store.save_time_entry(TimeEntry::new(task_id, start)).await?;

    eyre::ensure!(saved.start() == start, "start was {}", saved.start());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entries_list_latest_start_first_with_their_task(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let piano = saved_task(&store, "practice piano").await?;
    let chess = saved_task(&store, "study chess").await?;
    for (task_id, hour) in [(piano, 8), (chess, 14), (piano, 11)] {
        store
            .save_time_entry(TimeEntry::new(task_id, may_first(hour, 0)?))
            .await?;
    }

    let entries = store.list_time_entries(&TimeEntryFilter::All).await?;

    let described: Vec<(u32, &str)> = entries
        .iter()
        .map(|entry| {
            (
                chrono::Timelike::hour(&entry.start()),
                entry.task().map_or("", |task| task.name()),
            )
        })
        .collect();
    eyre::ensure!(
        described == [(14, "study chess"), (11, "practice piano"), (8, "practice piano")],
        "listing was {described:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn time_filters_compare_chronologically(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let task_id = saved_task(&store, "read").await?;
    for hour in [7, 9, 21] {
        store
            .save_time_entry(TimeEntry::new(task_id, may_first(hour, 0)?))
            .await?;
    }

    let morning = TimeEntryFilter::compare(TimeEntryField::Start, Comparison::Lt, may_first(12, 0)?)
        .and(TimeEntryFilter::eq(TimeEntryField::TaskId, task_id));
    let found = store.list_time_entries(&morning).await?;

    eyre::ensure!(found.len() == 2, "matched {} entries", found.len());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_carry_their_entries_newest_first(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let task_id = saved_task(&store, "write novel").await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(8, 0)?).with_end(may_first(9, 0)?)?)
        .await?;
    store
        .save_time_entry(TimeEntry::new(task_id, may_first(10, 0)?).with_end(may_first(10, 30)?)?)
        .await?;

    let task = store
        .find_task(task_id)
        .await?
        .ok_or_else(|| eyre::eyre!("task missing"))?;

    let starts: Vec<_> = task.time_entries().iter().map(TimeEntry::start).collect();
    eyre::ensure!(
        starts == [may_first(10, 0)?, may_first(8, 0)?],
        "entries were {starts:?}"
    );
    eyre::ensure!(
        task.tracked_time(may_first(23, 0)?) == Duration::minutes(90),
        "tracked {:?}",
        task.tracked_time(may_first(23, 0)?)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_tasks_cascades_to_entries(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let doomed = saved_task(&store, "old hobby").await?;
    let kept = saved_task(&store, "new hobby").await?;
    for (task_id, hour) in [(doomed, 9), (kept, 9), (doomed, 11)] {
        store
            .save_time_entry(TimeEntry::new(task_id, may_first(hour, 0)?))
            .await?;
    }

    let removed = store
        .delete_tasks(&TaskFilter::eq(TaskField::Id, doomed))
        .await?;

    eyre::ensure!(removed == 1, "removed {removed} tasks");
    let remaining = store.list_time_entries(&TimeEntryFilter::All).await?;
    eyre::ensure!(
        remaining.len() == 1 && remaining.iter().all(|entry| entry.task_id() == kept),
        "entries after cascade: {remaining:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entries_for_missing_tasks_violate_the_foreign_key(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;

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
async fn claimed_entry_id_must_agree_with_task_and_start(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let task_id = saved_task(&store, "jog").await?;
    let first = store
        .save_time_entry(TimeEntry::new(task_id, may_first(7, 0)?))
        .await?;
    let second = store
        .save_time_entry(TimeEntry::new(task_id, may_first(18, 0)?))
        .await?;
    let first_id = first.id().ok_or_else(|| eyre::eyre!("transient entry"))?;

    let result = store
        .save_time_entry(TimeEntry::new(task_id, may_first(18, 0)?).with_id(first_id))
        .await;

    eyre::ensure!(
        matches!(
            result,
            Err(TaskRepositoryError::IdentityConflict(IdentityConflict::TimeEntry { claimed, resolved }))
                if Some(claimed) == first.id() && Some(resolved) == second.id()
        ),
        "expected entry identity conflict, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_time_entries_leaves_tasks_alone(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
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
    eyre::ensure!(store.find_task(task_id).await?.is_some(), "task was deleted");
    eyre::ensure!(
        store.list_time_entries(&TimeEntryFilter::All).await?.len() == 1,
        "wrong entry count"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tag_predicates_are_rejected_for_entries(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;

    let result = store
        .list_time_entries(&TimeEntryFilter::has_tag("home"))
        .await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::MalformedFilter(_))),
        "expected malformed filter, got {result:?}"
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
    #[from(store)] opened: Opened,
    #[case] build: fn(TimeEntryFilter) -> TimeEntryFilter,
    #[case] expected_active: Vec<bool>,
) -> Result<(), eyre::Report> {
    let store = opened?;
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
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
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
