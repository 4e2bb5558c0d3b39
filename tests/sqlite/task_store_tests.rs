//! `SQLite` integration tests for task saves, listing, and deletion.

use super::helpers::{saved_task, store};
use chorez::config::StoreConfig;
use chorez::task::{
    adapters::sqlite::SqliteTaskStore,
    domain::{
        Comparison, Difficulty, Filter, Priority, Task, TaskField, TaskFilter, TaskId,
        TaskIdentityKey,
    },
    ports::{IdentityConflict, TaskRepository, TaskRepositoryError},
};
use rstest::rstest;

type Opened = Result<SqliteTaskStore, eyre::Report>;

async fn names(store: &SqliteTaskStore, filter: &TaskFilter) -> Result<Vec<String>, eyre::Report> {
    Ok(store
        .list_tasks(filter)
        .await?
        .iter()
        .map(|task| task.name().to_owned())
        .collect())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn saving_twice_is_idempotent(#[from(store)] opened: Opened) -> Result<(), eyre::Report> {
    let store = opened?;
    let task = Task::new("sweep porch")?
        .with_priority(Priority::High)
        .with_tags(vec!["Home".to_owned()]);

    let first = store.save_task(task.clone()).await?;
    let second = store.save_task(task).await?;

    eyre::ensure!(first.id().is_some(), "first save returned a transient task");
    eyre::ensure!(first == second, "second save changed the row: {second:?}");
    eyre::ensure!(
        store.list_tasks(&TaskFilter::All).await?.len() == 1,
        "duplicate row inserted"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn equal_identity_resolves_to_the_same_row(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let imported = |difficulty| -> Result<Task, eyre::Report> {
        Ok(Task::new("fix login")?
            .with_difficulty(difficulty)
            .imported_from(Some("GH-7".to_owned()), Some("https://example.test/7".to_owned())))
    };

    let first = store.save_task(imported(Difficulty::Easy)?).await?;
    let second = store.save_task(imported(Difficulty::Hard)?).await?;

    eyre::ensure!(first.id() == second.id(), "identity did not resolve");
    eyre::ensure!(second.difficulty() == Difficulty::Hard, "merge kept stale fields");
    eyre::ensure!(second.is_imported(), "importer flag lost");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn null_provenance_only_matches_null(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let local = store.save_task(Task::new("fix login")?).await?;
    let imported = store
        .save_task(Task::new("fix login")?.imported_from(Some("GH-7".to_owned()), None))
        .await?;
    let local_again = store.save_task(Task::new("fix login")?).await?;

    eyre::ensure!(local.id() != imported.id(), "null matched a value");
    eyre::ensure!(local.id() == local_again.id(), "null did not match null");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tags_are_stored_normalized(#[from(store)] opened: Opened) -> Result<(), eyre::Report> {
    let store = opened?;
    let saved = store
        .save_task(Task::new("groceries")?.with_tags(vec!["Foo".to_owned(), "asdf".to_owned()]))
        .await?;
    let id = saved.id().ok_or_else(|| eyre::eyre!("transient save result"))?;

    let reread = store
        .find_task(id)
        .await?
        .ok_or_else(|| eyre::eyre!("saved task is missing"))?;

    eyre::ensure!(reread.tags() == ["asdf", "foo"], "tags were {:?}", reread.tags());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflicting_claimed_id_leaves_the_store_unchanged(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    saved_task(&store, "decoy").await?;
    let original = store.save_task(Task::new("vacuum")?.with_desc("upstairs")).await?;
    eyre::ensure!(original.id() == Some(TaskId::new(2)), "unexpected id");
    let before = store.list_tasks(&TaskFilter::All).await?;

    let result = store
        .save_task(
            Task::new("vacuum")?
                .with_desc("downstairs")
                .with_id(TaskId::new(3)),
        )
        .await;

    eyre::ensure!(
        matches!(
            result,
            Err(TaskRepositoryError::IdentityConflict(IdentityConflict::Task { claimed, resolved }))
                if claimed == TaskId::new(3) && resolved == TaskId::new(2)
        ),
        "expected identity conflict, got {result:?}"
    );
    let after = store.list_tasks(&TaskFilter::All).await?;
    eyre::ensure!(before == after, "conflicting save modified the store");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claimed_id_without_identity_match_is_inserted_as_given(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;

    let saved = store
        .save_task(Task::new("restored")?.with_id(TaskId::new(40)))
        .await?;
    let next = saved_task(&store, "fresh").await?;

    eyre::ensure!(saved.id() == Some(TaskId::new(40)), "claimed id ignored");
    eyre::ensure!(next.value() > 40, "fresh id {next} reuses the claimed range");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn renaming_a_task_by_id_keeps_its_row(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    let mut task = store.save_task(Task::new("draft email")?).await?;

    task.rename("send email")?;
    let renamed = store.save_task(task.clone()).await?;

    eyre::ensure!(renamed.id() == task.id(), "rename minted a new row");
    eyre::ensure!(
        names(&store, &TaskFilter::All).await? == ["send email"],
        "old name survived"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_list_newest_first(#[from(store)] opened: Opened) -> Result<(), eyre::Report> {
    let store = opened?;
    for name in ["A", "B", "C"] {
        saved_task(&store, name).await?;
    }

    let listed = names(&store, &TaskFilter::All).await?;

    eyre::ensure!(listed == ["C", "B", "A"], "order was {listed:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn structured_filters_run_as_sql(#[from(store)] opened: Opened) -> Result<(), eyre::Report> {
    let store = opened?;
    let fixtures = [
        ("trim hedge", Priority::Low, vec!["garden"]),
        ("fix leak", Priority::Critical, vec!["home", "urgent"]),
        ("paint shed", Priority::Medium, vec!["garden", "home"]),
    ];
    for (name, priority, tags) in fixtures {
        store
            .save_task(
                Task::new(name)?
                    .with_priority(priority)
                    .with_tags(tags.into_iter().map(str::to_owned)),
            )
            .await?;
    }

    let at_least_medium =
        TaskFilter::compare(TaskField::Priority, Comparison::Ge, Priority::Medium);
    eyre::ensure!(
        names(&store, &at_least_medium).await? == ["paint shed", "fix leak"],
        "level ordering mistranslated"
    );

    let garden_not_low = TaskFilter::has_tag("Garden").and(
        TaskFilter::eq(TaskField::Priority, Priority::Low).negate(),
    );
    eyre::ensure!(
        names(&store, &garden_not_low).await? == ["paint shed"],
        "tag or negation mistranslated"
    );

    let either = TaskFilter::eq(TaskField::Name, "trim hedge")
        .or(TaskFilter::compare(TaskField::Id, Comparison::Eq, 2_i64));
    eyre::ensure!(
        names(&store, &either).await? == ["fix leak", "trim hedge"],
        "disjunction mistranslated"
    );

    eyre::ensure!(
        names(&store, &Filter::Or(Vec::new())).await?.is_empty(),
        "empty disjunction matched rows"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_filters_fail_before_sql(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    saved_task(&store, "keep me").await?;

    let result = store
        .delete_tasks(&TaskFilter::compare(TaskField::IsImported, Comparison::Gt, false))
        .await;

    eyre::ensure!(
        matches!(result, Err(TaskRepositoryError::MalformedFilter(_))),
        "expected malformed filter, got {result:?}"
    );
    eyre::ensure!(
        store.list_tasks(&TaskFilter::All).await?.len() == 1,
        "rows were deleted"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_by_filter_reports_the_count(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    for name in ["a", "b", "c"] {
        saved_task(&store, name).await?;
    }

    let removed = store
        .delete_tasks(&TaskFilter::compare(TaskField::Name, Comparison::Ne, "b"))
        .await?;

    eyre::ensure!(removed == 2, "removed {removed}");
    eyre::ensure!(
        names(&store, &TaskFilter::All).await? == ["b"],
        "wrong rows deleted"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn name_only_identity_merges_imported_tasks() -> Result<(), eyre::Report> {
    let config = StoreConfig::in_memory().with_identity_key(TaskIdentityKey::name_only());
    let store = SqliteTaskStore::connect(&config)?;

    let local = store.save_task(Task::new("report")?).await?;
    let imported = store
        .save_task(Task::new("report")?.imported_from(Some("J-1".to_owned()), None))
        .await?;

    eyre::ensure!(local.id() == imported.id(), "name-only key did not merge");
    eyre::ensure!(imported.source_id() == Some("J-1"), "merge lost provenance");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn renaming_onto_an_existing_identity_is_a_conflict(
    #[from(store)] opened: Opened,
) -> Result<(), eyre::Report> {
    let store = opened?;
    saved_task(&store, "laundry").await?;
    let mut other = store.save_task(Task::new("ironing")?).await?;

    other.rename("laundry")?;
    let result = store.save_task(other).await;

    eyre::ensure!(
        matches!(
            result,
            Err(TaskRepositoryError::IdentityConflict(IdentityConflict::Task { .. }))
        ),
        "expected identity conflict, got {result:?}"
    );
    Ok(())
}
