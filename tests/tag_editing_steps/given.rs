//! Given steps for tag editing BDD scenarios.

use super::world::{TagWorld, run_async, tag_list};
use chorez::task::{domain::TaskId, services::AddTaskRequest};
use eyre::WrapErr;
use rstest_bdd_macros::given;

fn add_task(world: &mut TagWorld, name: String, tags: Vec<String>) -> Result<(), eyre::Report> {
    let task = run_async(
        world
            .service
            .add_task(AddTaskRequest::new(name).with_tags(tags)),
    )
    .wrap_err("create task for tag scenario")?;
    world.target = task.id();
    Ok(())
}

#[given(r#"a task "{name}" tagged "{tags}""#)]
fn task_with_tags(world: &mut TagWorld, name: String, tags: String) -> Result<(), eyre::Report> {
    add_task(world, name, tag_list(&tags))
}

#[given(r#"a task "{name}" without tags"#)]
fn task_without_tags(world: &mut TagWorld, name: String) -> Result<(), eyre::Report> {
    add_task(world, name, Vec::new())
}

#[given("no task has id {id:i64}")]
fn no_task_with_id(world: &mut TagWorld, id: i64) -> Result<(), eyre::Report> {
    let existing = run_async(world.service.list_tasks(&Default::default()))
        .wrap_err("list tasks")?;
    eyre::ensure!(
        existing.iter().all(|task| task.id() != Some(TaskId::new(id))),
        "task {id} unexpectedly exists"
    );
    Ok(())
}
