//! Shared world state for tag editing BDD scenarios.

use std::sync::Arc;

use chorez::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{Task, TaskId},
    services::{TaskTrackingError, TaskTrackingService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestTrackingService = TaskTrackingService<InMemoryTaskStore, DefaultClock>;

/// Scenario world for tag editing behaviour tests.
pub struct TagWorld {
    pub service: TestTrackingService,
    pub target: Option<TaskId>,
    pub last_edit: Option<Result<Task, TaskTrackingError>>,
}

impl TagWorld {
    /// Creates a world over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: TaskTrackingService::new(
                Arc::new(InMemoryTaskStore::new()),
                Arc::new(DefaultClock),
            ),
            target: None,
            last_edit: None,
        }
    }
}

impl Default for TagWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TagWorld {
    TagWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Splits a comma-separated tag list from a step.
pub fn tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}
