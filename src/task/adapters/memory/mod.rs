//! In-memory adapters for task and time entry persistence.

mod store;

pub use store::InMemoryTaskStore;
