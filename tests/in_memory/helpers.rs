//! Shared test helpers for in-memory repository integration tests.

use chorez::task::adapters::memory::InMemoryTaskStore;
use chrono::{DateTime, TimeZone, Utc};
use rstest::fixture;

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> InMemoryTaskStore {
    InMemoryTaskStore::new()
}

/// Builds a UTC instant on 1 May 2024.
///
/// # Errors
///
/// Returns an error if the hour or minute is out of range.
pub fn may_first(hour: u32, minute: u32) -> Result<DateTime<Utc>, eyre::Report> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid time {hour}:{minute}"))
}
