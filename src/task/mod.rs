//! Task and time tracking for Chorez.
//!
//! Tasks are work items with a priority, a difficulty, tags, and a
//! description; time entries are intervals logged against a task. Saving is
//! an upsert by identity key, so resubmitting a value updates the stored row
//! instead of duplicating it. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
