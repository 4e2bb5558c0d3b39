//! Chorez: a personal task and time tracker.
//!
//! The crate records tasks and the time spent on them in an embedded
//! `SQLite` database, reconciling every save against the stored identity of
//! the record so that repeated saves update rather than duplicate.
//!
//! # Architecture
//!
//! Chorez follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence
//! - **Adapters**: Concrete implementations of ports (`SQLite`, in-memory)
//!
//! # Modules
//!
//! - [`task`]: Tasks, time entries, and their persistence
//! - [`config`]: Store configuration
//! - [`cli`]: Command layer and presentation

pub mod cli;
pub mod config;
pub mod task;
