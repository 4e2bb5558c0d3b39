//! Adapter implementations of the task persistence ports.

pub mod memory;
pub mod sqlite;
