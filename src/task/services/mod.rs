//! Application services for task and time tracking.

mod tracking;

pub use tracking::{
    AddTaskRequest, EditTaskRequest, StartTimeRequest, TaskTrackingError, TaskTrackingResult,
    TaskTrackingService,
};
