use thiserror::Error;

use crate::datetime::Due;
use crate::task::Recurrence;

/// A draft rejected at the add/edit boundary. The collection is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task name is required")]
    EmptyName,

    #[error("Importance level is required")]
    MissingImportance,

    #[error("unknown importance level: {0} (expected high, medium or low)")]
    UnknownImportance(String),

    #[error("unknown recurrence: {0} (expected none, daily, weekly or monthly)")]
    UnknownRecurrence(String),

    #[error("invalid due date/time: {0}")]
    InvalidDue(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("task has no due date to recur from")]
    MissingDue,

    #[error("task does not recur")]
    NotRecurring,

    #[error("next {kind} occurrence after {due} is out of range")]
    OutOfRange { due: Due, kind: Recurrence },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("id prefix {prefix} matches {count} tasks")]
    AmbiguousId { prefix: String, count: usize },

    #[error("task {task_id} has {len} step(s); step index {index} is out of range")]
    StepOutOfRange {
        task_id: String,
        index: usize,
        len: usize,
    },

    #[error("no unused task id after {attempts} attempts")]
    IdsExhausted { attempts: usize },
}
