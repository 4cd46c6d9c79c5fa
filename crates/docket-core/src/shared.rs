use parking_lot::Mutex;

use crate::datastore::TaskStore;
use crate::engine::{TaskEngine, ToggleOutcome};
use crate::error::TaskError;
use crate::ids::IdProvider;
use crate::task::{Task, TaskDraft};
use crate::view::ViewQuery;

/// Thread-safe handle that serializes every operation through one lock, so
/// each mutation and its write-through happen atomically with respect to
/// other callers. Reads hand out owned snapshots.
#[derive(Debug)]
pub struct SharedEngine<S, I> {
    engine: Mutex<TaskEngine<S, I>>,
}

impl<S: TaskStore, I: IdProvider> SharedEngine<S, I> {
    pub fn new(engine: TaskEngine<S, I>) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.engine.lock().tasks().to_vec()
    }

    pub fn visible(&self, query: &ViewQuery) -> Vec<Task> {
        self.engine
            .lock()
            .visible(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn add_task(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        self.engine.lock().add_task(draft).cloned()
    }

    pub fn edit_task(&self, id: &str, draft: TaskDraft) -> Result<Task, TaskError> {
        self.engine.lock().edit_task(id, draft).cloned()
    }

    pub fn delete_task(&self, id: &str) -> bool {
        self.engine.lock().delete_task(id)
    }

    pub fn toggle_complete(&self, id: &str) -> Result<ToggleOutcome, TaskError> {
        self.engine.lock().toggle_complete(id)
    }

    pub fn toggle_step(&self, id: &str, index: usize) -> Result<Task, TaskError> {
        self.engine.lock().toggle_step(id, index).cloned()
    }

    /// Runs several operations under a single lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut TaskEngine<S, I>) -> R) -> R {
        f(&mut self.engine.lock())
    }
}
