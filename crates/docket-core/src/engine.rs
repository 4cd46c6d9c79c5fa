use tracing::{debug, info, instrument, warn};

use crate::datastore::TaskStore;
use crate::error::{SchedulingError, TaskError};
use crate::ids::IdProvider;
use crate::recurrence::regenerate;
use crate::task::{Task, TaskDraft};
use crate::view::{ViewQuery, visible};

const MAX_ID_ATTEMPTS: usize = 16;

/// Result of flipping a task's completion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub completed: bool,
    /// Id of the next occurrence appended for a recurring task.
    pub spawned: Option<String>,
    /// Why a recurring task did not get a next occurrence.
    pub skipped: Option<SchedulingError>,
}

/// Sole owner of the task collection.
///
/// Every mutation validates, applies, then writes the whole collection
/// through to the store. A failed write is logged and the in-memory state
/// stays authoritative.
#[derive(Debug)]
pub struct TaskEngine<S, I> {
    store: S,
    ids: I,
    tasks: Vec<Task>,
}

impl<S: TaskStore, I: IdProvider> TaskEngine<S, I> {
    /// Loads the collection. Unreadable data starts an empty collection.
    #[instrument(skip_all)]
    pub fn open(store: S, ids: I) -> Self {
        let loaded = match store.load() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to load tasks; starting empty");
                vec![]
            }
        };

        let mut tasks: Vec<Task> = Vec::with_capacity(loaded.len());
        for mut task in loaded {
            if tasks.iter().any(|t| t.id == task.id) {
                warn!(id = %task.id, "dropping task with duplicate id");
                continue;
            }
            task.refresh_progress();
            tasks.push(task);
        }

        info!(count = tasks.len(), "opened task engine");
        Self { store, ids, tasks }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn visible(&self, query: &ViewQuery) -> Vec<&Task> {
        visible(&self.tasks, query)
    }

    /// Resolves a full id or a unique id prefix.
    pub fn resolve_id(&self, prefix: &str) -> Result<String, TaskError> {
        if let Some(task) = self.get(prefix) {
            return Ok(task.id.clone());
        }
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TaskError::NotFound(prefix.to_string()));
        }

        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [] => Err(TaskError::NotFound(prefix.to_string())),
            [task] => Ok(task.id.clone()),
            many => Err(TaskError::AmbiguousId {
                prefix: prefix.to_string(),
                count: many.len(),
            }),
        }
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<&Task, TaskError> {
        let valid = draft.validate()?;
        let id = self.mint_id()?;
        let task = Task::from_draft(id, valid);
        info!(id = %task.id, recurring = %task.recurring, "task added");

        let idx = self.tasks.len();
        self.tasks.push(task);
        self.persist();
        Ok(&self.tasks[idx])
    }

    /// Replaces the editable fields of an existing task. Position and id
    /// are kept; completion is kept unless every step is now done.
    #[instrument(skip(self, draft))]
    pub fn edit_task(&mut self, id: &str, draft: TaskDraft) -> Result<&Task, TaskError> {
        let valid = draft.validate()?;
        let idx = self.position(id)?;

        let task = &mut self.tasks[idx];
        task.name = valid.name;
        task.due_date = valid.due;
        task.importance = valid.importance;
        task.recurring = valid.recurring;
        let summary = task.set_steps(valid.steps);
        debug!(progress = summary.progress, completed = task.completed, "task edited");

        self.persist();
        Ok(&self.tasks[idx])
    }

    /// Returns whether a task was removed. A missing id is not an error.
    #[instrument(skip(self))]
    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!("delete of unknown task ignored");
            return false;
        };
        self.tasks.remove(idx);
        info!("task deleted");
        self.persist();
        true
    }

    /// Flips completion. Completing a recurring task appends its next
    /// occurrence; un-completing never removes one.
    #[instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: &str) -> Result<ToggleOutcome, TaskError> {
        let idx = self.position(id)?;
        let completing = !self.tasks[idx].completed;
        let next_id = if completing && self.tasks[idx].recurring.is_recurring() {
            Some(self.mint_id()?)
        } else {
            None
        };

        self.tasks[idx].completed = completing;

        let mut outcome = ToggleOutcome {
            completed: completing,
            spawned: None,
            skipped: None,
        };

        if let Some(new_id) = next_id {
            match regenerate(&self.tasks[idx], new_id) {
                Ok(next) => {
                    info!(
                        next_id = %next.id,
                        due = ?next.due_date.map(|d| d.to_string()),
                        "scheduled next occurrence"
                    );
                    outcome.spawned = Some(next.id.clone());
                    self.tasks.push(next);
                }
                Err(err) => {
                    warn!(error = %err, "recurring task completed without a next occurrence");
                    outcome.skipped = Some(err);
                }
            }
        }

        debug!(completed = outcome.completed, "toggled completion");
        self.persist();
        Ok(outcome)
    }

    /// Flips one step; the task is complete exactly when all its steps are.
    /// This never schedules a recurrence.
    #[instrument(skip(self))]
    pub fn toggle_step(&mut self, id: &str, index: usize) -> Result<&Task, TaskError> {
        let idx = self.position(id)?;
        let task = &mut self.tasks[idx];
        let len = task.steps().len();
        let summary = task
            .toggle_step(index)
            .ok_or_else(|| TaskError::StepOutOfRange {
                task_id: id.to_string(),
                index,
                len,
            })?;
        debug!(
            progress = summary.progress,
            all_complete = summary.all_complete,
            "toggled step"
        );

        self.persist();
        Ok(&self.tasks[idx])
    }

    fn position(&self, id: &str) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn mint_id(&mut self) -> Result<String, TaskError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.new_id();
            if self.get(&id).is_none() {
                return Ok(id);
            }
            warn!(id = %id, "id provider returned an id already in use; retrying");
        }
        Err(TaskError::IdsExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.tasks) {
            warn!(error = %format!("{err:#}"), "failed to persist tasks; keeping in-memory state");
        }
    }
}
