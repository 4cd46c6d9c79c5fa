use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datetime::{Due, due_serde};
use crate::error::ValidationError;
use crate::progress::{StepProgress, compute_progress};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingImportance);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Importance::High),
            "medium" | "med" | "m" => Ok(Importance::Medium),
            "low" | "l" => Ok(Importance::Low),
            _ => Err(ValidationError::UnknownImportance(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Importance {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Importance> for String {
    fn from(value: Importance) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", try_from = "Option<RecurrenceInput>")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "false" => Ok(Recurrence::None),
            "daily" | "true" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(ValidationError::UnknownRecurrence(s.trim().to_string())),
        }
    }
}

impl TryFrom<Option<RecurrenceInput>> for Recurrence {
    type Error = ValidationError;

    fn try_from(value: Option<RecurrenceInput>) -> Result<Self, Self::Error> {
        value.map_or(Ok(Recurrence::None), |input| input.normalize())
    }
}

/// Recurrence as the add form supplies it: older forms send a checkbox
/// flag, newer ones a cadence name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecurrenceInput {
    Flag(bool),
    Kind(String),
}

impl RecurrenceInput {
    pub fn normalize(&self) -> Result<Recurrence, ValidationError> {
        match self {
            RecurrenceInput::Flag(false) => Ok(Recurrence::None),
            RecurrenceInput::Flag(true) => Ok(Recurrence::Daily),
            RecurrenceInput::Kind(kind) => kind.parse(),
        }
    }
}

impl Default for RecurrenceInput {
    fn default() -> Self {
        RecurrenceInput::Flag(false)
    }
}

impl From<bool> for RecurrenceInput {
    fn from(value: bool) -> Self {
        RecurrenceInput::Flag(value)
    }
}

impl From<Recurrence> for RecurrenceInput {
    fn from(value: Recurrence) -> Self {
        RecurrenceInput::Kind(value.as_str().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// A tracked to-do item.
///
/// `steps` and `progress` are only reachable through methods so the
/// percentage can never drift from the step list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub name: String,

    #[serde(default, with = "due_serde::option")]
    pub due_date: Option<Due>,

    pub importance: Importance,

    #[serde(default)]
    pub recurring: Recurrence,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    steps: Vec<Step>,

    #[serde(default)]
    progress: f64,
}

impl Task {
    pub(crate) fn from_draft(id: String, draft: ValidDraft) -> Self {
        let mut task = Self {
            id,
            name: draft.name,
            due_date: draft.due,
            importance: draft.importance,
            recurring: draft.recurring,
            completed: false,
            steps: vec![],
            progress: 0.0,
        };
        task.set_steps(draft.steps);
        task
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due.is_before(now))
    }

    /// Replaces the step list, dropping blank-named steps, and refreshes
    /// the derived fields.
    pub(crate) fn set_steps(&mut self, steps: Vec<Step>) -> StepProgress {
        self.steps = steps.into_iter().filter(|s| !s.is_blank()).collect();
        self.refresh_derived()
    }

    /// Flips one step and sets the task's completion to whether every step
    /// is now done. `None` when `index` is out of range.
    pub(crate) fn toggle_step(&mut self, index: usize) -> Option<StepProgress> {
        let step = self.steps.get_mut(index)?;
        step.completed = !step.completed;
        let summary = compute_progress(&self.steps);
        self.progress = summary.progress;
        self.completed = summary.all_complete;
        Some(summary)
    }

    /// Recomputes `progress` and applies the all-steps-done auto-completion.
    pub(crate) fn refresh_derived(&mut self) -> StepProgress {
        let summary = self.refresh_progress();
        if summary.all_complete {
            self.completed = true;
        }
        summary
    }

    /// Recomputes `progress` only; `completed` is left as stored.
    pub(crate) fn refresh_progress(&mut self) -> StepProgress {
        let summary = compute_progress(&self.steps);
        self.progress = summary.progress;
        summary
    }

    /// Copies the step names with every step reset to incomplete.
    pub(crate) fn step_template(&self) -> Vec<Step> {
        self.steps.iter().map(|s| Step::new(s.name.clone())).collect()
    }
}

/// User-entered fields for an add or edit, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub due: Option<Due>,
    pub importance: String,
    pub recurring: RecurrenceInput,
    pub steps: Vec<Step>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, importance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            importance: importance.into(),
            ..Self::default()
        }
    }

    pub fn with_due(mut self, due: Due) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_recurring(mut self, recurring: impl Into<RecurrenceInput>) -> Self {
        self.recurring = recurring.into();
        self
    }

    pub fn with_steps<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = names.into_iter().map(Step::new).collect();
        self
    }

    /// Drafts pre-filled from an existing task, the way an edit form opens.
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            due: task.due_date,
            importance: task.importance.to_string(),
            recurring: task.recurring.into(),
            steps: task.steps.clone(),
        }
    }

    pub(crate) fn validate(self) -> Result<ValidDraft, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let importance: Importance = self.importance.parse()?;
        let recurring = self.recurring.normalize()?;
        Ok(ValidDraft {
            name: self.name,
            due: self.due,
            importance,
            recurring,
            steps: self.steps,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ValidDraft {
    pub name: String,
    pub due: Option<Due>,
    pub importance: Importance,
    pub recurring: Recurrence,
    pub steps: Vec<Step>,
}
