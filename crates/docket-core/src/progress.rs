use crate::task::Step;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProgress {
    /// Percentage of completed steps, in `[0, 100]`.
    pub progress: f64,
    /// True iff there is at least one step and every step is completed.
    pub all_complete: bool,
}

/// An empty step list has no progress bar and never counts as complete.
pub fn compute_progress(steps: &[Step]) -> StepProgress {
    if steps.is_empty() {
        return StepProgress {
            progress: 0.0,
            all_complete: false,
        };
    }

    let done = steps.iter().filter(|s| s.completed).count();
    StepProgress {
        progress: 100.0 * done as f64 / steps.len() as f64,
        all_complete: done == steps.len(),
    }
}
