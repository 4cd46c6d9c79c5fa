use chrono::{Days, Months, NaiveDate};
use tracing::debug;

use crate::datetime::Due;
use crate::error::SchedulingError;
use crate::task::{Recurrence, Task};

/// Advances `due` by one period of `kind`.
///
/// Monthly steps clamp to the last day of the target month (Jan 31 lands
/// on Feb 28/29). The time of day, if any, is kept.
#[tracing::instrument]
pub fn next_occurrence(due: Option<Due>, kind: Recurrence) -> Result<Due, SchedulingError> {
    if !kind.is_recurring() {
        return Err(SchedulingError::NotRecurring);
    }
    let due = due.ok_or(SchedulingError::MissingDue)?;

    let out_of_range = || SchedulingError::OutOfRange { due, kind };
    let next = match due {
        Due::Date(date) => Due::Date(advance(date, kind).ok_or_else(out_of_range)?),
        Due::DateTime(dt) => {
            let date = advance(dt.date(), kind).ok_or_else(out_of_range)?;
            Due::DateTime(date.and_time(dt.time()))
        }
    };

    debug!(%due, %next, %kind, "computed next occurrence");
    Ok(next)
}

fn advance(date: NaiveDate, kind: Recurrence) -> Option<NaiveDate> {
    match kind {
        Recurrence::None => Some(date),
        Recurrence::Daily => date.checked_add_days(Days::new(1)),
        Recurrence::Weekly => date.checked_add_days(Days::new(7)),
        Recurrence::Monthly => date.checked_add_months(Months::new(1)),
    }
}

/// Builds the next instance of a completed recurring task. The source task
/// is not touched.
pub fn regenerate(task: &Task, new_id: String) -> Result<Task, SchedulingError> {
    let next_due = next_occurrence(task.due_date, task.recurring)?;

    let mut next = task.clone();
    next.id = new_id;
    next.due_date = Some(next_due);
    next.completed = false;
    next.set_steps(task.step_template());
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;

    fn date(raw: &str) -> Due {
        Due::parse(raw).expect("valid due")
    }

    #[test]
    fn daily_and_weekly_add_days() {
        assert_eq!(
            next_occurrence(Some(date("2024-02-28")), Recurrence::Daily),
            Ok(date("2024-02-29"))
        );
        assert_eq!(
            next_occurrence(Some(date("2024-12-28 07:15")), Recurrence::Weekly),
            Ok(date("2025-01-04 07:15"))
        );
    }

    #[test]
    fn monthly_preserves_day_of_month() {
        assert_eq!(
            next_occurrence(Some(date("2024-01-15")), Recurrence::Monthly),
            Ok(date("2024-02-15"))
        );
    }

    #[test]
    fn monthly_clamps_overflowing_days() {
        assert_eq!(
            next_occurrence(Some(date("2024-01-31")), Recurrence::Monthly),
            Ok(date("2024-02-29"))
        );
        assert_eq!(
            next_occurrence(Some(date("2023-01-31 20:00")), Recurrence::Monthly),
            Ok(date("2023-02-28 20:00"))
        );
    }

    #[test]
    fn missing_due_or_no_recurrence_is_an_error() {
        assert_eq!(
            next_occurrence(None, Recurrence::Daily),
            Err(SchedulingError::MissingDue)
        );
        assert_eq!(
            next_occurrence(Some(date("2024-01-01")), Recurrence::None),
            Err(SchedulingError::NotRecurring)
        );
    }

    #[test]
    fn out_of_calendar_range_is_an_error() {
        let last = Due::Date(NaiveDate::MAX);
        assert!(matches!(
            next_occurrence(Some(last), Recurrence::Daily),
            Err(SchedulingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn regenerate_resets_completion_and_steps() {
        let draft = TaskDraft::new("Water plants", "Low")
            .with_due(date("2024-06-01 08:00"))
            .with_recurring(Recurrence::Weekly)
            .with_steps(["fill can", "water"])
            .validate()
            .expect("valid draft");
        let mut task = Task::from_draft("old".to_string(), draft);
        task.toggle_step(0);
        task.toggle_step(1);
        assert!(task.completed);

        let next = regenerate(&task, "new".to_string()).expect("regenerate");
        assert_eq!(next.id, "new");
        assert_eq!(next.name, task.name);
        assert_eq!(next.importance, task.importance);
        assert_eq!(next.recurring, Recurrence::Weekly);
        assert_eq!(next.due_date, Some(date("2024-06-08 08:00")));
        assert!(!next.completed);
        assert_eq!(next.progress(), 0.0);
        assert_eq!(next.steps().len(), 2);
        assert!(next.steps().iter().all(|s| !s.completed));
    }
}
