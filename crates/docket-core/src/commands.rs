use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};

use crate::cli::{AddArgs, Command, EditArgs, ListArgs};
use crate::config::Config;
use crate::datastore::TaskStore;
use crate::datetime::Due;
use crate::engine::TaskEngine;
use crate::ids::IdProvider;
use crate::render::{Renderer, short_id};
use crate::task::{RecurrenceInput, Step, TaskDraft};
use crate::view::{ImportanceFilter, ViewQuery};

#[instrument(skip(engine, cfg, renderer, command, now))]
pub fn dispatch<S: TaskStore, I: IdProvider>(
    engine: &mut TaskEngine<S, I>,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    match command {
        Command::Add(args) => cmd_add(engine, args),
        Command::Edit(args) => cmd_edit(engine, args),
        Command::Done(arg) => {
            info!("command done");
            let id = engine.resolve_id(&arg.id)?;
            let outcome = engine.toggle_complete(&id)?;
            let task = engine
                .get(&id)
                .with_context(|| format!("task {id} vanished after toggle"))?;
            renderer.print_toggle(task, &outcome)
        }
        Command::Step { id, number } => {
            info!("command step");
            let id = engine.resolve_id(&id)?;
            let index = usize::try_from(number.saturating_sub(1))?;
            let task = engine.toggle_step(&id, index)?;
            println!(
                "Task {} is {:.0}% done{}.",
                short_id(&task.id),
                task.progress(),
                if task.completed { " (completed)" } else { "" }
            );
            Ok(())
        }
        Command::Delete(arg) => {
            info!("command delete");
            let id = engine.resolve_id(&arg.id)?;
            if engine.delete_task(&id) {
                println!("Deleted task {}.", short_id(&id));
            }
            Ok(())
        }
        Command::List(args) => cmd_list(engine, cfg, renderer, args, now),
        Command::Info(arg) => {
            let id = engine.resolve_id(&arg.id)?;
            let task = engine
                .get(&id)
                .with_context(|| format!("task {id} not found"))?;
            renderer.print_task_info(task)
        }
    }
}

fn cmd_add<S: TaskStore, I: IdProvider>(
    engine: &mut TaskEngine<S, I>,
    args: AddArgs,
) -> anyhow::Result<()> {
    info!("command add");

    let recurring = if args.repeat {
        RecurrenceInput::Flag(true)
    } else {
        args.recurring
            .map_or_else(RecurrenceInput::default, RecurrenceInput::Kind)
    };
    let draft = TaskDraft {
        name: args.name,
        due: Due::from_parts(args.due.as_deref(), args.time.as_deref())?,
        importance: args.importance,
        recurring,
        steps: args.steps.into_iter().map(Step::new).collect(),
    };

    let task = engine.add_task(draft)?;
    println!("Created task {}.", short_id(&task.id));
    Ok(())
}

fn cmd_edit<S: TaskStore, I: IdProvider>(
    engine: &mut TaskEngine<S, I>,
    args: EditArgs,
) -> anyhow::Result<()> {
    info!("command edit");

    let id = engine.resolve_id(&args.id)?;
    let current = engine
        .get(&id)
        .with_context(|| format!("task {id} not found"))?;
    let draft = merge_edit(TaskDraft::from_task(current), args)?;
    debug!(?draft, "merged edit draft");

    let task = engine.edit_task(&id, draft)?;
    println!("Modified task {}.", short_id(&task.id));
    Ok(())
}

/// Applies the flags given to `edit` over the task's current values.
fn merge_edit(mut draft: TaskDraft, args: EditArgs) -> anyhow::Result<TaskDraft> {
    if let Some(name) = args.name {
        draft.name = name;
    }
    if let Some(importance) = args.importance {
        draft.importance = importance;
    }

    if args.no_due {
        draft.due = None;
    } else if args.due.is_some() {
        draft.due = Due::from_parts(args.due.as_deref(), args.time.as_deref())?;
    } else if let Some(time) = args.time {
        let date = draft
            .due
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .context("--time needs a due date; pass --due as well")?;
        draft.due = Due::from_parts(Some(&date), Some(&time))?;
    }

    if let Some(kind) = args.recurring {
        draft.recurring = RecurrenceInput::Kind(kind);
    }

    if args.clear_steps {
        draft.steps.clear();
    }
    draft.steps.extend(args.steps.into_iter().map(Step::new));

    Ok(draft)
}

fn cmd_list<S: TaskStore, I: IdProvider>(
    engine: &TaskEngine<S, I>,
    cfg: &Config,
    renderer: &Renderer,
    args: ListArgs,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command list");

    let importance: ImportanceFilter = match args.importance {
        Some(raw) => raw.parse()?,
        None => cfg.default_importance()?,
    };
    let query = ViewQuery::new(importance, args.search.unwrap_or_default());

    let shown = engine.visible(&query);
    debug!(shown = shown.len(), total = engine.len(), "listing tasks");
    if shown.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    renderer.print_task_table(&shown, now)?;
    println!();
    println!("{} of {} task(s)", shown.len(), engine.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Recurrence;

    fn edit_args(id: &str) -> EditArgs {
        EditArgs {
            id: id.to_string(),
            name: None,
            importance: None,
            due: None,
            time: None,
            no_due: false,
            recurring: None,
            steps: vec![],
            clear_steps: false,
        }
    }

    fn base_draft() -> TaskDraft {
        TaskDraft::new("Pay bills", "High")
            .with_due(Due::parse("2024-01-15").expect("due"))
            .with_recurring(Recurrence::Monthly)
            .with_steps(["gather"])
    }

    #[test]
    fn edit_keeps_unspecified_fields() {
        let draft = merge_edit(base_draft(), edit_args("x")).expect("merge");
        assert_eq!(draft, base_draft());
    }

    #[test]
    fn edit_time_alone_reuses_existing_date() {
        let mut args = edit_args("x");
        args.time = Some("09:30".to_string());
        let draft = merge_edit(base_draft(), args).expect("merge");
        assert_eq!(
            draft.due.map(|d| d.to_string()).as_deref(),
            Some("2024-01-15 09:30")
        );
    }

    #[test]
    fn edit_can_clear_due_and_replace_steps() {
        let mut args = edit_args("x");
        args.no_due = true;
        args.clear_steps = true;
        args.steps = vec!["new step".to_string()];
        let draft = merge_edit(base_draft(), args).expect("merge");
        assert_eq!(draft.due, None);
        assert_eq!(draft.steps, vec![Step::new("new step")]);
    }
}
