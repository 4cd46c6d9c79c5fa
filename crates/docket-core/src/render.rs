use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::engine::ToggleOutcome;
use crate::task::{Importance, Task};

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&self, tasks: &[&Task], now: NaiveDateTime) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_task_table(out, tasks, now)
    }

    pub fn write_task_table<W: Write>(
        &self,
        writer: W,
        tasks: &[&Task],
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "".to_string(),
            "ID".to_string(),
            "Due".to_string(),
            "Importance".to_string(),
            "Repeats".to_string(),
            "Steps".to_string(),
            "Name".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let mark = String::from(if task.completed { "x" } else { " " });
            let id = self.paint(short_id(&task.id), "33");

            let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let importance = self.paint(task.importance.as_str(), importance_color(task.importance));
            let repeats = if task.recurring.is_recurring() {
                task.recurring.to_string()
            } else {
                String::new()
            };
            let steps = if task.steps().is_empty() {
                String::new()
            } else {
                format!(
                    "{}/{} {:.0}%",
                    task.completed_steps(),
                    task.steps().len(),
                    task.progress()
                )
            };
            let name = if task.completed {
                self.paint(&task.name, "2")
            } else {
                task.name.clone()
            };

            rows.push(vec![mark, id, due, importance, repeats, steps, name]);
        }

        write_table(writer, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "name        {}", task.name)?;
        writeln!(out, "importance  {}", task.importance)?;
        writeln!(
            out,
            "due         {}",
            task.due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "No due date".to_string())
        )?;
        writeln!(out, "recurring   {}", task.recurring)?;
        writeln!(out, "completed   {}", if task.completed { "yes" } else { "no" })?;

        if !task.steps().is_empty() {
            writeln!(out, "progress    {:.0}%", task.progress())?;
            for (idx, step) in task.steps().iter().enumerate() {
                let mark = if step.completed { "x" } else { " " };
                writeln!(out, "  {:>2}. [{mark}] {}", idx + 1, step.name)?;
            }
        }

        Ok(())
    }

    pub fn print_toggle(&self, task: &Task, outcome: &ToggleOutcome) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let verb = if outcome.completed { "Completed" } else { "Reopened" };
        writeln!(out, "{verb} task {} '{}'.", short_id(&task.id), task.name)?;

        if let Some(next) = &outcome.spawned {
            writeln!(out, "Created next occurrence {}.", short_id(next))?;
        }
        if let Some(reason) = &outcome.skipped {
            writeln!(out, "No next occurrence: {reason}.")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(id, |(end, _)| &id[..end])
}

fn importance_color(importance: Importance) -> &'static str {
    match importance {
        Importance::High => "31",
        Importance::Medium => "33",
        Importance::Low => "32",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::datastore::MemoryStore;
    use crate::datetime::Due;
    use crate::engine::TaskEngine;
    use crate::ids::SequentialIds;
    use crate::task::TaskDraft;

    #[test]
    fn short_id_truncates_long_ids() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("task-1"), "task-1");
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }

    #[test]
    fn table_lists_steps_and_due() {
        let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
        engine
            .add_task(
                TaskDraft::new("Pay bills", "High")
                    .with_due(Due::parse("2024-01-15").expect("due"))
                    .with_steps(["gather", "pay"]),
            )
            .expect("add");
        engine.toggle_step("task-1", 0).expect("toggle step");

        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid now");
        let mut buf = Vec::new();
        let tasks: Vec<&Task> = engine.tasks().iter().collect();
        Renderer::plain()
            .write_task_table(&mut buf, &tasks, now)
            .expect("render");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Importance"));
        assert!(lines[2].contains("task-1"));
        assert!(lines[2].contains("2024-01-15"));
        assert!(lines[2].contains("1/2 50%"));
        assert!(lines[2].contains("Pay bills"));
    }
}
