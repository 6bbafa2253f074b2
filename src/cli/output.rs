use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::config::DisplayConfig;
use crate::model::task::Task;
use crate::ops::filter::{TaskStats, task_is_overdue};
use crate::util::unicode::{display_width, fit_to_width, truncate_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub overdue: bool,
}

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub tasks: Vec<TaskJson<'a>>,
    pub label: String,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn task_to_json(task: &Task, today: NaiveDate) -> TaskJson<'_> {
    TaskJson {
        task,
        overdue: task_is_overdue(task, today),
    }
}

pub fn stats_to_json(stats: &TaskStats) -> StatsJson {
    StatsJson {
        total: stats.total,
        active: stats.active,
        completed: stats.completed,
        overdue: stats.overdue,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Render a due date with the configured format, falling back to ISO when
/// the format string is invalid.
pub fn format_due_date(due: NaiveDate, date_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", due.format(date_format)).is_err() {
        out.clear();
        out.push_str(&due.format("%Y-%m-%d").to_string());
    }
    out
}

/// Format a task as its display lines: a summary line, then any further
/// lines of its text indented under the first.
pub fn format_task_lines(task: &Task, today: NaiveDate, display: &DisplayConfig) -> Vec<String> {
    let check = if task.completed { 'x' } else { ' ' };
    let prefix = format!("[{}] {}  ", check, task.id);

    let mut meta = Vec::new();
    if let Some(due) = task.due_date {
        let mut s = format_due_date(due, &display.date_format);
        if task_is_overdue(task, today) {
            s.push_str(" (Overdue!)");
        }
        meta.push(s);
    }
    if let Some(category) = &task.category {
        meta.push(category.display_name().to_string());
    }

    let mut text_lines = task.text.lines();
    let first = text_lines.next().unwrap_or("");
    let head = if meta.is_empty() {
        truncate_to_width(first, display.text_width)
    } else {
        format!("{}  {}", fit_to_width(first, display.text_width), meta.join("  "))
    };

    let mut lines = vec![format!("{}{}", prefix, head).trim_end().to_string()];
    let indent = " ".repeat(display_width(&prefix));
    for line in text_lines {
        let rendered = format!("{}{}", indent, truncate_to_width(line, display.text_width));
        lines.push(rendered.trim_end().to_string());
    }
    lines
}

/// Format a whole view followed by its count label
pub fn format_listing(
    tasks: &[&Task],
    label: &str,
    today: NaiveDate,
    display: &DisplayConfig,
) -> Vec<String> {
    let mut lines = Vec::new();
    if tasks.is_empty() {
        lines.push("No tasks to show.".to_string());
    }
    for task in tasks {
        lines.extend(format_task_lines(task, today, display));
    }
    lines.push(String::new());
    lines.push(label.to_string());
    lines
}

pub fn format_stats(stats: &TaskStats) -> Vec<String> {
    vec![
        format!("total:     {}", stats.total),
        format!("active:    {}", stats.active),
        format!("completed: {}", stats.completed),
        format!("overdue:   {}", stats.overdue),
    ]
}
