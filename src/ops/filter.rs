use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};

use crate::model::task::{Category, Task};

/// Narrowing by completion / due-date state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
            StatusFilter::Overdue => "overdue",
        }
    }

    /// Whether `task` passes this filter on `today`
    pub fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
            StatusFilter::Overdue => task_is_overdue(task, today),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            "overdue" => Ok(StatusFilter::Overdue),
            _ => Err(format!(
                "unknown status '{}' (expected: all, active, completed, overdue)",
                s
            )),
        }
    }
}

/// Narrowing by category. A task without a category never matches `Only`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => task.category.as_ref() == Some(c),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    /// `all` or any category value, including unrecognized ones.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("category filter cannot be empty".to_string()),
            "all" => Ok(CategoryFilter::All),
            other => Ok(CategoryFilter::Only(Category::from(other.to_string()))),
        }
    }
}

/// Everything that narrows the visible list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewFilters {
    pub status: StatusFilter,
    pub category: CategoryFilter,
    /// Case-insensitive substring; empty means no search
    pub search: String,
}

/// Local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// A due date is overdue when it falls before `today`. Due today is not overdue.
pub fn is_overdue(due: NaiveDate, today: NaiveDate) -> bool {
    due < today
}

/// Incomplete, has a due date, and that date is past.
pub fn task_is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && task.due_date.is_some_and(|d| is_overdue(d, today))
}

/// Derive the display list: search, then status, then category, then a
/// stable ascending sort on `position`.
pub fn filtered_view<'a>(tasks: &'a [Task], filters: &ViewFilters, today: NaiveDate) -> Vec<&'a Task> {
    let query = filters.search.to_lowercase();

    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|t| query.is_empty() || t.text.to_lowercase().contains(&query))
        .filter(|t| filters.status.matches(t, today))
        .filter(|t| filters.category.matches(t))
        .collect();

    view.sort_by_key(|t| t.position);
    view
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Counts over the whole collection, independent of the current filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn task_stats(tasks: &[Task], today: NaiveDate) -> TaskStats {
    let completed = tasks.iter().filter(|t| t.completed).count();
    TaskStats {
        total: tasks.len(),
        active: tasks.len() - completed,
        completed,
        overdue: tasks.iter().filter(|t| task_is_overdue(t, today)).count(),
    }
}

/// Footer text for the current status filter, e.g. "3 active tasks"
pub fn count_label(status: StatusFilter, stats: &TaskStats) -> String {
    fn plural(n: usize) -> &'static str {
        if n == 1 { "" } else { "s" }
    }
    match status {
        StatusFilter::All => format!("{} task{} total", stats.total, plural(stats.total)),
        StatusFilter::Active => format!("{} active task{}", stats.active, plural(stats.active)),
        StatusFilter::Completed => format!(
            "{} completed task{}",
            stats.completed,
            plural(stats.completed)
        ),
        StatusFilter::Overdue => {
            format!("{} overdue task{}", stats.overdue, plural(stats.overdue))
        }
    }
}
