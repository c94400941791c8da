//! Derived list-screen state: search, filter, ordering and global counts.
//!
//! Everything here is a pure function of the collection plus the ephemeral
//! search/filter inputs. Nothing is persisted and nothing can fail.

use crate::error::AppError;
use crate::model::{Task, parse_timestamp};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    fn keeps(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(AppError::invalid_input(format!(
                "unknown filter '{other}' (expected all, pending or completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListView {
    pub tasks: Vec<Task>,
    pub stats: TaskStats,
}

/// Ephemeral list-screen inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub filter: TaskFilter,
}

impl ListQuery {
    pub fn new<S: Into<String>>(search: S, filter: TaskFilter) -> Self {
        Self {
            search: search.into(),
            filter,
        }
    }

    pub fn view(&self, tasks: &[Task]) -> TaskListView {
        build_view(tasks, &self.search, self.filter)
    }
}

pub fn build_view(tasks: &[Task], search: &str, filter: TaskFilter) -> TaskListView {
    TaskListView {
        tasks: visible_tasks(tasks, search, filter),
        stats: stats(tasks),
    }
}

pub fn visible_tasks(tasks: &[Task], search: &str, filter: TaskFilter) -> Vec<Task> {
    let searching = !search.trim().is_empty();
    let needle = search.to_lowercase();

    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| !searching || task.title.to_lowercase().contains(&needle))
        .filter(|task| filter.keeps(task))
        .cloned()
        .collect();

    visible.sort_by(compare_for_display);
    visible
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|task| task.completed).count();
    TaskStats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
    }
}

/// Pending first, soonest due date first, undated last; then completed,
/// most recently completed first, undated last.
pub fn compare_for_display(a: &Task, b: &Task) -> Ordering {
    match (a.completed, b.completed) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, false) => present_first(
            timestamp(a.due_date.as_deref()),
            timestamp(b.due_date.as_deref()),
            |x, y| x.cmp(&y),
        ),
        (true, true) => present_first(
            timestamp(a.completed_at.as_deref()),
            timestamp(b.completed_at.as_deref()),
            |x, y| y.cmp(&x),
        ),
    }
}

fn present_first<F>(a: Option<OffsetDateTime>, b: Option<OffsetDateTime>, order: F) -> Ordering
where
    F: FnOnce(OffsetDateTime, OffsetDateTime) -> Ordering,
{
    match (a, b) {
        (Some(x), Some(y)) => order(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// Unparseable timestamps sort as if absent.
fn timestamp(value: Option<&str>) -> Option<OffsetDateTime> {
    value.and_then(parse_timestamp)
}
