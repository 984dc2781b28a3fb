use serde::Serialize;

use crate::format::format_short_date;
use crate::snapshot::{Task, TaskStatus};

/// Display record for one task. `text` is raw; the HTML binding escapes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub text: String,
    pub status: String,
    pub due: Option<String>,
    pub overdue: bool,
}

/// Blocked, then pending (and unknown statuses), then done; ties broken by due
/// date ascending with missing dates first. Stable for equal keys.
pub fn sort_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| {
        a.status
            .priority()
            .cmp(&b.status.priority())
            .then_with(|| a.due_key().cmp(b.due_key()))
    });
    sorted
}

/// `today` is the viewer's local date as `YYYY-MM-DD`.
pub fn is_overdue(task: &Task, today: &str) -> bool {
    task.status != TaskStatus::Done
        && task
            .due
            .as_deref()
            .is_some_and(|due| !due.is_empty() && due < today)
}

pub fn task_rows(tasks: &[Task], today: &str) -> Vec<TaskRow> {
    sort_tasks(tasks)
        .into_iter()
        .map(|task| TaskRow {
            overdue: is_overdue(&task, today),
            due: task
                .due
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| format_short_date(Some(d))),
            status: task.status.label().to_string(),
            text: task.text,
        })
        .collect()
}
