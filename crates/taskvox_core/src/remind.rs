use crate::error::AppError;
use crate::model::{Task, parse_timestamp};
use crate::notify::{Notifier, activation_argument};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

pub const DEFAULT_LEAD_MINUTES: u32 = 60;

#[derive(Debug)]
pub struct ReminderOutcome {
    pub notified: Vec<Task>,
    pub failures: Vec<ReminderFailure>,
}

#[derive(Debug)]
pub struct ReminderFailure {
    pub task_id: String,
    pub error: AppError,
}

pub fn lead_from_minutes(minutes: u32) -> Duration {
    Duration::minutes(i64::from(minutes))
}

fn due_at(task: &Task) -> Option<OffsetDateTime> {
    task.due_date.as_deref().and_then(parse_timestamp)
}

/// When a reminder for `task` should fire: `lead` before the due time, or at
/// the due time itself once that window has already opened. `None` for
/// completed tasks and for due times that are missing, unparseable or past.
pub fn reminder_time(task: &Task, now: OffsetDateTime, lead: Duration) -> Option<OffsetDateTime> {
    if task.completed {
        return None;
    }
    let due = due_at(task)?;
    if due <= now {
        return None;
    }

    let early = due - lead;
    Some(if early > now { early } else { due })
}

/// Pending tasks that are due within `lead` of `now` and not yet overdue.
pub fn due_reminders(tasks: &[Task], now: OffsetDateTime, lead: Duration) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| !task.completed)
        .filter(|task| {
            due_at(task).is_some_and(|due| due > now && due - lead <= now)
        })
        .cloned()
        .collect()
}

pub fn deliver_reminders(
    tasks: &[Task],
    now: OffsetDateTime,
    lead: Duration,
    notifier: &dyn Notifier,
) -> ReminderOutcome {
    let mut notified = Vec::new();
    let mut failures = Vec::new();

    for task in due_reminders(tasks, now, lead) {
        let action = activation_argument(&task.id);
        match notifier.notify_with_action(&task, &action) {
            Ok(()) => {
                debug!(target: "taskvox::remind", id = %task.id, "reminder delivered");
                notified.push(task);
            }
            Err(error) => {
                warn!(target: "taskvox::remind", id = %task.id, %error, "reminder failed");
                failures.push(ReminderFailure {
                    task_id: task.id.clone(),
                    error,
                });
            }
        }
    }

    ReminderOutcome { notified, failures }
}
