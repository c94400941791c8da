use crate::error::AppError;
use crate::model::{Priority, Task};
use crate::notify::{APP_NAME, Notifier, launch_show, reminder_body};
use notify_rust::{Hint, Notification, Timeout, Urgency};

const REMINDER_SUMMARY: &str = "Task due soon";

pub struct LinuxNotifier;

fn urgency_for(task: &Task) -> Urgency {
    match task.priority {
        Some(Priority::High) => Urgency::Critical,
        Some(Priority::Low) => Urgency::Low,
        _ => Urgency::Normal,
    }
}

impl Notifier for LinuxNotifier {
    fn notify(&self, task: &Task) -> Result<(), AppError> {
        self.notify_with_action(task, "")
    }

    fn notify_with_action(&self, task: &Task, action: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(REMINDER_SUMMARY)
            .body(&reminder_body(task))
            .urgency(urgency_for(task))
            .hint(Hint::Category("reminder".to_string()))
            .timeout(Timeout::Default);

        let action = action.trim();
        if !action.is_empty() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::platform(format!("{}: {}", task.id, err)))?;
        tracing::debug!(target: "taskvox::remind", id = %task.id, "desktop notification shown");

        // The listener only lives as long as this process.
        if !action.is_empty() {
            let action_key = action.to_string();
            let task_id = task.id.clone();
            std::thread::spawn(move || {
                handle.wait_for_action(|selected| {
                    if selected == action_key || selected == "default" {
                        let _ = launch_show(&task_id);
                    }
                });
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::urgency_for;
    use crate::model::{Priority, Task};
    use notify_rust::Urgency;

    fn with_priority(priority: Option<Priority>) -> Task {
        Task {
            id: "task-1".to_string(),
            title: "Pay rent".to_string(),
            description: String::new(),
            priority,
            due_date: None,
            completed: false,
            completed_at: None,
            voice_note: None,
            recordings: Vec::new(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn urgency_follows_priority() {
        assert_eq!(urgency_for(&with_priority(Some(Priority::High))), Urgency::Critical);
        assert_eq!(urgency_for(&with_priority(Some(Priority::Low))), Urgency::Low);
        assert_eq!(urgency_for(&with_priority(None)), Urgency::Normal);
        assert_eq!(
            urgency_for(&with_priority(Some(Priority::Other("Someday".into())))),
            Urgency::Normal
        );
    }
}
