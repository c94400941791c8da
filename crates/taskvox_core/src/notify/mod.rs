use crate::error::AppError;
use crate::model::Task;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const APP_NAME: &str = "taskvox";

pub trait Notifier {
    fn notify(&self, task: &Task) -> Result<(), AppError>;

    fn notify_with_action(&self, task: &Task, action: &str) -> Result<(), AppError> {
        let _ = action;
        self.notify(task)
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _task: &Task) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var("TASKVOX_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(AppError::Platform(message)) => {
            tracing::warn!(target: "taskvox::remind", %message, "notifications unavailable");
            Ok(Box::new(NoopNotifier))
        }
        Err(other) => Err(other),
    }
}

/// Reminder text: the title plus the due timestamp when there is one.
pub fn reminder_body(task: &Task) -> String {
    match task.due_date.as_deref() {
        Some(due) => format!("\"{}\" is due at {}", task.title, due),
        None => format!("\"{}\"", task.title),
    }
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: &str) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<String> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .map(|id| id.to_string())
}

/// Re-runs this executable as `show <id>` when a reminder is clicked.
pub fn launch_show(task_id: &str) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::platform(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id)
        .spawn()
        .map_err(|err| AppError::platform(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::platform(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{activation_argument, parse_activation_argument, reminder_body};
    use crate::model::Task;

    #[test]
    fn activation_argument_round_trip() {
        let argument = activation_argument("task-1");
        let parsed = parse_activation_argument(&argument);
        assert_eq!(parsed.as_deref(), Some("task-1"));
    }

    #[test]
    fn parse_activation_argument_rejects_other_values() {
        assert!(parse_activation_argument("other:task-1").is_none());
    }

    #[test]
    fn reminder_body_mentions_due_date() {
        let task = Task {
            id: "task-1".to_string(),
            title: "Pay rent".to_string(),
            description: String::new(),
            priority: None,
            due_date: Some("2026-01-01T09:00:00Z".to_string()),
            completed: false,
            completed_at: None,
            voice_note: None,
            recordings: Vec::new(),
            created_at: "2025-12-01T00:00:00Z".to_string(),
            updated_at: "2025-12-01T00:00:00Z".to_string(),
        };

        assert_eq!(
            reminder_body(&task),
            "\"Pay rent\" is due at 2026-01-01T09:00:00Z"
        );
    }
}
