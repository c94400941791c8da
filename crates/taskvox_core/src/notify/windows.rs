use crate::error::AppError;
use crate::model::{Priority, Task};
use crate::notify::{APP_NAME, Notifier, launch_show, parse_activation_argument, reminder_body};
use tauri_winrt_notification::{Duration, Sound, Toast};

pub struct WindowsNotifier;

/// Which task a toast activation should open. A click on the toast body
/// reports no arguments and opens the reminded task.
fn activation_target(args: Option<&str>, action: &str, task_id: &str) -> Option<String> {
    match args.map(str::trim) {
        None | Some("") => Some(task_id.to_string()),
        Some(args) if args == action => Some(task_id.to_string()),
        Some(args) => parse_activation_argument(args),
    }
}

impl Notifier for WindowsNotifier {
    fn notify(&self, task: &Task) -> Result<(), AppError> {
        self.notify_with_action(task, "")
    }

    fn notify_with_action(&self, task: &Task, action: &str) -> Result<(), AppError> {
        let action = action.trim().to_string();
        let duration = match task.priority {
            Some(Priority::High) => Duration::Long,
            _ => Duration::Short,
        };

        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title(APP_NAME)
            .text1("Task due soon")
            .text2(&reminder_body(task))
            .sound(Some(Sound::Reminder))
            .duration(duration);

        if !action.is_empty() {
            toast = toast.add_button("Open", &action);
        }

        let task_id = task.id.clone();
        toast
            .on_activated(move |args| {
                if let Some(id) = activation_target(args.as_deref(), &action, &task_id) {
                    let _ = launch_show(&id);
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::platform(format!("{}: {}", task.id, err)))?;
        tracing::debug!(target: "taskvox::remind", id = %task.id, "toast shown");
        Ok(())
    }
}
