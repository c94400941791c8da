use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskvox_cli::cli::{
    Cli, Command, overrides_from_args, parse_due_input, parse_priority_arg,
};
use taskvox_cli::logging::init_logging;
use taskvox_core::config::{Config, load_config_with_fallback, merge_overrides};
use taskvox_core::error::AppError;
use taskvox_core::model::{NewTask, Task, TaskPatch};
use taskvox_core::notify::notifier_from_env;
use taskvox_core::remind::deliver_reminders;
use taskvox_core::storage::FileKvStore;
use taskvox_core::view_model::{ListQuery, TaskListView, TaskStats};
use taskvox_core::{TaskStore, view_model};
use time::OffsetDateTime;

struct Session {
    config: Config,
    store: TaskStore<FileKvStore>,
}

fn open_session(base: &Config, raw_overrides: &[String]) -> Result<Session, AppError> {
    let overrides = overrides_from_args(raw_overrides)?;
    let config = merge_overrides(base, &overrides);
    let dir = config.resolve_store_dir()?;
    tracing::debug!(target: "taskvox::cli", dir = %dir.display(), "opening store");

    Ok(Session {
        config,
        store: TaskStore::new(FileKvStore::new(dir)),
    })
}

fn status_label(task: &Task) -> &'static str {
    if task.completed { "completed" } else { "pending" }
}

#[derive(Tabled)]
struct TaskRow {
    id: String,
    title: String,
    priority: String,
    due: String,
    status: &'static str,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            priority: task
                .priority
                .as_ref()
                .map(|priority| priority.to_string())
                .unwrap_or_else(|| "-".to_string()),
            due: task.due_date.clone().unwrap_or_else(|| "-".to_string()),
            status: status_label(task),
        }
    }
}

fn stats_line(stats: &TaskStats) -> String {
    format!(
        "Total: {} | Completed: {} | Pending: {}",
        stats.total, stats.completed, stats.pending
    )
}

fn print_view_plain(view: &TaskListView) {
    if view.tasks.is_empty() {
        println!("No tasks found.");
    } else {
        let mut table = Table::new(view.tasks.iter().map(TaskRow::from_task));
        table.with(Style::psql());
        println!("{table}");
    }
    println!("{}", stats_line(&view.stats));
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn print_task_plain(task: &Task) {
    println!("ID: {}", task.id);
    println!("Title: {}", task.title);
    println!("Status: {}", status_label(task));
    println!(
        "Priority: {}",
        or_dash(task.priority.as_ref().map(|priority| priority.as_str()))
    );
    println!("Due: {}", or_dash(task.due_date.as_deref()));
    if !task.description.is_empty() {
        println!("Description: {}", task.description);
    }
    if let Some(note) = task.voice_note.as_deref() {
        println!("Voice note: {note}");
    }
    for recording in &task.recordings {
        println!("Recording: {recording}");
    }
    println!("Created: {}", task.created_at);
    println!("Updated: {}", task.updated_at);
    if let Some(completed_at) = task.completed_at.as_deref() {
        println!("Completed: {completed_at}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}

fn report_task(json: bool, verb: &str, task: &Task) -> Result<(), AppError> {
    if json {
        print_json(task)
    } else {
        println!("{verb} task: {} ({})", task.title, task.id);
        Ok(())
    }
}

fn optional_due(raw: Option<String>) -> Result<Option<String>, AppError> {
    raw.as_deref().map(parse_due_input).transpose()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn report_error(err: &AppError) {
    if err.is_unexpected() {
        tracing::error!(target: "taskvox::cli", code = err.code(), message = err.message(), "command failed unexpectedly");
    }
    eprintln!("ERROR: {err}");
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(cli: Cli, base: &Config) -> Result<(), AppError> {
    let session = open_session(base, &cli.config_override)?;
    let store = &session.store;

    match cli.command {
        Command::Add {
            title,
            description,
            priority,
            due,
            voice_note,
            recordings,
        } => {
            let new_task = NewTask {
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                priority: match priority.as_deref() {
                    Some(raw) => Some(parse_priority_arg(raw)?),
                    None => session.config.default_priority.clone(),
                },
                due_date: optional_due(due)?,
                voice_note: non_blank(voice_note),
                recordings,
            };
            let task = store.add(new_task)?;
            report_task(cli.json, "Added", &task)?;
        }
        Command::Show { id } => {
            let task = store
                .get_by_id(&id)
                .ok_or_else(|| AppError::not_found(format!("no task with id '{}'", id.trim())))?;
            if cli.json {
                print_json(&task)?;
            } else {
                print_task_plain(&task);
            }
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            clear_priority,
            due,
            clear_due,
            voice_note,
            clear_voice_note,
            recordings,
            clear_recordings,
        } => {
            let mut patch = TaskPatch {
                title,
                description,
                ..TaskPatch::default()
            };
            if clear_priority {
                patch.priority = Some(None);
            } else if let Some(raw) = priority.as_deref() {
                patch.priority = Some(Some(parse_priority_arg(raw)?));
            }
            if clear_due {
                patch.due_date = Some(None);
            } else if let Some(raw) = due.as_deref() {
                patch.due_date = Some(Some(parse_due_input(raw)?));
            }
            if clear_voice_note {
                patch.voice_note = Some(None);
            } else if voice_note.is_some() {
                patch.voice_note = Some(non_blank(voice_note));
            }
            if clear_recordings {
                patch.recordings = Some(Vec::new());
            } else if !recordings.is_empty() {
                patch.recordings = Some(recordings);
            }

            if patch.is_empty() {
                return Err(AppError::invalid_input("nothing to update"));
            }

            let task = store.update(&id, patch)?;
            report_task(cli.json, "Updated", &task)?;
        }
        Command::Toggle { id } => {
            let task = store.toggle_completion(&id)?;
            let verb = if task.completed { "Completed" } else { "Reopened" };
            report_task(cli.json, verb, &task)?;
        }
        Command::Delete { id } => {
            let task = store.remove(&id)?;
            report_task(cli.json, "Deleted", &task)?;
        }
        Command::List { search, filter } => {
            let view = ListQuery::new(search, filter).view(&store.load_all());
            if cli.json {
                print_json(&view)?;
            } else {
                print_view_plain(&view);
            }
        }
        Command::Stats => {
            let stats = view_model::stats(&store.load_all());
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("{}", stats_line(&stats));
            }
        }
        Command::Remind => {
            let tasks = store.try_load_all()?;
            let notifier = notifier_from_env()?;
            let outcome = deliver_reminders(
                &tasks,
                OffsetDateTime::now_utc(),
                session.config.reminder_lead(),
                notifier.as_ref(),
            );

            if cli.json {
                let failures: Vec<_> = outcome
                    .failures
                    .iter()
                    .map(|failure| {
                        serde_json::json!({
                            "id": failure.task_id,
                            "error": failure.error.to_string(),
                        })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "notified": outcome.notified,
                    "failures": failures,
                }))?;
            } else if outcome.notified.is_empty() && outcome.failures.is_empty() {
                println!("No reminders due.");
            } else {
                for task in &outcome.notified {
                    println!("Reminded: {} ({})", task.title, task.id);
                }
                for failure in &outcome.failures {
                    eprintln!("ERROR: {} ({})", failure.error, failure.task_id);
                }
            }
        }
    }

    Ok(())
}

fn run_interactive(base: &Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskvox".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, base) {
            report_error(&err);
        }
    }

    Ok(())
}

/// Reads the config file and starts logging. A `log_filter` override wins over
/// the file; a malformed override is reported by `run_command` instead.
fn load_base_config(raw_overrides: &[String]) -> Config {
    let loaded = load_config_with_fallback();
    let log_filter = overrides_from_args(raw_overrides)
        .ok()
        .and_then(|overrides| overrides.log_filter)
        .or_else(|| loaded.config.log_filter.clone());
    init_logging(log_filter.as_deref());
    if let Some(error) = loaded.error {
        tracing::warn!(target: "taskvox::cli", %error, "using default configuration");
    }
    loaded.config
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let base = load_base_config(&[]);
        if let Err(err) = run_interactive(&base) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let base = load_base_config(&cli.config_override);
    if let Err(err) = run_command(cli, &base) {
        report_error(&err);
        std::process::exit(1);
    }
}
