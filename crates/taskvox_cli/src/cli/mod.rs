use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskvox_core::config::ConfigOverrides;
use taskvox_core::error::AppError;
use taskvox_core::model::Priority;
use taskvox_core::view_model::TaskFilter;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskvox add "Buy milk" --priority high --due "2026-01-05 09:00"
    Add {
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(short = 'p', long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Transcript of a voice note
        #[arg(long = "voice-note")]
        voice_note: Option<String>,
        /// Audio attachment locator (repeatable)
        #[arg(long = "recording", value_name = "URI")]
        recordings: Vec<String>,
    },
    /// Show details of a task
    ///
    /// Example: taskvox show task-1736000000000000000
    Show { id: String },
    /// Edit any subset of a task's fields
    ///
    /// Example: taskvox edit <id> --title "Buy oat milk" --clear-due
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(short = 'p', long, conflicts_with = "clear_priority")]
        priority: Option<String>,
        #[arg(long)]
        clear_priority: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long = "voice-note", conflicts_with = "clear_voice_note")]
        voice_note: Option<String>,
        #[arg(long)]
        clear_voice_note: bool,
        /// Replace the attachment list (repeatable)
        #[arg(long = "recording", value_name = "URI", conflicts_with = "clear_recordings")]
        recordings: Vec<String>,
        #[arg(long)]
        clear_recordings: bool,
    },
    /// Mark a task completed, or pending again if it already is
    ///
    /// Example: taskvox toggle <id>
    #[command(alias = "done")]
    Toggle { id: String },
    /// Delete a task
    ///
    /// Example: taskvox delete <id>
    Delete { id: String },
    /// List tasks, pending first
    ///
    /// Example: taskvox list --search milk --filter pending
    List {
        #[arg(short = 's', long, default_value = "")]
        search: String,
        #[arg(short = 'f', long, default_value = "all", value_parser = parse_filter)]
        filter: TaskFilter,
    },
    /// Show total, completed and pending counts
    Stats,
    /// Send reminders for tasks due soon
    Remind,
}

fn parse_filter(raw: &str) -> Result<TaskFilter, String> {
    raw.parse::<TaskFilter>().map_err(|err| err.message().to_string())
}

pub fn parse_priority_arg(raw: &str) -> Result<Priority, AppError> {
    Priority::parse_strict(raw).ok_or_else(|| {
        AppError::invalid_input(format!(
            "priority must be high, medium or low (got '{}')",
            raw.trim()
        ))
    })
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD` (midnight) in
/// local time, and returns a normalized RFC 3339 string.
pub fn parse_due_input(raw: &str) -> Result<String, AppError> {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    parse_due_input_with_offset(raw, local_offset)
}

pub fn parse_due_input_with_offset(raw: &str, offset: UtcOffset) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("due date is required"));
    }

    let parsed = if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        value
    } else if let Ok(value) = PrimitiveDateTime::parse(
        trimmed,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        value.assume_offset(offset)
    } else if let Ok(value) =
        PrimitiveDateTime::parse(trimmed, format_description!("[year]-[month]-[day] [hour]:[minute]"))
    {
        value.assume_offset(offset)
    } else if let Ok(value) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        value.with_time(Time::MIDNIGHT).assume_offset(offset)
    } else {
        return Err(AppError::invalid_input(format!(
            "due date '{trimmed}' must be RFC3339, YYYY-MM-DD HH:MM or YYYY-MM-DD"
        )));
    };

    parsed
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    StoreDir,
    DefaultPriority,
    ReminderLeadMinutes,
    LogFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "store_dir" | "store" => ConfigOverrideTarget::StoreDir,
        "default_priority" | "priority" => ConfigOverrideTarget::DefaultPriority,
        "reminder_lead_minutes" | "reminder_lead" => ConfigOverrideTarget::ReminderLeadMinutes,
        "log_filter" | "log" => ConfigOverrideTarget::LogFilter,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

pub fn overrides_from_args(raw_overrides: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for raw in raw_overrides {
        let parsed = parse_config_override(raw).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::StoreDir => {
                if parsed.value.is_empty() {
                    return Err(AppError::invalid_input("store_dir cannot be empty"));
                }
                overrides.store_dir = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::DefaultPriority => {
                overrides.default_priority = Some(parse_priority_arg(&parsed.value)?);
            }
            ConfigOverrideTarget::ReminderLeadMinutes => {
                let minutes = parsed.value.parse::<u32>().map_err(|_| {
                    AppError::invalid_input("reminder_lead_minutes must be a whole number")
                })?;
                overrides.reminder_lead_minutes = Some(minutes);
            }
            ConfigOverrideTarget::LogFilter => {
                overrides.log_filter = Some(parsed.value);
            }
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
