//! Language-model assistance: prompt construction, the text-in/text-out
//! contract, and the narrow parsers that turn free text back into task data.

use crate::error::AppError;
use crate::model::{Priority, Task};
use tracing::{debug, warn};

const SYSTEM_PREAMBLE: &str = "You are a task management assistant.";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 500;
const MIN_DESCRIPTION_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    CreateTask,
    GenerateDescription,
    AutoPriority,
    EnhanceTask,
    PlanSchedule,
    SmartSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Anything that can answer a prompt with text: a hosted model, a local one,
/// or a canned responder in tests.
pub trait Assistant {
    fn complete(&self, prompt: &Prompt) -> Result<String, AppError>;
}

impl Prompt {
    fn new(kind: PromptKind, instruction: &str, user: String) -> Self {
        Self {
            kind,
            system: format!("{SYSTEM_PREAMBLE} {instruction}"),
            user,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn create_task(input: &str) -> Self {
        Self::new(
            PromptKind::CreateTask,
            "Create a detailed task based on user input. Format the response as a clear, actionable task description with bullet points for key steps.",
            format!("Create a task with this description: {input}"),
        )
    }

    pub fn generate_description(title: &str) -> Self {
        Self::new(
            PromptKind::GenerateDescription,
            "Generate a detailed, well-structured task description that includes key steps, considerations, and success criteria.",
            format!("Generate a detailed description for a task titled: {title}"),
        )
    }

    pub fn auto_priority(text: &str) -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 20,
            ..Self::new(
                PromptKind::AutoPriority,
                "Analyze task priority. Respond with ONLY ONE WORD: High, Medium, or Low. No explanations, no punctuation, just the priority level.",
                format!("What priority should this task have? Task: {text}"),
            )
        }
    }

    pub fn enhance_task(task: &Task) -> Self {
        let description = if task.description.trim().is_empty() {
            "No description"
        } else {
            task.description.as_str()
        };
        Self::new(
            PromptKind::EnhanceTask,
            "Enhance and improve the given task description. Make it more detailed, actionable, and well-structured. Add specific steps and considerations.",
            format!(
                "Enhance this task:\nTitle: {}\nCurrent Description: {}\nPriority: {}",
                task.title,
                description,
                priority_label(task)
            ),
        )
    }

    pub fn plan_schedule(task: &Task) -> Self {
        Self {
            max_tokens: 800,
            ..Self::new(
                PromptKind::PlanSchedule,
                "Create a detailed schedule/plan for completing this task. Break it down into phases, steps, and time estimates. Format with clear sections and bullet points.",
                format!(
                    "Create a schedule plan for this task:\nTitle: {}\nDue Date: {}\nPriority: {}",
                    task.title,
                    task.due_date.as_deref().unwrap_or("none"),
                    priority_label(task)
                ),
            )
        }
    }

    pub fn smart_summary(tasks: &[Task]) -> Result<Self, AppError> {
        let payload = serde_json::to_string(tasks)?;
        Ok(Self::new(
            PromptKind::SmartSummary,
            "Provide a smart summary of tasks, highlighting priorities, deadlines, dependencies, and actionable suggestions.",
            format!("Provide a summary and insights for my tasks: {payload}"),
        ))
    }
}

fn priority_label(task: &Task) -> &str {
    task.priority.as_ref().map(Priority::as_str).unwrap_or("none")
}

/// Picks the level named earliest in `content`, or `fallback` when none is named.
pub fn parse_priority(content: &str, fallback: Priority) -> Priority {
    let lowered = content.to_lowercase();
    [
        ("high", Priority::High),
        ("medium", Priority::Medium),
        ("normal", Priority::Medium),
        ("low", Priority::Low),
    ]
    .into_iter()
    .filter_map(|(token, level)| lowered.find(token).map(|index| (index, level)))
    .min_by_key(|(index, _)| *index)
    .map(|(_, level)| level)
    .unwrap_or(fallback)
}

pub fn infer_priority(
    assistant: &dyn Assistant,
    text: &str,
    fallback: Priority,
) -> Result<Priority, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("text is required"));
    }

    let content = assistant.complete(&Prompt::auto_priority(trimmed))?;
    let priority = parse_priority(&content, fallback.clone());
    if content.trim().is_empty() {
        warn!(target: "taskvox::assist", fallback = %fallback, "empty priority response");
    }
    debug!(target: "taskvox::assist", %priority, response = content.trim(), "inferred priority");
    Ok(priority)
}

/// Asks for a description for `title`; falls back to a stock sentence when the
/// answer is unusable.
pub fn describe(assistant: &dyn Assistant, title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let content = assistant.complete(&Prompt::generate_description(trimmed))?;
    let cleaned = clean_response(&content);
    if cleaned.chars().count() < MIN_DESCRIPTION_LEN {
        return Ok(fallback_description(trimmed));
    }
    Ok(cleaned)
}

pub fn fallback_description(title: &str) -> String {
    format!("Complete \"{}\" efficiently and on time.", title.trim())
}

const DROPPED_LINE_PREFIXES: [&str; 4] = ["Task Title:", "Deliverables:", "Deadline:", "Priority:"];

/// Strips markdown decoration and boilerplate lines from model output.
pub fn clean_response(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw_line in text.lines() {
        let mut line = raw_line.trim().trim_start_matches('#').trim_start();

        let mut bulleted = false;
        for bullet in ["- ", "* ", "• "] {
            if let Some(rest) = line.strip_prefix(bullet) {
                line = rest;
                bulleted = true;
                break;
            }
        }

        let unstarred = line.replace('*', "");
        let mut line = unstarred.trim();
        if DROPPED_LINE_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
        {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Task Description") {
            line = rest.trim_start_matches(':').trim_start();
        }

        let line = if bulleted {
            format!("• {line}")
        } else {
            line.to_string()
        };

        if line.is_empty() && lines.last().is_none_or(|previous| previous.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
