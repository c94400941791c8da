use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub voice_note: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recordings: Vec<String>,
    pub created_at: String,
    /// Older collections never stored this; it falls back to `created_at` on load.
    #[serde(default)]
    pub updated_at: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
    /// Anything a lenient producer wrote that is not one of the known levels.
    Other(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Other(raw) => raw,
        }
    }

    /// Accepts only the known levels; "Normal" is the legacy name for Medium.
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        Self::parse_strict(&raw).unwrap_or(Self::Other(raw))
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a task. Identity and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub voice_note: Option<String>,
    pub recordings: Vec<String>,
}

impl NewTask {
    pub fn titled<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update. `None` leaves a field untouched; `Some(None)` clears a
/// clearable field. Completion state is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Option<Priority>>,
    pub due_date: Option<Option<String>>,
    pub voice_note: Option<Option<String>>,
    pub recordings: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(voice_note) = self.voice_note {
            task.voice_note = voice_note;
        }
        if let Some(recordings) = self.recordings {
            task.recordings = recordings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Task, TaskPatch};

    #[test]
    fn deserializes_minimal_record_with_defaults() {
        let json = r#"{"id":"1","title":"demo","createdAt":"2025-12-20T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();

        assert_eq!(task.description, "");
        assert_eq!(task.priority, None);
        assert_eq!(task.due_date, None);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.voice_note, None);
        assert!(task.recordings.is_empty());
        assert_eq!(task.updated_at, "");
    }

    #[test]
    fn accepts_explicit_nulls_for_optional_fields() {
        let json = r#"{
            "id": "1",
            "title": "demo",
            "description": null,
            "priority": null,
            "dueDate": null,
            "completed": null,
            "completedAt": null,
            "voiceNote": null,
            "recordings": null,
            "createdAt": "2025-12-20T00:00:00Z",
            "updatedAt": "2025-12-20T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();

        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert!(task.recordings.is_empty());
    }

    #[test]
    fn serializes_camel_case_field_names() {
        let json = r#"{"id":"1","title":"demo","dueDate":"2025-12-21T09:00:00Z","createdAt":"a","updatedAt":"b"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["dueDate"], "2025-12-21T09:00:00Z");
        assert_eq!(value["createdAt"], "a");
        assert_eq!(value["updatedAt"], "b");
        assert!(value["completedAt"].is_null());
        assert!(value.get("due_date").is_none());
    }

    #[test]
    fn priority_accepts_normal_as_medium() {
        let priority: Priority = serde_json::from_str("\"Normal\"").unwrap();
        assert_eq!(priority, Priority::Medium);
        assert_eq!(serde_json::to_string(&priority).unwrap(), "\"Medium\"");
    }

    #[test]
    fn priority_keeps_unknown_values_verbatim() {
        let priority: Priority = serde_json::from_str("\"Urgent!!\"").unwrap();
        assert_eq!(priority, Priority::Other("Urgent!!".to_string()));
        assert!(!priority.is_known());
        assert_eq!(serde_json::to_string(&priority).unwrap(), "\"Urgent!!\"");
    }

    #[test]
    fn parse_strict_rejects_unknown_levels() {
        assert_eq!(Priority::parse_strict(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse_strict("low"), Some(Priority::Low));
        assert_eq!(Priority::parse_strict("urgent"), None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            due_date: Some(None),
            ..TaskPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
