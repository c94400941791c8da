//! Read-modify-write CRUD over the task collection.
//!
//! The whole collection lives as one JSON array under a single key. Every
//! mutation is one full read followed by one full write, serialized through an
//! internal lock so concurrent callers in this process never lose an update.

use crate::error::AppError;
use crate::model::{NewTask, Task, TaskPatch};
use crate::storage::KeyValueStore;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, warn};

pub const TASKS_STORAGE_KEY: &str = "@tasks";
const QUARANTINE_SUFFIX: &str = ".corrupt";

pub struct TaskStore<S> {
    storage: S,
    key: String,
    writer: Mutex<IdClock>,
}

/// Last issued id stamp, so ids stay strictly increasing within the process.
#[derive(Debug, Default)]
struct IdClock {
    last: i128,
}

impl IdClock {
    fn next(&mut self, tasks: &[Task]) -> String {
        let mut stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
        if stamp <= self.last {
            stamp = self.last + 1;
        }
        loop {
            let candidate = format!("task-{stamp}");
            if !tasks.iter().any(|task| task.id == candidate) {
                self.last = stamp;
                return candidate;
            }
            stamp += 1;
        }
    }
}

struct Snapshot {
    tasks: Vec<Task>,
    unreadable: Option<String>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, TASKS_STORAGE_KEY)
    }

    pub fn with_key<K: Into<String>>(storage: S, key: K) -> Self {
        Self {
            storage,
            key: key.into(),
            writer: Mutex::new(IdClock::default()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every task, or an empty list when nothing is stored or the stored value
    /// cannot be read. Failures are logged, never returned.
    pub fn load_all(&self) -> Vec<Task> {
        match self.try_load_all() {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(target: "taskvox::store", key = %self.key, error = %err, "treating unreadable task collection as empty");
                Vec::new()
            }
        }
    }

    pub fn try_load_all(&self) -> Result<Vec<Task>, AppError> {
        let _guard = self.lock();
        self.read_collection()
    }

    pub fn save_all(&self, tasks: &[Task]) -> Result<(), AppError> {
        let _guard = self.lock();
        self.write_collection(tasks)
    }

    pub fn get_by_id(&self, id: &str) -> Option<Task> {
        let trimmed_id = id.trim();
        if trimmed_id.is_empty() {
            return None;
        }

        self.load_all()
            .into_iter()
            .find(|task| task.id == trimmed_id)
    }

    pub fn add(&self, new_task: NewTask) -> Result<Task, AppError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        let mut clock = self.lock();
        let mut snapshot = self.read_for_write()?;
        let now = now_rfc3339()?;

        let task = Task {
            id: clock.next(&snapshot.tasks),
            title: title.to_string(),
            description: new_task.description,
            priority: new_task.priority,
            due_date: new_task.due_date,
            completed: false,
            completed_at: None,
            voice_note: new_task.voice_note,
            recordings: new_task.recordings,
            created_at: now.clone(),
            updated_at: now,
        };

        snapshot.tasks.insert(0, task.clone());
        self.commit(&snapshot)?;
        debug!(target: "taskvox::store", id = %task.id, total = snapshot.tasks.len(), "added task");

        Ok(task)
    }

    /// Merges the supplied fields into an existing task and refreshes `updated_at`.
    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        if let Some(title) = patch.title.as_deref()
            && title.trim().is_empty()
        {
            return Err(AppError::invalid_input("title is required"));
        }

        self.mutate(id, "update", |task, now| {
            let mut patch = patch;
            if let Some(title) = patch.title.take() {
                patch.title = Some(title.trim().to_string());
            }
            patch.apply(task);
            task.updated_at = now.to_string();
        })
    }

    pub fn toggle_completion(&self, id: &str) -> Result<Task, AppError> {
        self.mutate(id, "toggle", |task, now| {
            task.completed = !task.completed;
            task.completed_at = task.completed.then(|| now.to_string());
            task.updated_at = now.to_string();
        })
    }

    pub fn remove(&self, id: &str) -> Result<Task, AppError> {
        let trimmed_id = require_id(id)?;

        let _guard = self.lock();
        let mut snapshot = self.read_for_write()?;
        let index = snapshot
            .tasks
            .iter()
            .position(|task| task.id == trimmed_id)
            .ok_or_else(|| not_found("remove", trimmed_id))?;

        let removed = snapshot.tasks.remove(index);
        self.commit(&snapshot)?;
        debug!(target: "taskvox::store", id = %removed.id, total = snapshot.tasks.len(), "removed task");

        Ok(removed)
    }

    fn mutate<F>(&self, id: &str, operation: &'static str, change: F) -> Result<Task, AppError>
    where
        F: FnOnce(&mut Task, &str),
    {
        let trimmed_id = require_id(id)?;

        let _guard = self.lock();
        let mut snapshot = self.read_for_write()?;
        let task = snapshot
            .tasks
            .iter_mut()
            .find(|task| task.id == trimmed_id)
            .ok_or_else(|| not_found(operation, trimmed_id))?;

        let now = now_rfc3339()?;
        change(task, &now);
        let updated = task.clone();

        self.commit(&snapshot)?;
        debug!(target: "taskvox::store", id = %updated.id, operation, completed = updated.completed, "updated task");

        Ok(updated)
    }

    fn lock(&self) -> MutexGuard<'_, IdClock> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_collection(&self) -> Result<Vec<Task>, AppError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        parse_collection(&raw)
    }

    /// Like `read_collection`, but an unparseable value is set aside instead of
    /// failing, so the app keeps working and the old bytes are not lost.
    fn read_for_write(&self) -> Result<Snapshot, AppError> {
        let raw = match self.storage.get(&self.key) {
            Ok(raw) => raw,
            Err(err) => {
                error!(target: "taskvox::store", key = %self.key, error = %err, "failed to read task collection");
                return Err(err);
            }
        };
        let Some(raw) = raw else {
            return Ok(Snapshot {
                tasks: Vec::new(),
                unreadable: None,
            });
        };

        match parse_collection(&raw) {
            Ok(tasks) => Ok(Snapshot {
                tasks,
                unreadable: None,
            }),
            Err(err) => {
                error!(target: "taskvox::store", key = %self.key, error = %err, "stored task collection is corrupt");
                Ok(Snapshot {
                    tasks: Vec::new(),
                    unreadable: Some(raw),
                })
            }
        }
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        if let Some(raw) = snapshot.unreadable.as_deref() {
            let quarantine_key = format!("{}{}", self.key, QUARANTINE_SUFFIX);
            self.storage.set(&quarantine_key, raw).inspect_err(|err| {
                error!(target: "taskvox::store", key = %quarantine_key, error = %err, "failed to preserve corrupt task collection");
            })?;
            warn!(target: "taskvox::store", key = %quarantine_key, "moved corrupt task collection aside");
        }
        self.write_collection(&snapshot.tasks)
    }

    fn write_collection(&self, tasks: &[Task]) -> Result<(), AppError> {
        let content = serde_json::to_string(tasks)?;
        self.storage.set(&self.key, &content).inspect_err(|err| {
            error!(target: "taskvox::store", key = %self.key, error = %err, "failed to save task collection");
        })
    }
}

fn parse_collection(raw: &str) -> Result<Vec<Task>, AppError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parsed: Option<Vec<Task>> = serde_json::from_str(raw)
        .map_err(|err| AppError::invalid_data(format!("task collection: {err}")))?;
    let mut tasks = parsed.unwrap_or_default();
    for task in &mut tasks {
        if task.updated_at.is_empty() {
            task.updated_at = task.created_at.clone();
        }
    }
    Ok(tasks)
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::not_found("id is required"));
    }
    Ok(trimmed_id)
}

fn not_found(operation: &str, id: &str) -> AppError {
    warn!(target: "taskvox::store", id, operation, "task not found");
    AppError::not_found(format!("task {id} not found"))
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{TASKS_STORAGE_KEY, TaskStore};
    use crate::model::{NewTask, Priority, Task, TaskPatch};
    use crate::storage::{FileKvStore, KeyValueStore, MemoryKvStore};
    use std::sync::Arc;

    fn seeded_task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            priority: Some(Priority::Medium),
            due_date: None,
            completed: false,
            completed_at: None,
            voice_note: None,
            recordings: Vec::new(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn seeded_store(tasks: &[Task]) -> TaskStore<MemoryKvStore> {
        let store = TaskStore::new(MemoryKvStore::new());
        store.save_all(tasks).unwrap();
        store
    }

    #[test]
    fn add_then_get_returns_pending_task() {
        let store = TaskStore::new(MemoryKvStore::new());
        let created = store.add(NewTask::titled("  Buy milk  ")).unwrap();

        let fetched = store.get_by_id(&created.id).expect("task stored");
        assert_eq!(fetched.title, "Buy milk");
        assert!(!fetched.completed);
        assert_eq!(fetched.completed_at, None);
        assert_eq!(fetched.created_at, fetched.updated_at);
        assert_eq!(fetched, created);
    }

    #[test]
    fn add_rejects_blank_title_and_leaves_collection_unchanged() {
        let store = seeded_store(&[seeded_task("task-1", "existing")]);
        let before = store.load_all();

        let err = store.add(NewTask::titled("   ")).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(store.load_all(), before);
    }

    #[test]
    fn add_prepends_and_keeps_all_fields() {
        let store = seeded_store(&[seeded_task("task-1", "existing")]);
        let created = store
            .add(NewTask {
                title: "Record standup".to_string(),
                description: "notes".to_string(),
                priority: Some(Priority::High),
                due_date: Some("2026-01-02T09:00:00Z".to_string()),
                voice_note: Some("remember the agenda".to_string()),
                recordings: vec!["file:///rec/1.m4a".to_string()],
            })
            .unwrap();

        let tasks = store.load_all();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, created.id);
        assert_eq!(tasks[1].id, "task-1");
        assert_eq!(tasks[0].priority, Some(Priority::High));
        assert_eq!(tasks[0].recordings, vec!["file:///rec/1.m4a".to_string()]);
        assert_eq!(tasks[0].voice_note.as_deref(), Some("remember the agenda"));
    }

    #[test]
    fn ids_stay_unique_for_rapid_adds() {
        let store = TaskStore::new(MemoryKvStore::new());
        let mut ids: Vec<String> = (0..50)
            .map(|index| store.add(NewTask::titled(format!("task {index}"))).unwrap().id)
            .collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn toggle_sets_completed_at_and_refreshes_updated_at() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        let toggled = store.toggle_completion("task-1").unwrap();

        assert!(toggled.completed);
        let completed_at = toggled.completed_at.clone().expect("completed_at set");
        assert_eq!(toggled.updated_at, completed_at);
        assert_ne!(toggled.updated_at, "2025-01-01T00:00:00Z");
        assert_eq!(toggled.created_at, "2025-01-01T00:00:00Z");
        assert_eq!(store.get_by_id("task-1"), Some(toggled));
    }

    #[test]
    fn toggling_twice_restores_pending_with_null_completed_at() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        store.toggle_completion("task-1").unwrap();
        let restored = store.toggle_completion("task-1").unwrap();

        assert!(!restored.completed);
        assert_eq!(restored.completed_at, None);
    }

    #[test]
    fn toggle_rejects_unknown_and_blank_ids() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        assert!(store.toggle_completion("task-9").unwrap_err().is_not_found());
        assert!(store.toggle_completion("  ").unwrap_err().is_not_found());
        assert!(!store.load_all()[0].completed);
    }

    #[test]
    fn update_unknown_id_fails_without_change() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);
        let before = store.storage().raw(TASKS_STORAGE_KEY);

        let err = store
            .update(
                "task-2",
                TaskPatch {
                    title: Some("renamed".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.storage().raw(TASKS_STORAGE_KEY), before);
    }

    #[test]
    fn update_persists_every_supplied_field() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        let updated = store
            .update(
                "task-1",
                TaskPatch {
                    title: Some(" renamed ".to_string()),
                    priority: Some(Some(Priority::High)),
                    due_date: Some(Some("2026-03-01T10:00:00Z".to_string())),
                    recordings: Some(vec!["file:///a.m4a".to_string()]),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let stored = store.get_by_id("task-1").unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.description, "");
        assert_eq!(stored.priority, Some(Priority::High));
        assert_eq!(stored.due_date.as_deref(), Some("2026-03-01T10:00:00Z"));
        assert_eq!(stored.recordings, vec!["file:///a.m4a".to_string()]);
        assert_eq!(stored.created_at, "2025-01-01T00:00:00Z");
        assert_ne!(stored.updated_at, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn update_can_clear_optional_fields() {
        let mut task = seeded_task("task-1", "demo");
        task.due_date = Some("2026-03-01T10:00:00Z".to_string());
        task.voice_note = Some("transcript".to_string());
        let store = seeded_store(&[task]);

        let updated = store
            .update(
                "task-1",
                TaskPatch {
                    due_date: Some(None),
                    voice_note: Some(None),
                    priority: Some(None),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.due_date, None);
        assert_eq!(updated.voice_note, None);
        assert_eq!(updated.priority, None);
    }

    #[test]
    fn update_does_not_touch_completion_state() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);
        let completed = store.toggle_completion("task-1").unwrap();

        let updated = store
            .update(
                "task-1",
                TaskPatch {
                    description: Some("more detail".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.completed_at, completed.completed_at);
    }

    #[test]
    fn update_rejects_blank_title() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        let err = store
            .update(
                "task-1",
                TaskPatch {
                    title: Some("  ".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(store.load_all()[0].title, "demo");
    }

    #[test]
    fn remove_deletes_exactly_one_and_leaves_others_identical() {
        let store = seeded_store(&[
            seeded_task("task-1", "first"),
            seeded_task("task-2", "second"),
            seeded_task("task-3", "third"),
        ]);
        let before: Vec<serde_json::Value> = serde_json::from_str(
            &store.storage().raw(TASKS_STORAGE_KEY).unwrap(),
        )
        .unwrap();

        let removed = store.remove("task-2").unwrap();
        let after: Vec<serde_json::Value> = serde_json::from_str(
            &store.storage().raw(TASKS_STORAGE_KEY).unwrap(),
        )
        .unwrap();

        assert_eq!(removed.id, "task-2");
        assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
    }

    #[test]
    fn remove_rejects_unknown_and_blank_ids() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        assert!(store.remove("task-2").unwrap_err().is_not_found());
        assert!(store.remove("").unwrap_err().is_not_found());
        assert_eq!(store.load_all().len(), 1);
    }

    #[test]
    fn get_by_id_returns_none_for_blank_or_unknown_id() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);

        assert_eq!(store.get_by_id(""), None);
        assert_eq!(store.get_by_id("task-2"), None);
        assert!(store.get_by_id(" task-1 ").is_some());
    }

    #[test]
    fn saving_what_was_loaded_is_idempotent() {
        let store = seeded_store(&[seeded_task("task-1", "a"), seeded_task("task-2", "b")]);

        let first = store.load_all();
        store.save_all(&first).unwrap();
        let raw_after_first = store.storage().raw(TASKS_STORAGE_KEY);
        store.save_all(&store.load_all()).unwrap();

        assert_eq!(store.load_all(), first);
        assert_eq!(store.storage().raw(TASKS_STORAGE_KEY), raw_after_first);
    }

    #[test]
    fn absent_value_loads_as_empty() {
        let store = TaskStore::new(MemoryKvStore::new());
        assert!(store.load_all().is_empty());
        assert!(store.try_load_all().unwrap().is_empty());
    }

    #[test]
    fn legacy_records_load_with_defaults() {
        let raw = r#"[{"id":"1","title":"old","priority":"Normal","createdAt":"2025-01-01T00:00:00Z","completedAt":null}]"#;
        let store = TaskStore::new(MemoryKvStore::with_entry(TASKS_STORAGE_KEY, raw));

        let tasks = store.load_all();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, Some(Priority::Medium));
        assert_eq!(tasks[0].updated_at, "2025-01-01T00:00:00Z");
        assert!(tasks[0].recordings.is_empty());
    }

    #[test]
    fn corrupt_value_loads_as_empty_but_strict_load_reports_it() {
        let store = TaskStore::new(MemoryKvStore::with_entry(TASKS_STORAGE_KEY, "{not json"));

        assert!(store.load_all().is_empty());
        assert_eq!(store.try_load_all().unwrap_err().code(), "invalid_data");
    }

    #[test]
    fn add_over_corrupt_value_preserves_old_bytes() {
        let store = TaskStore::new(MemoryKvStore::with_entry(TASKS_STORAGE_KEY, "{not json"));

        store.add(NewTask::titled("fresh start")).unwrap();

        assert_eq!(store.load_all().len(), 1);
        assert_eq!(
            store.storage().raw("@tasks.corrupt").as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn write_failure_is_reported_and_state_kept() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);
        store.storage().fail_writes(true);

        let add_err = store.add(NewTask::titled("new")).unwrap_err();
        let toggle_err = store.toggle_completion("task-1").unwrap_err();
        store.storage().fail_writes(false);

        assert_eq!(add_err.code(), "storage_error");
        assert_eq!(toggle_err.code(), "storage_error");
        let tasks = store.load_all();
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].completed);
    }

    #[test]
    fn read_failure_degrades_to_empty_list() {
        let store = seeded_store(&[seeded_task("task-1", "demo")]);
        store.storage().fail_reads(true);

        assert!(store.load_all().is_empty());
        assert_eq!(
            store.remove("task-1").unwrap_err().code(),
            "storage_error"
        );
        assert!(store.storage().raw(TASKS_STORAGE_KEY).is_some());
    }

    #[test]
    fn concurrent_mutations_do_not_lose_updates() {
        let store = Arc::new(TaskStore::new(MemoryKvStore::new()));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for index in 0..10 {
                        store
                            .add(NewTask::titled(format!("w{worker}-{index}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tasks = store.load_all();
        assert_eq!(tasks.len(), 80);
        let mut ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 80);
    }

    #[test]
    fn file_backed_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let created = TaskStore::new(FileKvStore::new(dir.path()))
            .add(NewTask::titled("persisted"))
            .unwrap();

        let reopened = TaskStore::new(FileKvStore::new(dir.path()));
        assert_eq!(reopened.get_by_id(&created.id), Some(created));

        let raw = reopened.storage().get(TASKS_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["title"], "persisted");
        assert_eq!(value[0]["completed"], false);
    }
}
