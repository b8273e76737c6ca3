// Snapshot encoding and the persistence observer

use crate::kv::KeyValueStore;
use crate::models::Task;
use eyre::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Default key the list is stored under
pub const DEFAULT_STORAGE_KEY: &str = "todos";

/// Serialize the full list as a JSON array of `{id, text, date}` objects
pub fn encode(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task list")
}

/// Parse a persisted list.
///
/// Anything that is not a JSON array yields an empty list. Malformed elements
/// are skipped, and an id seen twice keeps its first occurrence.
pub fn decode(raw: &str) -> Vec<Task> {
    let elements = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(elements)) => elements,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Persisted task list is not an array, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = ?e, "Failed to parse persisted task list, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(elements.len());

    for (index, element) in elements.into_iter().enumerate() {
        let task: Task = match serde_json::from_value(element) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse task, skipping");
                continue;
            }
        };

        if !seen.insert(task.id.clone()) {
            warn!(index, id = %task.id, "Duplicate task id, skipping");
            continue;
        }

        tasks.push(task);
    }

    tasks
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read the list stored under `key`. Missing, unreadable or unparsable → empty.
pub fn load_tasks(kv: &dyn KeyValueStore, key: &str) -> Vec<Task> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No persisted task list");
            return Vec::new();
        }
        Err(e) => {
            error!(key, error = ?e, "Failed to read persisted task list, starting empty");
            return Vec::new();
        }
    };

    let tasks = decode(&raw);
    info!(key, count = tasks.len(), "Loaded task list");
    tasks
}

/// Receives every new snapshot of the task list
pub trait SnapshotObserver {
    fn on_snapshot(&mut self, tasks: &[Task]);
}

/// Writes each snapshot in full to a key-value store.
///
/// Write failures are logged and swallowed; the in-memory list stays
/// authoritative until the next write succeeds.
pub struct KvPersister {
    kv: Box<dyn KeyValueStore>,
    key: String,
}

impl KvPersister {
    pub fn new(kv: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted list from this persister's store
    pub fn load(&self) -> Vec<Task> {
        load_tasks(self.kv.as_ref(), &self.key)
    }

    fn write(&mut self, tasks: &[Task]) -> Result<()> {
        let raw = encode(tasks)?;
        self.kv.set(&self.key, &raw)
    }
}

impl SnapshotObserver for KvPersister {
    fn on_snapshot(&mut self, tasks: &[Task]) {
        match self.write(tasks) {
            Ok(()) => debug!(key = %self.key, count = tasks.len(), "Persisted task list"),
            Err(e) => {
                error!(
                    key = %self.key,
                    count = tasks.len(),
                    error = ?e,
                    "Failed to persist task list, keeping in-memory state"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileKv, MemoryKv};
    use tempfile::TempDir;

    fn sample() -> Vec<Task> {
        vec![
            Task {
                id: "b".to_string(),
                text: "walk dog".to_string(),
                created_at: 2000,
            },
            Task {
                id: "a".to_string(),
                text: "buy milk".to_string(),
                created_at: 1000,
            },
        ]
    }

    #[test]
    fn test_encode_field_names() {
        let raw = encode(&sample()).unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.contains(r#""id":"b""#));
        assert!(raw.contains(r#""text":"walk dog""#));
        assert!(raw.contains(r#""date":2000"#));
        assert!(!raw.contains("created_at"));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let tasks = sample();
        let decoded = decode(&encode(&tasks).unwrap());
        assert_eq!(decoded, tasks);
    }

    #[test]
    fn test_decode_unparsable_is_empty() {
        assert!(decode("").is_empty());
        assert!(decode("{malformed json}").is_empty());
        assert!(decode(r#"{"id":"a","text":"x","date":1}"#).is_empty());
        assert!(decode("null").is_empty());
    }

    #[test]
    fn test_decode_skips_malformed_elements() {
        let raw = r#"[
            {"id":"a","text":"Valid","date":1000},
            {"id":"b","text":42},
            "not a task",
            {"id":"c","text":"Also Valid","date":2000}
        ]"#;

        let tasks = decode(raw);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "a");
        assert_eq!(tasks[1].id, "c");
    }

    #[test]
    fn test_decode_drops_duplicate_ids() {
        let raw = r#"[
            {"id":"a","text":"first","date":1000},
            {"id":"a","text":"second","date":2000}
        ]"#;

        let tasks = decode(raw);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "first");
    }

    #[test]
    fn test_load_tasks_missing_key() {
        let kv = MemoryKv::new();
        assert!(load_tasks(&kv, DEFAULT_STORAGE_KEY).is_empty());
    }

    #[test]
    fn test_persister_writes_and_loads() {
        let kv = MemoryKv::new();
        let mut persister = KvPersister::new(Box::new(kv.clone()), DEFAULT_STORAGE_KEY);
        assert_eq!(persister.key(), "todos");

        persister.on_snapshot(&sample());
        assert!(kv.get("todos").unwrap().is_some());
        assert_eq!(persister.load(), sample());
    }

    #[test]
    fn test_persister_swallows_write_failure() {
        let kv = MemoryKv::new();
        let mut persister = KvPersister::new(Box::new(kv.clone()), DEFAULT_STORAGE_KEY);

        persister.on_snapshot(&sample());
        kv.set_fail_writes(true);
        persister.on_snapshot(&[]);

        // Persisted copy still holds the last successful write
        assert_eq!(load_tasks(&kv, "todos"), sample());
    }

    #[test]
    fn test_persister_with_file_backend() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path()).unwrap();
        let mut persister = KvPersister::new(Box::new(kv), "todos");

        persister.on_snapshot(&sample());

        let reopened = FileKv::open(temp.path()).unwrap();
        assert_eq!(load_tasks(&reopened, "todos"), sample());
    }
}
