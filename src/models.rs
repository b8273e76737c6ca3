// Data models for the task list

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    /// Creation time in milliseconds since epoch
    #[serde(rename = "date")]
    pub created_at: i64,
}

impl Task {
    /// Build a task with a fresh id that does not collide with `existing`
    pub fn new(text: impl Into<String>, existing: &[Task]) -> Self {
        Self {
            id: new_task_id(existing),
            text: text.into(),
            created_at: now_ms(),
        }
    }

    /// First eight characters of the id, for display
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Generate a v4 UUID string unique among `existing`
pub fn new_task_id(existing: &[Task]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !existing.iter().any(|t| t.id == id) {
            return id;
        }
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
