// In-memory task list with snapshot observers

use crate::edit::EditSession;
use crate::error::TaskError;
use crate::models::Task;
use crate::persist::{KvPersister, SnapshotObserver};
use crate::sort::SortCriterion;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable snapshot of the list, most recent first unless sorted
pub type TaskList = Arc<[Task]>;

/// Owns the authoritative task list and performs every mutation.
///
/// Each mutation replaces the list with a new snapshot and hands it to every
/// subscribed observer before returning.
pub struct TaskListStore {
    tasks: TaskList,
    edit: EditSession,
    error: Option<TaskError>,
    input: String,
    validate_edits: bool,
    observers: Vec<Box<dyn SnapshotObserver>>,
}

impl Default for TaskListStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TaskListStore {
    /// Create a store holding `tasks`, with no observers
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Arc::from(tasks),
            edit: EditSession::Idle,
            error: None,
            input: String::new(),
            validate_edits: false,
            observers: Vec::new(),
        }
    }

    /// Load the persisted list and keep it in sync on every mutation
    pub fn open(persister: KvPersister) -> Self {
        let tasks = persister.load();
        info!(key = persister.key(), count = tasks.len(), "Opened task list");
        let mut store = Self::new(tasks);
        store.subscribe(Box::new(persister));
        store
    }

    pub fn subscribe(&mut self, observer: Box<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    /// Reject empty text on edit submit as well as on create
    pub fn set_validate_edits(&mut self, validate: bool) {
        self.validate_edits = validate;
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Cheap handle to the current snapshot
    pub fn snapshot(&self) -> TaskList {
        Arc::clone(&self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Message to show until the next create, delete or clear
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Find a task by 1-based position or by a unique id prefix.
    ///
    /// Selectors made only of digits are positions; out of range gives `None`.
    pub fn resolve(&self, selector: &str) -> Option<&Task> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }

        // A number is always a position, never an id prefix
        if let Ok(position) = selector.parse::<usize>() {
            return position.checked_sub(1).and_then(|i| self.tasks.get(i));
        }

        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(selector));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task),
            _ => None,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task to the front of the list
    pub fn create(&mut self, text: &str) -> Result<Task, TaskError> {
        if text.is_empty() {
            debug!("create: rejected empty text");
            self.error = Some(TaskError::EmptyText);
            return Err(TaskError::EmptyText);
        }

        let task = Task::new(text, &self.tasks);
        debug!(id = %task.id, "create: adding task");

        let mut tasks = Vec::with_capacity(self.tasks.len() + 1);
        tasks.push(task.clone());
        tasks.extend(self.tasks.iter().cloned());

        self.error = None;
        self.replace(tasks);
        Ok(task)
    }

    /// Replace the pending input text
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Create a task from the pending input, which is cleared either way
    pub fn submit_input(&mut self) -> Result<Task, TaskError> {
        let text = std::mem::take(&mut self.input);
        self.create(&text)
    }

    /// Change the text of `id`, keeping its id, timestamp and position
    pub fn update(&mut self, id: &str, new_text: &str) -> TaskList {
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .map(|t| {
                if t.id == id {
                    Task {
                        text: new_text.to_string(),
                        ..t.clone()
                    }
                } else {
                    t.clone()
                }
            })
            .collect();

        debug!(id, found = self.get(id).is_some(), "update: called");
        self.replace(tasks);
        self.snapshot()
    }

    /// Remove `id` from the list, ending any edit of it
    pub fn delete(&mut self, id: &str) -> TaskList {
        let tasks: Vec<Task> = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        debug!(id, removed = tasks.len() != self.tasks.len(), "delete: called");

        if self.edit.invalidate(id) {
            debug!(id, "delete: cleared edit session targeting removed task");
        }
        self.error = None;
        self.replace(tasks);
        self.snapshot()
    }

    /// Empty the list and reset error, input and edit state
    pub fn clear_all(&mut self) -> TaskList {
        info!(count = self.tasks.len(), "clear_all: removing every task");
        self.edit.cancel();
        self.error = None;
        self.input.clear();
        self.replace(Vec::new());
        self.snapshot()
    }

    /// Reorder the current list by `criterion`
    pub fn sort(&mut self, criterion: SortCriterion) -> TaskList {
        let mut tasks = self.tasks.to_vec();
        criterion.apply(&mut tasks);
        debug!(%criterion, "sort: reordered list");
        self.replace(tasks);
        self.snapshot()
    }

    // ========================================================================
    // Edit session
    // ========================================================================

    /// Start editing `id`. Returns false if no such task exists.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter().find(|t| t.id == id) else {
            return false;
        };
        self.edit.begin(task);
        true
    }

    /// Update the draft of the active edit. Returns false when not editing.
    pub fn change_draft(&mut self, text: impl Into<String>) -> bool {
        self.edit.change_draft(text)
    }

    /// Apply the draft to its task and end the session.
    ///
    /// With edit validation on, an empty draft is rejected and the session
    /// stays open. When no session is active the list is returned unchanged.
    pub fn submit_edit(&mut self) -> Result<TaskList, TaskError> {
        if self.validate_edits && self.edit.draft_text() == Some("") {
            self.error = Some(TaskError::EmptyText);
            return Err(TaskError::EmptyText);
        }

        match self.edit.take() {
            Some((target_id, draft_text)) => Ok(self.update(&target_id, &draft_text)),
            None => Ok(self.snapshot()),
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit.cancel();
    }

    fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = Arc::from(tasks);
        for observer in &mut self.observers {
            observer.on_snapshot(&self.tasks);
        }
    }
}
