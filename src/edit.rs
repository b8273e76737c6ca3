// Edit-in-place session state

use crate::models::Task;

/// Which task, if any, is being edited and its in-progress text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditSession {
    #[default]
    Idle,
    Editing { target_id: String, draft_text: String },
}

impl EditSession {
    /// Start editing `task`, replacing any active session
    pub fn begin(&mut self, task: &Task) {
        *self = EditSession::Editing {
            target_id: task.id.clone(),
            draft_text: task.text.clone(),
        };
    }

    /// Replace the draft text. Returns false when idle.
    pub fn change_draft(&mut self, text: impl Into<String>) -> bool {
        match self {
            EditSession::Editing { draft_text, .. } => {
                *draft_text = text.into();
                true
            }
            EditSession::Idle => false,
        }
    }

    /// End the session, handing back `(target_id, draft_text)` if one was active
    pub fn take(&mut self) -> Option<(String, String)> {
        match std::mem::take(self) {
            EditSession::Editing { target_id, draft_text } => Some((target_id, draft_text)),
            EditSession::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = EditSession::Idle;
    }

    /// Drop the session if it points at `id`. Returns true if it did.
    pub fn invalidate(&mut self, id: &str) -> bool {
        if self.target_id() == Some(id) {
            *self = EditSession::Idle;
            true
        } else {
            false
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditSession::Editing { .. })
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            EditSession::Editing { target_id, .. } => Some(target_id.as_str()),
            EditSession::Idle => None,
        }
    }

    pub fn draft_text(&self) -> Option<&str> {
        match self {
            EditSession::Editing { draft_text, .. } => Some(draft_text.as_str()),
            EditSession::Idle => None,
        }
    }
}
