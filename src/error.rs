// User-facing task errors

/// Errors surfaced to whoever drives the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Text was empty on create (or on edit when edits are validated)
    #[error("Task cannot be empty!")]
    EmptyText,
}
