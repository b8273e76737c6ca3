// tasklist - A single-list task manager persisted to a key-value store

pub mod config;
pub mod edit;
pub mod error;
pub mod kv;
pub mod models;
pub mod persist;
pub mod render;
pub mod sort;
pub mod store;

// Re-export main types for convenience
pub use config::{Backend, Config, Overrides};
pub use edit::EditSession;
pub use error::TaskError;
pub use kv::{FileKv, KeyValueStore, MemoryKv, SqliteKv};
pub use models::{Task, now_ms};
pub use persist::{KvPersister, SnapshotObserver};
pub use sort::SortCriterion;
pub use store::{TaskList, TaskListStore};
