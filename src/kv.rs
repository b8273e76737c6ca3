// Key-value backends the task list is persisted into

use crate::models::now_ms;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// String-keyed, string-valued persistent storage
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Validate a storage key (also used as a filename by `FileKv`)
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail, as a full or broken store would
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(eyre!("Memory store rejected write to {}", key));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(eyre!("Memory store rejected removal of {}", key));
        }
        inner.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// One file per key
// ============================================================================

/// Directory-backed store writing each key to `{key}.json`
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a file store in `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        // Writers replace the file by rename, so a plain read never sees a partial value
        let value = fs::read_to_string(&path).context("Failed to read value file")?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));

        // Exclusive lock serializes writers sharing the temp file
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.base_path.join(format!("{}.lock", key)))
            .context("Failed to open lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut file = File::create(&tmp_path).context("Failed to create temp value file")?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path).context("Failed to move value file into place")?;

        debug!(file = ?path, bytes = value.len(), "FileKv::set: wrote value");
        // Lock is released when lock is dropped
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove value file")?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// SQLite-backed store in `{dir}/tasklist.db`
pub struct SqliteKv {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteKv {
    /// Open or create the database inside `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("tasklist.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let store = Self { base_path, db };
        store.create_schema()?;
        store.create_gitignore()?;

        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "tasklist.db\ntasklist.db-shm\ntasklist.db-wal\n")?;
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &mut dyn KeyValueStore) {
        assert_eq!(store.get("todos").unwrap(), None);

        store.set("todos", "[]").unwrap();
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[]"));

        store.set("todos", r#"[{"id":"a","text":"x","date":1}]"#).unwrap();
        assert_eq!(
            store.get("todos").unwrap().as_deref(),
            Some(r#"[{"id":"a","text":"x","date":1}]"#)
        );

        store.remove("todos").unwrap();
        assert_eq!(store.get("todos").unwrap(), None);

        // Removing a missing key is fine
        store.remove("todos").unwrap();
    }

    #[test]
    fn test_validate_key() {
        // Valid
        assert!(validate_key("todos").is_ok());
        assert!(validate_key("my_todos-2").is_ok());

        // Invalid
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_memory_kv() {
        let mut store = MemoryKv::new();
        exercise(&mut store);
    }

    #[test]
    fn test_memory_kv_clones_share_entries() {
        let store = MemoryKv::new();
        let mut handle = store.clone();
        handle.set("todos", "[]").unwrap();
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_kv_fail_writes() {
        let mut store = MemoryKv::new();
        store.set("todos", "[]").unwrap();
        store.set_fail_writes(true);
        assert!(store.set("todos", "[1]").is_err());
        assert!(store.remove("todos").is_err());
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_kv() {
        let temp = TempDir::new().unwrap();
        let mut store = FileKv::open(temp.path().join("data")).unwrap();
        assert!(store.base_path().exists());
        exercise(&mut store);
    }

    #[test]
    fn test_file_kv_overwrite_shorter_value() {
        let temp = TempDir::new().unwrap();
        let mut store = FileKv::open(temp.path()).unwrap();

        store.set("todos", "a much longer value than the next").unwrap();
        store.set("todos", "short").unwrap();

        let content = fs::read_to_string(temp.path().join("todos.json")).unwrap();
        assert_eq!(content, "short");
    }

    #[test]
    fn test_file_kv_interrupted_write_keeps_previous_value() {
        let temp = TempDir::new().unwrap();
        let mut store = FileKv::open(temp.path()).unwrap();
        store.set("todos", r#"[{"id":"a","text":"x","date":1}]"#).unwrap();
        assert!(!temp.path().join("todos.json.tmp").exists());

        // A write that died before the rename leaves only a partial temp file
        fs::write(temp.path().join("todos.json.tmp"), r#"[{"id":"b","te"#).unwrap();
        assert_eq!(
            store.get("todos").unwrap().as_deref(),
            Some(r#"[{"id":"a","text":"x","date":1}]"#)
        );

        // The next write replaces the stale temp file
        store.set("todos", "[]").unwrap();
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[]"));
        assert!(!temp.path().join("todos.json.tmp").exists());
    }

    #[test]
    fn test_file_kv_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        let mut store = FileKv::open(temp.path()).unwrap();
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("a/b").is_err());
    }

    #[test]
    fn test_sqlite_kv() {
        let temp = TempDir::new().unwrap();
        let mut store = SqliteKv::open(temp.path()).unwrap();
        assert!(temp.path().join("tasklist.db").exists());
        assert!(temp.path().join(".gitignore").exists());
        exercise(&mut store);
    }

    #[test]
    fn test_sqlite_kv_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = SqliteKv::open(temp.path()).unwrap();
            store.set("todos", "[]").unwrap();
        }

        let store = SqliteKv::open(temp.path()).unwrap();
        assert_eq!(store.base_path(), temp.path());
        assert_eq!(store.get("todos").unwrap().as_deref(), Some("[]"));
    }
}
