// Configuration loaded from YAML with CLI overrides

use crate::kv::{FileKv, KeyValueStore, MemoryKv, SqliteKv, validate_key};
use crate::persist::DEFAULT_STORAGE_KEY;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_DATE_FORMAT: &str = "%A, %B %-d, %Y - %-I:%M:%S %p";

/// Where the task list is persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl Backend {
    /// Open the key-value store for this backend inside `data_dir`
    pub fn open(self, data_dir: &Path) -> Result<Box<dyn KeyValueStore>> {
        debug!(backend = %self, data_dir = ?data_dir, "Opening key-value backend");
        let kv: Box<dyn KeyValueStore> = match self {
            Backend::Sqlite => Box::new(SqliteKv::open(data_dir)?),
            Backend::File => Box::new(FileKv::open(data_dir)?),
            Backend::Memory => Box::new(MemoryKv::new()),
        };
        Ok(kv)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::File => write!(f, "file"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "file" => Ok(Backend::File),
            "memory" => Ok(Backend::Memory),
            other => Err(eyre!("Unknown backend: {} (expected sqlite, file or memory)", other)),
        }
    }
}

/// Config file contents; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    backend: Option<Backend>,
    data_dir: Option<PathBuf>,
    storage_key: Option<String>,
    validate_edits: Option<bool>,
    date_format: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub data_dir: Option<PathBuf>,
    pub storage_key: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub validate_edits: bool,
    pub date_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            validate_edits: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Resolve CLI overrides over the config file over defaults.
    ///
    /// An explicit config path must exist; the default path is optional.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => Some(read_config_file(path)?),
            None => match default_config_path() {
                Some(path) if path.exists() => Some(read_config_file(&path)?),
                _ => None,
            },
        };

        let config = Self::resolve(file.unwrap_or_default(), overrides);
        validate_key(&config.storage_key)?;
        info!(backend = %config.backend, data_dir = ?config.data_dir, key = %config.storage_key, "Loaded config");
        Ok(config)
    }

    /// Parse YAML config text and apply `overrides` on top
    pub fn from_yaml(yaml: &str, overrides: &Overrides) -> Result<Self> {
        let file = parse_config(yaml)?;
        let config = Self::resolve(file, overrides);
        validate_key(&config.storage_key)?;
        Ok(config)
    }

    fn resolve(file: ConfigFile, overrides: &Overrides) -> Self {
        let defaults = Self::default();
        Self {
            backend: overrides.backend.or(file.backend).unwrap_or(defaults.backend),
            data_dir: overrides
                .data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or(defaults.data_dir),
            storage_key: overrides
                .storage_key
                .clone()
                .or(file.storage_key)
                .unwrap_or(defaults.storage_key),
            validate_edits: file.validate_edits.unwrap_or(defaults.validate_edits),
            date_format: file.date_format.unwrap_or(defaults.date_format),
        }
    }
}

fn parse_config(yaml: &str) -> Result<ConfigFile> {
    if yaml.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(yaml).context("Failed to parse config file")
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content)
}

/// `<config_dir>/tasklist/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tasklist").join("config.yaml"))
}

/// `<data_dir>/tasklist`, or `.tasklist` when no data directory is known
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("", &Overrides::default()).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.storage_key, "todos");
        assert!(!config.validate_edits);
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.data_dir, default_data_dir());
    }

    #[test]
    fn test_yaml_values() {
        let yaml = r#"
backend: file
data_dir: /tmp/tasks
storage_key: my_todos
validate_edits: true
date_format: "%Y-%m-%d"
"#;
        let config = Config::from_yaml(yaml, &Overrides::default()).unwrap();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.storage_key, "my_todos");
        assert!(config.validate_edits);
        assert_eq!(config.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            backend: Some(Backend::Memory),
            data_dir: Some(PathBuf::from("/elsewhere")),
            storage_key: Some("other".to_string()),
            ..Default::default()
        };
        let config = Config::from_yaml("backend: file\nstorage_key: mine\n", &overrides).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.data_dir, PathBuf::from("/elsewhere"));
        assert_eq!(config.storage_key, "other");
    }

    #[test]
    fn test_invalid_yaml_and_key() {
        assert!(Config::from_yaml("backend: floppy\n", &Overrides::default()).is_err());
        assert!(Config::from_yaml("unknown_field: 1\n", &Overrides::default()).is_err());
        assert!(Config::from_yaml("storage_key: ../x\n", &Overrides::default()).is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "backend: memory\n").unwrap();

        let overrides = Overrides {
            config: Some(path),
            ..Default::default()
        };
        let config = Config::load(&overrides).unwrap();
        assert_eq!(config.backend, Backend::Memory);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let overrides = Overrides {
            config: Some(temp.path().join("missing.yaml")),
            ..Default::default()
        };
        assert!(Config::load(&overrides).is_err());
    }

    #[test]
    fn test_backend_parse_and_open() {
        assert_eq!("SQLite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!(Backend::File.to_string(), "file");
        assert!("floppy".parse::<Backend>().is_err());

        let temp = TempDir::new().unwrap();
        for backend in [Backend::Sqlite, Backend::File, Backend::Memory] {
            let mut kv = backend.open(temp.path()).unwrap();
            kv.set("todos", "[]").unwrap();
            assert_eq!(kv.get("todos").unwrap().as_deref(), Some("[]"));
        }
    }
}
