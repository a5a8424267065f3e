//! Durable key/value storage for client-side caches.
//!
//! Values are opaque strings (the monitor stores one JSON blob per key).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

/// Minimal durable key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (replace) a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Volatile store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("key/value store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("key/value store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated record behind.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory (`<data_dir>/jobpulse`).
    pub fn in_data_dir() -> Result<Self> {
        let base = dirs::data_dir().context("no platform data directory available")?;
        Ok(Self::new(base.join("jobpulse")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create directory {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move {} into place", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let kv = InMemoryKeyValueStore::new();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "v1").unwrap();
        kv.set("k", "v2").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn file_store_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(tmp.path().join("nested"));

        assert_eq!(kv.get("jobpulse.settings").unwrap(), None);
        kv.set("jobpulse.settings", r#"{"a":1}"#).unwrap();
        kv.set("jobpulse.settings", r#"{"a":2}"#).unwrap();

        assert_eq!(kv.get("jobpulse.settings").unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert!(tmp.path().join("nested/jobpulse.settings.json").exists());
    }

    #[test]
    fn keys_are_sanitized_into_file_names() {
        let tmp = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(tmp.path());
        kv.set("../escape/attempt", "x").unwrap();
        assert!(tmp.path().join(".._escape_attempt.json").exists());
        assert_eq!(kv.get("../escape/attempt").unwrap().as_deref(), Some("x"));
    }
}
