//! Persistence backends for the mock store.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// String key-value persistence.
pub trait BalanceStorage: Send + Sync {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn store(&self, key: &str, value: &str) -> io::Result<()>;
}

/// A JSON object on disk, one entry per namespaced key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> io::Result<HashMap<String, Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl BalanceStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        // Numeric entries are accepted as well as strings.
        Ok(self.read_map()?.remove(key).map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!(path = ?self.path, error = %e, "Unreadable mock state file, starting fresh");
            HashMap::new()
        });
        map.insert(key.to_string(), Value::String(value.to_string()));

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.inner.insert(key.to_string(), value.to_string());
        storage
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }
}

impl BalanceStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn store(&self, key: &str, value: &str) -> io::Result<()> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
