//! Cross-scene key/value storage.
//!
//! Scenes hand small payloads to each other through this store (e.g. the
//! character picked on the selection screen). Reads are destructive: `take`
//! returns the value and removes it in one step.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

pub trait HandoffStore: Send {
    /// Stores `data` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, data: &[u8]) -> anyhow::Result<()>;
    /// Removes and returns the value under `key`.
    fn take(&mut self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn contains(&self, key: &str) -> bool;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandoffStore for MemoryStore {
    fn put(&mut self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn take(&mut self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.remove(key))
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Directory-backed store: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "invalid store key {key:?}"
        );
        Ok(self.dir.join(format!("{key}.json")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl HandoffStore for FileStore {
    fn put(&mut self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        std::fs::write(&path, data).with_context(|| format!("write {}", path.display()))
    }

    fn take(&mut self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        std::fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        Ok(Some(data))
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }
}
