//! Key-Value Stores
//!
//! Synchronous string stores backing [`LocalFormStore`](super::LocalFormStore).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::domain::{DomainError, DomainResult};

/// Minimal synchronous key-value contract
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> DomainResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> DomainResult<()>;
    fn remove(&self, key: &str) -> DomainResult<()>;
}

/// Process-local store, one per test or session
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> DomainResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| DomainError::Internal("Key-value store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DomainResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn open(dir: impl AsRef<Path>) -> DomainResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            DomainError::Internal(format!("Failed to create store directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name = utf8_percent_encode(key, NON_ALPHANUMERIC).to_string();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> DomainResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::Internal(format!("Failed to read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        // Write-then-rename so readers never see a half-written value
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| DomainError::Internal(format!("Failed to write {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| DomainError::Internal(format!("Failed to write {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> DomainResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Internal(format!("Failed to remove {}: {}", key, e))),
        }
    }
}
