//! services/api/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as one JSON object on disk.
//!
//! Every write rewrites the whole file through a temporary sibling and a
//! rename, so a crash leaves either the old or the new contents.
//!
//! The `KeyValueStore` port is synchronous, so writes block the calling task.
//! The file holds a handful of small keys and every caller already runs under
//! the session mutex, which serializes them; a write costs about one small
//! `fs::write` plus a rename on the runtime worker.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use aura_tarot_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::{error, info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store. An unreadable file is moved aside to
    /// `<path>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error(&path, e))?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    let aside = path.with_extension("corrupt");
                    warn!(path = %path.display(), error = %e, "Store file is unreadable, moving it aside");
                    fs::rename(&path, &aside).map_err(|e| storage_error(&path, e))?;
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(storage_error(&path, e)),
        };

        info!(path = %path.display(), keys = entries.len(), "Opened key-value store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, e))
    }

    /// Applies `change` to a copy of the entries and commits it only once it
    /// is on disk.
    fn mutate<F>(&self, change: F) -> PortResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> PortError {
    error!(path = %path.display(), error = %e, "Store file I/O failed");
    PortError::Storage(format!("{}: {}", path.display(), e))
}

fn poisoned() -> PortError {
    PortError::Storage("file store lock poisoned".to_string())
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.mutate(|entries| {
            let previous = entries.insert(key.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.mutate(|entries| entries.remove(key).is_some())
    }
}
