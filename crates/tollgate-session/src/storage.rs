//! Durable key-value storage surface shared by the session store and the gateway.
//!
//! # Design
//! - Values are opaque strings; callers own (de)serialisation.
//! - The principal and the credential live under independent keys with no
//!   cross-key transaction, so either may exist without the other.
//! - Removing an absent key is a no-op, which keeps clears idempotent.
//! - Removing any key from a file that no longer parses deletes the file, so a
//!   clear always leaves the store readable.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Key holding the serialised [`crate::Principal`].
pub const USER_KEY: &str = "user";

/// Key holding the raw bearer credential.
pub const TOKEN_KEY: &str = "token";

/// String-keyed persistence that survives reloads of the executing context.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Absent keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Read the bearer credential. An empty value reads as absent; anything else,
/// whitespace included, is returned verbatim.
///
/// # Errors
///
/// Propagates backend read failures.
pub fn read_credential<S: KeyValueStore + ?Sized>(store: &S) -> StorageResult<Option<String>> {
    Ok(store.get(TOKEN_KEY)?.filter(|token| !token.is_empty()))
}

/// Persist the bearer credential issued by a login flow.
///
/// # Errors
///
/// Propagates backend write failures.
pub fn write_credential<S: KeyValueStore + ?Sized>(store: &S, token: &str) -> StorageResult<()> {
    store.set(TOKEN_KEY, token)
}

/// Drop the bearer credential.
///
/// # Errors
///
/// Propagates backend write failures.
pub fn clear_credential<S: KeyValueStore + ?Sized>(store: &S) -> StorageResult<()> {
    store.remove(TOKEN_KEY)
}

/// Process-local store, used for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
        operation: &'static str,
    ) -> StorageResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Poisoned { operation })
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries("get")?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries("set")?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries("remove")?.remove(key);
        Ok(())
    }
}

/// JSON-file store: every key lives in one object on disk.
///
/// Reads of a malformed file fail with [`StorageError::Format`]; a `remove`
/// on such a file drops every entry along with it.
///
/// Writes land in a sibling temp file that is renamed over the target, so a
/// crash mid-write never leaves a truncated session file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    /// Bind a store to `path`. The file is created lazily on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> StorageResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let io_err = |operation: &'static str| {
            let path = self.path.clone();
            move |source| StorageError::Io {
                operation,
                path,
                source,
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err("create_dir"))?;
        }
        let payload =
            serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Format {
                path: self.path.clone(),
                source,
            })?;
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, payload).map_err(io_err("write"))?;
        fs::rename(&temp, &self.path).map_err(io_err("rename"))?;
        debug!(path = %self.path.display(), keys = entries.len(), "session file written");
        Ok(())
    }

    fn discard(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                operation: "discard",
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn update(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> StorageResult<()> {
        let _lock = self
            .guard
            .lock()
            .map_err(|_| StorageError::Poisoned { operation })?;
        let mut entries = self.read_entries()?;
        if apply(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _lock = self
            .guard
            .lock()
            .map_err(|_| StorageError::Poisoned { operation: "get" })?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update("set", |entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let _lock = self
            .guard
            .lock()
            .map_err(|_| StorageError::Poisoned { operation: "remove" })?;
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StorageError::Format { source, .. }) => {
                warn!(
                    path = %self.path.display(),
                    error = %source,
                    "discarding unreadable session file"
                );
                return self.discard();
            }
            Err(err) => return Err(err),
        };
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
