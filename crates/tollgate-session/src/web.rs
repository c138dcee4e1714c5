//! Browser `localStorage` binding for the durable store.
//!
//! Values are written raw through `Storage::setItem`, not JSON-encoded, so the
//! `token` entry holds the bare credential other scripts on the page expect.

use std::fmt::Debug;

use gloo::console;
use gloo::storage::{LocalStorage, Storage};

use crate::error::{StorageError, StorageResult};
use crate::storage::KeyValueStore;

/// [`KeyValueStore`] over `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    /// Bind to the page's `localStorage`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn unavailable(operation: &'static str, key: &str, err: &impl Debug) -> StorageError {
    let detail = format!("{err:?}");
    console::error!("storage operation failed", operation, key, detail.as_str());
    StorageError::Unavailable { operation, detail }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|err| unavailable("get", key, &err))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|err| unavailable("set", key, &err))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|err| unavailable("remove", key, &err))
    }
}
