#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Client-side session state for the Tollgate auth layer.
//!
//! Layout: `principal.rs` (the cached identity record), `storage.rs` (durable
//! key-value surface plus memory/file backends), `store.rs` (`SessionStore` and
//! the per-context `SessionContext`), `error.rs` (error types), `web.rs`
//! (browser `localStorage` binding, wasm32 only).

pub mod error;
pub mod principal;
pub mod storage;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{SessionError, SessionResult, StorageError, StorageResult};
pub use principal::{ADMIN_ROLE, Principal};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, TOKEN_KEY, USER_KEY, clear_credential,
    read_credential, write_credential,
};
pub use store::{Hydration, SessionContext, SessionStore};
#[cfg(target_arch = "wasm32")]
pub use web::LocalStorageStore;
