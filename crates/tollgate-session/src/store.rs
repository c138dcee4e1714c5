//! In-memory session state backed by durable storage.
//!
//! # Design
//! - One `SessionContext` per execution context; every consumer receives a clone
//!   of its `SessionStore` instead of reaching for module-level state.
//! - State lives in a `watch` channel so consumers can both read the current
//!   principal and react to transitions.
//! - Durable writes happen before the in-memory publish; a failed write leaves
//!   memory untouched.
//! - Hydration is an explicit `initialize()` call, never a side effect of construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult, StorageError};
use crate::principal::Principal;
use crate::storage::{KeyValueStore, USER_KEY, clear_credential};

/// Outcome of [`SessionContext::initialize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hydration {
    /// A persisted principal was found and is now the current user.
    Restored(Principal),
    /// Nothing was persisted; the session starts anonymous.
    Empty,
    /// Initialisation already ran, or a principal was set before it could.
    AlreadyInitialized,
}

/// Shared handle to the current principal.
///
/// Clones are cheap and observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    state: Arc<watch::Sender<Option<Principal>>>,
}

impl SessionStore {
    /// Create an anonymous store over `storage`. Does not read storage.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            storage,
            state: Arc::new(state),
        }
    }

    /// Populate memory from the persisted principal, if one exists.
    ///
    /// An absent entry leaves the current state as it is, so this never moves
    /// an authenticated session back to anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CorruptSessionData`] when the stored entry, or
    /// the backing file holding it, does not parse (memory and storage are left
    /// unchanged), or a storage error.
    pub fn load(&self) -> SessionResult<Option<Principal>> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(raw) => raw,
            Err(StorageError::Format { path, source }) => {
                warn!(path = %path.display(), error = %source, "session file is corrupt");
                return Err(SessionError::CorruptSessionData { source });
            }
            Err(source) => return Err(SessionError::storage("load", source)),
        };
        let Some(raw) = raw else {
            debug!("no persisted principal");
            return Ok(None);
        };

        let principal: Principal = serde_json::from_str(&raw).map_err(|source| {
            warn!(error = %source, "persisted principal is corrupt");
            SessionError::CorruptSessionData { source }
        })?;
        self.state.send_replace(Some(principal.clone()));
        Ok(Some(principal))
    }

    /// Persist `principal` and make it the current user. Leaves the credential alone.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the durable write fails; memory is
    /// not updated in that case.
    pub fn set_user(&self, principal: Principal) -> SessionResult<()> {
        let raw =
            serde_json::to_string(&principal).map_err(|source| SessionError::Serialize { source })?;
        self.storage
            .set(USER_KEY, &raw)
            .map_err(|source| SessionError::storage("set_user", source))?;
        debug!(user_id = %principal.id, "principal stored");
        self.state.send_replace(Some(principal));
        Ok(())
    }

    /// Drop the current user and remove both the principal and the credential
    /// from durable storage. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Both removals are always attempted; the first failure is returned.
    pub fn clear_user(&self) -> SessionResult<()> {
        self.state.send_replace(None);
        let user = self.storage.remove(USER_KEY);
        let token = clear_credential(self.storage.as_ref());
        user.and(token)
            .map_err(|source| SessionError::storage("clear_user", source))
    }

    /// Re-check durable storage after an out-of-band invalidation (for example
    /// a 401 handled by the gateway). Drops the cached principal when its
    /// durable entry is gone. Never writes storage.
    ///
    /// Returns `true` when the cached state changed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry cannot be read.
    pub fn reconcile(&self) -> SessionResult<bool> {
        let persisted = self
            .storage
            .get(USER_KEY)
            .map_err(|source| SessionError::storage("reconcile", source))?;
        if persisted.is_some() {
            return Ok(false);
        }
        let changed = self.state.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("cached principal dropped after durable invalidation");
        }
        Ok(changed)
    }

    /// The current principal, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<Principal> {
        self.state.borrow().clone()
    }

    /// Whether a principal is loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Whether the current principal holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().as_ref().is_some_and(Principal::is_admin)
    }

    /// Subscribe to principal transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}

/// Session state for one execution context: the durable store plus the
/// [`SessionStore`] every consumer shares.
#[derive(Clone)]
pub struct SessionContext {
    storage: Arc<dyn KeyValueStore>,
    session: SessionStore,
    initialized: Arc<AtomicBool>,
}

impl SessionContext {
    /// Build the context. Call [`Self::initialize`] once at startup to hydrate.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            session: SessionStore::new(Arc::clone(&storage)),
            storage,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restore a persisted session. Runs `load()` at most once per context, and
    /// only while memory is still empty.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionStore::load`] failures. The context stays
    /// uninitialised so a later call can retry (for example after `clear_user`).
    pub fn initialize(&self) -> SessionResult<Hydration> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Ok(Hydration::AlreadyInitialized);
        }
        if self.session.is_authenticated() {
            return Ok(Hydration::AlreadyInitialized);
        }
        match self.session.load() {
            Ok(Some(principal)) => {
                info!(user_id = %principal.id, "session restored");
                Ok(Hydration::Restored(principal))
            }
            Ok(None) => Ok(Hydration::Empty),
            Err(err) => {
                self.initialized.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Durable storage shared with the request gateway.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.storage)
    }

    /// The shared session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }
}
