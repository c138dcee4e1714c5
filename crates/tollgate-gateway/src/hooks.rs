//! Notification and navigation capabilities the gateway calls out to.
//!
//! # Design
//! - The gateway only needs "show a message", "where am I" and "go to path";
//!   UI toolkits bind these however they render toasts and routes.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

/// Surfaces a message to the user.
pub trait Notifier: Send + Sync {
    /// Show `message`.
    fn notify(&self, message: &str);
}

/// Reads and changes the current navigation location.
pub trait Navigator: Send + Sync {
    /// Current location path (e.g. `/dashboard`).
    fn current_path(&self) -> String;
    /// Hard-navigate to `path`.
    fn navigate_to(&self, path: &str);
}

/// Notifier that logs notices through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(notice = message, "user notice");
    }
}

/// Notifier that forwards to a closure, e.g. a UI toast callback.
pub struct FnNotifier<F> {
    emit: F,
}

impl<F> FnNotifier<F>
where
    F: Fn(&str) + Send + Sync,
{
    /// Wrap `emit`.
    pub const fn new(emit: F) -> Self {
        Self { emit }
    }
}

impl<F> Notifier for FnNotifier<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        (self.emit)(message);
    }
}

impl<F> fmt::Debug for FnNotifier<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("FnNotifier").finish_non_exhaustive()
    }
}

/// Navigator that tracks the location in memory, for hosts without a router.
#[derive(Debug)]
pub struct InMemoryNavigator {
    path: Mutex<String>,
}

impl InMemoryNavigator {
    /// Start at `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            path: Mutex::new(initial.into()),
        }
    }
}

impl Navigator for InMemoryNavigator {
    fn current_path(&self) -> String {
        self.path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate_to(&self, path: &str) {
        info!(path, "navigating");
        *self.path.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }
}
