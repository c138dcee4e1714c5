//! Recording doubles for the gateway's notify and navigate capabilities.

use std::sync::{Mutex, PoisonError};

use tollgate_gateway::{Navigator, Notifier};

/// Notifier that records every message it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages surfaced so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Navigator that starts at a fixed path and records navigations.
#[derive(Debug)]
pub struct ScriptedNavigator {
    current: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl ScriptedNavigator {
    /// Start at `path`.
    #[must_use]
    pub fn at(path: &str) -> Self {
        Self {
            current: Mutex::new(path.to_string()),
            visits: Mutex::new(Vec::new()),
        }
    }

    /// Paths navigated to so far, oldest first.
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for ScriptedNavigator {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate_to(&self, path: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
