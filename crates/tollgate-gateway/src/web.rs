//! Browser bindings for the notify and navigate capabilities.

use gloo::console;
use gloo::dialogs::alert;
use gloo::utils::window;

use crate::hooks::{Navigator, Notifier};

/// Notifier that raises a blocking `window.alert` dialog.
#[derive(Clone, Copy, Debug, Default)]
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn notify(&self, message: &str) {
        alert(message);
    }
}

/// Navigator over `window.location`; navigation is a full page load.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn current_path(&self) -> String {
        window().location().pathname().unwrap_or_else(|err| {
            console::warn!("failed to read location pathname", err);
            String::new()
        })
    }

    fn navigate_to(&self, path: &str) {
        if let Err(err) = window().location().set_href(path) {
            console::error!("navigation failed", path, err);
        }
    }
}
