//! Authenticated principal record cached on the client.
//!
//! # Design
//! - Mirror the server's user payload field-for-field so the cached copy round-trips.
//! - Keep the role as the raw server string; privilege checks normalise case at read time.

use serde::{Deserialize, Serialize};

/// Canonical administrator role. Compared ASCII-case-insensitively.
pub const ADMIN_ROLE: &str = "admin";

/// Identity of the currently authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque stable identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Contact address; empty when the server does not supply one.
    #[serde(default)]
    pub email: String,
    /// Role string as sent by the server (case varies between backends).
    pub role: String,
    /// Creation timestamp, kept verbatim.
    pub created_at: String,
}

impl Principal {
    /// Whether this principal holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }
}
