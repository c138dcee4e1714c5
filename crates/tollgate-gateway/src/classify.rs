//! Pure failure classification for gateway responses.
//!
//! # Design
//! - Map a transport outcome to exactly one [`FailureKind`] plus the user notice
//!   and session effect it calls for; perform none of those effects here.
//! - A 401 is the only outcome that invalidates the session. Redirect and
//!   notice are suppressed when the user already sits on the entry path.

use std::fmt::{self, Display, Formatter};

use serde_json::Value;

/// Notice for transport failures with no response.
pub const NETWORK_ERROR_NOTICE: &str = "Network error - no response from server";
/// Notice for an expired or rejected session.
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please login again.";
/// Notice for 403 responses.
pub const PERMISSION_DENIED_NOTICE: &str = "Permission denied";
/// Notice for 404 responses.
pub const NOT_FOUND_NOTICE: &str = "Resource not found";
/// Notice for 500 responses.
pub const SERVER_ERROR_NOTICE: &str = "Server error";
/// Fallback notice for other failure statuses.
pub const REQUEST_FAILED_NOTICE: &str = "Request failed";
/// Notice for requests that could not be built.
pub const CONFIGURATION_ERROR_NOTICE: &str = "Request configuration error";

/// What the transport reported for a failed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureSignal<'a> {
    /// The request was sent but no response arrived.
    NoResponse,
    /// The server answered with a non-success status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: &'a [u8],
    },
    /// The request was never dispatched.
    NotSent,
}

/// Failure taxonomy surfaced to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, timeout, or any other missing response.
    NetworkFailure,
    /// 401: the credential is missing, expired, or rejected.
    AuthenticationExpired,
    /// 403: authenticated but not allowed.
    AuthorizationDenied,
    /// 404.
    NotFound,
    /// 500.
    ServerFault,
    /// Any other failure status.
    OtherHttpFailure {
        /// Server-supplied `error` text, when the body carried one.
        message: Option<String>,
    },
    /// Building the request failed; nothing was dispatched.
    RequestConfigurationFailure,
}

impl FailureKind {
    /// Stable machine-friendly label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NetworkFailure => "network_failure",
            Self::AuthenticationExpired => "authentication_expired",
            Self::AuthorizationDenied => "authorization_denied",
            Self::NotFound => "not_found",
            Self::ServerFault => "server_fault",
            Self::OtherHttpFailure { .. } => "other_http_failure",
            Self::RequestConfigurationFailure => "request_configuration_failure",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Emitted when a response revokes the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInvalidated {
    /// Entry path to navigate to, unless the user is already there.
    pub redirect_to: Option<String>,
    /// Whether the durable credential and principal were removed. Always
    /// `false` from [`classify`]; [`crate::RequestGateway::apply`] records the
    /// outcome on the event it broadcasts.
    pub storage_cleared: bool,
}

/// Result of classifying one failed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Failure kind returned to the caller.
    pub kind: FailureKind,
    /// Message to surface to the user, if any.
    pub notice: Option<String>,
    /// Session effect to apply, if any.
    pub invalidation: Option<SessionInvalidated>,
}

impl Classification {
    fn notify(kind: FailureKind, notice: impl Into<String>) -> Self {
        Self {
            kind,
            notice: Some(notice.into()),
            invalidation: None,
        }
    }
}

/// Classify a failed request.
#[must_use]
pub fn classify(signal: FailureSignal<'_>, current_path: &str, entry_path: &str) -> Classification {
    match signal {
        FailureSignal::NoResponse => {
            Classification::notify(FailureKind::NetworkFailure, NETWORK_ERROR_NOTICE)
        }
        FailureSignal::Status { status: 401, .. } => {
            let away_from_entry = current_path != entry_path;
            Classification {
                kind: FailureKind::AuthenticationExpired,
                notice: away_from_entry.then(|| SESSION_EXPIRED_NOTICE.to_string()),
                invalidation: Some(SessionInvalidated {
                    redirect_to: away_from_entry.then(|| entry_path.to_string()),
                    storage_cleared: false,
                }),
            }
        }
        FailureSignal::Status { status: 403, .. } => {
            Classification::notify(FailureKind::AuthorizationDenied, PERMISSION_DENIED_NOTICE)
        }
        FailureSignal::Status { status: 404, .. } => {
            Classification::notify(FailureKind::NotFound, NOT_FOUND_NOTICE)
        }
        FailureSignal::Status { status: 500, .. } => {
            Classification::notify(FailureKind::ServerFault, SERVER_ERROR_NOTICE)
        }
        FailureSignal::Status { body, .. } => {
            let message = error_message(body);
            let notice = message
                .clone()
                .unwrap_or_else(|| REQUEST_FAILED_NOTICE.to_string());
            Classification::notify(FailureKind::OtherHttpFailure { message }, notice)
        }
        FailureSignal::NotSent => Classification::notify(
            FailureKind::RequestConfigurationFailure,
            CONFIGURATION_ERROR_NOTICE,
        ),
    }
}

/// Extract the structured `error` message from a JSON failure body.
///
/// Only a non-empty string counts; anything else falls back to the generic notice.
#[must_use]
pub fn error_message(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    match parsed.get("error")? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}
