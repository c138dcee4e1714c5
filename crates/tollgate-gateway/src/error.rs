//! Error types for gateway construction and request dispatch.

use reqwest::StatusCode;
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

use crate::classify::FailureKind;
use crate::config::ConfigError;

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The original failure, preserved for the caller after classification.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// The request builder carried an error (bad URL, body encoding, ...).
    #[error("request could not be built")]
    Build {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },
    /// The stored credential cannot be carried in a header.
    #[error("stored credential is not a valid header value")]
    InvalidCredential {
        /// Underlying header error.
        #[source]
        source: InvalidHeaderValue,
    },
    /// The transport gave up before a response arrived.
    #[error("no response from server")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("server responded with {status}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body; empty when it could not be read.
        body: Vec<u8>,
    },
}

/// Primary error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A request failed and was classified; side effects have already run.
    #[error("request failed: {kind}")]
    Request {
        /// Classified failure kind.
        kind: FailureKind,
        /// The original failure.
        #[source]
        failure: RequestFailure,
    },
    /// Gateway configuration was rejected.
    #[error("invalid gateway configuration")]
    Config {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A successful response body could not be read.
    #[error("failed to read response body")]
    Body {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// A successful response body did not decode into the requested type.
    #[error("failed to decode response body")]
    Decode {
        /// Response status.
        status: StatusCode,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// Classified failure kind, for request failures.
    #[must_use]
    pub const fn kind(&self) -> Option<&FailureKind> {
        match self {
            Self::Request { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Response status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Request {
                failure: RequestFailure::Status { status, .. },
                ..
            }
            | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure revoked the session.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self.kind(), Some(FailureKind::AuthenticationExpired))
    }
}

impl From<ConfigError> for GatewayError {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn status_failure_exposes_kind_and_status() {
        let err = GatewayError::Request {
            kind: FailureKind::NotFound,
            failure: RequestFailure::Status {
                status: StatusCode::NOT_FOUND,
                body: Vec::new(),
            },
        };
        assert_eq!(err.to_string(), "request failed: not_found");
        assert_eq!(err.kind(), Some(&FailureKind::NotFound));
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_session_expired());
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("server responded with 404 Not Found")
        );
    }

    #[test]
    fn unauthorized_failure_reports_session_expiry() {
        let err = GatewayError::Request {
            kind: FailureKind::AuthenticationExpired,
            failure: RequestFailure::Status {
                status: StatusCode::UNAUTHORIZED,
                body: b"{}".to_vec(),
            },
        };
        assert!(err.is_session_expired());
    }

    #[test]
    fn config_errors_convert() {
        let err = GatewayError::from(ConfigError::InvalidEntryPath {
            value: "login".to_string(),
        });
        assert!(err.kind().is_none());
        assert!(err.status().is_none());
        assert_eq!(err.to_string(), "invalid gateway configuration");
    }
}
