//! Gateway configuration and environment loading.
//!
//! # Design
//! - Defaults mirror the reference web client: 10 s deadline, credentials included.
//! - Environment lookups go through a closure so tests never touch process env.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/";
/// Transport deadline used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Entry (login) path that 401 responses redirect to.
pub const DEFAULT_ENTRY_PATH: &str = "/";

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "TOLLGATE_API_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "TOLLGATE_TIMEOUT_SECS";
/// Environment variable holding the entry path.
pub const ENV_ENTRY_PATH: &str = "TOLLGATE_ENTRY_PATH";

/// Configuration rejected by [`GatewayConfig::validate`] or env parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Base URL did not parse.
    #[error("invalid base url")]
    InvalidUrl {
        /// Offending value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// Base URL cannot have paths appended (e.g. `mailto:`).
    #[error("base url cannot be a base")]
    CannotBeBase {
        /// Offending value.
        value: String,
    },
    /// Timeout was not a positive whole number of seconds.
    #[error("invalid timeout")]
    InvalidTimeout {
        /// Offending value.
        value: String,
    },
    /// Entry path must be absolute.
    #[error("entry path must start with '/'")]
    InvalidEntryPath {
        /// Offending value.
        value: String,
    },
}

/// Settings for a [`crate::RequestGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Prefix for every request path.
    pub base_url: Url,
    /// Transport deadline per request.
    pub timeout: Duration,
    /// Designated entry/login path.
    pub entry_path: String,
    /// Keep and send cookies alongside the bearer credential.
    pub with_credentials: bool,
}

impl GatewayConfig {
    /// Configuration for `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            entry_path: DEFAULT_ENTRY_PATH.to_string(),
            with_credentials: true,
        }
    }

    /// Override the transport deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the entry path.
    #[must_use]
    pub fn with_entry_path(mut self, entry_path: impl Into<String>) -> Self {
        self.entry_path = entry_path.into();
        self
    }

    /// Toggle cookie handling.
    #[must_use]
    pub const fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Load from `TOLLGATE_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a looked-up value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            lookup(ENV_API_URL)
                .as_deref()
                .unwrap_or(DEFAULT_API_URL),
        )?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout_secs(&raw)?;
        }
        if let Some(entry_path) = lookup(ENV_ENTRY_PATH) {
            config.entry_path = entry_path;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that construction alone does not enforce.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeBase {
                value: self.base_url.to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                value: "0".to_string(),
            });
        }
        if !self.entry_path.starts_with('/') {
            return Err(ConfigError::InvalidEntryPath {
                value: self.entry_path.clone(),
            });
        }
        Ok(())
    }
}

/// Parse a base URL as given on the command line or in the environment.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] when the value does not parse.
pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}
