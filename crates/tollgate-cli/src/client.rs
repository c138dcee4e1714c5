//! Session and gateway wiring, error types, and terminal notices for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tollgate_gateway::{
    FailureKind, GatewayConfig, GatewayError, InMemoryNavigator, Notifier, RequestFailure,
    RequestGateway, error_message,
};
use tollgate_session::{FileStore, Hydration, Principal, SessionContext, SessionError};
use tracing::debug;
use url::Url;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }

    /// Map a failed login: a 401 carrying an `error` text becomes a validation
    /// error with that text.
    pub(crate) fn from_login(err: GatewayError) -> Self {
        if err.is_session_expired()
            && let Some(message) = server_error_text(&err)
        {
            return Self::validation(message);
        }
        Self::from(err)
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        if matches!(err, GatewayError::Config { .. }) {
            return Self::validation(format!("{:#}", anyhow::Error::from(err)));
        }
        let rejected_input = matches!(
            err.status(),
            Some(StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY)
        );
        if !rejected_input {
            return Self::failure(err);
        }
        let server_message = match err.kind() {
            Some(FailureKind::OtherHttpFailure {
                message: Some(message),
            }) => Some(message.clone()),
            _ => None,
        };
        Self::validation(
            server_message.unwrap_or_else(|| format!("{:#}", anyhow::Error::from(err))),
        )
    }
}

fn server_error_text(err: &GatewayError) -> Option<String> {
    match err {
        GatewayError::Request {
            failure: RequestFailure::Status { body, .. },
            ..
        } => error_message(body),
        _ => None,
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::failure(err)
    }
}

/// Prints gateway notices to stderr so stdout stays machine-readable.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("notice: {message}");
    }
}

/// Connection settings gathered from flags and environment.
#[derive(Clone, Debug)]
pub(crate) struct ConnectSettings {
    pub(crate) api_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) session_file: PathBuf,
    /// Location reported to the gateway; the entry path for login.
    pub(crate) location: String,
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) session: SessionContext,
    pub(crate) gateway: RequestGateway,
    session_file: PathBuf,
}

impl AppContext {
    /// Open the session file and build a gateway over it.
    pub(crate) fn connect(settings: &ConnectSettings) -> CliResult<Self> {
        let storage = Arc::new(FileStore::new(settings.session_file.clone()));
        let session = SessionContext::new(storage);
        let config = GatewayConfig::new(settings.api_url.clone()).with_timeout(settings.timeout);
        let gateway = RequestGateway::new(
            config,
            &session,
            Arc::new(StderrNotifier),
            Arc::new(InMemoryNavigator::new(settings.location.clone())),
        )?;
        debug!(
            api_url = %settings.api_url,
            session_file = %settings.session_file.display(),
            "cli context ready"
        );
        Ok(Self {
            session,
            gateway,
            session_file: settings.session_file.clone(),
        })
    }

    pub(crate) fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Restore the persisted principal, if any.
    pub(crate) fn hydrate(&self) -> CliResult<Option<Principal>> {
        match self.session.initialize() {
            Ok(Hydration::Restored(principal)) => Ok(Some(principal)),
            Ok(Hydration::Empty) => Ok(None),
            Ok(Hydration::AlreadyInitialized) => Ok(self.session.session().current_user()),
            Err(SessionError::CorruptSessionData { .. }) => Err(CliError::validation(format!(
                "session file {} is corrupt; run `tollgate session clear`",
                self.session_file.display()
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    tollgate_gateway::parse_base_url(input).map_err(|err| format!("invalid URL '{input}': {err}"))
}
