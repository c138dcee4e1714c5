//! Outbound credential injection and inbound failure handling.
//!
//! # Design
//! - Read the credential from durable storage on every request, never from the
//!   session cache, so the gateway works before (or without) hydration.
//! - Classify with the pure [`classify`] step, then run the effects in one place
//!   ([`RequestGateway::apply`]): storage clear, notice, navigation.
//! - Every failure still reaches the caller with its original cause attached.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tollgate_session::{KeyValueStore, SessionContext, TOKEN_KEY, USER_KEY, read_credential};
use tracing::{debug, error, warn};

use crate::classify::{Classification, FailureSignal, SessionInvalidated, classify};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, RequestFailure};
use crate::hooks::{Navigator, Notifier};

const INVALIDATION_CAPACITY: usize = 16;

/// Wraps an HTTP client with credential injection and failure policy.
pub struct RequestGateway {
    client: Client,
    config: GatewayConfig,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    invalidations: broadcast::Sender<SessionInvalidated>,
}

impl RequestGateway {
    /// Build a gateway over the durable storage owned by `context`.
    ///
    /// # Errors
    ///
    /// Returns an error when `config` is invalid or the HTTP client cannot be built.
    pub fn new(
        config: GatewayConfig,
        context: &SessionContext,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .timeout(config.timeout)
            .cookie_store(config.with_credentials);
        let client = builder
            .build()
            .map_err(|source| GatewayError::Client { source })?;

        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Ok(Self {
            client,
            config,
            storage: context.storage(),
            notifier,
            navigator,
            invalidations,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Receive an event each time a response revokes the session.
    #[must_use]
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<SessionInvalidated> {
        self.invalidations.subscribe()
    }

    /// Start a request for `path` relative to the base URL.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.endpoint(path))
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    /// Start a PUT request.
    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    /// Start a DELETE request.
    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Dispatch `builder` through the outbound and inbound hooks.
    ///
    /// Successful (2xx) responses are returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Request`] for every failure, after the notice,
    /// and for 401 the session invalidation, has been applied.
    pub async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let request = match builder.build() {
            Ok(request) => request,
            Err(source) => {
                return Err(self.reject(FailureSignal::NotSent, RequestFailure::Build { source }));
            }
        };
        let request = match self.authorize(request) {
            Ok(request) => request,
            Err(source) => {
                return Err(self.reject(
                    FailureSignal::NotSent,
                    RequestFailure::InvalidCredential { source },
                ));
            }
        };

        let method = request.method().clone();
        let url = request.url().clone();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(source) => {
                warn!(%method, %url, error = %source, "request got no response");
                return Err(self.reject(
                    FailureSignal::NoResponse,
                    RequestFailure::Transport { source },
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(%method, %url, status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                debug!(error = %err, "failed to read error body");
                Vec::new()
            }
        };
        warn!(%method, %url, status = status.as_u16(), "request failed");
        let classification = self.classify(FailureSignal::Status {
            status: status.as_u16(),
            body: &body,
        });
        Err(self.finish(classification, RequestFailure::Status { status, body }))
    }

    /// [`Self::send`], then decode a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the [`Self::send`] error, or a body/decode error for a 2xx
    /// response that is not valid `T`. Decode errors surface no notice.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self.send(builder).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| GatewayError::Body { source })?;
        serde_json::from_slice(&body).map_err(|source| GatewayError::Decode { status, source })
    }

    /// Run the side effects a classification calls for: clear the durable
    /// session on invalidation, surface the notice, then navigate.
    ///
    /// The broadcast event carries `storage_cleared` for the clear that just ran.
    pub fn apply(&self, classification: &Classification) {
        if let Some(invalidated) = &classification.invalidation {
            let event = SessionInvalidated {
                storage_cleared: self.invalidate_session(),
                ..invalidated.clone()
            };
            if self.invalidations.send(event).is_err() {
                debug!("no invalidation subscribers");
            }
        }
        if let Some(notice) = &classification.notice {
            self.notifier.notify(notice);
        }
        if let Some(path) = classification
            .invalidation
            .as_ref()
            .and_then(|invalidated| invalidated.redirect_to.as_deref())
        {
            self.navigator.navigate_to(path);
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, mut request: Request) -> Result<Request, InvalidHeaderValue> {
        let token = read_credential(self.storage.as_ref()).unwrap_or_else(|err| {
            warn!(error = %err, "credential read failed; sending without authorization");
            None
        });
        match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                debug!(url = %request.url(), "credential attached");
            }
            None => debug!(url = %request.url(), "no credential stored"),
        }
        Ok(request)
    }

    fn classify(&self, signal: FailureSignal<'_>) -> Classification {
        let current_path = self.navigator.current_path();
        classify(signal, &current_path, &self.config.entry_path)
    }

    fn reject(&self, signal: FailureSignal<'_>, failure: RequestFailure) -> GatewayError {
        let classification = self.classify(signal);
        self.finish(classification, failure)
    }

    fn finish(&self, classification: Classification, failure: RequestFailure) -> GatewayError {
        self.apply(&classification);
        GatewayError::Request {
            kind: classification.kind,
            failure,
        }
    }

    fn invalidate_session(&self) -> bool {
        let mut cleared = true;
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                error!(key, error = %err, "failed to clear durable session entry");
                cleared = false;
            }
        }
        warn!(storage_cleared = cleared, "session invalidated by server");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SESSION_EXPIRED_NOTICE;
    use crate::config::parse_base_url;
    use crate::hooks::{FnNotifier, InMemoryNavigator, TracingNotifier};
    use std::sync::{Mutex, PoisonError};
    use tollgate_session::{MemoryStore, StorageError, StorageResult};

    fn gateway_at(base: &str, path: &str) -> (RequestGateway, Arc<dyn KeyValueStore>) {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let context = SessionContext::new(Arc::clone(&storage));
        let config = GatewayConfig::new(parse_base_url(base).expect("valid url"));
        let gateway = RequestGateway::new(
            config,
            &context,
            Arc::new(TracingNotifier),
            Arc::new(InMemoryNavigator::new(path)),
        )
        .expect("gateway builds");
        (gateway, storage)
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let (gateway, _) = gateway_at("http://127.0.0.1:8080/app/", "/");
        assert_eq!(gateway.endpoint("/api/me"), "http://127.0.0.1:8080/app/api/me");
        assert_eq!(gateway.endpoint("api/me"), "http://127.0.0.1:8080/app/api/me");
        let (gateway, _) = gateway_at("http://127.0.0.1:8080", "/");
        assert_eq!(gateway.endpoint("/api/login"), "http://127.0.0.1:8080/api/login");
    }

    #[test]
    fn apply_invalidation_clears_storage_and_navigates() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(TOKEN_KEY, "tok").expect("set token");
        storage.set(USER_KEY, "{}").expect("set user");
        let context = SessionContext::new(Arc::clone(&storage));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let navigator = Arc::new(InMemoryNavigator::new("/reports"));
        let gateway = RequestGateway::new(
            GatewayConfig::new(parse_base_url("http://127.0.0.1:8080/").expect("valid url")),
            &context,
            Arc::new(FnNotifier::new(move |message: &str| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(message.to_string());
            })),
            navigator.clone(),
        )
        .expect("gateway builds");
        let mut events = gateway.subscribe_invalidations();

        let classification = classify(
            FailureSignal::Status {
                status: 401,
                body: b"",
            },
            "/reports",
            "/",
        );
        gateway.apply(&classification);

        assert_eq!(storage.get(TOKEN_KEY).expect("read"), None);
        assert_eq!(storage.get(USER_KEY).expect("read"), None);
        assert_eq!(navigator.current_path(), "/");
        assert_eq!(
            events.try_recv().expect("event queued"),
            SessionInvalidated {
                redirect_to: Some("/".to_string()),
                storage_cleared: true,
            }
        );
        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(seen, vec![SESSION_EXPIRED_NOTICE]);
    }

    struct LockedStore;

    impl KeyValueStore for LockedStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(Some("tok".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable {
                operation: "remove",
                detail: "storage locked".to_string(),
            })
        }
    }

    #[test]
    fn failed_clear_is_recorded_on_event() {
        let context = SessionContext::new(Arc::new(LockedStore));
        let gateway = RequestGateway::new(
            GatewayConfig::new(parse_base_url("http://127.0.0.1:8080/").expect("valid url")),
            &context,
            Arc::new(TracingNotifier),
            Arc::new(InMemoryNavigator::new("/reports")),
        )
        .expect("gateway builds");
        let mut events = gateway.subscribe_invalidations();

        gateway.apply(&classify(
            FailureSignal::Status {
                status: 401,
                body: b"",
            },
            "/reports",
            "/",
        ));

        let event = events.try_recv().expect("event queued");
        assert!(!event.storage_cleared);
        assert_eq!(event.redirect_to.as_deref(), Some("/"));
    }

    #[test]
    fn apply_without_invalidation_leaves_storage() {
        let (gateway, storage) = gateway_at("http://127.0.0.1:8080/", "/reports");
        storage.set(TOKEN_KEY, "tok").expect("set token");
        gateway.apply(&classify(
            FailureSignal::Status {
                status: 500,
                body: b"",
            },
            "/reports",
            "/",
        ));
        assert_eq!(storage.get(TOKEN_KEY).expect("read").as_deref(), Some("tok"));
    }
}
