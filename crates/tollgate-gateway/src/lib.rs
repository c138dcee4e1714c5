#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Request gateway for the Tollgate auth layer.
//!
//! Layout: `classify.rs` (pure failure taxonomy and notices), `config.rs`
//! (gateway settings and env loading), `hooks.rs` (notify/navigate
//! capabilities), `gateway.rs` (`RequestGateway` pipeline), `error.rs`
//! (error types), `web.rs` (browser bindings, wasm32 only).

pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hooks;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use classify::{
    CONFIGURATION_ERROR_NOTICE, Classification, FailureKind, FailureSignal, NETWORK_ERROR_NOTICE,
    NOT_FOUND_NOTICE, PERMISSION_DENIED_NOTICE, REQUEST_FAILED_NOTICE, SERVER_ERROR_NOTICE,
    SESSION_EXPIRED_NOTICE, SessionInvalidated, classify, error_message,
};
pub use config::{ConfigError, GatewayConfig, parse_base_url};
pub use error::{GatewayError, GatewayResult, RequestFailure};
pub use gateway::RequestGateway;
pub use hooks::{FnNotifier, InMemoryNavigator, Navigator, Notifier, TracingNotifier};
#[cfg(target_arch = "wasm32")]
pub use web::{DialogNotifier, WindowNavigator};
