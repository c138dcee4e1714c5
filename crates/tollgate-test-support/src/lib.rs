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

//! Shared test helpers used across integration suites.
//!
//! Layout:
//! - `fixtures.rs`: principals and session contexts.
//! - `mocks.rs`: recording notifier and navigator doubles.

pub mod fixtures;
pub mod mocks;
