//! Merchant catalog status monitor.
//!
//! Polls an upstream product-catalog status API on a schedule, compares the
//! current counts against the previous snapshot, and emails an alert when
//! configured thresholds are exceeded.
//!
//! # Architecture
//!
//! - [`client::StatusClient`] fetches and parses the upstream report, with
//!   bounded retry/backoff and a single credential refresh on auth failures.
//! - [`store::SnapshotStore`] is the append-only history of check snapshots.
//! - [`notify::AlertChannel`] delivers threshold alerts (email by default).
//! - [`engine::CheckEngine`] orchestrates one check cycle and derives
//!   status/trend summaries from stored history.
//! - [`scheduler::Scheduler`] triggers the engine on a fixed interval.
//! - [`server`] exposes the thin HTTP surface around the engine.
//!
//! All collaborators are constructed once at startup and injected into the
//! engine; there are no global singletons.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod server;
pub mod store;

pub use config::Config;
pub use engine::CheckEngine;
pub use error::{ChannelError, EngineError, FetchError, StoreError};
