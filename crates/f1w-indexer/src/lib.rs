//! Newznab-compatible indexer client (C4, §4.3). Dispatches the query set
//! `f1w_core::query` builds, tolerant of both RSS/XML and JSON Newznab
//! response shapes, with per-indexer concurrency caps, retry/backoff and a
//! circuit breaker per indexer id.

pub use f1w_core::error::IndexerError;

pub mod client;
pub mod parse;

pub use client::{IndexerClient, NewznabClient, SearchOutcome};
pub use parse::NewznabItem;
