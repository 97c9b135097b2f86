#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Persistence backends for exported annual financials.
//!
//! This crate provides implementations of the [`FinancialsStore`] trait from `finstat-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite store (default, requires `sqlite` feature)
//! - [`InMemoryStore`] - In-memory store for testing

/// In-memory store implementation.
pub mod memory;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use finstat_core::FinancialsStore;

pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use finstat_core::Ticker;

/// Base run identifier: ticker plus UTC start time (`AAPL_20240101T120000Z`).
pub(crate) fn run_id_base(ticker: &Ticker, started_at: DateTime<Utc>) -> String {
    format!("{}_{}", ticker, started_at.format("%Y%m%dT%H%M%SZ"))
}

/// Returns `base`, or `base_2`, `base_3`... for the first one `taken` rejects.
pub(crate) fn unique_run_id(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|id| !taken(id))
        .unwrap_or_else(|| base.to_string())
}
