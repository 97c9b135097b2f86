//! Store trait for persisting exported financials.
//!
//! This module defines the [`FinancialsStore`] trait that provides a unified interface
//! for the long-format annual table, per-company metadata, and the run log.

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{CompanyMeta, LongRow, RunRecord, RunStatus, Ticker},
};

/// Trait for persisting exported annual financials.
///
/// Implementations can store data in various backends (SQLite, in-memory).
#[async_trait]
pub trait FinancialsStore: Send + Sync {
    /// Inserts rows, replacing `fiscal_year_end`, `value`, `unit` and `updated_at`
    /// of any existing row with the same `(ticker, fy, metric)`.
    async fn upsert_annual_long(&self, rows: &[LongRow]) -> Result<()>;

    /// Returns all long rows for a ticker, ordered by fiscal year then metric.
    async fn annual_long(&self, ticker: &Ticker) -> Result<Vec<LongRow>>;

    /// Inserts or replaces the metadata for a company.
    async fn upsert_company_meta(&self, meta: &CompanyMeta) -> Result<()>;

    /// Returns the stored metadata for a company, if any.
    async fn company_meta(&self, ticker: &Ticker) -> Result<Option<CompanyMeta>>;

    /// Opens a run log entry in the `RUNNING` state.
    async fn start_run(&self, ticker: &Ticker) -> Result<RunRecord>;

    /// Closes a run log entry with a final status and message.
    async fn finish_run(&self, run_id: &str, status: RunStatus, message: Option<&str>)
    -> Result<()>;

    /// Returns the run log for a ticker, oldest first.
    async fn runs(&self, ticker: &Ticker) -> Result<Vec<RunRecord>>;
}
