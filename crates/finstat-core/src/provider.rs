//! Provider trait for fetching raw company facts.
//!
//! [`FactsProvider`] is the seam between the pipeline and the regulatory API client.
//! The EDGAR client in `finstat-edgar` implements it; tests use fixed in-memory fakes.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    facts::CompanyFacts,
    types::{CompanyProfile, Ticker},
};

/// Source of raw XBRL company facts.
#[async_trait]
pub trait FactsProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Resolves a ticker to the company's identity (CIK and registrant name).
    async fn company_profile(&self, ticker: &Ticker) -> Result<CompanyProfile>;

    /// Fetches the full company facts disclosure for a ticker.
    async fn company_facts(&self, ticker: &Ticker) -> Result<CompanyFacts>;
}
