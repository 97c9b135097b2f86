#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and traits for XBRL annual financials.
//!
//! This crate provides the foundational abstractions shared by the pipeline and its
//! collaborators:
//!
//! - [`CompanyFacts`](facts::CompanyFacts) - Raw SEC company-facts document
//! - [`RawObservation`](types::RawObservation) - One flattened fact
//! - [`MetricDefinition`](metric::MetricDefinition) - Metric to concept alias table
//! - [`AnnualTable`](types::AnnualTable) - Resolved annual values and concept map
//! - [`FactsProvider`](provider::FactsProvider) - Source of raw facts
//! - [`FinancialsStore`](store::FinancialsStore) - Persistence abstraction

/// Error types for finstat operations.
pub mod error;
/// Raw SEC company-facts schema.
pub mod facts;
/// Canonical metrics and concept aliases.
pub mod metric;
/// Fiscal period and form type definitions.
pub mod period;
/// Provider trait for fetching raw facts.
pub mod provider;
/// Store trait for persisting exports.
pub mod store;
/// Core data types.
pub mod types;

// Re-export commonly used items at crate root
pub use error::{FinError, Result};
pub use facts::{CompanyFacts, ConceptFacts, FactRecord};
pub use metric::{DEFAULT_METRICS, Metric, MetricDefinition};
pub use period::{FiscalPeriod, FormType};
pub use provider::FactsProvider;
pub use store::FinancialsStore;
pub use types::{
    AnnualRow, AnnualTable, CompanyMeta, CompanyProfile, ConceptMap, DisplayRow, LongRow,
    RawObservation, RunRecord, RunStatus, Ticker,
};
