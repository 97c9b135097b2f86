#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```no_run
//! use finstat_core::CompanyFacts;
//! use finstat_xbrl::{FinancialsConfig, Pipeline};
//!
//! # fn main() -> finstat_core::Result<()> {
//! let facts = CompanyFacts::from_json(&std::fs::read_to_string("CIK0000320193.json").unwrap())?;
//! let pipeline = Pipeline::new(FinancialsConfig::default().with_last_n_years(Some(5)))?;
//! let output = pipeline.run(&facts)?;
//! for row in &output.display {
//!     println!("{} revenue={:?}bn net_margin={:?}", row.fy, row.revenue, row.net_margin);
//! }
//! # Ok(())
//! # }
//! ```

/// Annual table builder.
pub mod annual;
/// Ratio derivation and display scaling.
pub mod display;
/// Polars frame conversion.
pub mod frame;
/// Long-format rows.
pub mod long;
/// Fact normalizer.
pub mod normalize;
/// End-to-end pipeline.
pub mod pipeline;

pub use annual::{
    AnnualTableBuilder, COVER_PAGE_TAXONOMY, ConceptPolicy, MAX_ANNUAL_DAYS, MIN_ANNUAL_DAYS,
    is_full_year, latest_restatement, restatement_order,
};
pub use display::{BILLION, format_for_display};
pub use frame::{annual_frame, display_frame, long_frame};
pub use long::{RATIO_UNIT, infer_unit, to_long_rows};
pub use normalize::{Normalized, normalize};
pub use pipeline::{FinancialsConfig, Pipeline, PipelineOutput};

/// Builds an annual table with the given definitions and configuration.
///
/// # Errors
/// Returns an error only if the table cannot be assembled.
pub fn build_annual_table(
    observations: &[finstat_core::RawObservation],
    definitions: &[finstat_core::MetricDefinition],
    config: &FinancialsConfig,
) -> finstat_core::Result<finstat_core::AnnualTable> {
    AnnualTableBuilder::new(definitions)
        .with_currency(config.currency.clone())
        .with_last_n_years(config.last_n_years)
        .with_policy(config.policy)
        .build(observations)
}
