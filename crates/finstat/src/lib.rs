#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Annual financial statements from SEC XBRL company facts.
//!
//! This crate re-exports the core types and pipeline stages and provides the
//! [`Exporter`], which runs the pipeline for tickers and persists the results,
//! plus a Markdown [`report`] with [`charts`].

// Core types and traits
pub use finstat_core::*;

// Pipeline
pub use finstat_xbrl::{
    AnnualTableBuilder, ConceptPolicy, FinancialsConfig, Normalized, Pipeline, PipelineOutput,
    annual_frame, build_annual_table, display_frame, format_for_display, infer_unit, long_frame,
    normalize, to_long_rows,
};

// Stores
pub use finstat_store::InMemoryStore;
#[cfg(feature = "store-sqlite")]
pub use finstat_store::SqliteStore;

// Providers
#[cfg(feature = "edgar")]
pub use finstat_edgar::EdgarClient;

mod exporter;
pub use exporter::{ExportConfig, ExportSummary, Exporter, parse_tickers};

/// SVG charts of the display table.
pub mod charts;
pub use charts::{ChartFile, save_financial_charts};

/// Markdown report rendering.
pub mod report;
pub use report::{
    ReportFiles, ReportInput, ReportOptions, fmt_num, fmt_pct, render_markdown, write_report,
};
