//! Export orchestration: fetch, reconcile, persist, log.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use finstat_core::{
    CompanyMeta, CompanyProfile, ConceptMap, DisplayRow, FactsProvider, FinError,
    FinancialsStore, Result, RunStatus, Ticker,
};
use finstat_xbrl::{FinancialsConfig, Pipeline, to_long_rows};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::report::{ReportFiles, ReportInput, ReportOptions, render_markdown, write_report};

/// Export settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Number of most recent fiscal years written per company.
    pub years: usize,
    /// Maximum tickers exported at once by [`Exporter::export_many`].
    pub concurrency: usize,
    /// Pipeline settings.
    pub financials: FinancialsConfig,
    /// Report sections.
    pub report: ReportOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            years: 5,
            concurrency: 4,
            financials: FinancialsConfig::default(),
            report: ReportOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Sets the number of fiscal years kept.
    #[must_use]
    pub const fn with_years(mut self, years: usize) -> Self {
        self.years = years;
        self
    }

    /// Sets the number of concurrent exports.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the pipeline configuration.
    #[must_use]
    pub fn with_financials(mut self, financials: FinancialsConfig) -> Self {
        self.financials = financials;
        self
    }

    /// Sets the report options.
    #[must_use]
    pub const fn with_report(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] if `years` or `concurrency` is zero, or if
    /// the pipeline configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.years == 0 {
            return Err(FinError::InvalidParameter(
                "years must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(FinError::InvalidParameter(
                "concurrency must be positive".to_string(),
            ));
        }
        self.financials.validate()
    }
}

/// Outcome of one successful ticker export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSummary {
    /// Run log identifier.
    pub run_id: String,
    /// Company identity.
    pub profile: CompanyProfile,
    /// Exported display rows, ascending by fiscal year.
    pub display: Vec<DisplayRow>,
    /// Concept chosen per metric.
    pub concept_map: ConceptMap,
    /// Number of long rows written.
    pub rows_written: usize,
}

/// Runs the pipeline for tickers and persists the results.
pub struct Exporter {
    provider: Arc<dyn FactsProvider>,
    store: Arc<dyn FinancialsStore>,
    pipeline: Pipeline,
    config: ExportConfig,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("provider", &self.provider.name())
            .field("store", &"configured")
            .field("config", &self.config)
            .finish()
    }
}

impl Exporter {
    /// Creates an exporter.
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] if the configuration is invalid.
    pub fn new(
        provider: Arc<dyn FactsProvider>,
        store: Arc<dyn FinancialsStore>,
        config: ExportConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pipeline = Pipeline::new(config.financials.clone())?;
        Ok(Self {
            provider,
            store,
            pipeline,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Exports one ticker.
    ///
    /// The run is logged as `OK` on success and as `ERROR` with the error text on failure;
    /// the error is returned in the latter case.
    ///
    /// # Errors
    /// [`FinError::InvalidParameter`] for a blank ticker (no run is logged), otherwise any
    /// provider, pipeline or store error.
    #[instrument(skip(self))]
    pub async fn export_ticker(&self, ticker: &str) -> Result<ExportSummary> {
        let ticker = Ticker::new(ticker);
        if ticker.is_empty() {
            return Err(FinError::InvalidParameter("Empty ticker".to_string()));
        }

        let run = self.store.start_run(&ticker).await?;
        match self.export_inner(&ticker, &run.run_id).await {
            Ok(summary) => {
                let message = format!("exported last {} FY", self.config.years);
                self.store
                    .finish_run(&run.run_id, RunStatus::Ok, Some(&message))
                    .await?;
                info!(ticker = %ticker, rows = summary.rows_written, "Export complete");
                Ok(summary)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(log_err) = self
                    .store
                    .finish_run(&run.run_id, RunStatus::Error, Some(&message))
                    .await
                {
                    warn!(error = %log_err, "Failed to close run log entry");
                }
                warn!(ticker = %ticker, error = %e, "Export failed");
                Err(e)
            }
        }
    }

    async fn export_inner(&self, ticker: &Ticker, run_id: &str) -> Result<ExportSummary> {
        let profile = self.provider.company_profile(ticker).await?;
        let facts = self.provider.company_facts(ticker).await?;

        let output = self.pipeline.run(&facts)?;
        let (_, concept_map) = output.table.into_parts();

        let mut display = output.display;
        display.sort_by_key(|r| r.fy);
        let display = display.split_off(display.len().saturating_sub(self.config.years));

        let updated_at = Utc::now();
        let long = to_long_rows(
            ticker,
            &display,
            &self.config.financials.currency,
            updated_at,
        );
        self.store.upsert_annual_long(&long).await?;

        let latest = display.last();
        let meta = CompanyMeta {
            ticker: ticker.clone(),
            cik: profile.cik.clone(),
            company_name: profile.name.clone(),
            latest_fy: latest.map(|r| r.fy),
            latest_fy_end: latest.and_then(|r| r.fiscal_year_end),
            concept_map_json: concept_map.to_json()?,
            updated_at,
        };
        self.store.upsert_company_meta(&meta).await?;

        let years = display.len();
        debug!(years, rows = long.len(), "Persisted export");
        Ok(ExportSummary {
            run_id: run_id.to_string(),
            profile,
            display,
            concept_map,
            rows_written: long.len(),
        })
    }

    /// Exports several tickers concurrently.
    ///
    /// One failure does not stop the others. Results come back in input order.
    pub async fn export_many<S: AsRef<str>>(
        &self,
        tickers: &[S],
    ) -> Vec<(String, Result<ExportSummary>)> {
        stream::iter(tickers)
            .map(|t| async move {
                let t = t.as_ref();
                (t.to_string(), self.export_ticker(t).await)
            })
            .buffered(self.config.concurrency)
            .collect()
            .await
    }

    /// Renders the Markdown report for an export, without charts.
    #[must_use]
    pub fn render_report(&self, summary: &ExportSummary) -> String {
        render_markdown(&self.report_input(summary))
    }

    /// Writes `<out_dir>/<TICKER>.md` and its charts for an export.
    ///
    /// # Errors
    /// Returns [`FinError::Storage`] if the report or a chart cannot be written.
    pub fn write_report(
        &self,
        summary: &ExportSummary,
        out_dir: impl AsRef<Path>,
    ) -> Result<ReportFiles> {
        write_report(out_dir.as_ref(), &self.report_input(summary))
    }

    fn report_input<'a>(&'a self, summary: &'a ExportSummary) -> ReportInput<'a> {
        ReportInput {
            profile: &summary.profile,
            display: &summary.display,
            concept_map: &summary.concept_map,
            currency: &self.config.financials.currency,
            charts: &[],
            years: self.config.years,
            generated_at: Utc::now(),
            options: self.config.report,
        }
    }
}

/// Splits comma or whitespace separated ticker lists, uppercasing and dropping blanks.
///
/// `["AAPL,msft", "NVDA"]` becomes `["AAPL", "MSFT", "NVDA"]`.
#[must_use]
pub fn parse_tickers<S: AsRef<str>>(args: &[S]) -> Vec<Ticker> {
    args.iter()
        .flat_map(|arg| {
            arg.as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(Ticker::new)
                .collect::<Vec<_>>()
        })
        .filter(|t| !t.is_empty())
        .collect()
}
