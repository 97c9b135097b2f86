//! Normalize, build and format in one call.

use finstat_core::{
    AnnualTable, CompanyFacts, DEFAULT_METRICS, DisplayRow, FinError, MetricDefinition, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::annual::ConceptPolicy;
use crate::build_annual_table;
use crate::display::format_for_display;
use crate::normalize::normalize;

/// Configuration of the annual financials pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialsConfig {
    /// Only the most recent `n` fiscal years are considered; `None` keeps all.
    pub last_n_years: Option<usize>,
    /// Reporting currency unit (`USD`).
    pub currency: String,
    /// Concept selection policy.
    pub policy: ConceptPolicy,
}

impl Default for FinancialsConfig {
    fn default() -> Self {
        Self {
            last_n_years: None,
            currency: "USD".to_string(),
            policy: ConceptPolicy::LockPerRun,
        }
    }
}

impl FinancialsConfig {
    /// Sets the lookback window.
    #[must_use]
    pub const fn with_last_n_years(mut self, n: Option<usize>) -> Self {
        self.last_n_years = n;
        self
    }

    /// Sets the reporting currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Sets the concept selection policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ConceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] for a zero-year window or an empty currency.
    pub fn validate(&self) -> Result<()> {
        if self.last_n_years == Some(0) {
            return Err(FinError::InvalidParameter(
                "last_n_years must be positive".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(FinError::InvalidParameter(
                "currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineOutput {
    /// Number of normalized observations.
    pub observations: usize,
    /// Records skipped for a missing or non-numeric value.
    pub dropped_missing_value: usize,
    /// Records skipped for an unusable period.
    pub dropped_malformed: usize,
    /// Resolved annual values and concept map.
    pub table: AnnualTable,
    /// Display rows with derived ratios.
    pub display: Vec<DisplayRow>,
}

/// Facts document to display rows.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: FinancialsConfig,
    definitions: Vec<MetricDefinition>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: FinancialsConfig::default(),
            definitions: DEFAULT_METRICS.to_vec(),
        }
    }
}

impl Pipeline {
    /// Creates a pipeline with the default metric table.
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] if the configuration is invalid.
    pub fn new(config: FinancialsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// Replaces the metric table.
    #[must_use]
    pub fn with_definitions(mut self, definitions: Vec<MetricDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FinancialsConfig {
        &self.config
    }

    /// Runs all three stages over a facts document.
    ///
    /// # Errors
    /// Only fails if the annual table cannot be assembled; data gaps produce nulls.
    #[instrument(skip(self, facts), fields(entity = facts.entity_name.as_deref().unwrap_or("")))]
    pub fn run(&self, facts: &CompanyFacts) -> Result<PipelineOutput> {
        let normalized = normalize(facts);

        let table = build_annual_table(&normalized.observations, &self.definitions, &self.config)?;
        let display = format_for_display(table.rows());

        debug!(
            years = table.len(),
            resolved_metrics = table.concept_map().len(),
            "Pipeline complete"
        );

        Ok(PipelineOutput {
            observations: normalized.observations.len(),
            dropped_missing_value: normalized.dropped_missing_value,
            dropped_malformed: normalized.dropped_malformed,
            table,
            display,
        })
    }
}
