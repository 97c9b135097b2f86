//! Core data types for normalized and annualized financials.
//!
//! - [`Ticker`] - Exchange ticker
//! - [`RawObservation`] - One flattened XBRL fact
//! - [`AnnualRow`] / [`AnnualTable`] - Resolved values per fiscal year
//! - [`ConceptMap`] - Concept selected for each metric
//! - [`DisplayRow`] - Annual row with derived ratios, levels in billions
//! - [`LongRow`] - Long-format persistence row
//! - [`CompanyProfile`], [`CompanyMeta`], [`RunRecord`] - Collaborator records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{FinError, Result};
use crate::metric::Metric;
use crate::period::FiscalPeriod;

/// An exchange ticker.
///
/// Tickers are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker, trimming whitespace and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ticker is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One disclosed fact, flattened out of the nested facts document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Taxonomy (`us-gaap`, `dei`, `ifrs-full`).
    pub taxonomy: String,
    /// Taxonomy-qualified concept (`us-gaap:Revenues`).
    pub concept: String,
    /// Unit of measure (`USD`, `shares`).
    pub unit: String,
    /// Fiscal year of the reporting filing.
    pub fiscal_year: Option<i32>,
    /// Fiscal period marker of the reporting filing.
    pub fiscal_period: Option<FiscalPeriod>,
    /// Start of the period; `None` for instant facts.
    pub period_start: Option<NaiveDate>,
    /// End of the period, or the instant.
    pub period_end: Option<NaiveDate>,
    /// Date the filing was accepted.
    pub filed: Option<NaiveDate>,
    /// Accession number of the filing.
    pub accession: Option<String>,
    /// Form type of the filing.
    pub form: Option<String>,
    /// Calendar frame assigned by the SEC.
    pub frame: Option<String>,
    /// Reported value; always finite.
    pub value: f64,
}

impl RawObservation {
    /// Creates an observation with the identifying fields; everything else is unset.
    #[must_use]
    pub fn new(concept: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        let concept = concept.into();
        let taxonomy = concept
            .split_once(':')
            .map(|(taxonomy, _)| taxonomy.to_string())
            .unwrap_or_default();
        Self {
            taxonomy,
            concept,
            unit: unit.into(),
            fiscal_year: None,
            fiscal_period: None,
            period_start: None,
            period_end: None,
            filed: None,
            accession: None,
            form: None,
            frame: None,
            value,
        }
    }

    /// Sets the fiscal year and period marker.
    #[must_use]
    pub fn with_fiscal(mut self, fiscal_year: i32, fiscal_period: FiscalPeriod) -> Self {
        self.fiscal_year = Some(fiscal_year);
        self.fiscal_period = Some(fiscal_period);
        self
    }

    /// Sets the period bounds; pass `None` as start for instant facts.
    #[must_use]
    pub fn with_period(mut self, start: Option<NaiveDate>, end: NaiveDate) -> Self {
        self.period_start = start;
        self.period_end = Some(end);
        self
    }

    /// Sets the filing metadata.
    #[must_use]
    pub fn with_filing(
        mut self,
        form: impl Into<String>,
        accession: impl Into<String>,
        filed: NaiveDate,
    ) -> Self {
        self.form = Some(form.into());
        self.accession = Some(accession.into());
        self.filed = Some(filed);
        self
    }

    /// Returns true if this is an instant fact (balance sheet items).
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.period_start.is_none()
    }

    /// Returns the duration in days if this is a duration fact.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => Some(end.signed_duration_since(start).num_days()),
            _ => None,
        }
    }
}

/// Resolved values for one fiscal year.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualRow {
    /// Fiscal year.
    pub fy: i32,
    /// End date of the fiscal year.
    pub fiscal_year_end: Option<NaiveDate>,
    /// Total revenue.
    pub revenue: Option<f64>,
    /// Gross profit.
    pub gross_profit: Option<f64>,
    /// Operating income.
    pub operating_income: Option<f64>,
    /// Net income.
    pub net_income: Option<f64>,
    /// Cash flow from operations.
    pub cfo: Option<f64>,
    /// Capital expenditures.
    pub capex: Option<f64>,
    /// Cash and cash equivalents.
    pub cash: Option<f64>,
    /// Stockholders' equity.
    pub equity: Option<f64>,
}

impl AnnualRow {
    /// Creates an all-null row for a fiscal year.
    #[must_use]
    pub fn new(fy: i32) -> Self {
        Self {
            fy,
            ..Default::default()
        }
    }

    /// Returns the value of a metric.
    #[must_use]
    pub const fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::GrossProfit => self.gross_profit,
            Metric::OperatingIncome => self.operating_income,
            Metric::NetIncome => self.net_income,
            Metric::Cfo => self.cfo,
            Metric::Capex => self.capex,
            Metric::Cash => self.cash,
            Metric::Equity => self.equity,
        }
    }

    /// Sets the value of a metric.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Revenue => &mut self.revenue,
            Metric::GrossProfit => &mut self.gross_profit,
            Metric::OperatingIncome => &mut self.operating_income,
            Metric::NetIncome => &mut self.net_income,
            Metric::Cfo => &mut self.cfo,
            Metric::Capex => &mut self.capex,
            Metric::Cash => &mut self.cash,
            Metric::Equity => &mut self.equity,
        };
        *slot = value;
    }

    /// Returns true if no metric was resolved for this year.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Concept selected for each resolved metric during one run.
///
/// Only metrics that were actually resolved appear; there are no placeholder entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMap(BTreeMap<Metric, String>);

impl ConceptMap {
    /// Creates an empty concept map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records the concept selected for a metric.
    pub fn insert(&mut self, metric: Metric, concept: impl Into<String>) {
        self.0.insert(metric, concept.into());
    }

    /// Returns the concept selected for a metric.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<&str> {
        self.0.get(&metric).map(String::as_str)
    }

    /// Returns the number of resolved metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no metric was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(metric, concept)` pairs in metric order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &str)> {
        self.0.iter().map(|(m, c)| (*m, c.as_str()))
    }

    /// Serializes the map as a JSON object keyed by metric name.
    ///
    /// # Errors
    /// Returns [`FinError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|e| FinError::Parse(e.to_string()))
    }
}

/// Annual rows in ascending fiscal-year order plus the concept map of the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualTable {
    rows: Vec<AnnualRow>,
    concept_map: ConceptMap,
}

impl AnnualTable {
    /// Creates a table, sorting rows by fiscal year.
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] if a fiscal year appears twice.
    pub fn new(mut rows: Vec<AnnualRow>, concept_map: ConceptMap) -> Result<Self> {
        rows.sort_by_key(|r| r.fy);
        if let Some(pair) = rows.windows(2).find(|w| w[0].fy == w[1].fy) {
            return Err(FinError::InvalidParameter(format!(
                "duplicate fiscal year {}",
                pair[0].fy
            )));
        }
        Ok(Self { rows, concept_map })
    }

    /// Rows in ascending fiscal-year order.
    #[must_use]
    pub fn rows(&self) -> &[AnnualRow] {
        &self.rows
    }

    /// Concept selected per metric.
    #[must_use]
    pub const fn concept_map(&self) -> &ConceptMap {
        &self.concept_map
    }

    /// Returns the row for a fiscal year.
    #[must_use]
    pub fn row(&self, fy: i32) -> Option<&AnnualRow> {
        self.rows
            .binary_search_by_key(&fy, |r| r.fy)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Number of fiscal years.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no fiscal year was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps the `n` highest fiscal years, still in ascending order.
    #[must_use]
    pub fn last_n_years(&self, n: usize) -> Self {
        let skip = self.rows.len().saturating_sub(n);
        Self {
            rows: self.rows[skip..].to_vec(),
            concept_map: self.concept_map.clone(),
        }
    }

    /// Consumes the table and returns its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<AnnualRow>, ConceptMap) {
        (self.rows, self.concept_map)
    }
}

/// Annual row with derived ratios; level metrics are expressed in billions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    /// Fiscal year.
    pub fy: i32,
    /// End date of the fiscal year.
    pub fiscal_year_end: Option<NaiveDate>,

    // Levels, billions
    /// Total revenue.
    pub revenue: Option<f64>,
    /// Gross profit.
    pub gross_profit: Option<f64>,
    /// Operating income.
    pub operating_income: Option<f64>,
    /// Net income.
    pub net_income: Option<f64>,
    /// Cash flow from operations.
    pub cfo: Option<f64>,
    /// Capital expenditures.
    pub capex: Option<f64>,
    /// Free cash flow (`cfo - capex`).
    pub fcf: Option<f64>,
    /// Cash and cash equivalents.
    pub cash: Option<f64>,
    /// Stockholders' equity.
    pub equity: Option<f64>,

    // Ratios, decimals
    /// Revenue growth against the immediately preceding fiscal year.
    pub revenue_yoy: Option<f64>,
    /// Gross profit over revenue.
    pub gross_margin: Option<f64>,
    /// Operating income over revenue.
    pub operating_margin: Option<f64>,
    /// Net income over revenue.
    pub net_margin: Option<f64>,
    /// Free cash flow over revenue.
    pub fcf_margin: Option<f64>,
    /// Net income over equity.
    pub roe: Option<f64>,
}

impl DisplayRow {
    /// Level columns in display order.
    pub const LEVEL_COLUMNS: [&'static str; 9] = [
        "revenue",
        "gross_profit",
        "operating_income",
        "net_income",
        "cfo",
        "capex",
        "fcf",
        "cash",
        "equity",
    ];

    /// Ratio columns in display order.
    pub const RATIO_COLUMNS: [&'static str; 6] = [
        "revenue_yoy",
        "gross_margin",
        "operating_margin",
        "net_margin",
        "fcf_margin",
        "roe",
    ];

    /// All value columns (levels then ratios) paired with their values.
    #[must_use]
    pub fn columns(&self) -> [(&'static str, Option<f64>); 15] {
        [
            ("revenue", self.revenue),
            ("gross_profit", self.gross_profit),
            ("operating_income", self.operating_income),
            ("net_income", self.net_income),
            ("cfo", self.cfo),
            ("capex", self.capex),
            ("fcf", self.fcf),
            ("cash", self.cash),
            ("equity", self.equity),
            ("revenue_yoy", self.revenue_yoy),
            ("gross_margin", self.gross_margin),
            ("operating_margin", self.operating_margin),
            ("net_margin", self.net_margin),
            ("fcf_margin", self.fcf_margin),
            ("roe", self.roe),
        ]
    }

    /// Returns a column value by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<f64> {
        self.columns()
            .into_iter()
            .find(|(col, _)| *col == name)
            .and_then(|(_, v)| v)
    }
}

/// Long-format row: one value of one metric for one fiscal year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    /// Company ticker.
    pub ticker: Ticker,
    /// Fiscal year.
    pub fy: i32,
    /// End date of the fiscal year.
    pub fiscal_year_end: Option<NaiveDate>,
    /// Column name (`revenue`, `net_margin`).
    pub metric: String,
    /// Value, `None` when unresolved.
    pub value: Option<f64>,
    /// `ratio` or the display currency unit (`usd_billions`).
    pub unit: String,
    /// Time the row was produced.
    pub updated_at: DateTime<Utc>,
}

/// Identity of a company on the regulatory API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Ticker.
    pub ticker: Ticker,
    /// SEC CIK, zero-padded to 10 digits.
    pub cik: String,
    /// Registrant name.
    pub name: String,
}

/// Per-company metadata stored after an export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyMeta {
    /// Ticker.
    pub ticker: Ticker,
    /// SEC CIK.
    pub cik: String,
    /// Registrant name.
    pub company_name: String,
    /// Most recent exported fiscal year.
    pub latest_fy: Option<i32>,
    /// End date of the most recent exported fiscal year.
    pub latest_fy_end: Option<NaiveDate>,
    /// Concept map of the run, as JSON.
    pub concept_map_json: String,
    /// Time of the export.
    pub updated_at: DateTime<Utc>,
}

/// Status of an export run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run started and has not finished.
    Running,
    /// Run completed.
    Ok,
    /// Run failed.
    Error,
}

impl RunStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

impl FromStr for RunStatus {
    type Err = FinError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "OK" => Ok(Self::Ok),
            "ERROR" => Ok(Self::Error),
            _ => Err(FinError::Parse(format!("Invalid run status: {}", s))),
        }
    }
}

/// One entry of the run log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier (`AAPL_20240101T120000Z`).
    pub run_id: String,
    /// Ticker being exported.
    pub ticker: Ticker,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Finish time; equals `started_at` while running.
    pub finished_at: DateTime<Utc>,
    /// Current status.
    pub status: RunStatus,
    /// Outcome message.
    pub message: Option<String>,
}
