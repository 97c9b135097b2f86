//! Annual table builder.
//!
//! Resolves, for every metric and fiscal year, the single observation that represents the
//! authoritative annual value:
//!
//! 1. keep full-year observations from annual report forms in the reporting currency;
//! 2. attribute each observation to a fiscal year (prior-year comparatives inside a 10-K
//!    are shifted onto their own year);
//! 3. pick one concept per metric according to the [`ConceptPolicy`];
//! 4. within a concept and year, the most recently filed observation wins.

use chrono::{Datelike, NaiveDate};
use finstat_core::{
    AnnualRow, AnnualTable, ConceptMap, DEFAULT_METRICS, FormType, Metric, MetricDefinition,
    RawObservation, Result,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Shortest duration, in days, accepted as a full fiscal year (52-week years are 364 days).
pub const MIN_ANNUAL_DAYS: i64 = 350;

/// Longest duration, in days, accepted as a full fiscal year (53-week years are 371 days).
pub const MAX_ANNUAL_DAYS: i64 = 380;

/// Cover-page taxonomy; its facts describe the filing, not a fiscal period.
pub const COVER_PAGE_TAXONOMY: &str = "dei";

/// How the concept used for a metric is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptPolicy {
    /// One concept per metric for the whole run: the first alias, in preference order,
    /// with any qualifying observation in the considered years. Years where that concept
    /// is missing stay null even if another alias was reported.
    #[default]
    LockPerRun,
    /// Re-resolve the alias independently for every fiscal year. The concept map records
    /// the alias used for the most recent resolved year.
    PerYear,
}

/// Builds an [`AnnualTable`] from normalized observations.
#[derive(Clone, Debug)]
pub struct AnnualTableBuilder<'a> {
    definitions: &'a [MetricDefinition],
    currency: String,
    last_n_years: Option<usize>,
    policy: ConceptPolicy,
}

impl Default for AnnualTableBuilder<'static> {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS)
    }
}

impl<'a> AnnualTableBuilder<'a> {
    /// Creates a builder over the given metric definitions, USD, all years, locked concepts.
    #[must_use]
    pub fn new(definitions: &'a [MetricDefinition]) -> Self {
        Self {
            definitions,
            currency: "USD".to_string(),
            last_n_years: None,
            policy: ConceptPolicy::default(),
        }
    }

    /// Sets the reporting currency; observations in other units are ignored.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Restricts the considered fiscal years to the `n` most recent.
    #[must_use]
    pub const fn with_last_n_years(mut self, n: Option<usize>) -> Self {
        self.last_n_years = n;
        self
    }

    /// Sets the concept selection policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ConceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolves the annual table.
    ///
    /// Rows cover every fiscal year from the earliest to the latest reported one, so a
    /// year without any annual filing is an explicit row of nulls. The window keeps the
    /// last `n` fiscal years of that range. Observations that are not annual, not in the
    /// currency, or outside the window are ignored; this never fails on data gaps.
    ///
    /// # Errors
    /// Propagates [`AnnualTable::new`] failures, which cannot occur for rows keyed by year.
    pub fn build(&self, observations: &[RawObservation]) -> Result<AnnualTable> {
        let annual: Vec<&RawObservation> =
            observations.iter().filter(|o| is_full_year(o)).collect();
        let attributed = attribute_fiscal_years(&annual);

        let years = fiscal_year_range(&attributed, self.last_n_years);

        // concept -> fiscal year -> competing observations
        let mut index: BTreeMap<&str, BTreeMap<i32, Vec<&RawObservation>>> = BTreeMap::new();
        for (fy, obs) in &attributed {
            if years.contains(fy) && obs.unit.eq_ignore_ascii_case(&self.currency) {
                index
                    .entry(obs.concept.as_str())
                    .or_default()
                    .entry(*fy)
                    .or_default()
                    .push(*obs);
            }
        }

        debug!(
            observations = observations.len(),
            annual = annual.len(),
            years = years.len(),
            concepts = index.len(),
            "Resolving annual table"
        );

        let mut rows: BTreeMap<i32, AnnualRow> =
            years.iter().map(|fy| (*fy, AnnualRow::new(*fy))).collect();
        let mut period_ends: BTreeMap<i32, BTreeMap<Metric, NaiveDate>> = BTreeMap::new();
        let mut concept_map = ConceptMap::new();

        for def in self.definitions {
            let chosen: Vec<(i32, &str)> = match self.policy {
                ConceptPolicy::LockPerRun => lock_concept(def, &index)
                    .map(|alias| years.iter().map(move |fy| (*fy, alias)).collect())
                    .unwrap_or_default(),
                ConceptPolicy::PerYear => years
                    .iter()
                    .filter_map(|fy| per_year_concept(def, &index, *fy).map(|a| (*fy, a)))
                    .collect(),
            };

            for (fy, alias) in chosen {
                let Some(winner) = index
                    .get(alias)
                    .and_then(|by_year| by_year.get(&fy))
                    .and_then(|candidates| latest_restatement(candidates))
                else {
                    continue;
                };

                trace!(metric = %def.metric, fy, concept = alias, value = winner.value, "Resolved");
                concept_map.insert(def.metric, alias);
                if let Some(row) = rows.get_mut(&fy) {
                    row.set(def.metric, Some(winner.value));
                }
                if let Some(end) = winner.period_end {
                    period_ends.entry(fy).or_default().insert(def.metric, end);
                }
            }
        }

        for (fy, row) in &mut rows {
            row.fiscal_year_end = period_ends
                .get(fy)
                .and_then(|ends| fiscal_year_end(self.definitions, ends));
        }

        AnnualTable::new(rows.into_values().collect(), concept_map)
    }
}

/// Orders competing observations of one concept and fiscal year; the greatest wins.
///
/// Later filing date first, then higher accession number. Exact ties fall back to the
/// later period end and then the larger value so the order is total.
#[must_use]
pub fn restatement_order(a: &RawObservation, b: &RawObservation) -> Ordering {
    a.filed
        .cmp(&b.filed)
        .then_with(|| a.accession.cmp(&b.accession))
        .then_with(|| a.period_end.cmp(&b.period_end))
        .then_with(|| a.value.total_cmp(&b.value))
}

/// Returns the most recently reported observation.
#[must_use]
pub fn latest_restatement<'o>(candidates: &[&'o RawObservation]) -> Option<&'o RawObservation> {
    candidates
        .iter()
        .copied()
        .max_by(|a, b| restatement_order(a, b))
}

/// Returns true for full-year observations from annual report forms.
///
/// Duration facts must span roughly twelve months. Instant facts (balance sheet items)
/// qualify when they are not tagged with a sub-annual period marker. Cover-page facts
/// never qualify: their dates are filing dates, not period ends.
#[must_use]
pub fn is_full_year(obs: &RawObservation) -> bool {
    let annual_form = obs
        .form
        .as_deref()
        .is_some_and(|f| FormType::classify(f).is_annual());
    if !annual_form || obs.period_end.is_none() || obs.taxonomy == COVER_PAGE_TAXONOMY {
        return false;
    }

    match obs.duration_days() {
        Some(days) => (MIN_ANNUAL_DAYS..=MAX_ANNUAL_DAYS).contains(&days),
        None => obs
            .fiscal_period
            .as_ref()
            .is_none_or(|fp| fp.is_full_year()),
    }
}

/// Assigns each observation the fiscal year its period belongs to.
///
/// An annual report tags every fact, including prior-year comparatives, with the fiscal
/// year of the report. The latest full-year duration within one `(accession, fiscal year)`
/// ends the report's own year; instants anchor the filing only when it has no durations.
/// Earlier period ends are shifted back by the whole years between them, never forward.
/// Observations without a fiscal year fall back to the calendar year of their period end.
fn attribute_fiscal_years<'o>(annual: &[&'o RawObservation]) -> Vec<(i32, &'o RawObservation)> {
    type Anchors<'k> = BTreeMap<(Option<&'k str>, i32), NaiveDate>;
    let mut duration_anchors: Anchors<'_> = BTreeMap::new();
    let mut instant_anchors: Anchors<'_> = BTreeMap::new();
    for obs in annual {
        if let (Some(fy), Some(end)) = (obs.fiscal_year, obs.period_end) {
            let anchors = if obs.is_instant() {
                &mut instant_anchors
            } else {
                &mut duration_anchors
            };
            anchors
                .entry((obs.accession.as_deref(), fy))
                .and_modify(|anchor| *anchor = (*anchor).max(end))
                .or_insert(end);
        }
    }

    annual
        .iter()
        .filter_map(|obs| {
            let end = obs.period_end?;
            let fy = match obs.fiscal_year {
                Some(fy) => {
                    let key = (obs.accession.as_deref(), fy);
                    let anchor = duration_anchors
                        .get(&key)
                        .or_else(|| instant_anchors.get(&key))
                        .copied()
                        .unwrap_or(end);
                    let days = anchor.signed_duration_since(end).num_days();
                    let shift = (days as f64 / 365.25).round() as i32;
                    fy - shift.max(0)
                }
                None => end.year(),
            };
            Some((fy, *obs))
        })
        .collect()
}

/// Every fiscal year from the earliest to the latest attributed one, cut to the last `n`.
fn fiscal_year_range(
    attributed: &[(i32, &RawObservation)],
    last_n_years: Option<usize>,
) -> BTreeSet<i32> {
    let (Some(first), Some(last)) = (
        attributed.iter().map(|(fy, _)| *fy).min(),
        attributed.iter().map(|(fy, _)| *fy).max(),
    ) else {
        return BTreeSet::new();
    };

    let first = match last_n_years {
        Some(n) => {
            let span = i32::try_from(n).unwrap_or(i32::MAX);
            first.max(last.saturating_sub(span.saturating_sub(1)))
        }
        None => first,
    };
    (first..=last).collect()
}

/// First alias with at least one observation in any considered year.
fn lock_concept<'d>(
    def: &'d MetricDefinition,
    index: &BTreeMap<&str, BTreeMap<i32, Vec<&RawObservation>>>,
) -> Option<&'d str> {
    def.aliases
        .iter()
        .copied()
        .find(|alias| index.get(alias).is_some_and(|by_year| !by_year.is_empty()))
}

/// First alias with an observation in the given year.
fn per_year_concept<'d>(
    def: &'d MetricDefinition,
    index: &BTreeMap<&str, BTreeMap<i32, Vec<&RawObservation>>>,
    fy: i32,
) -> Option<&'d str> {
    def.aliases.iter().copied().find(|alias| {
        index
            .get(alias)
            .and_then(|by_year| by_year.get(&fy))
            .is_some_and(|c| !c.is_empty())
    })
}

/// Period end of the revenue observation, else of the first resolved metric in definition order.
fn fiscal_year_end(
    definitions: &[MetricDefinition],
    ends: &BTreeMap<Metric, NaiveDate>,
) -> Option<NaiveDate> {
    ends.get(&Metric::Revenue).copied().or_else(|| {
        definitions
            .iter()
            .find_map(|def| ends.get(&def.metric).copied())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finstat_core::FiscalPeriod;

    const REVENUE_A: &str = "us-gaap:RevenueFromContractWithCustomerExcludingAssessedTax";
    const REVENUE_B: &str = "us-gaap:Revenues";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Full-year duration fact from a 10-K for fiscal year `fy`, ending Dec 31.
    fn annual(concept: &str, fy: i32, value: f64, filed: NaiveDate, accn: &str) -> RawObservation {
        RawObservation::new(concept, "USD", value)
            .with_fiscal(fy, FiscalPeriod::FullYear)
            .with_period(Some(date(fy, 1, 1)), date(fy, 12, 31))
            .with_filing("10-K", accn, filed)
    }

    /// Year-end balance from a 10-K.
    fn balance(concept: &str, fy: i32, value: f64) -> RawObservation {
        RawObservation::new(concept, "USD", value)
            .with_fiscal(fy, FiscalPeriod::FullYear)
            .with_period(None, date(fy, 12, 31))
            .with_filing("10-K", format!("k-{fy}"), date(fy + 1, 2, 1))
    }

    fn build(observations: &[RawObservation]) -> AnnualTable {
        AnnualTableBuilder::default().build(observations).unwrap()
    }

    #[test]
    fn test_full_year_filter() {
        let good = annual(REVENUE_B, 2023, 1.0, date(2024, 2, 1), "a");
        assert!(is_full_year(&good));

        let quarter = RawObservation::new(REVENUE_B, "USD", 1.0)
            .with_fiscal(2023, FiscalPeriod::Quarter(1))
            .with_period(Some(date(2023, 1, 1)), date(2023, 3, 31))
            .with_filing("10-Q", "q", date(2023, 5, 1));
        assert!(!is_full_year(&quarter));

        // Fourth-quarter duration inside an annual report
        let q4_in_10k = RawObservation::new(REVENUE_B, "USD", 1.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(Some(date(2023, 10, 1)), date(2023, 12, 31))
            .with_filing("10-K", "k", date(2024, 2, 1));
        assert!(!is_full_year(&q4_in_10k));

        let transition = RawObservation::new(REVENUE_B, "USD", 1.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(Some(date(2023, 1, 1)), date(2023, 12, 31))
            .with_filing("10-KT", "t", date(2024, 2, 1));
        assert!(!is_full_year(&transition));

        let amended = annual(REVENUE_B, 2023, 1.0, date(2024, 6, 1), "b")
            .with_filing("10-K/A", "b", date(2024, 6, 1));
        assert!(is_full_year(&amended));

        let instant = balance("us-gaap:StockholdersEquity", 2023, 1.0);
        assert!(is_full_year(&instant));

        let no_form = RawObservation::new(REVENUE_B, "USD", 1.0)
            .with_period(Some(date(2023, 1, 1)), date(2023, 12, 31));
        assert!(!is_full_year(&no_form));
    }

    #[test]
    fn test_latest_filing_wins() {
        let original = annual(REVENUE_A, 2023, 100.0, date(2023, 11, 1), "0000001-23-000001");
        let amended = annual(REVENUE_A, 2023, 105.0, date(2024, 2, 15), "0000001-24-000002")
            .with_filing("10-K/A", "0000001-24-000002", date(2024, 2, 15));

        let table = build(&[amended.clone(), original.clone()]);
        assert_eq!(table.row(2023).unwrap().revenue, Some(105.0));

        let table = build(&[original, amended]);
        assert_eq!(table.row(2023).unwrap().revenue, Some(105.0));
    }

    #[test]
    fn test_accession_breaks_same_day_tie() {
        let filed = date(2024, 2, 1);
        let low = annual(REVENUE_A, 2023, 1.0, filed, "0000001-24-000001");
        let high = annual(REVENUE_A, 2023, 2.0, filed, "0000001-24-000009");
        assert_eq!(restatement_order(&high, &low), Ordering::Greater);
        assert_eq!(
            latest_restatement(&[&high, &low]).map(|o| o.value),
            Some(2.0)
        );
        assert_eq!(build(&[high, low]).row(2023).unwrap().revenue, Some(2.0));
    }

    #[test]
    fn test_concept_locked_per_run() {
        let observations = vec![
            annual(REVENUE_A, 2021, 10.0, date(2022, 2, 1), "k21"),
            annual(REVENUE_A, 2022, 11.0, date(2023, 2, 1), "k22"),
            annual(REVENUE_B, 2023, 12.0, date(2024, 2, 1), "k23"),
        ];

        let table = build(&observations);
        assert_eq!(table.concept_map().get(Metric::Revenue), Some(REVENUE_A));
        assert_eq!(table.row(2021).unwrap().revenue, Some(10.0));
        assert_eq!(table.row(2022).unwrap().revenue, Some(11.0));
        // The year is still emitted, but the locked concept has no value for it
        assert_eq!(table.row(2023).unwrap().revenue, None);
    }

    #[test]
    fn test_per_year_policy_switches_concepts() {
        let observations = vec![
            annual(REVENUE_A, 2021, 10.0, date(2022, 2, 1), "k21"),
            annual(REVENUE_A, 2022, 11.0, date(2023, 2, 1), "k22"),
            annual(REVENUE_B, 2023, 12.0, date(2024, 2, 1), "k23"),
        ];

        let table = AnnualTableBuilder::default()
            .with_policy(ConceptPolicy::PerYear)
            .build(&observations)
            .unwrap();
        assert_eq!(table.row(2023).unwrap().revenue, Some(12.0));
        assert_eq!(table.concept_map().get(Metric::Revenue), Some(REVENUE_B));
    }

    #[test]
    fn test_lookback_window_limits_concept_choice() {
        // The preferred alias only appears in an old year outside the window
        let observations = vec![
            annual(REVENUE_A, 2015, 5.0, date(2016, 2, 1), "k15"),
            annual(REVENUE_B, 2022, 11.0, date(2023, 2, 1), "k22"),
            annual(REVENUE_B, 2023, 12.0, date(2024, 2, 1), "k23"),
        ];

        let table = AnnualTableBuilder::default()
            .with_last_n_years(Some(2))
            .build(&observations)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.concept_map().get(Metric::Revenue), Some(REVENUE_B));
        assert_eq!(table.row(2023).unwrap().revenue, Some(12.0));
    }

    #[test]
    fn test_comparatives_attributed_to_their_own_year() {
        // FY2023 10-K reports 2023 and the 2022 comparative, both tagged fy=2023
        let k23 = "0000001-24-000001";
        let current = annual(REVENUE_A, 2023, 120.0, date(2024, 2, 1), k23);
        let comparative = RawObservation::new(REVENUE_A, "USD", 101.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(Some(date(2022, 1, 1)), date(2022, 12, 31))
            .with_filing("10-K", k23, date(2024, 2, 1));
        let original_2022 = annual(REVENUE_A, 2022, 100.0, date(2023, 2, 1), "0000001-23-000001");

        let table = build(&[current, comparative, original_2022]);
        assert_eq!(table.row(2023).unwrap().revenue, Some(120.0));
        // The restated comparative is the most recent figure for 2022
        assert_eq!(table.row(2022).unwrap().revenue, Some(101.0));
        assert_eq!(table.row(2022).unwrap().fiscal_year_end, Some(date(2022, 12, 31)));
    }

    #[test]
    fn test_late_filer_cover_page_does_not_shift_years() {
        // FY2020 10-K filed fourteen months after year end; the cover page is dated 2022
        let accn = "0000001-22-000001";
        let revenue = annual(REVENUE_B, 2020, 500.0, date(2022, 3, 15), accn);
        let shares = RawObservation::new("dei:EntityCommonStockSharesOutstanding", "shares", 7.0)
            .with_fiscal(2020, FiscalPeriod::FullYear)
            .with_period(None, date(2022, 3, 1))
            .with_filing("10-K", accn, date(2022, 3, 15));
        assert!(!is_full_year(&shares));

        let table = build(&[revenue, shares]);
        let years: Vec<i32> = table.rows().iter().map(|r| r.fy).collect();
        assert_eq!(years, vec![2020]);
        assert_eq!(table.row(2020).unwrap().revenue, Some(500.0));
    }

    #[test]
    fn test_late_instant_never_moves_forward() {
        let accn = "0000001-22-000001";
        let revenue = annual(REVENUE_B, 2020, 500.0, date(2022, 3, 15), accn);
        let cash = RawObservation::new("us-gaap:CashAndCashEquivalentsAtCarryingValue", "USD", 9.0)
            .with_fiscal(2020, FiscalPeriod::FullYear)
            .with_period(None, date(2021, 9, 30))
            .with_filing("10-K", accn, date(2022, 3, 15));

        let table = build(&[revenue, cash]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(2020).unwrap().cash, Some(9.0));
    }

    #[test]
    fn test_instants_anchor_filing_without_durations() {
        let accn = "0000001-24-000001";
        let equity = |end: NaiveDate, value: f64| {
            RawObservation::new("us-gaap:StockholdersEquity", "USD", value)
                .with_fiscal(2023, FiscalPeriod::FullYear)
                .with_period(None, end)
                .with_filing("10-K", accn, date(2024, 2, 1))
        };

        let table = build(&[equity(date(2023, 12, 31), 60.0), equity(date(2022, 12, 31), 50.0)]);
        assert_eq!(table.row(2023).unwrap().equity, Some(60.0));
        assert_eq!(table.row(2022).unwrap().equity, Some(50.0));
    }

    #[test]
    fn test_missing_year_emitted_as_nulls() {
        let table = build(&[
            annual(REVENUE_A, 2020, 10.0, date(2021, 2, 1), "k20"),
            annual(REVENUE_A, 2022, 12.0, date(2023, 2, 1), "k22"),
        ]);
        let years: Vec<i32> = table.rows().iter().map(|r| r.fy).collect();
        assert_eq!(years, vec![2020, 2021, 2022]);
        assert!(table.row(2021).unwrap().is_empty());
        assert_eq!(table.row(2021).unwrap().fiscal_year_end, None);
        assert_eq!(table.row(2022).unwrap().revenue, Some(12.0));
    }

    #[test]
    fn test_window_counts_fiscal_years() {
        let observations = vec![
            annual(REVENUE_A, 2019, 9.0, date(2020, 2, 1), "k19"),
            annual(REVENUE_A, 2021, 11.0, date(2022, 2, 1), "k21"),
            annual(REVENUE_A, 2023, 13.0, date(2024, 2, 1), "k23"),
        ];
        let table = AnnualTableBuilder::default()
            .with_last_n_years(Some(3))
            .build(&observations)
            .unwrap();
        let years: Vec<i32> = table.rows().iter().map(|r| r.fy).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);
        assert_eq!(table.row(2022).unwrap().revenue, None);
    }

    #[test]
    fn test_other_currency_and_units_ignored() {
        let eur = RawObservation::new(REVENUE_A, "EUR", 1.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(Some(date(2023, 1, 1)), date(2023, 12, 31))
            .with_filing("10-K", "k", date(2024, 2, 1));
        let table = build(&[eur.clone()]);
        assert_eq!(table.len(), 1);
        assert!(table.row(2023).unwrap().is_empty());
        assert!(table.concept_map().is_empty());

        let table = AnnualTableBuilder::default()
            .with_currency("EUR")
            .build(&[eur])
            .unwrap();
        assert_eq!(table.row(2023).unwrap().revenue, Some(1.0));
    }

    #[test]
    fn test_fiscal_year_end_prefers_revenue() {
        let equity = RawObservation::new("us-gaap:StockholdersEquity", "USD", 50.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(None, date(2023, 9, 30))
            .with_filing("10-K", "k", date(2023, 11, 3));
        let table = build(&[equity.clone()]);
        assert_eq!(table.row(2023).unwrap().fiscal_year_end, Some(date(2023, 9, 30)));

        let revenue = RawObservation::new(REVENUE_A, "USD", 300.0)
            .with_fiscal(2023, FiscalPeriod::FullYear)
            .with_period(Some(date(2022, 10, 1)), date(2023, 9, 30))
            .with_filing("10-K", "k", date(2023, 11, 3));
        let table = build(&[equity, revenue]);
        let row = table.row(2023).unwrap();
        assert_eq!(row.fiscal_year_end, Some(date(2023, 9, 30)));
        assert_eq!(row.equity, Some(50.0));
        assert_eq!(row.revenue, Some(300.0));
    }

    #[test]
    fn test_unresolved_metrics_absent_from_concept_map() {
        let table = build(&[
            annual(REVENUE_A, 2023, 1.0, date(2024, 2, 1), "k"),
            balance("us-gaap:StockholdersEquity", 2023, 2.0),
        ]);
        let map = table.concept_map();
        assert_eq!(map.len(), 2);
        assert!(map.get(Metric::GrossProfit).is_none());
        assert_eq!(table.row(2023).unwrap().gross_profit, None);
    }

    #[test]
    fn test_no_annual_filings_yields_empty_table() {
        let quarterly = RawObservation::new(REVENUE_A, "USD", 1.0)
            .with_fiscal(2023, FiscalPeriod::Quarter(2))
            .with_period(Some(date(2023, 4, 1)), date(2023, 6, 30))
            .with_filing("10-Q", "q", date(2023, 8, 1));
        let table = build(&[quarterly]);
        assert!(table.is_empty());
        assert!(table.concept_map().is_empty());
        assert!(build(&[]).is_empty());
    }

    #[test]
    fn test_year_with_only_unmapped_concepts_is_emitted() {
        let table = build(&[
            annual(REVENUE_A, 2022, 1.0, date(2023, 2, 1), "k22"),
            annual("us-gaap:ResearchAndDevelopmentExpense", 2023, 9.0, date(2024, 2, 1), "k23"),
        ]);
        let years: Vec<i32> = table.rows().iter().map(|r| r.fy).collect();
        assert_eq!(years, vec![2022, 2023]);
        assert!(table.row(2023).unwrap().is_empty());
        assert_eq!(table.row(2023).unwrap().fiscal_year_end, None);
    }

    #[test]
    fn test_deterministic() {
        let observations = vec![
            annual(REVENUE_A, 2022, 1.0, date(2023, 2, 1), "x"),
            annual(REVENUE_A, 2022, 2.0, date(2023, 2, 1), "x"),
            annual(REVENUE_B, 2023, 3.0, date(2024, 2, 1), "y"),
            balance("us-gaap:StockholdersEquity", 2023, 4.0),
        ];
        let first = build(&observations);
        let mut reversed = observations;
        reversed.reverse();
        for _ in 0..5 {
            assert_eq!(build(&reversed), first);
        }
        assert_eq!(first.row(2022).unwrap().revenue, Some(2.0));
    }
}
