//! Fact normalizer.
//!
//! Flattens the nested `taxonomy -> concept -> unit -> [observation]` document into one
//! [`RawObservation`] per disclosed value. No annual/quarterly filtering happens here.

use chrono::NaiveDate;
use finstat_core::{CompanyFacts, FactRecord, FiscalPeriod, RawObservation};
use serde_json::Value;
use tracing::debug;

/// Output of [`normalize`]: the flat observations plus drop counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    /// Observations in taxonomy, concept, unit order, records in input order.
    pub observations: Vec<RawObservation>,
    /// Records skipped because `val` was missing, non-numeric or non-finite.
    pub dropped_missing_value: usize,
    /// Records skipped because no usable period could be read.
    pub dropped_malformed: usize,
}

/// Why a record was not turned into an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Skip {
    MissingValue,
    Malformed,
}

/// Flattens a company-facts document.
///
/// Records without a numeric value are counted in `dropped_missing_value`. Records with
/// neither period bound, or with `end < start`, are counted in `dropped_malformed`.
/// Neither case is an error.
#[must_use]
pub fn normalize(facts: &CompanyFacts) -> Normalized {
    let mut out = Normalized::default();

    for (taxonomy, concepts) in &facts.facts {
        for (name, concept) in concepts {
            let qualified = format!("{}:{}", taxonomy, name);
            for (unit, records) in &concept.units {
                for record in records {
                    match flatten(taxonomy, &qualified, unit, record) {
                        Ok(obs) => out.observations.push(obs),
                        Err(Skip::MissingValue) => out.dropped_missing_value += 1,
                        Err(Skip::Malformed) => out.dropped_malformed += 1,
                    }
                }
            }
        }
    }

    debug!(
        observations = out.observations.len(),
        dropped_missing_value = out.dropped_missing_value,
        dropped_malformed = out.dropped_malformed,
        "Normalized company facts"
    );
    out
}

fn flatten(
    taxonomy: &str,
    concept: &str,
    unit: &str,
    record: &FactRecord,
) -> Result<RawObservation, Skip> {
    let value = record
        .val
        .as_ref()
        .and_then(numeric)
        .ok_or(Skip::MissingValue)?;

    let period_start = record.start.as_deref().and_then(parse_date);
    let period_end = record.end.as_deref().and_then(parse_date);
    match (period_start, period_end) {
        (None, None) => return Err(Skip::Malformed),
        (Some(start), Some(end)) if end < start => return Err(Skip::Malformed),
        _ => {}
    }

    Ok(RawObservation {
        taxonomy: taxonomy.to_string(),
        concept: concept.to_string(),
        unit: unit.to_string(),
        fiscal_year: record.fy,
        fiscal_period: record.fp.as_deref().map(FiscalPeriod::parse),
        period_start,
        period_end,
        filed: record.filed.as_deref().and_then(parse_date),
        accession: record.accn.clone(),
        form: record.form.clone(),
        frame: record.frame.clone(),
        value,
    })
}

/// Reads a finite number from a JSON number or numeric string.
fn numeric(val: &Value) -> Option<f64> {
    let n = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
