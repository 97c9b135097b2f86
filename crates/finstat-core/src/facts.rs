//! Raw SEC company-facts schema.
//!
//! Mirrors the JSON returned by `https://data.sec.gov/api/xbrl/companyfacts/CIK##########.json`:
//!
//! ```text
//! facts.<taxonomy>.<concept>.units.<unit>[] = { start?, end, val, accn, fy, fp, form, filed, frame? }
//! ```
//!
//! Record fields are decoded leniently: every field is optional, `val` is kept as raw JSON, and
//! a field of the wrong JSON type (a numeric `filed`, a string `fy`) decodes as `None` instead of
//! failing the document. Numeric strings are accepted for `fy`. Only a document that does not
//! have the overall shape above, including records that are not JSON objects, is rejected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{FinError, Result};

/// A company's full facts disclosure, grouped by taxonomy then concept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// CIK as reported (SEC returns a number, some mirrors a string).
    #[serde(default)]
    pub cik: Option<Value>,
    /// Registrant name.
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Facts keyed by taxonomy (`us-gaap`, `dei`, `ifrs-full`) then concept name.
    #[serde(default)]
    pub facts: BTreeMap<String, BTreeMap<String, ConceptFacts>>,
}

/// All reported values of one concept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptFacts {
    /// Human readable label.
    #[serde(default)]
    pub label: Option<String>,
    /// Concept description.
    #[serde(default)]
    pub description: Option<String>,
    /// Observations keyed by unit (`USD`, `shares`, `USD/shares`, `pure`).
    #[serde(default)]
    pub units: BTreeMap<String, Vec<FactRecord>>,
}

/// One period observation as disclosed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Period start (`YYYY-MM-DD`), absent for instant facts.
    #[serde(default, deserialize_with = "lenient_string")]
    pub start: Option<String>,
    /// Period end or instant (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub end: Option<String>,
    /// Reported value; numeric in well-formed data.
    #[serde(default)]
    pub val: Option<Value>,
    /// Accession number of the filing.
    #[serde(default, deserialize_with = "lenient_string")]
    pub accn: Option<String>,
    /// Fiscal year of the filing.
    #[serde(default, deserialize_with = "lenient_year")]
    pub fy: Option<i32>,
    /// Fiscal period marker (`FY`, `Q1`..`Q4`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub fp: Option<String>,
    /// Form type (`10-K`, `10-Q`, `10-K/A`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub form: Option<String>,
    /// Filing date (`YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub filed: Option<String>,
    /// Calendar frame (`CY2023`, `CY2023Q4I`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub frame: Option<String>,
}

/// Keeps JSON strings; any other type becomes `None`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Integers, or integer strings, that fit a year.
fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl CompanyFacts {
    /// Parses a company-facts JSON document.
    ///
    /// # Errors
    /// Returns [`FinError::Parse`] for invalid JSON and [`FinError::Structure`] when the
    /// document is valid JSON but not shaped like a facts disclosure.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FinError::Parse(format!("Failed to parse company facts: {}", e)))?;
        Self::from_value(value)
    }

    /// Decodes an already parsed JSON value.
    ///
    /// # Errors
    /// Returns [`FinError::Structure`] when the value is not shaped like a facts disclosure.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(FinError::Structure(
                "company facts must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| FinError::Structure(e.to_string()))
    }

    /// Total number of observations across all taxonomies, concepts and units.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.facts
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(|c| c.units.values())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "us-gaap": {
                "Revenues": {
                    "label": "Revenues",
                    "description": "Amount of revenue",
                    "units": {
                        "USD": [
                            {"start": "2022-09-25", "end": "2023-09-30", "val": 383285000000,
                             "accn": "0000320193-23-000106", "fy": 2023, "fp": "FY",
                             "form": "10-K", "filed": "2023-11-03", "frame": "CY2023"},
                            {"end": "2023-09-30", "val": null, "fy": null}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let facts = CompanyFacts::from_json(SAMPLE).unwrap();
        assert_eq!(facts.entity_name.as_deref(), Some("Apple Inc."));
        assert_eq!(facts.observation_count(), 2);

        let revenues = &facts.facts["us-gaap"]["Revenues"].units["USD"];
        assert_eq!(revenues[0].fy, Some(2023));
        assert_eq!(revenues[0].form.as_deref(), Some("10-K"));
        assert!(revenues[1].val.as_ref().is_none_or(Value::is_null));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            CompanyFacts::from_json("not json"),
            Err(FinError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_shape_is_structure_error() {
        assert!(matches!(
            CompanyFacts::from_json("[1, 2, 3]"),
            Err(FinError::Structure(_))
        ));
        assert!(matches!(
            CompanyFacts::from_json(r#"{"facts": {"us-gaap": [1]}}"#),
            Err(FinError::Structure(_))
        ));
    }

    #[test]
    fn test_mistyped_fields_decode_as_none() {
        let json = r#"{"facts": {"us-gaap": {"Revenues": {"units": {"USD": [
            {"end": "2023-12-31", "val": 5, "fy": "2023", "filed": 20240201, "accn": 42, "form": "10-K"},
            {"end": "2022-12-31", "val": 4, "fy": 2.5, "fp": ["FY"], "form": "10-K"}
        ]}}}}}"#;
        let facts = CompanyFacts::from_json(json).unwrap();
        let records = &facts.facts["us-gaap"]["Revenues"].units["USD"];
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fy, Some(2023));
        assert_eq!(records[0].filed, None);
        assert_eq!(records[0].accn, None);
        assert_eq!(records[0].form.as_deref(), Some("10-K"));
        assert_eq!(records[1].fy, None);
        assert_eq!(records[1].fp, None);
        assert_eq!(records[1].end.as_deref(), Some("2022-12-31"));
    }

    #[test]
    fn test_missing_facts_is_empty() {
        let facts = CompanyFacts::from_json(r#"{"cik": "0000000001"}"#).unwrap();
        assert_eq!(facts.observation_count(), 0);
    }
}
