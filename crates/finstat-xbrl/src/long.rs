//! Long-format conversion of display rows.

use chrono::{DateTime, Utc};
use finstat_core::{DisplayRow, LongRow, Ticker};

/// Unit label for dimensionless columns.
pub const RATIO_UNIT: &str = "ratio";

/// Infers the unit label of a display column.
///
/// Margins, growth rates and ROE are ratios; every other column is a level in billions
/// of the reporting currency (`usd_billions`).
#[must_use]
pub fn infer_unit(metric: &str, currency: &str) -> String {
    if metric.ends_with("_margin") || metric.ends_with("_yoy") || metric == "roe" {
        RATIO_UNIT.to_string()
    } else {
        format!("{}_billions", currency.to_lowercase())
    }
}

/// Melts display rows into one row per fiscal year and column.
///
/// Null values are kept so that a later upsert overwrites stale values.
#[must_use]
pub fn to_long_rows(
    ticker: &Ticker,
    rows: &[DisplayRow],
    currency: &str,
    updated_at: DateTime<Utc>,
) -> Vec<LongRow> {
    rows.iter()
        .flat_map(|row| {
            row.columns().into_iter().map(move |(metric, value)| LongRow {
                ticker: ticker.clone(),
                fy: row.fy,
                fiscal_year_end: row.fiscal_year_end,
                metric: metric.to_string(),
                value,
                unit: infer_unit(metric, currency),
                updated_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_infer_unit() {
        assert_eq!(infer_unit("gross_margin", "USD"), "ratio");
        assert_eq!(infer_unit("revenue_yoy", "USD"), "ratio");
        assert_eq!(infer_unit("roe", "USD"), "ratio");
        assert_eq!(infer_unit("revenue", "USD"), "usd_billions");
        assert_eq!(infer_unit("fcf", "EUR"), "eur_billions");
    }

    #[test]
    fn test_melt() {
        let rows = vec![
            DisplayRow {
                fy: 2022,
                fiscal_year_end: NaiveDate::from_ymd_opt(2022, 12, 31),
                revenue: Some(10.0),
                ..Default::default()
            },
            DisplayRow {
                fy: 2023,
                revenue: Some(12.0),
                revenue_yoy: Some(0.2),
                ..Default::default()
            },
        ];
        let now = Utc::now();
        let long = to_long_rows(&Ticker::new("msft"), &rows, "USD", now);

        assert_eq!(long.len(), 2 * 15);
        assert!(long.iter().all(|r| r.ticker.as_str() == "MSFT" && r.updated_at == now));

        let yoy = long
            .iter()
            .find(|r| r.fy == 2023 && r.metric == "revenue_yoy")
            .unwrap();
        assert_eq!(yoy.value, Some(0.2));
        assert_eq!(yoy.unit, "ratio");

        let revenue = long
            .iter()
            .find(|r| r.fy == 2022 && r.metric == "revenue")
            .unwrap();
        assert_eq!(revenue.unit, "usd_billions");
        assert_eq!(revenue.fiscal_year_end, NaiveDate::from_ymd_opt(2022, 12, 31));

        let missing = long
            .iter()
            .find(|r| r.fy == 2022 && r.metric == "capex")
            .unwrap();
        assert_eq!(missing.value, None);
    }
}
