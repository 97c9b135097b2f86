//! Polars views of annual, display and long tables.

use chrono::NaiveDate;
use finstat_core::{AnnualTable, DisplayRow, FinError, LongRow, Metric, Result};
use polars::prelude::*;

fn epoch_days(date: Option<NaiveDate>) -> Option<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    date.map(|d| d.signed_duration_since(epoch).num_days() as i32)
}

fn date_column(name: &str, dates: impl Iterator<Item = Option<NaiveDate>>) -> Result<Column> {
    let days: Vec<Option<i32>> = dates.map(epoch_days).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| FinError::Other(e.to_string()))
}

/// Annual table with one column per metric, ascending by `fy`.
///
/// # Errors
/// Returns [`FinError::Other`] if the frame cannot be assembled.
pub fn annual_frame(table: &AnnualTable) -> Result<DataFrame> {
    let rows = table.rows();
    let mut columns = vec![
        Column::new("fy".into(), rows.iter().map(|r| r.fy).collect::<Vec<i32>>()),
        date_column("fiscal_year_end", rows.iter().map(|r| r.fiscal_year_end))?,
    ];
    for metric in Metric::ALL {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.get(metric)).collect();
        columns.push(Column::new(metric.as_str().into(), values));
    }

    DataFrame::new(columns).map_err(|e| FinError::Other(e.to_string()))
}

/// Display rows, levels first then ratios.
///
/// # Errors
/// Returns [`FinError::Other`] if the frame cannot be assembled.
pub fn display_frame(rows: &[DisplayRow]) -> Result<DataFrame> {
    let mut columns = vec![
        Column::new("fy".into(), rows.iter().map(|r| r.fy).collect::<Vec<i32>>()),
        date_column("fiscal_year_end", rows.iter().map(|r| r.fiscal_year_end))?,
    ];
    let names = DisplayRow::LEVEL_COLUMNS
        .iter()
        .chain(DisplayRow::RATIO_COLUMNS.iter());
    for name in names {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.column(name)).collect();
        columns.push(Column::new((*name).into(), values));
    }

    DataFrame::new(columns).map_err(|e| FinError::Other(e.to_string()))
}

/// Long rows sorted by `fy` then `metric`.
///
/// # Errors
/// Returns [`FinError::Other`] if the frame cannot be assembled.
pub fn long_frame(rows: &[LongRow]) -> Result<DataFrame> {
    let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
    let fys: Vec<i32> = rows.iter().map(|r| r.fy).collect();
    let metrics: Vec<&str> = rows.iter().map(|r| r.metric.as_str()).collect();
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
    let units: Vec<&str> = rows.iter().map(|r| r.unit.as_str()).collect();
    let updated: Vec<i64> = rows.iter().map(|r| r.updated_at.timestamp_millis()).collect();

    let updated_col = Column::new("updated_at".into(), updated)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| FinError::Other(e.to_string()))?;

    DataFrame::new(vec![
        Column::new("ticker".into(), tickers),
        Column::new("fy".into(), fys),
        date_column("fiscal_year_end", rows.iter().map(|r| r.fiscal_year_end))?,
        Column::new("metric".into(), metrics),
        Column::new("value".into(), values),
        Column::new("unit".into(), units),
        updated_col,
    ])
    .map_err(|e| FinError::Other(e.to_string()))?
    .lazy()
    .sort(["fy", "metric"], Default::default())
    .collect()
    .map_err(|e| FinError::Other(e.to_string()))
}
