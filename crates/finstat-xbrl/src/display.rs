//! Derived ratios and display scaling.

use finstat_core::{AnnualRow, DisplayRow};

/// Divisor turning raw currency amounts into billions.
pub const BILLION: f64 = 1e9;

/// Derives free cash flow, margins, growth and ROE, and scales levels to billions.
///
/// Rows are processed in ascending fiscal-year order regardless of input order. Ratios are
/// computed from the unscaled values. Any missing input, zero denominator or non-finite
/// result yields `None` for that cell. Revenue growth is only computed against the
/// immediately preceding fiscal year; a gap in the sequence leaves it `None`.
#[must_use]
pub fn format_for_display(rows: &[AnnualRow]) -> Vec<DisplayRow> {
    let mut sorted: Vec<&AnnualRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.fy);

    let mut previous: Option<&AnnualRow> = None;
    let mut out = Vec::with_capacity(sorted.len());

    for row in sorted {
        let fcf = match (row.cfo, row.capex) {
            (Some(cfo), Some(capex)) => finite(cfo - capex),
            _ => None,
        };
        let prior_revenue = previous
            .filter(|p| p.fy.checked_add(1) == Some(row.fy))
            .and_then(|p| p.revenue);

        out.push(DisplayRow {
            fy: row.fy,
            fiscal_year_end: row.fiscal_year_end,
            revenue: billions(row.revenue),
            gross_profit: billions(row.gross_profit),
            operating_income: billions(row.operating_income),
            net_income: billions(row.net_income),
            cfo: billions(row.cfo),
            capex: billions(row.capex),
            fcf: billions(fcf),
            cash: billions(row.cash),
            equity: billions(row.equity),
            revenue_yoy: ratio(row.revenue, prior_revenue).map(|r| r - 1.0),
            gross_margin: ratio(row.gross_profit, row.revenue),
            operating_margin: ratio(row.operating_income, row.revenue),
            net_margin: ratio(row.net_income, row.revenue),
            fcf_margin: ratio(fcf, row.revenue),
            roe: ratio(row.net_income, row.equity),
        });
        previous = Some(row);
    }

    out
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => finite(n / d),
        _ => None,
    }
}

fn billions(value: Option<f64>) -> Option<f64> {
    value.and_then(|v| finite(v / BILLION))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
