//! Markdown analysis report.

use chrono::{DateTime, Utc};
use finstat_core::{CompanyProfile, ConceptMap, DisplayRow, FinError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::charts::{ChartFile, save_financial_charts};

/// Report sections that can be switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Append the metric to concept table.
    pub include_concept_map: bool,
    /// Draw charts when writing the report to disk.
    pub include_charts: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_concept_map: true,
            include_charts: true,
        }
    }
}

/// Everything the report is rendered from.
#[derive(Clone, Copy, Debug)]
pub struct ReportInput<'a> {
    /// Company identity.
    pub profile: &'a CompanyProfile,
    /// Display rows in ascending fiscal-year order.
    pub display: &'a [DisplayRow],
    /// Concept chosen per metric.
    pub concept_map: &'a ConceptMap,
    /// Reporting currency of the level metrics.
    pub currency: &'a str,
    /// Charts to embed, paths relative to the report file.
    pub charts: &'a [ChartFile],
    /// Number of fiscal years covered.
    pub years: usize,
    /// Report timestamp.
    pub generated_at: DateTime<Utc>,
    /// Section switches.
    pub options: ReportOptions,
}

/// Table columns: identity, levels, ratios.
const TABLE_COLUMNS: [&str; 17] = [
    "fy",
    "fiscal_year_end",
    "revenue",
    "gross_profit",
    "operating_income",
    "net_income",
    "cfo",
    "capex",
    "fcf",
    "revenue_yoy",
    "gross_margin",
    "operating_margin",
    "net_margin",
    "fcf_margin",
    "cash",
    "equity",
    "roe",
];

/// Formats a ratio as a percentage with one decimal (`0.425` -> `42.5%`), `NA` when missing.
#[must_use]
pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}%", v * 100.0),
        _ => "NA".to_string(),
    }
}

/// Formats a number with one decimal, `NA` when missing.
#[must_use]
pub fn fmt_num(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => "NA".to_string(),
    }
}

/// Renders the full report.
#[must_use]
pub fn render_markdown(input: &ReportInput<'_>) -> String {
    let ticker = &input.profile.ticker;
    let mut lines = vec![
        format!(
            "# {} - {} Automated Financial Analysis Report",
            input.profile.name, ticker
        ),
        String::new(),
        format!("- CIK: `{}`", input.profile.cik),
        format!(
            "- Generated: {}",
            input.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("- Coverage: last {} fiscal years", input.years),
        String::new(),
        "## Highlights".to_string(),
    ];
    lines.extend(highlights(input.display));
    lines.push(String::new());

    lines.push("## Charts".to_string());
    lines.push(String::new());
    if input.charts.is_empty() {
        lines.push("_No charts generated._".to_string());
    } else {
        lines.push(chart_grid(input.charts));
    }
    lines.push(String::new());

    lines.push("## Annual Financials Table".to_string());
    lines.push(format!(
        "{} in billions for level metrics",
        input.currency.to_uppercase()
    ));
    lines.push(annual_table(input.display));
    lines.push(String::new());

    if input.options.include_concept_map && !input.concept_map.is_empty() {
        lines.push("## XBRL Concept Map".to_string());
        lines.push(String::new());
        lines.push("| Metric | XBRL Concept |".to_string());
        lines.push("|---|---|".to_string());
        for (metric, concept) in input.concept_map.iter() {
            lines.push(format!("| {} | `{}` |", metric, concept));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Where [`write_report`] put its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportFiles {
    /// The Markdown report, `<out_dir>/<TICKER>.md`.
    pub markdown: PathBuf,
    /// Charts under `<out_dir>/assets/<TICKER>/`, absolute or relative as `out_dir` is.
    pub charts: Vec<ChartFile>,
}

/// Writes the report and its charts under `out_dir`.
///
/// Charts go to `assets/<TICKER>/` and are linked relative to the report. When
/// `include_charts` is off or there are no rows, the report says no charts were made.
/// Any `charts` already set on `input` are replaced.
///
/// # Errors
/// Returns [`FinError::Storage`] if a directory, chart or the report cannot be written.
#[instrument(skip(input), fields(ticker = %input.profile.ticker))]
pub fn write_report(out_dir: &Path, input: &ReportInput<'_>) -> Result<ReportFiles> {
    fs::create_dir_all(out_dir)
        .map_err(|e| FinError::Storage(format!("Failed to create {}: {}", out_dir.display(), e)))?;

    let ticker = input.profile.ticker.as_str();
    let charts = if input.options.include_charts {
        let asset_dir = out_dir.join("assets").join(ticker);
        save_financial_charts(input.display, input.currency, &asset_dir)?
    } else {
        Vec::new()
    };
    let linked: Vec<ChartFile> = charts
        .iter()
        .map(|chart| ChartFile {
            path: chart
                .path
                .strip_prefix(out_dir)
                .map_or_else(|_| chart.path.clone(), Path::to_path_buf),
            ..chart.clone()
        })
        .collect();

    let markdown = render_markdown(&ReportInput {
        charts: &linked,
        ..*input
    });
    let path = out_dir.join(format!("{}.md", ticker));
    fs::write(&path, markdown)
        .map_err(|e| FinError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

    debug!(path = %path.display(), charts = charts.len(), "Wrote report");
    Ok(ReportFiles {
        markdown: path,
        charts,
    })
}

/// Two-column HTML image grid.
fn chart_grid(charts: &[ChartFile]) -> String {
    let cell = |chart: &ChartFile| {
        format!(
            "<b>{}</b><br><img src='{}' width='100%'>",
            chart.title,
            chart.path.to_string_lossy().replace('\\', "/")
        )
    };

    let mut lines = vec!["| | |".to_string(), "|---|---|".to_string()];
    for pair in charts.chunks(2) {
        let left = cell(&pair[0]);
        let right = pair.get(1).map(cell).unwrap_or_default();
        lines.push(format!("| {} | {} |", left, right));
    }
    lines.join("\n")
}

/// Bullet points for the most recent fiscal year.
fn highlights(display: &[DisplayRow]) -> Vec<String> {
    let Some(latest) = display.iter().max_by_key(|r| r.fy) else {
        return vec!["- No data available.".to_string()];
    };
    let previous = display
        .iter()
        .filter(|r| r.fy < latest.fy)
        .max_by_key(|r| r.fy);

    let mut lines = vec![format!(
        "- Latest fiscal year: **FY{}** ended {}.",
        latest.fy,
        latest
            .fiscal_year_end
            .map_or_else(|| "NA".to_string(), |d| d.to_string())
    )];

    if let Some(revenue) = latest.revenue {
        lines.push(match latest.revenue_yoy {
            Some(yoy) => format!(
                "- Revenue: **{}B** and {} YoY.",
                fmt_num(Some(revenue)),
                fmt_pct(Some(yoy))
            ),
            None => format!("- Revenue: **{}B**.", fmt_num(Some(revenue))),
        });
    }
    for (label, value) in [
        ("Gross margin", latest.gross_margin),
        ("Operating margin", latest.operating_margin),
        ("Net margin", latest.net_margin),
    ] {
        if value.is_some() {
            lines.push(format!("- {}: **{}**.", label, fmt_pct(value)));
        }
    }
    if let Some(fcf) = latest.fcf {
        lines.push(match latest.fcf_margin {
            Some(margin) => format!(
                "- Free cash flow: **{}B** and {} of revenue.",
                fmt_num(Some(fcf)),
                fmt_pct(Some(margin))
            ),
            None => format!("- Free cash flow: **{}B**.", fmt_num(Some(fcf))),
        });
    }

    let direction = previous
        .and_then(|p| p.revenue)
        .zip(latest.revenue)
        .and_then(|(prior, current)| current.partial_cmp(&prior));
    match direction {
        Some(Ordering::Greater) => lines.push("- Revenue increased vs prior year.".to_string()),
        Some(Ordering::Less) => lines.push("- Revenue decreased vs prior year.".to_string()),
        Some(Ordering::Equal) => lines.push("- Revenue was flat vs prior year.".to_string()),
        None => {}
    }

    lines
}

/// Newest-first Markdown table; levels to one decimal, ratios as percentages.
fn annual_table(display: &[DisplayRow]) -> String {
    if display.is_empty() {
        return "_No data._".to_string();
    }

    let mut rows: Vec<&DisplayRow> = display.iter().collect();
    rows.sort_by(|a, b| b.fy.cmp(&a.fy));

    let mut lines = vec![
        format!("| {} |", TABLE_COLUMNS.join(" | ")),
        format!("|{}", "---|".repeat(TABLE_COLUMNS.len())),
    ];
    for row in rows {
        let cells: Vec<String> = TABLE_COLUMNS
            .iter()
            .map(|col| match *col {
                "fy" => row.fy.to_string(),
                "fiscal_year_end" => row
                    .fiscal_year_end
                    .map_or_else(|| "NA".to_string(), |d| d.to_string()),
                ratio if DisplayRow::RATIO_COLUMNS.contains(&ratio) => fmt_pct(row.column(ratio)),
                level => fmt_num(row.column(level)),
            })
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use finstat_core::{Metric, Ticker};

    fn profile() -> CompanyProfile {
        CompanyProfile {
            ticker: Ticker::new("ACME"),
            cik: "0000000042".to_string(),
            name: "Acme Corp".to_string(),
        }
    }

    fn rows() -> Vec<DisplayRow> {
        vec![
            DisplayRow {
                fy: 2022,
                fiscal_year_end: NaiveDate::from_ymd_opt(2022, 12, 31),
                revenue: Some(100.0),
                ..Default::default()
            },
            DisplayRow {
                fy: 2023,
                fiscal_year_end: NaiveDate::from_ymd_opt(2023, 12, 31),
                revenue: Some(123.4),
                revenue_yoy: Some(0.234),
                gross_margin: Some(0.425),
                fcf: Some(20.0),
                fcf_margin: Some(0.162),
                roe: Some(0.31),
                ..Default::default()
            },
        ]
    }

    fn render(display: &[DisplayRow], map: &ConceptMap, options: ReportOptions) -> String {
        let profile = profile();
        render_markdown(&ReportInput {
            profile: &profile,
            display,
            concept_map: map,
            currency: "USD",
            charts: &[],
            years: 5,
            generated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            options,
        })
    }

    #[test]
    fn test_formatters() {
        assert_eq!(fmt_pct(Some(0.425)), "42.5%");
        assert_eq!(fmt_pct(Some(-0.05)), "-5.0%");
        assert_eq!(fmt_pct(None), "NA");
        assert_eq!(fmt_pct(Some(f64::NAN)), "NA");
        assert_eq!(fmt_num(Some(123.4)), "123.4");
        assert_eq!(fmt_num(Some(0.04)), "0.0");
        assert_eq!(fmt_num(None), "NA");
    }

    #[test]
    fn test_header_and_highlights() {
        let md = render(&rows(), &ConceptMap::new(), ReportOptions::default());
        assert!(md.starts_with("# Acme Corp - ACME Automated Financial Analysis Report"));
        assert!(md.contains("- CIK: `0000000042`"));
        assert!(md.contains("- Generated: 2024-01-02 03:04:05 UTC"));
        assert!(md.contains("- Coverage: last 5 fiscal years"));
        assert!(md.contains("- Latest fiscal year: **FY2023** ended 2023-12-31."));
        assert!(md.contains("- Revenue: **123.4B** and 23.4% YoY."));
        assert!(md.contains("- Gross margin: **42.5%**."));
        assert!(!md.contains("Operating margin:"));
        assert!(md.contains("- Free cash flow: **20.0B** and 16.2% of revenue."));
        assert!(md.contains("- Revenue increased vs prior year."));
    }

    #[test]
    fn test_table_newest_first() {
        let md = render(&rows(), &ConceptMap::new(), ReportOptions::default());
        let header = md
            .lines()
            .position(|l| l.starts_with("| fy | fiscal_year_end | revenue"))
            .unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert!(lines[header + 2].starts_with("| 2023 | 2023-12-31 | 123.4 |"));
        assert!(lines[header + 2].ends_with("| 31.0% |"));
        assert!(lines[header + 3].starts_with("| 2022 | 2022-12-31 | 100.0 | NA |"));
        assert!(!md.contains("XBRL Concept Map"));
    }

    #[test]
    fn test_concept_map_section() {
        let mut map = ConceptMap::new();
        map.insert(Metric::Revenue, "us-gaap:Revenues");

        let md = render(&rows(), &map, ReportOptions::default());
        assert!(md.contains("## XBRL Concept Map"));
        assert!(md.contains("| revenue | `us-gaap:Revenues` |"));

        let md = render(
            &rows(),
            &map,
            ReportOptions {
                include_concept_map: false,
                ..Default::default()
            },
        );
        assert!(!md.contains("## XBRL Concept Map"));
    }

    #[test]
    fn test_table_caption_uses_currency() {
        let profile = profile();
        let display = rows();
        let md = render_markdown(&ReportInput {
            profile: &profile,
            display: &display,
            concept_map: &ConceptMap::new(),
            currency: "eur",
            charts: &[],
            years: 2,
            generated_at: Utc::now(),
            options: ReportOptions::default(),
        });
        assert!(md.contains("EUR in billions for level metrics"));
        assert!(!md.contains("USD in billions"));
    }

    #[test]
    fn test_chart_grid() {
        let chart = |key: &'static str, title: &'static str| ChartFile {
            key,
            title,
            path: PathBuf::from(format!("assets/ACME/{}.svg", key)),
        };
        let grid = chart_grid(&[
            chart("revenue", "Revenue"),
            chart("revenue_yoy", "Revenue YoY"),
            chart("margins", "Margins"),
        ]);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[2],
            "| <b>Revenue</b><br><img src='assets/ACME/revenue.svg' width='100%'> \
             | <b>Revenue YoY</b><br><img src='assets/ACME/revenue_yoy.svg' width='100%'> |"
        );
        assert!(lines[3].ends_with("width='100%'> |  |"));
    }

    #[test]
    fn test_write_report_with_charts() {
        let dir = std::env::temp_dir().join(format!("finstat-report-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let profile = profile();
        let display = rows();
        let input = ReportInput {
            profile: &profile,
            display: &display,
            concept_map: &ConceptMap::new(),
            currency: "USD",
            charts: &[],
            years: 2,
            generated_at: Utc::now(),
            options: ReportOptions::default(),
        };

        let files = write_report(&dir, &input).unwrap();
        assert_eq!(files.markdown, dir.join("ACME.md"));
        assert!(!files.charts.is_empty());
        assert!(files.charts.iter().all(|c| c.path.starts_with(dir.join("assets").join("ACME"))));

        let md = fs::read_to_string(&files.markdown).unwrap();
        assert!(md.contains("## Charts"));
        assert!(md.contains("<img src='assets/ACME/revenue.svg' width='100%'>"));

        let files = write_report(
            &dir,
            &ReportInput {
                options: ReportOptions {
                    include_charts: false,
                    ..Default::default()
                },
                ..input
            },
        )
        .unwrap();
        assert!(files.charts.is_empty());
        let md = fs::read_to_string(&files.markdown).unwrap();
        assert!(md.contains("_No charts generated._"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_report() {
        let md = render(&[], &ConceptMap::new(), ReportOptions::default());
        assert!(md.contains("- No data available."));
        assert!(md.contains("_No data._"));
    }
}
