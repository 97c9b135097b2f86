//! SVG charts of the annual display table.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use finstat_core::{DisplayRow, FinError, Result};
use plotters::prelude::*;
use tracing::debug;

const CHART_SIZE: (u32, u32) = (760, 460);

const PALETTE: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

/// Derived column: operating cash flow minus net income.
const CASH_QUALITY: &str = "cfo_minus_net_income";

/// A chart written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartFile {
    /// Chart key, also the file stem (`revenue`, `margins`).
    pub key: &'static str,
    /// Chart title.
    pub title: &'static str,
    /// Location of the SVG file.
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug)]
enum Scale {
    Billions,
    Percent,
}

impl Scale {
    const fn apply(self, value: f64) -> f64 {
        match self {
            Self::Billions => value,
            Self::Percent => value * 100.0,
        }
    }

    fn tick(self, value: f64) -> String {
        match self {
            Self::Billions => format!("{:.1}", value),
            Self::Percent => format!("{:.0}%", value),
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Billions => "B",
            Self::Percent => "%",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Style {
    Lines,
    Bars,
}

#[derive(Debug)]
struct ChartSpec {
    key: &'static str,
    title: &'static str,
    style: Style,
    scale: Scale,
    /// `(column, legend label)` pairs.
    columns: &'static [(&'static str, &'static str)],
}

/// Charts in report order.
const CHARTS: [ChartSpec; 8] = [
    ChartSpec {
        key: "revenue",
        title: "Revenue",
        style: Style::Lines,
        scale: Scale::Billions,
        columns: &[("revenue", "Revenue")],
    },
    ChartSpec {
        key: "revenue_yoy",
        title: "Revenue YoY",
        style: Style::Bars,
        scale: Scale::Percent,
        columns: &[("revenue_yoy", "Revenue YoY")],
    },
    ChartSpec {
        key: "margins",
        title: "Margins",
        style: Style::Lines,
        scale: Scale::Percent,
        columns: &[
            ("gross_margin", "Gross margin"),
            ("operating_margin", "Operating margin"),
            ("net_margin", "Net margin"),
            ("fcf_margin", "FCF margin"),
        ],
    },
    ChartSpec {
        key: "cash_flow",
        title: "Cash flow",
        style: Style::Lines,
        scale: Scale::Billions,
        columns: &[("cfo", "CFO"), ("capex", "Capex"), ("fcf", "FCF")],
    },
    ChartSpec {
        key: "income_statement",
        title: "Income statement levels",
        style: Style::Lines,
        scale: Scale::Billions,
        columns: &[
            ("revenue", "Revenue"),
            ("gross_profit", "Gross profit"),
            ("operating_income", "Operating income"),
            ("net_income", "Net income"),
        ],
    },
    ChartSpec {
        key: "balance_sheet",
        title: "Balance sheet snapshot",
        style: Style::Lines,
        scale: Scale::Billions,
        columns: &[("cash", "Cash"), ("equity", "Equity")],
    },
    ChartSpec {
        key: "cash_quality",
        title: "Cash flow quality",
        style: Style::Bars,
        scale: Scale::Billions,
        columns: &[(CASH_QUALITY, "CFO minus net income")],
    },
    ChartSpec {
        key: "roe",
        title: "Return on equity",
        style: Style::Lines,
        scale: Scale::Percent,
        columns: &[("roe", "ROE")],
    },
];

/// One plotted column, aligned with the chart's years.
#[derive(Debug)]
struct Series {
    label: &'static str,
    points: Vec<Option<f64>>,
}

/// Renders every chart that has data into `out_dir` as `<key>.svg`.
///
/// Rows are plotted in fiscal-year order; null values break lines. Charts whose columns
/// are all null are skipped, and an empty table yields no charts and creates nothing.
///
/// # Errors
/// Returns [`FinError::Storage`] if the directory or a chart file cannot be written.
pub fn save_financial_charts(
    display: &[DisplayRow],
    currency: &str,
    out_dir: &Path,
) -> Result<Vec<ChartFile>> {
    if display.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(out_dir).map_err(|e| {
        FinError::Storage(format!("Failed to create {}: {}", out_dir.display(), e))
    })?;

    let mut rows: Vec<&DisplayRow> = display.iter().collect();
    rows.sort_by_key(|r| r.fy);
    let years: Vec<f64> = rows.iter().map(|r| f64::from(r.fy)).collect();

    let mut saved = Vec::new();
    for spec in &CHARTS {
        let series: Vec<Series> = spec
            .columns
            .iter()
            .map(|&(column, label)| Series {
                label,
                points: rows
                    .iter()
                    .map(|r| {
                        column_value(r, column)
                            .filter(|v| v.is_finite())
                            .map(|v| spec.scale.apply(v))
                    })
                    .collect(),
            })
            .filter(|s| s.points.iter().any(Option::is_some))
            .collect();
        if series.is_empty() {
            continue;
        }

        let path = out_dir.join(format!("{}.svg", spec.key));
        draw_chart(&path, spec, &years, &series, currency).map_err(|e| {
            FinError::Storage(format!("Failed to draw {}: {}", path.display(), e))
        })?;
        debug!(chart = spec.key, path = %path.display(), "Saved chart");
        saved.push(ChartFile {
            key: spec.key,
            title: spec.title,
            path,
        });
    }

    Ok(saved)
}

fn column_value(row: &DisplayRow, column: &str) -> Option<f64> {
    if column == CASH_QUALITY {
        return row.cfo.zip(row.net_income).map(|(cfo, ni)| cfo - ni);
    }
    row.column(column)
}

fn draw_chart(
    path: &Path,
    spec: &ChartSpec,
    years: &[f64],
    series: &[Series],
    currency: &str,
) -> std::result::Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let bars = matches!(spec.style, Style::Bars);
    let (lo, hi) = value_bounds(series, bars);
    let left = years.first().copied().unwrap_or_default() - 0.6;
    let right = years.last().copied().unwrap_or_default() + 0.6;
    let y_desc = match spec.scale {
        Scale::Billions => format!("{} billions", currency.to_uppercase()),
        Scale::Percent => "Percent".to_string(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(64)
        .build_cartesian_2d(left..right, lo..hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(years.len() + 1)
        .x_label_formatter(&|x| year_label(*x))
        .y_label_formatter(&|y| spec.scale.tick(*y))
        .x_desc("Fiscal year")
        .y_desc(y_desc.as_str())
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let points: Vec<(f64, f64)> = years
            .iter()
            .zip(&s.points)
            .filter_map(|(x, y)| y.map(|y| (*x, y)))
            .collect();

        if bars {
            chart.draw_series(points.iter().map(|(x, y)| {
                Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *y)], color.mix(0.85).filled())
            }))?;
            continue;
        }

        for segment in line_segments(years, &s.points) {
            chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
        }
        chart
            .draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))?
            .label(s.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    }

    if bars {
        chart.draw_series(LineSeries::new(
            vec![(left, 0.0), (right, 0.0)],
            BLACK.stroke_width(1),
        ))?;
    } else if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    // Latest value of the chart's leading column
    let leads = spec.columns.first().is_some_and(|(_, l)| *l == series[0].label);
    let last = years
        .iter()
        .zip(&series[0].points)
        .filter_map(|(x, y)| y.map(|y| (*x, y)))
        .next_back();
    if let (true, Some((x, y))) = (leads && !bars, last) {
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}{}", y, spec.scale.suffix()),
            (x, y),
            ("sans-serif", 13),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Contiguous runs of non-null points; a null breaks the line.
fn line_segments(years: &[f64], points: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (x, y) in years.iter().zip(points) {
        match y {
            Some(y) => current.push((*x, *y)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Padded value range; bar charts always include zero.
fn value_bounds(series: &[Series], include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = series
        .iter()
        .flat_map(|s| s.points.iter().flatten().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo {
        (hi - lo) * 0.1
    } else {
        lo.abs().max(1.0) * 0.1
    };
    (lo - pad, hi + pad)
}

fn year_label(x: f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{:.0}", x)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("finstat-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn row(fy: i32, revenue: Option<f64>, net_margin: Option<f64>) -> DisplayRow {
        DisplayRow {
            fy,
            revenue,
            net_margin,
            ..Default::default()
        }
    }

    #[test]
    fn test_line_segments_break_on_null() {
        let years = [2020.0, 2021.0, 2022.0, 2023.0];
        let segments = line_segments(&years, &[Some(1.0), None, Some(3.0), Some(4.0)]);
        assert_eq!(
            segments,
            vec![vec![(2020.0, 1.0)], vec![(2022.0, 3.0), (2023.0, 4.0)]]
        );
        assert!(line_segments(&years, &[None, None, None, None]).is_empty());
    }

    #[test]
    fn test_value_bounds() {
        let series = [Series {
            label: "x",
            points: vec![Some(10.0), None, Some(20.0)],
        }];
        assert_eq!(value_bounds(&series, false), (9.0, 21.0));
        let (lo, hi) = value_bounds(&series, true);
        assert!((lo + 2.0).abs() < 1e-12);
        assert!((hi - 22.0).abs() < 1e-12);
        assert_eq!(value_bounds(&[], false), (0.0, 1.0));
    }

    #[test]
    fn test_year_labels_only_on_whole_years() {
        assert_eq!(year_label(2023.0), "2023");
        assert_eq!(year_label(2022.5), "");
    }

    #[test]
    fn test_save_charts_skips_empty_columns() {
        let dir = scratch_dir("charts");
        let display = vec![
            row(2023, Some(121.2), Some(0.1)),
            row(2021, Some(80.0), None),
            row(2022, None, Some(0.08)),
        ];

        let charts = save_financial_charts(&display, "usd", &dir).unwrap();
        let keys: Vec<&str> = charts.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["revenue", "margins", "income_statement"]);
        for chart in &charts {
            let svg = fs::read_to_string(&chart.path).unwrap();
            assert!(svg.contains("<svg"));
            assert!(svg.contains(chart.title));
        }
        assert!(!dir.join("roe.svg").exists());

        let revenue = fs::read_to_string(dir.join("revenue.svg")).unwrap();
        assert!(revenue.contains("USD billions"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_table_draws_nothing() {
        let dir = scratch_dir("charts-empty");
        assert!(save_financial_charts(&[], "USD", &dir).unwrap().is_empty());
        assert!(!dir.exists());
    }
}
