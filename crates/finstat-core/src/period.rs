//! Fiscal period and filing form definitions.
//!
//! This module defines [`FiscalPeriod`] for the `fp` marker carried by each
//! disclosed fact and [`FormType`] for the filing form that reported it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fiscal period marker of a disclosed fact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// Full fiscal year (`FY`).
    FullYear,
    /// Fiscal quarter (`Q1`..`Q4`).
    Quarter(u8),
    /// Fiscal half year (`H1`, `H2`).
    Half(u8),
    /// Any other marker, kept verbatim.
    Other(String),
}

impl FiscalPeriod {
    /// Parses an EDGAR `fp` marker. Unknown markers are preserved as [`FiscalPeriod::Other`].
    #[must_use]
    pub fn parse(marker: &str) -> Self {
        let marker = marker.trim().to_uppercase();
        if marker == "FY" {
            return Self::FullYear;
        }

        let ordinal = |prefix: char, max: u8| {
            marker
                .strip_prefix(prefix)
                .and_then(|rest| rest.parse::<u8>().ok())
                .filter(|n| (1..=max).contains(n))
        };

        if let Some(q) = ordinal('Q', 4) {
            Self::Quarter(q)
        } else if let Some(h) = ordinal('H', 2) {
            Self::Half(h)
        } else {
            Self::Other(marker)
        }
    }

    /// Returns true for the full fiscal year marker.
    #[must_use]
    pub const fn is_full_year(&self) -> bool {
        matches!(self, Self::FullYear)
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullYear => write!(f, "FY"),
            Self::Quarter(q) => write!(f, "Q{q}"),
            Self::Half(h) => write!(f, "H{h}"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Filing form that reported a fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report (`10-K`, `20-F`, `40-F`, and their amendments).
    Annual,
    /// Transition report covering a changed fiscal year (`10-KT`).
    Transition,
    /// Quarterly report (`10-Q`, `6-K`, and amendments).
    Quarterly,
    /// Anything else (registration statements, proxies, 8-K).
    Other,
}

impl FormType {
    /// Classifies an EDGAR form name.
    #[must_use]
    pub fn classify(form: &str) -> Self {
        let form = form.trim().to_uppercase();
        let base = form.strip_suffix("/A").unwrap_or(&form);
        match base {
            "10-K" | "20-F" | "40-F" => Self::Annual,
            "10-KT" | "20-FT" => Self::Transition,
            "10-Q" | "10-QT" | "6-K" => Self::Quarterly,
            _ => Self::Other,
        }
    }

    /// Returns true if the form is a full annual report.
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        matches!(self, Self::Annual)
    }
}
