//! Canonical metrics and their XBRL concept aliases.
//!
//! Different companies (and the same company over time) report the same line
//! item under different tags. Each [`MetricDefinition`] lists the acceptable
//! concepts in preference order, most specific or modern tag first. The table
//! is plain data: supporting another taxonomy means appending aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FinError;

/// A canonical financial statement line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Total revenue.
    Revenue,
    /// Gross profit.
    GrossProfit,
    /// Operating income (loss).
    OperatingIncome,
    /// Net income (loss).
    NetIncome,
    /// Cash flow from operating activities.
    Cfo,
    /// Capital expenditures (payments for property, plant and equipment).
    Capex,
    /// Cash and cash equivalents at period end.
    Cash,
    /// Stockholders' equity at period end.
    Equity,
}

impl Metric {
    /// All metrics in table column order.
    pub const ALL: [Self; 8] = [
        Self::Revenue,
        Self::GrossProfit,
        Self::OperatingIncome,
        Self::NetIncome,
        Self::Cfo,
        Self::Capex,
        Self::Cash,
        Self::Equity,
    ];

    /// Column name of the metric.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::GrossProfit => "gross_profit",
            Self::OperatingIncome => "operating_income",
            Self::NetIncome => "net_income",
            Self::Cfo => "cfo",
            Self::Capex => "capex",
            Self::Cash => "cash",
            Self::Equity => "equity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = FinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| FinError::InvalidParameter(format!("Unknown metric: {s}")))
    }
}

/// A metric together with its ordered list of acceptable concept aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricDefinition {
    /// The canonical metric.
    pub metric: Metric,
    /// Taxonomy-qualified concepts, most preferred first.
    pub aliases: &'static [&'static str],
}

impl MetricDefinition {
    /// Creates a definition from a metric and its aliases.
    #[must_use]
    pub const fn new(metric: Metric, aliases: &'static [&'static str]) -> Self {
        Self { metric, aliases }
    }
}

/// Default alias table covering US-GAAP filers, with IFRS fallbacks for foreign private issuers.
pub const DEFAULT_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new(
        Metric::Revenue,
        &[
            "us-gaap:RevenueFromContractWithCustomerExcludingAssessedTax",
            "us-gaap:Revenues",
            "us-gaap:SalesRevenueNet",
            "us-gaap:RevenueFromContractWithCustomerIncludingAssessedTax",
            "us-gaap:SalesRevenueGoodsNet",
            "ifrs-full:Revenue",
        ],
    ),
    MetricDefinition::new(
        Metric::GrossProfit,
        &["us-gaap:GrossProfit", "ifrs-full:GrossProfit"],
    ),
    MetricDefinition::new(
        Metric::OperatingIncome,
        &[
            "us-gaap:OperatingIncomeLoss",
            "ifrs-full:ProfitLossFromOperatingActivities",
        ],
    ),
    MetricDefinition::new(
        Metric::NetIncome,
        &[
            "us-gaap:NetIncomeLoss",
            "us-gaap:ProfitLoss",
            "us-gaap:NetIncomeLossAvailableToCommonStockholdersBasic",
            "ifrs-full:ProfitLoss",
        ],
    ),
    MetricDefinition::new(
        Metric::Cfo,
        &[
            "us-gaap:NetCashProvidedByUsedInOperatingActivities",
            "us-gaap:NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
            "ifrs-full:CashFlowsFromUsedInOperatingActivities",
        ],
    ),
    MetricDefinition::new(
        Metric::Capex,
        &[
            "us-gaap:PaymentsToAcquirePropertyPlantAndEquipment",
            "us-gaap:PaymentsToAcquireProductiveAssets",
            "us-gaap:PaymentsForCapitalImprovements",
            "ifrs-full:PurchaseOfPropertyPlantAndEquipmentClassifiedAsInvestingActivities",
        ],
    ),
    MetricDefinition::new(
        Metric::Cash,
        &[
            "us-gaap:CashAndCashEquivalentsAtCarryingValue",
            "us-gaap:CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
            "us-gaap:Cash",
            "ifrs-full:CashAndCashEquivalents",
        ],
    ),
    MetricDefinition::new(
        Metric::Equity,
        &[
            "us-gaap:StockholdersEquity",
            "us-gaap:StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            "ifrs-full:Equity",
        ],
    ),
];
