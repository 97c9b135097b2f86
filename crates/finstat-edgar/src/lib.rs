#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR client for XBRL company facts.
//!
//! # Example
//!
//! ```no_run
//! use finstat_core::{FactsProvider, Ticker};
//! use finstat_edgar::EdgarClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let ticker = Ticker::new("AAPL");
//!     let profile = client.company_profile(&ticker).await?;
//!     println!("Company: {} (CIK: {})", profile.name, profile.cik);
//!
//!     let facts = client.company_facts(&ticker).await?;
//!     println!("Observations: {}", facts.observation_count());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use finstat_core::{CompanyFacts, CompanyProfile, FactsProvider, FinError, Result, Ticker};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            last_request: now.checked_sub(min_interval).unwrap_or(now),
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR client.
///
/// Resolves tickers to CIKs and downloads company facts. The ticker map is fetched once
/// per client and reused. Requests share one rate limiter, so a single client can be used
/// from many tasks.
#[derive(Debug, Clone)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    tickers: Arc<OnceCell<HashMap<String, CompanyTickerInfo>>>,
}

impl EdgarClient {
    /// Create a new EDGAR client with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns [`FinError::InvalidParameter`] for an empty user agent and
    /// [`FinError::Network`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        if user_agent.trim().is_empty() {
            return Err(FinError::InvalidParameter(
                "SEC requests need a user agent".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FinError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR client with a custom HTTP client.
    ///
    /// The client must already carry an identifying user agent.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            tickers: Arc::new(OnceCell::new()),
        }
    }

    /// Look up a company's CIK number from its ticker symbol.
    ///
    /// # Returns
    /// The company's CIK number as a zero-padded 10-digit string
    ///
    /// # Errors
    /// [`FinError::InvalidParameter`] for an empty ticker, [`FinError::SymbolNotFound`]
    /// when the SEC does not list it.
    pub async fn get_cik(&self, ticker: &str) -> Result<String> {
        self.lookup(ticker).await.map(|info| pad_cik(info.cik_str))
    }

    async fn lookup(&self, ticker: &str) -> Result<&CompanyTickerInfo> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(FinError::InvalidParameter("Empty ticker".to_string()));
        }

        let tickers = self
            .tickers
            .get_or_try_init(|| self.fetch_company_tickers())
            .await?;
        let info = find_ticker(tickers, ticker)
            .ok_or_else(|| FinError::SymbolNotFound(ticker.to_uppercase()))?;
        debug!("Found CIK {} for ticker {}", info.cik_str, ticker);
        Ok(info)
    }

    async fn fetch_company_tickers(&self) -> Result<HashMap<String, CompanyTickerInfo>> {
        debug!("Fetching company tickers from SEC");
        let body = self.get_text(COMPANY_TICKERS_URL).await?;
        serde_json::from_str(&body)
            .map_err(|e| FinError::Parse(format!("Failed to parse company tickers: {}", e)))
    }

    /// Fetch company facts from SEC EDGAR.
    ///
    /// # Errors
    /// [`FinError::SymbolNotFound`] when the company has no XBRL facts,
    /// [`FinError::Network`] on transport failures and [`FinError::Parse`] or
    /// [`FinError::Structure`] for an unreadable document.
    #[instrument(skip(self))]
    pub async fn fetch_company_facts(&self, cik: &str) -> Result<CompanyFacts> {
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{:0>10}.json",
            EDGAR_BASE_URL,
            cik.trim()
        );
        debug!("Fetching company facts from {}", url);
        let body = self.get_text(&url).await?;
        let facts = CompanyFacts::from_json(&body)?;
        debug!(observations = facts.observation_count(), "Fetched company facts");
        Ok(facts)
    }

    /// Fetch company submissions/filings metadata.
    ///
    /// # Errors
    /// [`FinError::Network`] on transport failures, [`FinError::Parse`] for invalid JSON.
    #[instrument(skip(self))]
    pub async fn fetch_submissions(&self, cik: &str) -> Result<CompanySubmissions> {
        let url = format!("{}/submissions/CIK{:0>10}.json", EDGAR_BASE_URL, cik.trim());
        debug!("Fetching company submissions from {}", url);
        let body = self.get_text(&url).await?;
        serde_json::from_str(&body)
            .map_err(|e| FinError::Parse(format!("Failed to parse submissions: {}", e)))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FinError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FinError::SymbolNotFound(format!("{} not found", url)));
        }
        if !status.is_success() {
            return Err(FinError::Network(format!(
                "Failed to fetch {}: HTTP {}",
                url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| FinError::Network(e.to_string()))
    }
}

#[async_trait]
impl FactsProvider for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn company_profile(&self, ticker: &Ticker) -> Result<CompanyProfile> {
        let info = self.lookup(ticker.as_str()).await?;
        let cik = pad_cik(info.cik_str);

        let name = match self.fetch_submissions(&cik).await {
            Ok(submissions) => submissions.name,
            Err(e) => {
                warn!("Failed to fetch submissions for {}: {}", ticker, e);
                None
            }
        };

        Ok(CompanyProfile {
            ticker: ticker.clone(),
            name: registrant_name(name, &info.title, ticker),
            cik,
        })
    }

    async fn company_facts(&self, ticker: &Ticker) -> Result<CompanyFacts> {
        let cik = self.get_cik(ticker.as_str()).await?;
        self.fetch_company_facts(&cik).await
    }
}

fn pad_cik(cik: u64) -> String {
    format!("{:0>10}", cik)
}

fn find_ticker<'a>(
    tickers: &'a HashMap<String, CompanyTickerInfo>,
    ticker: &str,
) -> Option<&'a CompanyTickerInfo> {
    tickers
        .values()
        .find(|company| company.ticker.eq_ignore_ascii_case(ticker))
}

/// Submissions name, then the ticker map title, then the ticker itself.
fn registrant_name(submissions: Option<String>, title: &str, ticker: &Ticker) -> String {
    submissions
        .filter(|n| !n.trim().is_empty())
        .or_else(|| (!title.trim().is_empty()).then(|| title.to_string()))
        .unwrap_or_else(|| ticker.to_string())
}

// =============================================================================
// SEC API Response Types
// =============================================================================

/// Company ticker information from SEC JSON.
#[derive(Debug, Clone, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
    /// Company name
    #[serde(default)]
    title: String,
}

/// Company submissions/filings metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySubmissions {
    /// Registrant name
    #[serde(default)]
    pub name: Option<String>,
    /// Listed tickers
    #[serde(default)]
    pub tickers: Vec<String>,
    /// List of exchanges
    #[serde(default)]
    pub exchanges: Vec<String>,
    /// SIC description
    #[serde(default)]
    pub sic_description: Option<String>,
    /// Fiscal year end as `MMDD`
    #[serde(default)]
    pub fiscal_year_end: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TICKERS: &str = r#"{
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
        "2": {"cik_str": 1067983, "ticker": "BRK-B", "title": ""}
    }"#;

    fn tickers() -> HashMap<String, CompanyTickerInfo> {
        serde_json::from_str(TICKERS).unwrap()
    }

    #[test]
    fn test_client_construction() {
        let client = EdgarClient::new("Test/1.0 (test@example.com)").unwrap();
        assert_eq!(client.name(), "SEC EDGAR");
        assert!(matches!(
            EdgarClient::new("  "),
            Err(FinError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cik_padding() {
        assert_eq!(pad_cik(320193), "0000320193");
        assert_eq!(pad_cik(320193).len(), 10);
    }

    #[test]
    fn test_find_ticker_case_insensitive() {
        let map = tickers();
        assert_eq!(find_ticker(&map, "msft").map(|c| c.cik_str), Some(789019));
        assert_eq!(find_ticker(&map, "brk-b").map(|c| c.cik_str), Some(1067983));
        assert!(find_ticker(&map, "ZZZZ").is_none());
    }

    #[test]
    fn test_registrant_name_fallbacks() {
        let ticker = Ticker::new("brk-b");
        assert_eq!(
            registrant_name(Some("Apple Inc.".into()), "APPLE", &ticker),
            "Apple Inc."
        );
        assert_eq!(registrant_name(None, "Berkshire", &ticker), "Berkshire");
        assert_eq!(registrant_name(Some(" ".into()), "", &ticker), "BRK-B");
    }

    #[test]
    fn test_parse_submissions() {
        let json = r#"{"cik": "320193", "name": "Apple Inc.", "tickers": ["AAPL"],
            "exchanges": ["Nasdaq"], "sicDescription": "Electronic Computers",
            "fiscalYearEnd": "0928", "filings": {"recent": {}}}"#;
        let submissions: CompanySubmissions = serde_json::from_str(json).unwrap();
        assert_eq!(submissions.name.as_deref(), Some("Apple Inc."));
        assert_eq!(submissions.fiscal_year_end.as_deref(), Some("0928"));
        assert_eq!(submissions.exchanges, vec!["Nasdaq"]);
    }

    #[tokio::test]
    async fn test_empty_ticker_rejected_without_request() {
        let client = EdgarClient::new("Test/1.0 (test@example.com)").unwrap();
        assert!(matches!(
            client.get_cik("   ").await,
            Err(FinError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_spacing() {
        let mut limiter = RateLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
