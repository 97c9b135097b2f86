//! In-memory store implementation.

use async_trait::async_trait;
use chrono::Utc;
use finstat_core::{
    CompanyMeta, FinError, FinancialsStore, LongRow, Result, RunRecord, RunStatus, Ticker,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{run_id_base, unique_run_id};

/// Primary key of `annual_long`.
type LongKey = (Ticker, i32, String);

/// In-memory store for tests and dry runs.
///
/// Same semantics as the SQLite store; data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    annual: RwLock<BTreeMap<LongKey, LongRow>>,
    meta: RwLock<HashMap<Ticker, CompanyMeta>>,
    runs: RwLock<Vec<RunRecord>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FinancialsStore for InMemoryStore {
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_annual_long(&self, rows: &[LongRow]) -> Result<()> {
        let mut annual = self.annual.write().await;
        for row in rows {
            let key = (row.ticker.clone(), row.fy, row.metric.clone());
            annual.insert(key, row.clone());
        }
        debug!("Upserted {} annual rows", rows.len());
        Ok(())
    }

    async fn annual_long(&self, ticker: &Ticker) -> Result<Vec<LongRow>> {
        // BTreeMap order is (ticker, fy, metric)
        let annual = self.annual.read().await;
        Ok(annual
            .values()
            .filter(|row| &row.ticker == ticker)
            .cloned()
            .collect())
    }

    async fn upsert_company_meta(&self, meta: &CompanyMeta) -> Result<()> {
        self.meta
            .write()
            .await
            .insert(meta.ticker.clone(), meta.clone());
        Ok(())
    }

    async fn company_meta(&self, ticker: &Ticker) -> Result<Option<CompanyMeta>> {
        Ok(self.meta.read().await.get(ticker).cloned())
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn start_run(&self, ticker: &Ticker) -> Result<RunRecord> {
        let started_at = Utc::now();
        let mut runs = self.runs.write().await;

        let base = run_id_base(ticker, started_at);
        let run_id = unique_run_id(&base, |id| runs.iter().any(|r| r.run_id == id));

        let record = RunRecord {
            run_id,
            ticker: ticker.clone(),
            started_at,
            finished_at: started_at,
            status: RunStatus::Running,
            message: None,
        };
        runs.push(record.clone());
        debug!("Started run {}", record.run_id);
        Ok(record)
    }

    async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<()> {
        let mut runs = self.runs.write().await;
        let run = runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| FinError::Storage(format!("Unknown run: {}", run_id)))?;
        run.finished_at = Utc::now();
        run.status = status;
        run.message = message.map(str::to_string);
        Ok(())
    }

    async fn runs(&self, ticker: &Ticker) -> Result<Vec<RunRecord>> {
        Ok(self
            .runs
            .read()
            .await
            .iter()
            .filter(|r| &r.ticker == ticker)
            .cloned()
            .collect())
    }
}
