//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use finstat_core::{
    CompanyMeta, FinError, FinancialsStore, LongRow, Result, RunRecord, RunStatus, Ticker,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::{run_id_base, unique_run_id};

/// SQLite-backed store for exported financials.
///
/// Data is kept in a single database file and survives restarts. Dates are stored as
/// ISO-8601 text, timestamps as RFC 3339.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| FinError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| FinError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FinError::Storage(e.to_string()))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS annual_long (
                ticker TEXT NOT NULL,
                fy INTEGER NOT NULL,
                fiscal_year_end TEXT,
                metric TEXT NOT NULL,
                value REAL,
                unit TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (ticker, fy, metric)
            );
            CREATE TABLE IF NOT EXISTS company_meta (
                ticker TEXT PRIMARY KEY,
                cik TEXT,
                company_name TEXT,
                latest_fy INTEGER,
                latest_fy_end TEXT,
                concept_map_json TEXT,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS run_log (
                run_id TEXT PRIMARY KEY,
                ticker TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_run_log_ticker ON run_log(ticker);",
        )
        .map_err(|e| FinError::Storage(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

// =============================================================================
// Column conversions
// =============================================================================

fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn date_from_sql(text: Option<String>) -> Result<Option<NaiveDate>> {
    text.filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| FinError::Parse(format!("Invalid date {}: {}", s, e)))
        })
        .transpose()
}

fn timestamp_from_sql(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| FinError::Parse(format!("Invalid timestamp {}: {}", text, e)))
}

type RunColumns = (String, String, String, String, String, Option<String>);

fn run_columns(row: &Row<'_>) -> rusqlite::Result<RunColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn run_from_columns(cols: RunColumns) -> Result<RunRecord> {
    let (run_id, ticker, started_at, finished_at, status, message) = cols;
    Ok(RunRecord {
        run_id,
        ticker: Ticker::new(ticker),
        started_at: timestamp_from_sql(&started_at)?,
        finished_at: timestamp_from_sql(&finished_at)?,
        status: status.parse()?,
        message,
    })
}

#[async_trait]
impl FinancialsStore for SqliteStore {
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_annual_long(&self, rows: &[LongRow]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| FinError::Storage(e.to_string()))?;

        for row in rows {
            tx.execute(
                "INSERT INTO annual_long (ticker, fy, fiscal_year_end, metric, value, unit, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(ticker, fy, metric) DO UPDATE SET
                     fiscal_year_end = excluded.fiscal_year_end,
                     value = excluded.value,
                     unit = excluded.unit,
                     updated_at = excluded.updated_at",
                params![
                    row.ticker.as_str(),
                    row.fy,
                    date_to_sql(row.fiscal_year_end),
                    row.metric,
                    row.value,
                    row.unit,
                    row.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FinError::Storage(e.to_string()))?;
        }

        tx.commit().map_err(|e| FinError::Storage(e.to_string()))?;
        debug!("Upserted {} annual rows", rows.len());
        Ok(())
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn annual_long(&self, ticker: &Ticker) -> Result<Vec<LongRow>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT ticker, fy, fiscal_year_end, metric, value, unit, updated_at
                 FROM annual_long
                 WHERE ticker = ?1
                 ORDER BY fy ASC, metric ASC",
            )
            .map_err(|e| FinError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![ticker.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(|e| FinError::Storage(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (ticker, fy, fiscal_year_end, metric, value, unit, updated_at) =
                row.map_err(|e| FinError::Storage(e.to_string()))?;
            out.push(LongRow {
                ticker: Ticker::new(ticker),
                fy,
                fiscal_year_end: date_from_sql(fiscal_year_end)?,
                metric,
                value,
                unit: unit.unwrap_or_default(),
                updated_at: timestamp_from_sql(&updated_at)?,
            });
        }

        debug!("Loaded {} annual rows", out.len());
        Ok(out)
    }

    #[instrument(skip(self, meta), fields(ticker = %meta.ticker))]
    async fn upsert_company_meta(&self, meta: &CompanyMeta) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO company_meta
             (ticker, cik, company_name, latest_fy, latest_fy_end, concept_map_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(ticker) DO UPDATE SET
                 cik = excluded.cik,
                 company_name = excluded.company_name,
                 latest_fy = excluded.latest_fy,
                 latest_fy_end = excluded.latest_fy_end,
                 concept_map_json = excluded.concept_map_json,
                 updated_at = excluded.updated_at",
            params![
                meta.ticker.as_str(),
                meta.cik,
                meta.company_name,
                meta.latest_fy,
                date_to_sql(meta.latest_fy_end),
                meta.concept_map_json,
                meta.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| FinError::Storage(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn company_meta(&self, ticker: &Ticker) -> Result<Option<CompanyMeta>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT ticker, cik, company_name, latest_fy, latest_fy_end, concept_map_json, updated_at
                 FROM company_meta WHERE ticker = ?1",
                params![ticker.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<i32>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| FinError::Storage(e.to_string()))?;

        let Some((ticker, cik, company_name, latest_fy, latest_fy_end, concept_map_json, updated_at)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(CompanyMeta {
            ticker: Ticker::new(ticker),
            cik: cik.unwrap_or_default(),
            company_name: company_name.unwrap_or_default(),
            latest_fy,
            latest_fy_end: date_from_sql(latest_fy_end)?,
            concept_map_json: concept_map_json.unwrap_or_default(),
            updated_at: timestamp_from_sql(&updated_at)?,
        }))
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn start_run(&self, ticker: &Ticker) -> Result<RunRecord> {
        let started_at = Utc::now();
        let conn = self.lock()?;

        let base = run_id_base(ticker, started_at);
        let mut exists = conn
            .prepare("SELECT 1 FROM run_log WHERE run_id = ?1")
            .map_err(|e| FinError::Storage(e.to_string()))?;
        let run_id = unique_run_id(&base, |id| exists.exists(params![id]).unwrap_or(true));

        conn.execute(
            "INSERT INTO run_log (run_id, ticker, started_at, finished_at, status, message)
             VALUES (?1, ?2, ?3, ?3, ?4, NULL)",
            params![
                run_id,
                ticker.as_str(),
                started_at.to_rfc3339(),
                RunStatus::Running.as_str(),
            ],
        )
        .map_err(|e| FinError::Storage(e.to_string()))?;

        debug!("Started run {}", run_id);
        Ok(RunRecord {
            run_id,
            ticker: ticker.clone(),
            started_at,
            finished_at: started_at,
            status: RunStatus::Running,
            message: None,
        })
    }

    #[instrument(skip(self, message), fields(status = status.as_str()))]
    async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE run_log SET finished_at = ?1, status = ?2, message = ?3 WHERE run_id = ?4",
                params![Utc::now().to_rfc3339(), status.as_str(), message, run_id],
            )
            .map_err(|e| FinError::Storage(e.to_string()))?;

        if updated == 0 {
            return Err(FinError::Storage(format!("Unknown run: {}", run_id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn runs(&self, ticker: &Ticker) -> Result<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, ticker, started_at, finished_at, status, message
                 FROM run_log WHERE ticker = ?1
                 ORDER BY started_at ASC, run_id ASC",
            )
            .map_err(|e| FinError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![ticker.as_str()], run_columns)
            .map_err(|e| FinError::Storage(e.to_string()))?;

        rows.map(|row| run_from_columns(row.map_err(|e| FinError::Storage(e.to_string()))?))
            .collect()
    }
}
