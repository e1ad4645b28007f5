use crate::model::{KeywordReport, StorageError};
use crate::report::describe_discrepancies;
use crate::utils::parse_datetime;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

/// Status a keyword had in the most recent recorded run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousStatus {
    pub run_id: i64,
    pub status: String,
    pub flagged: bool,
    pub relevance_pct: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// History of validation runs, so status changes between runs can be spotted.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Opens the database and creates the tables if needed.
    pub fn new(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                keyword_count INTEGER NOT NULL,
                flagged_count INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS keyword_reports (
                run_id INTEGER NOT NULL REFERENCES runs(id),
                input_row INTEGER NOT NULL,
                keyword TEXT NOT NULL,
                status TEXT NOT NULL,
                flagged INTEGER NOT NULL,
                failing_products INTEGER NOT NULL,
                total_products INTEGER NOT NULL,
                relevance_pct REAL,
                discrepancies TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (run_id, input_row)
            );

            CREATE INDEX IF NOT EXISTS idx_keyword_reports_keyword
                ON keyword_reports (keyword);
            "
        )?;

        Ok(Self { conn })
    }

    /// Stores a whole batch atomically and returns the new run id.
    pub fn record_run(
        &self,
        started_at: DateTime<Utc>,
        reports: &[KeywordReport],
    ) -> Result<i64, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let flagged_count = reports.iter().filter(|r| r.flagged()).count();

        tx.execute(
            "INSERT INTO runs (started_at, finished_at, keyword_count, flagged_count)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                started_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                reports.len(),
                flagged_count,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO keyword_reports (
                    run_id, input_row, keyword, status, flagged,
                    failing_products, total_products, relevance_pct, discrepancies
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for report in reports {
                stmt.execute(params![
                    run_id,
                    report.keyword.row,
                    &report.keyword.text,
                    report.status.as_str(),
                    report.flagged(),
                    report.failing_count,
                    report.total_count,
                    report.relevance_pct(),
                    describe_discrepancies(report),
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Latest recorded status of `keyword`, if it was ever checked.
    pub fn last_status(&self, keyword: &str) -> Result<Option<PreviousStatus>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT k.run_id, k.status, k.flagged, k.relevance_pct, r.finished_at
             FROM keyword_reports k JOIN runs r ON r.id = k.run_id
             WHERE k.keyword = ?1
             ORDER BY k.run_id DESC, k.input_row ASC
             LIMIT 1",
        )?;

        let mut rows = stmt.query(params![keyword])?;
        if let Some(row) = rows.next()? {
            let finished_at: String = row.get(4)?;
            let recorded_at = parse_datetime(&finished_at)
                .ok_or_else(|| StorageError::InvalidDatetime(finished_at.clone()))?;
            Ok(Some(PreviousStatus {
                run_id: row.get(0)?,
                status: row.get(1)?,
                flagged: row.get(2)?,
                relevance_pct: row.get(3)?,
                recorded_at,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn run_count(&self) -> Result<usize, StorageError> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }
}
