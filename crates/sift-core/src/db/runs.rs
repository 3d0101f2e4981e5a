//! Ingest run history

use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{IngestRun, RunKind, RunStatus};

/// Counters written when a run completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub fetched: i64,
    pub skipped: i64,
    pub duplicates: i64,
    pub inserted: i64,
    pub cache_hits: i64,
    pub classified: i64,
}

fn map_run_row(row: &Row) -> rusqlite::Result<IngestRun> {
    let kind: String = row.get(1)?;
    let status: String = row.get(3)?;
    let started_at: String = row.get(11)?;
    let finished_at: Option<String> = row.get(12)?;

    Ok(IngestRun {
        id: row.get(0)?,
        kind: kind.parse().unwrap_or(RunKind::Transactions),
        account_id: row.get(2)?,
        status: status.parse().unwrap_or(RunStatus::Failed),
        fetched: row.get(4)?,
        skipped: row.get(5)?,
        duplicates: row.get(6)?,
        inserted: row.get(7)?,
        cache_hits: row.get(8)?,
        classified: row.get(9)?,
        error: row.get(10)?,
        started_at: parse_datetime(&started_at),
        finished_at: finished_at.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// Record the start of a run and return its id
    pub fn start_run(&self, kind: RunKind, account_id: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ingest_runs (kind, account_id, status) VALUES (?, ?, ?)",
            params![kind.as_str(), account_id, RunStatus::Running.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finish_run(&self, run_id: i64, counts: &RunCounts) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE ingest_runs
            SET status = ?, fetched = ?, skipped = ?, duplicates = ?, inserted = ?,
                cache_hits = ?, classified = ?, finished_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                RunStatus::Completed.as_str(),
                counts.fetched,
                counts.skipped,
                counts.duplicates,
                counts.inserted,
                counts.cache_hits,
                counts.classified,
                run_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Ingest run {}", run_id)));
        }
        Ok(())
    }

    pub fn fail_run(&self, run_id: i64, error: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE ingest_runs SET status = ?, error = ?, finished_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![RunStatus::Failed.as_str(), error, run_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Ingest run {}", run_id)));
        }
        Ok(())
    }

    /// Most recent runs first
    pub fn list_runs(&self, limit: i64) -> Result<Vec<IngestRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kind, account_id, status, fetched, skipped, duplicates, inserted,
                   cache_hits, classified, error, started_at, finished_at
            FROM ingest_runs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit], map_run_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }
}
