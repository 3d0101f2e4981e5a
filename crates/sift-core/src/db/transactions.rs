//! Ledger table operations
//!
//! Both ledger tables share one column set; `LedgerTable::table_name` is the
//! only text ever interpolated into these queries.

use std::collections::HashSet;

use rusqlite::{params, Row};
use serde::Serialize;
use tracing::{debug, warn};

use super::Database;
use crate::error::Result;
use crate::models::{Category, LedgerTable, Transaction};

const COLUMNS: &str =
    "account_id, transaction_id, amount, source, time, vendor, category, location, description";

/// Row counts for one ledger table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: i64,
    pub uncategorized: i64,
    pub vendors: i64,
}

fn parse_category(label: &str, transaction_id: &str) -> Option<Category> {
    if label.is_empty() {
        return None;
    }
    match label.parse() {
        Ok(category) => Some(category),
        Err(_) => {
            warn!(transaction_id, category = label, "Unknown category in ledger");
            None
        }
    }
}

fn map_transaction_row(row: &Row) -> rusqlite::Result<Transaction> {
    let transaction_id: String = row.get(1)?;
    let category: String = row.get(6)?;
    Ok(Transaction {
        account_id: row.get(0)?,
        category: parse_category(&category, &transaction_id),
        transaction_id,
        amount: row.get(2)?,
        source: row.get(3)?,
        time: row.get(4)?,
        vendor: row.get(5)?,
        location: row.get(7)?,
        description: row.get(8)?,
    })
}

impl Database {
    /// Ids already stored, excluding the empty id and the backfill marker
    pub fn existing_transaction_ids(
        &self,
        table: LedgerTable,
        backfill_marker: &str,
    ) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT transaction_id FROM {} WHERE transaction_id != '' AND transaction_id != ?",
            table.table_name()
        ))?;

        let ids = stmt
            .query_map(params![backfill_marker], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;

        debug!(table = %table, count = ids.len(), "Loaded stored transaction ids");
        Ok(ids)
    }

    /// Categorized `(vendor, category)` pairs, oldest first
    ///
    /// Ordered by posting time then insertion order, so replaying them into a
    /// cache leaves the most recent category for each vendor.
    pub fn vendor_category_history(&self, table: LedgerTable) -> Result<Vec<(String, Category)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT transaction_id, vendor, category FROM {}
             WHERE vendor != '' AND category != ''
             ORDER BY time, rowid",
            table.table_name()
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, vendor, label)| {
                parse_category(&label, &id).map(|category| (vendor, category))
            })
            .collect())
    }

    /// Insert a batch in one SQL transaction
    ///
    /// Either every row is stored or none is.
    pub fn insert_transactions(&self, table: LedgerTable, txs: &[Transaction]) -> Result<usize> {
        if txs.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        {
            let mut stmt = db_tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                table.table_name(),
                COLUMNS
            ))?;
            for tx in txs {
                stmt.execute(params![
                    tx.account_id,
                    tx.transaction_id,
                    tx.amount,
                    tx.source,
                    tx.time,
                    tx.vendor,
                    tx.category_label(),
                    tx.location,
                    tx.description,
                ])?;
            }
        }
        db_tx.commit()?;

        debug!(table = %table, count = txs.len(), "Inserted transactions");
        Ok(txs.len())
    }

    /// Most recent transactions first
    pub fn list_transactions(&self, table: LedgerTable, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY time DESC, rowid DESC LIMIT ?",
            COLUMNS,
            table.table_name()
        ))?;

        let txs = stmt
            .query_map(params![limit], map_transaction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Rows with an empty category, oldest first
    pub fn uncategorized_transactions(&self, table: LedgerTable) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE category = '' ORDER BY time, rowid",
            COLUMNS,
            table.table_name()
        ))?;

        let txs = stmt
            .query_map([], map_transaction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    pub fn count_transactions(&self, table: LedgerTable) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Set a stored row's category if it has none
    ///
    /// Returns false when the row is missing or already categorized.
    pub fn update_category(
        &self,
        table: LedgerTable,
        transaction_id: &str,
        category: Category,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET category = ? WHERE transaction_id = ? AND category = ''",
                table.table_name()
            ),
            params![category.as_str(), transaction_id],
        )?;
        Ok(changed > 0)
    }

    pub fn ledger_stats(&self, table: LedgerTable) -> Result<LedgerStats> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            &format!(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN category = '' THEN 1 ELSE 0 END), 0),
                        COUNT(DISTINCT NULLIF(vendor, ''))
                 FROM {}",
                table.table_name()
            ),
            [],
            |row| {
                Ok(LedgerStats {
                    total: row.get(0)?,
                    uncategorized: row.get(1)?,
                    vendors: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}
