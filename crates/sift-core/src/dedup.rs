//! Exclusion of transactions already present in the destination table

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::Transaction;

/// Placeholder id carried by historical rows that were backfilled without one
pub const LEGACY_BACKFILL_MARKER: &str = "backfill";

/// Ids that mark incompletely migrated rows; never treated as "already stored"
pub fn is_sentinel_id(transaction_id: &str, backfill_marker: &str) -> bool {
    transaction_id.is_empty() || transaction_id == backfill_marker
}

/// Result of filtering a batch against stored ids
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Transactions to persist, in input order
    pub fresh: Vec<Transaction>,
    /// Ids dropped because they were stored already or repeated in the batch
    pub duplicates: Vec<String>,
    /// Records carrying a placeholder id; these can never be deduplicated
    pub sentinels: Vec<String>,
}

/// Keep only transactions whose id is not in `existing`.
///
/// A repeated id within the batch keeps its first occurrence. Placeholder ids
/// are dropped outright since `existing` never contains them.
pub fn filter_new(
    existing: &HashSet<String>,
    backfill_marker: &str,
    transactions: Vec<Transaction>,
) -> DedupOutcome {
    let mut seen: HashSet<String> = HashSet::new();
    let mut outcome = DedupOutcome::default();

    for tx in transactions {
        if is_sentinel_id(&tx.transaction_id, backfill_marker) {
            warn!(
                transaction_id = %tx.transaction_id,
                "Dropping record with placeholder transaction id"
            );
            outcome.sentinels.push(tx.transaction_id);
        } else if existing.contains(&tx.transaction_id) || !seen.insert(tx.transaction_id.clone()) {
            outcome.duplicates.push(tx.transaction_id);
        } else {
            outcome.fresh.push(tx);
        }
    }

    debug!(
        fresh = outcome.fresh.len(),
        duplicates = outcome.duplicates.len(),
        sentinels = outcome.sentinels.len(),
        "Filtered already-stored transactions"
    );
    outcome
}
