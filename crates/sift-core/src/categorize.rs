//! Categorization orchestrator
//!
//! Cache first, classifier second: transactions whose vendor is already known
//! are categorized locally, and everything left goes to the classifier in a
//! single call. Categorization is best-effort; a classifier failure leaves
//! categories empty and never fails the run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{ClassificationInput, Classifier};
use crate::cache::VendorCategoryCache;
use crate::models::Transaction;

/// Counters for one categorization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizeReport {
    /// Transactions that already had a category
    pub already_categorized: usize,
    /// Categorized from the vendor cache
    pub cache_hits: usize,
    /// Categorized by the classifier
    pub classified: usize,
    /// Still uncategorized afterwards
    pub unresolved: usize,
    /// Sent to the classifier while sharing a vendor with an earlier one in the batch
    pub repeated_vendors: usize,
    pub classifier_calls: usize,
    pub classifier_failed: bool,
}

pub struct Categorizer<'a> {
    classifier: &'a dyn Classifier,
}

impl<'a> Categorizer<'a> {
    pub fn new(classifier: &'a dyn Classifier) -> Self {
        Self { classifier }
    }

    /// Fill in categories in place, growing `cache` with what the classifier decides
    pub async fn categorize(
        &self,
        cache: &mut VendorCategoryCache,
        transactions: &mut [Transaction],
    ) -> CategorizeReport {
        let mut report = CategorizeReport::default();
        let mut pending: Vec<usize> = Vec::new();
        let mut pending_vendors = std::collections::HashSet::new();

        for (idx, tx) in transactions.iter_mut().enumerate() {
            if tx.is_categorized() {
                report.already_categorized += 1;
                continue;
            }
            match cache.lookup(&tx.vendor) {
                Some(category) => {
                    tx.assign_category(category);
                    report.cache_hits += 1;
                }
                None => {
                    if !tx.vendor.is_empty() && !pending_vendors.insert(tx.vendor.clone()) {
                        report.repeated_vendors += 1;
                    }
                    pending.push(idx);
                }
            }
        }

        debug!(
            cache_hits = report.cache_hits,
            pending = pending.len(),
            "Partitioned transactions"
        );

        if pending.is_empty() {
            return report;
        }

        let batch: Vec<ClassificationInput> = pending
            .iter()
            .map(|&idx| ClassificationInput::from(&transactions[idx]))
            .collect();

        report.classifier_calls = 1;
        let assignments = match self.classifier.classify(&batch).await {
            Ok(assignments) => assignments,
            Err(e) => {
                warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    transactions = batch.len(),
                    "Classification failed, leaving transactions uncategorized"
                );
                report.classifier_failed = true;
                report.unresolved = pending.len();
                return report;
            }
        };

        for &idx in &pending {
            let tx = &mut transactions[idx];
            match assignments.get(&tx.transaction_id) {
                Some(&category) => {
                    if tx.assign_category(category) {
                        report.classified += 1;
                        cache.record(&tx.vendor, category);
                    }
                }
                None => {
                    warn!(
                        transaction_id = %tx.transaction_id,
                        vendor = %tx.vendor,
                        "Classifier returned no category"
                    );
                    report.unresolved += 1;
                }
            }
        }

        info!(
            cache_hits = report.cache_hits,
            classified = report.classified,
            unresolved = report.unresolved,
            "Categorization complete"
        );
        report
    }
}
