//! Ingestion pipeline
//!
//! fetch → normalize → dedup → categorize → one atomic insert, with every run
//! recorded in `ingest_runs`. Normalization and classification problems
//! degrade the run; persistence failures end it.

use tracing::{info, warn};

use crate::ai::ClassifierClient;
use crate::bank::BankFeed;
use crate::cache::VendorCategoryCache;
use crate::categorize::{CategorizeReport, Categorizer};
use crate::db::{Database, RunCounts};
use crate::dedup::{filter_new, LEGACY_BACKFILL_MARKER};
use crate::error::{Error, Result};
use crate::models::{AccountRef, IngestReport, LedgerTable, RunKind};
use crate::normalize::normalize_batch;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Placeholder id that never counts as already stored
    pub backfill_marker: String,
    /// Categorize fresh transactions before storing them
    pub classify: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            backfill_marker: LEGACY_BACKFILL_MARKER.to_string(),
            classify: true,
        }
    }
}

pub struct Pipeline {
    db: Database,
    feed: Box<dyn BankFeed>,
    classifier: ClassifierClient,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(db: Database, feed: Box<dyn BankFeed>, classifier: ClassifierClient) -> Self {
        Self {
            db,
            feed,
            classifier,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Ingest everyday spending into `transactions`, categorizing new rows
    pub async fn ingest_transactions(&self, account: &AccountRef) -> Result<IngestReport> {
        self.record_ingest(
            RunKind::Transactions,
            LedgerTable::Transactions,
            account,
            self.options.classify,
        )
        .await
    }

    /// Ingest rent account activity into `rent_transactions`, uncategorized
    pub async fn ingest_rent(&self, account: &AccountRef) -> Result<IngestReport> {
        self.record_ingest(RunKind::Rent, LedgerTable::Rent, account, false)
            .await
    }

    /// Categorize stored rows that still have no category
    pub async fn recategorize(&self, table: LedgerTable) -> Result<CategorizeReport> {
        let run_id = self.db.start_run(RunKind::Recategorize, None)?;

        match self.recategorize_inner(table).await {
            Ok((report, updated)) => {
                self.db.finish_run(
                    run_id,
                    &RunCounts {
                        fetched: (report.already_categorized
                            + report.cache_hits
                            + report.classified
                            + report.unresolved) as i64,
                        inserted: updated as i64,
                        cache_hits: report.cache_hits as i64,
                        classified: report.classified as i64,
                        ..Default::default()
                    },
                )?;
                Ok(report)
            }
            Err(e) => {
                self.mark_failed(run_id, &e);
                Err(e)
            }
        }
    }

    async fn record_ingest(
        &self,
        kind: RunKind,
        table: LedgerTable,
        account: &AccountRef,
        classify: bool,
    ) -> Result<IngestReport> {
        let run_id = self.db.start_run(kind, Some(&account.account_id))?;

        match self.ingest(table, account, classify).await {
            Ok(report) => {
                let categorization = report.categorization.clone().unwrap_or_default();
                self.db.finish_run(
                    run_id,
                    &RunCounts {
                        fetched: report.fetched as i64,
                        skipped: report.skipped as i64,
                        duplicates: report.duplicates as i64,
                        inserted: report.inserted as i64,
                        cache_hits: categorization.cache_hits as i64,
                        classified: categorization.classified as i64,
                    },
                )?;
                Ok(report)
            }
            Err(e) => {
                self.mark_failed(run_id, &e);
                Err(e)
            }
        }
    }

    async fn ingest(
        &self,
        table: LedgerTable,
        account: &AccountRef,
        classify: bool,
    ) -> Result<IngestReport> {
        let raws = self
            .feed
            .search_account_transactions(
                &account.account_id,
                &account.bank_id,
                &account.customer_id,
            )
            .await?;
        let fetched = raws.len();

        let batch = normalize_batch(&raws, &account.account_id);

        let existing = self
            .db
            .existing_transaction_ids(table, &self.options.backfill_marker)?;
        let outcome = filter_new(
            &existing,
            &self.options.backfill_marker,
            batch.transactions,
        );
        let skipped = batch.skipped.len() + outcome.sentinels.len();
        let duplicates = outcome.duplicates.len();
        let mut fresh = outcome.fresh;

        let categorization = if classify && !fresh.is_empty() {
            let history = self.db.vendor_category_history(table)?;
            let mut cache = VendorCategoryCache::from_history(history);
            let categorizer = Categorizer::new(&self.classifier);
            Some(categorizer.categorize(&mut cache, &mut fresh).await)
        } else {
            None
        };

        let inserted = self.db.insert_transactions(table, &fresh)?;

        info!(
            table = %table,
            account_id = %account.account_id,
            fetched,
            skipped,
            duplicates,
            inserted,
            "Ingest complete"
        );

        Ok(IngestReport {
            account_id: account.account_id.clone(),
            fetched,
            skipped,
            duplicates,
            inserted,
            categorization,
        })
    }

    async fn recategorize_inner(&self, table: LedgerTable) -> Result<(CategorizeReport, usize)> {
        let mut pending = self.db.uncategorized_transactions(table)?;
        if pending.is_empty() {
            info!(table = %table, "Nothing to recategorize");
            return Ok((CategorizeReport::default(), 0));
        }

        let history = self.db.vendor_category_history(table)?;
        let mut cache = VendorCategoryCache::from_history(history);
        let report = Categorizer::new(&self.classifier)
            .categorize(&mut cache, &mut pending)
            .await;

        let mut updated = 0;
        for tx in &pending {
            if let Some(category) = tx.category {
                if self.db.update_category(table, &tx.transaction_id, category)? {
                    updated += 1;
                }
            }
        }

        info!(
            table = %table,
            pending = pending.len(),
            updated,
            "Recategorize complete"
        );
        Ok((report, updated))
    }

    fn mark_failed(&self, run_id: i64, error: &Error) {
        if let Err(e) = self.db.fail_run(run_id, &error.to_string()) {
            warn!(run_id, error = %e, "Failed to record run failure");
        }
    }
}
