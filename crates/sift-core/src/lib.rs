//! Sift Core Library
//!
//! Bank transaction ingestion and categorization:
//! - Normalization of raw bank records into canonical transactions
//! - Deduplication against the stored ledger
//! - Vendor → category cache seeded from ledger history
//! - Batch classification through a Messages API session with web search
//! - Encrypted SQLite ledger with run history

pub mod ai;
pub mod bank;
pub mod cache;
pub mod categorize;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod tools;

/// Test utilities including a mock Messages API server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AgentClassifier, AnthropicCompatBackend, CategoryAssignments, ClassificationInput,
    Classifier, ClassifierClient, MockClassifier,
};
pub use bank::{BankFeed, JsonFileFeed, RawTransaction, StaticFeed};
pub use cache::VendorCategoryCache;
pub use categorize::{CategorizeReport, Categorizer};
pub use config::Config;
pub use db::Database;
pub use dedup::{filter_new, DedupOutcome, LEGACY_BACKFILL_MARKER};
pub use error::{Error, Result};
pub use models::{
    AccountRef, Category, IngestReport, IngestRun, LedgerTable, RunKind, RunStatus, Transaction,
};
pub use normalize::{normalize_batch, normalize_record, NormalizedBatch, RecordFlavor, SkipReason};
pub use pipeline::{Pipeline, PipelineOptions};
pub use tools::SearchProvider;
