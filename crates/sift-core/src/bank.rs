//! Banking collaborator boundary
//!
//! Raw records arrive from the bank exactly as the bank reports them. Every field
//! is optional: the normalizer decides what is usable. Session establishment and
//! authentication live outside this crate; implementations of [`BankFeed`] are
//! handed an already-usable source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// A transaction record as returned by the bank
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default, alias = "transaction_id", alias = "transactionId")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<MoneyValue>,
    /// Posted time: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or Unix seconds
    #[serde(default, deserialize_with = "string_or_number")]
    pub posted: Option<String>,
    #[serde(default)]
    pub counterparty: Option<Counterparty>,
    /// Merchant enrichment block; present only on card/merchant transactions
    #[serde(default)]
    pub lwc: Option<MerchantMetadata>,
    #[serde(default, alias = "shortDescription")]
    pub short_description: Option<String>,
}

/// Monetary value in major currency units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoneyValue {
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counterparty {
    #[serde(default, alias = "legalName")]
    pub legal_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantMetadata {
    #[serde(default, alias = "merchantName", alias = "name")]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Accept `"12.34"` as well as `12.34`; the normalizer parses the text.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Source of raw transactions for an account
#[async_trait]
pub trait BankFeed: Send + Sync {
    async fn search_account_transactions(
        &self,
        account_id: &str,
        bank_id: &str,
        customer_id: &str,
    ) -> Result<Vec<RawTransaction>>;
}

/// Feed export on disk: either a flat list or records keyed by account id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedExport {
    Flat(Vec<RawTransaction>),
    ByAccount(HashMap<String, Vec<RawTransaction>>),
}

/// Reads a JSON export of bank records
///
/// A flat array is treated as belonging to whichever account is asked for.
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BankFeed for JsonFileFeed {
    async fn search_account_transactions(
        &self,
        account_id: &str,
        _bank_id: &str,
        _customer_id: &str,
    ) -> Result<Vec<RawTransaction>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Feed(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let export: FeedExport = serde_json::from_str(&content).map_err(|e| {
            Error::Feed(format!("Invalid feed export {}: {}", self.path.display(), e))
        })?;

        let records = match export {
            FeedExport::Flat(records) => records,
            FeedExport::ByAccount(mut by_account) => {
                by_account.remove(account_id).unwrap_or_default()
            }
        };

        debug!(
            account_id,
            records = records.len(),
            path = %self.path.display(),
            "Loaded feed export"
        );
        Ok(records)
    }
}

/// In-memory feed, keyed by account id
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    records: HashMap<String, Vec<RawTransaction>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, account_id: &str, records: Vec<RawTransaction>) -> Self {
        self.records
            .entry(account_id.to_string())
            .or_default()
            .extend(records);
        self
    }
}

#[async_trait]
impl BankFeed for StaticFeed {
    async fn search_account_transactions(
        &self,
        account_id: &str,
        _bank_id: &str,
        _customer_id: &str,
    ) -> Result<Vec<RawTransaction>> {
        Ok(self.records.get(account_id).cloned().unwrap_or_default())
    }
}
