//! Transaction classification
//!
//! # Architecture
//!
//! - `Classifier` trait: one call per batch, returning `transaction_id → Category`
//! - `ClassifierClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `AgentClassifier` (Messages API session with web search)
//!   and `MockClassifier` (scripted, for tests and offline runs)
//!
//! # Configuration
//!
//! Environment variables:
//! - `SIFT_CLASSIFIER`: backend to use (agent, mock). Default: agent
//! - `SIFT_CLASSIFIER_HOST`, `SIFT_CLASSIFIER_MODEL`, `SIFT_CLASSIFIER_API_KEY`

pub mod anthropic_compat;
mod mock;
pub mod parsing;
pub mod session;

pub use anthropic_compat::{AnthropicCompatBackend, Message};
pub use mock::{MockClassifier, MockResponse};
pub use parsing::CategorizedEntry;
pub use session::{AgentClassifier, SessionOutcome, SessionState};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::config::{ClassifierBackend, Config};
use crate::error::Result;
use crate::models::{Category, Transaction};
use crate::tools::SearchProvider;

/// Fields sent to the classifier for one transaction
///
/// The category is deliberately absent: the classifier only ever sees
/// transactions that do not have one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationInput {
    pub account_id: String,
    pub transaction_id: String,
    pub amount: i64,
    pub source: String,
    pub time: i64,
    pub vendor: String,
    pub location: String,
    pub description: String,
}

impl From<&Transaction> for ClassificationInput {
    fn from(tx: &Transaction) -> Self {
        Self {
            account_id: tx.account_id.clone(),
            transaction_id: tx.transaction_id.clone(),
            amount: tx.amount,
            source: tx.source.clone(),
            time: tx.time,
            vendor: tx.vendor.clone(),
            location: tx.location.clone(),
            description: tx.description.clone(),
        }
    }
}

/// Categories chosen by the classifier, keyed by transaction id
pub type CategoryAssignments = HashMap<String, Category>;

/// Convert parsed entries into assignments
///
/// Labels outside the classifiable set are dropped with a warning, and a
/// repeated id keeps its first category.
pub fn assignments_from_entries(entries: Vec<CategorizedEntry>) -> CategoryAssignments {
    let mut assignments = CategoryAssignments::new();
    for entry in entries {
        match entry.category.parse::<Category>() {
            Ok(category) if Category::classifiable().contains(&category) => {
                assignments.entry(entry.transaction_id).or_insert(category);
            }
            _ => {
                warn!(
                    transaction_id = %entry.transaction_id,
                    category = %entry.category,
                    "Classifier returned an unknown category"
                );
            }
        }
    }
    assignments
}

/// Parse a final response into assignments; unusable text yields an empty map
pub fn assignments_from_response(text: &str) -> CategoryAssignments {
    match parsing::parse_categorized_transactions(text) {
        Ok(entries) => assignments_from_entries(entries),
        Err(e) => {
            warn!(error = %e, "Failed to parse classifier response");
            CategoryAssignments::new()
        }
    }
}

/// A backend that assigns categories to a batch of transactions
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the whole batch in one call
    ///
    /// An unusable response is an empty map, not an error. Errors are reserved
    /// for the backend being unreachable or too slow.
    async fn classify(&self, batch: &[ClassificationInput]) -> Result<CategoryAssignments>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Concrete classifier enum
#[derive(Clone)]
pub enum ClassifierClient {
    Agent(AgentClassifier),
    Mock(MockClassifier),
}

impl ClassifierClient {
    /// Build the classifier named by the config
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.classifier.backend {
            ClassifierBackend::Agent => {
                let backend = AnthropicCompatBackend::from_config(&config.classifier)?;
                let search = SearchProvider::from_config(
                    &config.search,
                    std::time::Duration::from_secs(config.classifier.request_timeout_secs),
                )?;
                Ok(ClassifierClient::Agent(
                    AgentClassifier::new(backend, search)
                        .with_max_turns(config.classifier.max_turns)
                        .with_session_timeout(config.classifier.session_timeout()),
                ))
            }
            ClassifierBackend::Mock => Ok(ClassifierClient::Mock(MockClassifier::new())),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, ClassifierClient::Mock(_))
    }

    /// Model name, or "mock"
    pub fn model(&self) -> &str {
        match self {
            ClassifierClient::Agent(c) => c.model(),
            ClassifierClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    async fn classify(&self, batch: &[ClassificationInput]) -> Result<CategoryAssignments> {
        match self {
            ClassifierClient::Agent(c) => c.classify(batch).await,
            ClassifierClient::Mock(c) => c.classify(batch).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ClassifierClient::Agent(c) => c.name(),
            ClassifierClient::Mock(c) => c.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, category: &str) -> CategorizedEntry {
        CategorizedEntry {
            transaction_id: id.into(),
            category: category.into(),
            reason: None,
        }
    }

    #[test]
    fn test_assignments_drop_unknown_and_debit() {
        let assignments = assignments_from_entries(vec![
            entry("t1", "Groceries"),
            entry("t2", "Shopping"),
            entry("t3", "Debit"),
            entry("t4", "eating out"),
        ]);
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments["t1"], Category::Groceries);
        assert_eq!(assignments["t4"], Category::EatingOut);
    }

    #[test]
    fn test_assignments_first_entry_wins() {
        let assignments =
            assignments_from_entries(vec![entry("t1", "Travel"), entry("t1", "Car")]);
        assert_eq!(assignments["t1"], Category::Travel);
    }

    #[test]
    fn test_assignments_from_malformed_response_empty() {
        assert!(assignments_from_response("Sorry, no idea").is_empty());
        assert!(assignments_from_response("{\"categorized_transactions\": 3}").is_empty());
    }

    #[test]
    fn test_classification_input_omits_category() {
        let tx = Transaction {
            account_id: "acc".into(),
            transaction_id: "t1".into(),
            amount: 1234,
            source: "Aldi Stores".into(),
            time: 1_700_000_000,
            vendor: "Aldi".into(),
            category: None,
            location: "Newtown".into(),
            description: "ALDI 123".into(),
        };
        let json = serde_json::to_value(ClassificationInput::from(&tx)).unwrap();
        assert!(json.get("category").is_none());
        assert_eq!(json["vendor"], "Aldi");
        assert_eq!(json["amount"], 1234);
    }

    #[test]
    fn test_from_config_mock() {
        let mut config = Config::default();
        config.classifier.backend = ClassifierBackend::Mock;
        let client = ClassifierClient::from_config(&config).unwrap();
        assert!(client.is_mock());
        assert_eq!(client.model(), "mock");
    }

    #[test]
    fn test_from_config_agent() {
        let mut config = Config::default();
        config.classifier.model = "test-model".into();
        let client = ClassifierClient::from_config(&config).unwrap();
        assert!(!client.is_mock());
        assert_eq!(client.model(), "test-model");
    }
}
