//! Mock classifier for testing
//!
//! Responses are scripted per call and every batch it receives is recorded, so
//! tests can assert how often (and with what) the classifier was invoked.
//! Clones share state.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Category;

use super::{
    assignments_from_response, CategoryAssignments, ClassificationInput, Classifier,
};

/// What the mock does for one call
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Final response text, parsed like a real model's
    Text(String),
    /// Backend failure
    Fail(String),
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    vendor_rules: HashMap<String, Category>,
    calls: Vec<Vec<ClassificationInput>>,
}

/// Mock classifier
///
/// With no scripted response left, transactions whose vendor has a rule get
/// that category and everything else is left out of the result.
#[derive(Clone, Default)]
pub struct MockClassifier {
    state: Arc<Mutex<MockState>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final response text
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.lock().responses.push_back(MockResponse::Text(text.into()));
        self
    }

    /// Queue a backend failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.lock()
            .responses
            .push_back(MockResponse::Fail(message.into()));
        self
    }

    /// Assign `category` to any transaction from `vendor`
    pub fn with_vendor(self, vendor: impl Into<String>, category: Category) -> Self {
        self.lock().vendor_rules.insert(vendor.into(), category);
        self
    }

    /// Every batch received so far
    pub fn calls(&self) -> Vec<Vec<ClassificationInput>> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, batch: &[ClassificationInput]) -> Result<CategoryAssignments> {
        let mut state = self.lock();
        state.calls.push(batch.to_vec());

        match state.responses.pop_front() {
            Some(MockResponse::Text(text)) => Ok(assignments_from_response(&text)),
            Some(MockResponse::Fail(message)) => Err(Error::ClassificationUnavailable(message)),
            None => Ok(batch
                .iter()
                .filter_map(|input| {
                    state
                        .vendor_rules
                        .get(&input.vendor)
                        .map(|c| (input.transaction_id.clone(), *c))
                })
                .collect()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, vendor: &str) -> ClassificationInput {
        ClassificationInput {
            account_id: "acc".into(),
            transaction_id: id.into(),
            amount: 500,
            source: vendor.into(),
            time: 0,
            vendor: vendor.into(),
            location: String::new(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockClassifier::new()
            .with_response(r#"{"categorized_transactions":[{"transaction_id":"t1","category":"Car"}]}"#)
            .with_failure("overloaded");

        let first = mock.classify(&[input("t1", "Shell")]).await.unwrap();
        assert_eq!(first["t1"], Category::Car);

        let second = mock.classify(&[input("t2", "Shell")]).await;
        assert!(matches!(second, Err(Error::ClassificationUnavailable(_))));
    }

    #[tokio::test]
    async fn test_vendor_rules_when_unscripted() {
        let mock = MockClassifier::new().with_vendor("Qantas", Category::Travel);
        let result = mock
            .classify(&[input("t1", "Qantas"), input("t2", "Unknown")])
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result["t1"], Category::Travel);
    }

    #[tokio::test]
    async fn test_calls_recorded_across_clones() {
        let mock = MockClassifier::new();
        let clone = mock.clone();
        clone
            .classify(&[input("t1", "a"), input("t2", "b")])
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_is_empty() {
        let mock = MockClassifier::new().with_response("I'm not sure about these.");
        let result = mock.classify(&[input("t1", "a")]).await.unwrap();
        assert!(result.is_empty());
    }
}
