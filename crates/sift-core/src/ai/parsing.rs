//! JSON parsing helpers for classifier responses
//!
//! Models wrap their JSON payload in commentary or markdown fences, so the
//! payload is located by brace scanning before it is handed to serde.

use serde::Deserialize;

use crate::error::{Error, Result};

/// One entry of the classifier's `categorized_transactions` array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategorizedEntry {
    pub transaction_id: String,
    /// Label as written by the model; validated by the caller
    pub category: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategorizedTransactions {
    categorized_transactions: Vec<CategorizedEntry>,
}

/// Slice from the first `{` to the last `}` inclusive
///
/// Returns `None` when either brace is missing or they are out of order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn truncate(text: &str) -> String {
    if text.len() > 200 {
        let cut = (0..=200).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}

/// Parse the `categorized_transactions` array out of a free-text response
pub fn parse_categorized_transactions(response: &str) -> Result<Vec<CategorizedEntry>> {
    let response = response.trim();
    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in classifier response | Raw: {}",
            truncate(response)
        ))
    })?;

    let parsed: CategorizedTransactions = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid JSON from classifier: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    Ok(parsed.categorized_transactions)
}
