//! Tools offered to the classifier
//!
//! The classifier may call `web_search` when a transaction's fields are not
//! enough to pick a category, e.g. to find out what kind of business a vendor is.
//! Tools are read-only lookups; nothing here touches the ledger.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::ai::anthropic_compat::Tool;
use crate::config::{SearchConfig, SearchProviderKind};
use crate::error::{Error, Result};

pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Results beyond this many related topics are dropped
const MAX_RELATED_TOPICS: usize = 5;

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct WebSearchParams {
    /// Search terms, typically the vendor name plus its location
    #[schemars(
        description = "Search query, e.g. the vendor name and location, to learn what kind of business it is"
    )]
    pub query: String,
}

/// Tool definitions sent with every classification request
pub fn classification_tools() -> Vec<Tool> {
    vec![Tool::new(
        WEB_SEARCH_TOOL,
        "Search the web for information about a vendor when the transaction fields are not enough to choose a category",
        schemars::schema_for!(WebSearchParams).into(),
    )]
}

/// Backing implementation for `web_search`
#[derive(Clone)]
pub enum SearchProvider {
    /// DuckDuckGo instant answer API
    DuckDuckGo { client: Client, endpoint: String },
    /// Canned answers keyed by lowercase query
    Static(HashMap<String, String>),
    /// Every search fails; the model sees an error result
    Disabled,
}

impl SearchProvider {
    pub fn from_config(config: &SearchConfig, request_timeout: Duration) -> Result<Self> {
        match config.provider {
            SearchProviderKind::DuckDuckGo => {
                let client = Client::builder().timeout(request_timeout).build()?;
                Ok(Self::DuckDuckGo {
                    client,
                    endpoint: config.endpoint.clone(),
                })
            }
            SearchProviderKind::Disabled => Ok(Self::Disabled),
        }
    }

    pub fn fixed<I, K, V>(answers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Static(
            answers
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo { .. } => "duckduckgo",
            Self::Static(_) => "static",
            Self::Disabled => "disabled",
        }
    }

    /// Run a search and return a plain-text summary for the model
    pub async fn search(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidData("Search query is empty".into()));
        }

        match self {
            Self::DuckDuckGo { client, endpoint } => {
                duckduckgo_search(client, endpoint, query).await
            }
            Self::Static(answers) => Ok(answers
                .get(&query.to_lowercase())
                .cloned()
                .unwrap_or_else(|| format!("No results for \"{}\"", query))),
            Self::Disabled => Err(Error::InvalidData("Web search is disabled".into())),
        }
    }

    /// Execute a tool call by name
    pub async fn execute_tool(&self, name: &str, input: &serde_json::Value) -> Result<String> {
        match name {
            WEB_SEARCH_TOOL => {
                let params: WebSearchParams = serde_json::from_value(input.clone())
                    .map_err(|e| Error::InvalidData(format!("Invalid params: {}", e)))?;
                self.search(&params.query).await
            }
            _ => Err(Error::InvalidData(format!("Unknown tool: {}", name))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    /// Grouped topics nest one level
    #[serde(rename = "Topics")]
    topics: Vec<RelatedTopic>,
}

async fn duckduckgo_search(client: &Client, endpoint: &str, query: &str) -> Result<String> {
    debug!(query, "Running web search");

    let response = client
        .get(endpoint)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::InvalidData(format!(
            "Search failed: HTTP {}",
            response.status()
        )));
    }

    // The API answers with a JavaScript content type, so decode by hand
    let body = response.text().await?;
    let answer: InstantAnswer = serde_json::from_str(&body)?;
    Ok(summarize_answer(query, &answer))
}

fn summarize_answer(query: &str, answer: &InstantAnswer) -> String {
    let mut lines = Vec::new();

    if !answer.abstract_text.is_empty() {
        if answer.heading.is_empty() {
            lines.push(answer.abstract_text.clone());
        } else {
            lines.push(format!("{}: {}", answer.heading, answer.abstract_text));
        }
        if !answer.abstract_url.is_empty() {
            lines.push(format!("Source: {}", answer.abstract_url));
        }
    }

    let related = answer
        .related_topics
        .iter()
        .flat_map(|t| std::iter::once(t).chain(t.topics.iter()))
        .filter_map(|t| t.text.as_deref())
        .filter(|t| !t.is_empty())
        .take(MAX_RELATED_TOPICS);
    for text in related {
        lines.push(format!("- {}", text));
    }

    if lines.is_empty() {
        format!("No results for \"{}\"", query)
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_tools_schema() {
        let tools = classification_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, WEB_SEARCH_TOOL);

        let schema = &tools[0].input_schema;
        assert!(schema["properties"]["query"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "query"));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = SearchProvider::fixed([("Joe's Diner", "Joe's Diner is a restaurant")]);
        assert_eq!(
            provider.search("joe's diner").await.unwrap(),
            "Joe's Diner is a restaurant"
        );
        assert!(provider.search("Unknown").await.unwrap().starts_with("No results"));
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let err = SearchProvider::Disabled.search("anything").await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let provider = SearchProvider::fixed(Vec::<(String, String)>::new());
        assert!(provider.search("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_execute_tool_dispatch() {
        let provider = SearchProvider::fixed([("Qantas", "Australian airline")]);
        let out = provider
            .execute_tool(WEB_SEARCH_TOOL, &serde_json::json!({"query": "Qantas"}))
            .await
            .unwrap();
        assert_eq!(out, "Australian airline");

        assert!(provider
            .execute_tool(WEB_SEARCH_TOOL, &serde_json::json!({"q": "Qantas"}))
            .await
            .is_err());
        assert!(provider
            .execute_tool("get_weather", &serde_json::json!({}))
            .await
            .is_err());
    }

    #[test]
    fn test_summarize_answer() {
        let answer: InstantAnswer = serde_json::from_str(
            r#"{
                "Heading": "Bunnings Warehouse",
                "AbstractText": "Bunnings is an Australian hardware chain.",
                "AbstractURL": "https://en.wikipedia.org/wiki/Bunnings",
                "RelatedTopics": [
                    {"Text": "Hardware store", "FirstURL": "x"},
                    {"Name": "Group", "Topics": [{"Text": "Wesfarmers subsidiary"}]}
                ]
            }"#,
        )
        .unwrap();

        let summary = summarize_answer("Bunnings", &answer);
        assert!(summary.starts_with("Bunnings Warehouse: Bunnings is"));
        assert!(summary.contains("- Hardware store"));
        assert!(summary.contains("- Wesfarmers subsidiary"));
    }

    #[test]
    fn test_summarize_empty_answer() {
        let summary = summarize_answer("zzz", &InstantAnswer::default());
        assert_eq!(summary, "No results for \"zzz\"");
    }

    #[test]
    fn test_from_config() {
        let disabled = SearchConfig {
            provider: SearchProviderKind::Disabled,
            ..Default::default()
        };
        let provider = SearchProvider::from_config(&disabled, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.name(), "disabled");

        let ddg = SearchProvider::from_config(&SearchConfig::default(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(ddg.name(), "duckduckgo");
    }
}
