//! Classification session over the Messages API
//!
//! Each `classify` call opens a fresh session:
//!
//! ```text
//! Created → MessageSent → SearchInvoked* → FinalResponse → Parsed
//!                                                        → ParseFailed
//!                                        → NoResponse
//! ```
//!
//! The batch goes out as one user message. While the model answers with
//! `web_search` tool calls, each call is executed and its result sent back.
//! Text the model writes alongside tool calls is kept in the outcome but never
//! parsed; only the final message is.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::Category;
use crate::tools::{classification_tools, SearchProvider};

use super::anthropic_compat::{AnthropicCompatBackend, ContentBlock, Message, Tool};
use super::{
    assignments_from_entries, parsing, CategoryAssignments, ClassificationInput, Classifier,
};

/// Session progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    MessageSent,
    SearchInvoked,
    FinalResponse,
    Parsed,
    ParseFailed,
    NoResponse,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Parsed | Self::ParseFailed | Self::NoResponse)
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub assignments: CategoryAssignments,
    /// Text of the final message, if one arrived
    pub final_text: Option<String>,
    /// Text written alongside tool calls
    pub intermediate_text: Vec<String>,
    /// Queries the model searched for
    pub searches: Vec<String>,
    pub turns: usize,
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    transactions: &'a [ClassificationInput],
}

/// Parsed tool call from XML-style output
#[derive(Debug, Clone)]
struct ParsedToolCall {
    name: String,
    params: serde_json::Value,
}

/// System prompt naming the categories and the search fallback
pub fn system_prompt() -> String {
    let categories: Vec<&str> = Category::classifiable().iter().map(|c| c.as_str()).collect();
    format!(
        r#"You categorize personal banking transactions.
The user sends a JSON object with a list of transactions. Categorize every transaction using its fields, especially description, vendor and location.
If the fields are not enough to decide, use the web_search tool to learn more, for example to check that a vendor is a restaurant.
Each transaction must get exactly one category from this list: {}.
Your final message must contain only a single JSON object with this schema and no other text:
{{
    "categorized_transactions": [
        {{
            "transaction_id": "...",
            "category": "...",
            "reason": "..."
        }}
    ]
}}"#,
        categories.join(", ")
    )
}

/// One conversation with the model for one batch
struct ClassificationSession<'a> {
    backend: &'a AnthropicCompatBackend,
    search: &'a SearchProvider,
    tools: Vec<Tool>,
    max_turns: usize,
    state: SessionState,
    messages: Vec<Message>,
    intermediate_text: Vec<String>,
    searches: Vec<String>,
    turns: usize,
}

impl<'a> ClassificationSession<'a> {
    fn new(backend: &'a AnthropicCompatBackend, search: &'a SearchProvider, max_turns: usize) -> Self {
        Self {
            backend,
            search,
            tools: classification_tools(),
            max_turns,
            state: SessionState::Created,
            messages: Vec::new(),
            intermediate_text: Vec::new(),
            searches: Vec::new(),
            turns: 0,
        }
    }

    async fn run(mut self, batch: &[ClassificationInput]) -> Result<SessionOutcome> {
        let payload = serde_json::to_string(&BatchPayload {
            transactions: batch,
        })?;
        self.messages.push(Message::user(payload));
        let system = system_prompt();

        info!(
            model = %self.backend.model(),
            transactions = batch.len(),
            "Starting classification session"
        );

        let mut final_text = None;
        while self.turns < self.max_turns {
            self.turns += 1;
            let response = self
                .backend
                .messages(Some(&system), self.messages.clone(), Some(&self.tools))
                .await?;
            self.state = SessionState::MessageSent;

            let tool_uses = response.tool_uses();
            let xml_calls = if tool_uses.is_empty() {
                response
                    .text()
                    .map(|t| parse_xml_tool_calls(&t))
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            if tool_uses.is_empty() && xml_calls.is_empty() {
                self.state = SessionState::FinalResponse;
                final_text = response.text();
                break;
            }

            self.state = SessionState::SearchInvoked;
            if !tool_uses.is_empty() {
                if let Some(text) = response.text() {
                    self.intermediate_text.push(text);
                }
                self.messages
                    .push(Message::assistant_blocks(response.content.clone()));

                let mut results = Vec::new();
                for (id, name, input) in tool_uses {
                    match self.run_tool(name, input).await {
                        Ok(output) => results.push(ContentBlock::tool_result(id, output)),
                        Err(e) => results.push(ContentBlock::tool_error(id, e.to_string())),
                    }
                }
                self.messages.push(Message::tool_results(results));
            } else {
                // Some models write tool calls as text instead of tool_use blocks
                let text = response.text().unwrap_or_default();
                let preamble = strip_xml_tool_calls(&text);
                if !preamble.is_empty() {
                    self.intermediate_text.push(preamble.clone());
                    self.messages.push(Message::assistant(preamble));
                }

                let mut outputs = Vec::new();
                for (i, call) in xml_calls.iter().enumerate() {
                    match self.run_tool(&call.name, &call.params).await {
                        Ok(output) => outputs.push(format!(
                            "Tool {} ({}) result:\n{}",
                            i + 1,
                            call.name,
                            output
                        )),
                        Err(e) => outputs.push(format!(
                            "Tool {} ({}) error: {}",
                            i + 1,
                            call.name,
                            e
                        )),
                    }
                }
                self.messages.push(Message::user(format!(
                    "Here are the results from the tools you requested:\n\n{}",
                    outputs.join("\n\n")
                )));
            }
        }

        let (state, assignments) = match &final_text {
            None => {
                warn!(
                    turns = self.turns,
                    "Classification session ended without a final response"
                );
                (SessionState::NoResponse, CategoryAssignments::new())
            }
            Some(text) => match parsing::parse_categorized_transactions(text) {
                Ok(entries) => (SessionState::Parsed, assignments_from_entries(entries)),
                Err(e) => {
                    warn!(error = %e, "Failed to parse classifier response");
                    (SessionState::ParseFailed, CategoryAssignments::new())
                }
            },
        };

        info!(
            state = ?state,
            turns = self.turns,
            searches = self.searches.len(),
            assigned = assignments.len(),
            "Classification session finished"
        );

        Ok(SessionOutcome {
            state,
            assignments,
            final_text,
            intermediate_text: self.intermediate_text,
            searches: self.searches,
            turns: self.turns,
        })
    }

    async fn run_tool(&mut self, name: &str, input: &serde_json::Value) -> Result<String> {
        if let Some(query) = input.get("query").and_then(|q| q.as_str()) {
            self.searches.push(query.to_string());
        }
        let result = self.search.execute_tool(name, input).await;
        match &result {
            Ok(output) => debug!(tool = name, output_len = output.len(), "Tool succeeded"),
            Err(e) => warn!(tool = name, error = %e, "Tool failed"),
        }
        result
    }
}

/// `<function=NAME>...</function>` block written as plain text
static FUNCTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<function=([^>]+)>(.*?)</function>").expect("valid regex")
});

/// `<parameter=KEY>VALUE</parameter>` inside a function block
static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<parameter=([^>]+)>([^<]*)</parameter>").expect("valid regex")
});

/// Stray `<tool_call>` wrappers left behind once blocks are removed
static TOOL_CALL_WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?\s*tool_?call\s*>").expect("valid regex"));

/// Tool calls a model wrote as text instead of `tool_use` blocks
///
/// ```text
/// <function=web_search>
/// <parameter=query>Joe's Diner Newtown</parameter>
/// </function>
/// ```
fn parse_xml_tool_calls(text: &str) -> Vec<ParsedToolCall> {
    FUNCTION_BLOCK
        .captures_iter(text)
        .map(|block| {
            let params = PARAMETER
                .captures_iter(&block[2])
                .map(|p| {
                    let value = serde_json::Value::from(p[2].trim());
                    (p[1].trim().to_string(), value)
                })
                .collect::<serde_json::Map<String, serde_json::Value>>();
            ParsedToolCall {
                name: block[1].trim().to_string(),
                params: serde_json::Value::Object(params),
            }
        })
        .collect()
}

/// Prose surrounding text-form tool calls
fn strip_xml_tool_calls(text: &str) -> String {
    let without_blocks = FUNCTION_BLOCK.replace_all(text, "");
    TOOL_CALL_WRAPPER
        .replace_all(&without_blocks, "")
        .trim()
        .to_string()
}

/// Classifier backed by a Messages API session with web search
#[derive(Clone)]
pub struct AgentClassifier {
    backend: AnthropicCompatBackend,
    search: SearchProvider,
    max_turns: usize,
    session_timeout: Duration,
}

impl AgentClassifier {
    pub fn new(backend: AnthropicCompatBackend, search: SearchProvider) -> Self {
        Self {
            backend,
            search,
            max_turns: 8,
            session_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Run a full session, bounded by the session timeout
    pub async fn run_session(&self, batch: &[ClassificationInput]) -> Result<SessionOutcome> {
        let session = ClassificationSession::new(&self.backend, &self.search, self.max_turns);
        match tokio::time::timeout(self.session_timeout, session.run(batch)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout = ?self.session_timeout, "Classification session timed out");
                Err(Error::Timeout(self.session_timeout))
            }
        }
    }
}

#[async_trait]
impl Classifier for AgentClassifier {
    async fn classify(&self, batch: &[ClassificationInput]) -> Result<CategoryAssignments> {
        if batch.is_empty() {
            return Ok(CategoryAssignments::new());
        }
        Ok(self.run_session(batch).await?.assignments)
    }

    fn name(&self) -> &str {
        "agent"
    }
}
