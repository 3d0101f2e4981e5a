//! Test utilities for sift-core
//!
//! A mock Messages API server that replays scripted replies and records every
//! request body it receives.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::sync::oneshot;

use crate::ai::anthropic_compat::ContentBlock;

/// One scripted reply from the mock server
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    status: u16,
    body: serde_json::Value,
    delay: Option<Duration>,
}

impl ScriptedReply {
    fn message(content: Vec<ContentBlock>, stop_reason: &str) -> Self {
        Self {
            status: 200,
            body: serde_json::json!({
                "id": "msg_mock",
                "type": "message",
                "role": "assistant",
                "content": content,
                "model": "mock-model",
                "stop_reason": stop_reason,
                "stop_sequence": null
            }),
            delay: None,
        }
    }

    /// Final text answer
    pub fn text(text: &str) -> Self {
        Self::message(vec![ContentBlock::text(text)], "end_turn")
    }

    /// A single tool call
    pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> Self {
        Self::message(
            vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
            "tool_use",
        )
    }

    /// Non-success status with an Anthropic-style error body
    pub fn error(status: u16) -> Self {
        Self {
            status,
            body: serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            }),
            delay: None,
        }
    }

    /// Prepend a text block to the reply's content
    pub fn with_text(mut self, text: &str) -> Self {
        if let Some(content) = self.body["content"].as_array_mut() {
            content.insert(0, serde_json::json!({"type": "text", "text": text}));
        }
        self
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct ServerState {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<serde_json::Value>,
}

type SharedState = Arc<Mutex<ServerState>>;

/// Mock `/v1/messages` server
pub struct MockMessagesServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockMessagesServer {
    /// Start on an available port with replies served in order
    pub async fn start(replies: Vec<ScriptedReply>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(ServerState {
            replies: replies.into(),
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockMessagesServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_messages(
    State(state): State<SharedState>,
    Json(request): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let reply = {
        let mut state = state.lock().unwrap();
        state.requests.push(request);
        state.replies.pop_front()
    };

    let Some(reply) = reply else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "no scripted reply left"})),
        );
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body))
}
