//! API request and response models.
//!
//! The gateway deliberately keeps the request loosely typed: only the
//! `messages` array is checked structurally, and the remaining fields are
//! forwarded when they carry the expected JSON type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "x-ai/grok-4.1-fast";

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A structurally validated chat completion request.
///
/// `messages` is guaranteed non-empty. Individual messages are kept as raw
/// JSON so that malformed entries reach the upstream untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Value>,
    pub model: Option<String>,
    pub stream: Option<bool>,
    pub temperature: Option<Value>,
    pub max_tokens: Option<Value>,
}

impl CompletionRequest {
    /// Build from a JSON object whose `messages` field is already known to be
    /// a non-empty array. Optional fields of the wrong JSON type are dropped.
    pub(crate) fn from_object(obj: &Map<String, Value>, messages: Vec<Value>) -> Self {
        Self {
            messages,
            model: obj.get("model").and_then(Value::as_str).map(str::to_string),
            stream: obj.get("stream").and_then(Value::as_bool),
            temperature: obj.get("temperature").filter(|v| v.is_number()).cloned(),
            max_tokens: obj.get("max_tokens").filter(|v| v.is_number()).cloned(),
        }
    }

    /// Requested model, or [`DEFAULT_MODEL`].
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Typed view of the messages, failing if any entry does not match
    /// [`ChatMessage`].
    pub fn typed_messages(&self) -> serde_json::Result<Vec<ChatMessage>> {
        self.messages
            .iter()
            .map(|m| serde_json::from_value(m.clone()))
            .collect()
    }

    /// Outbound provider payload. Absent optional fields are omitted rather
    /// than sent as `null`.
    pub fn to_upstream_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "model".to_string(),
            Value::String(self.effective_model().to_string()),
        );
        payload.insert("messages".to_string(), Value::Array(self.messages.clone()));
        if let Some(stream) = self.stream {
            payload.insert("stream".to_string(), Value::Bool(stream));
        }
        if let Some(temperature) = &self.temperature {
            payload.insert("temperature".to_string(), temperature.clone());
        }
        if let Some(max_tokens) = &self.max_tokens {
            payload.insert("max_tokens".to_string(), max_tokens.clone());
        }
        Value::Object(payload)
    }
}

/// Chat completion response returned by the gateway.
///
/// Upstream responses are passed through as raw JSON; this type is only used
/// to synthesize the mock-mode answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// A single choice in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl CompletionResponse {
    /// Deterministic local answer used in mock mode.
    pub fn mock(model: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: format!("chatcmpl-mock-{}", now.timestamp_millis()),
            object: "chat.completion".to_string(),
            created: now.timestamp(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new(Role::Assistant, "Mocked response."),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 3,
                total_tokens: 13,
            },
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_ms: u64,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}
