//! Prompt-experiment toolkit for OpenAI-compatible chat-completion APIs.
//!
//! `promptlab` provides the shared plumbing for a family of small
//! command-line experiments: a thin async HTTP client for any
//! `/chat/completions` endpoint, JSON settings, retry with backoff,
//! token-usage tallying, Markdown/JSON report writing, and — for the
//! interactive chat binary — persistent transcripts with sliding-window
//! summarization.
//!
//! # Getting started
//!
//! ```ignore
//! use promptlab::{ChatRequest, Message, OpenAiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("OPENAI_API_KEY").unwrap();
//!     let client = OpenAiClient::new("https://api.openai.com/v1", api_key, 60)?;
//!
//!     let body = ChatRequest {
//!         model: "gpt-4o-mini".into(),
//!         messages: vec![
//!             Message::system("You are terse."),
//!             Message::user("Name three prime numbers."),
//!         ],
//!         temperature: Some(0.7),
//!         ..Default::default()
//!     };
//!
//!     let completion = client.chat(&body).await?;
//!     println!("{}", completion.content.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Retry with backoff, token-usage tally |
//! | [`config`] | JSON settings file |
//! | [`context`] | Transcript summarization: running summary + recent window |
//! | [`experiment`] | Experiment plans: parameter grids, sweeps, strategy prompts |
//! | [`report`] | Markdown and JSON result files |
//! | [`transcript`] | Role-tagged turns and their on-disk form |

pub mod api;
pub mod config;
pub mod context;
pub mod experiment;
pub mod report;
pub mod transcript;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::api::retry::RetryConfig;

// ── Constants ──────────────────────────────────────────────────────

/// Default endpoint base. Any OpenAI-compatible server works — set
/// `base_url` in the settings file to point elsewhere.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for all experiments.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a chat-completion request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ── Request types ──────────────────────────────────────────────────

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

/// Chat completion request body. Unused optional fields are omitted from
/// serialization so the same struct serves every experiment.
///
/// `temperature` is `Option` rather than a bare float: the sweep experiment
/// sends `0.0` deliberately, so "unset" and "zero" must stay distinct.
#[derive(Serialize, Debug, Default, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenAiClient::chat`].
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a new client. `base_url` is the API root without the
    /// `/chat/completions` suffix; a trailing slash is tolerated.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("promptlab/0.2")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={:?}, temp={:?}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("chat API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("chat API error: {}", err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed.choices.and_then(|c| c.into_iter().next());
        match choice {
            Some(c) => Ok(ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            }),
            None => Ok(ChatCompletion {
                content: None,
                usage: parsed.usage,
                finish_reason: None,
            }),
        }
    }
}

// ── Send-message capability ────────────────────────────────────────

/// Future returned by [`ChatCapability::send_message`].
pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(String, UsageInfo), String>> + Send + 'a>>;

/// The one thing transcript compression needs from an LLM client: send a
/// message list, get back text and token usage. Keeping this narrow means
/// the context module never sees a concrete HTTP client, and tests can
/// substitute a canned responder.
pub trait ChatCapability {
    fn send_message(&self, turns: Vec<Message>) -> SendFuture<'_>;
}

/// A [`ChatCapability`] that binds an [`OpenAiClient`] to a fixed model and
/// sampling parameters, with retry applied per call.
pub struct ChatSender<'a> {
    pub client: &'a OpenAiClient,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub retry: RetryConfig,
}

impl ChatCapability for ChatSender<'_> {
    fn send_message(&self, turns: Vec<Message>) -> SendFuture<'_> {
        Box::pin(async move {
            let body = ChatRequest {
                model: self.model.clone(),
                messages: turns,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                ..Default::default()
            };
            let completion = self.client.chat_with_retry(&body, &self.retry).await?;
            let usage = completion.usage.clone().unwrap_or_default();
            let text = completion
                .content
                .ok_or_else(|| "empty LLM response".to_string())?;
            Ok((text, usage))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content, "hello");

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);

        let assist = Message::assistant("reply");
        assert_eq!(assist.role, MessageRole::Assistant);
        assert_eq!(assist.content, "reply");
    }

    #[test]
    fn chat_request_skips_unset_fields() {
        let req = ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            max_tokens: Some(100),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("stop").is_none());
        assert!(json.get("response_format").is_none());
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn zero_temperature_is_serialized() {
        let req = ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            temperature: Some(0.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn response_format_serializes_as_json_object() {
        let fmt = ResponseFormat::json_object();
        let json = serde_json::to_value(&fmt).unwrap();
        assert_eq!(json["type"], "json_object");
    }

    #[test]
    fn raw_response_parses_error_body() {
        let raw: RawChatResponse =
            serde_json::from_str(r#"{"error": {"message": "model not found"}}"#).unwrap();
        assert_eq!(raw.error.unwrap().message, "model not found");
        assert!(raw.choices.is_none());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new("https://api.example.com/v1/", "k", 30).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
