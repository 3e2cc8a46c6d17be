//! Inference server interface and its Ollama HTTP implementation.
//!
//! [`InferenceBackend`] is the seam between the story pipeline and the
//! server: the pipeline only ever lists, pulls and chats through it, so tests
//! can drive the whole pipeline against an in-memory fake.

use crate::config::ServerConfig;
use crate::error::{ConfigError, InferenceError, Operation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A model installed on the inference server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstalledModel {
    pub name: String,
}

/// A single chat message. Images are base64 payloads without a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    /// A user-role message carrying a prompt and images.
    pub fn user(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images,
        }
    }
}

/// Ollama /api/chat request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Ollama /api/chat response (non-streaming).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

impl ChatResponse {
    /// The generated text, if the server returned any non-blank content.
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Operations the story pipeline needs from an inference server.
///
/// Uses `async_trait` so the client can hold an `Arc<dyn InferenceBackend>`.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Base address of the server, for diagnostics.
    fn endpoint(&self) -> &str;

    /// List locally installed models.
    async fn list_models(&self) -> Result<Vec<InstalledModel>, InferenceError>;

    /// Download and install a model, returning once the server reports success.
    async fn pull_model(&self, name: &str) -> Result<(), InferenceError>;

    /// Submit a chat request and wait for the complete response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError>;
}

/// Talks to a local Ollama instance via its HTTP API.
/// No authentication required.
pub struct OllamaBackend {
    endpoint: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigError> {
        // Only the connect phase is bounded: pulls and generation may
        // legitimately run for minutes.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

/// Ollama /api/tags response.
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

/// Ollama /api/pull request body.
#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// One NDJSON line of pull progress.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PullStatus {
    #[serde(default)]
    pub status: String,
    pub error: Option<String>,
    pub total: Option<u64>,
    pub completed: Option<u64>,
}

impl PullStatus {
    fn percent(&self) -> Option<u64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => Some(done.saturating_mul(100) / total),
            _ => None,
        }
    }
}

/// Parse one line of the pull stream. Blank lines yield `None`; error lines
/// become pull failures.
pub(crate) fn parse_pull_line(line: &str) -> Result<Option<PullStatus>, InferenceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let status: PullStatus = serde_json::from_str(line).map_err(|e| {
        InferenceError::new(Operation::Pull, format!("Malformed pull progress '{line}': {e}"))
    })?;
    match status.error {
        Some(message) => Err(InferenceError::new(Operation::Pull, message)),
        None => Ok(Some(status)),
    }
}

/// Ollama error bodies look like `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turn a non-success response into an [`InferenceError`].
async fn error_from_response(operation: Operation, resp: reqwest::Response) -> InferenceError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if text.trim().is_empty() => format!("Ollama HTTP {status}"),
        Err(_) => format!("Ollama HTTP {status}: {}", text.trim()),
    };
    InferenceError::http(operation, status.as_u16(), message)
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn list_models(&self) -> Result<Vec<InstalledModel>, InferenceError> {
        let resp = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| InferenceError::transport(Operation::List, &e))?;

        if !resp.status().is_success() {
            return Err(error_from_response(Operation::List, resp).await);
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| InferenceError::transport(Operation::List, &e))?;
        tracing::debug!("Server reports {} installed model(s)", tags.models.len());
        Ok(tags.models)
    }

    async fn pull_model(&self, name: &str) -> Result<(), InferenceError> {
        use futures_util::StreamExt;

        let resp = self
            .client
            .post(self.url("/api/pull"))
            .json(&PullRequest {
                model: name,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| InferenceError::transport(Operation::Pull, &e))?;

        if !resp.status().is_success() {
            return Err(error_from_response(Operation::Pull, resp).await);
        }

        let mut stream = resp.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut last_status = String::new();
        let mut last_percent: Option<u64> = None;
        let mut succeeded = false;

        let mut handle_line = |line: &[u8]| -> Result<(), InferenceError> {
            let Some(status) = parse_pull_line(&String::from_utf8_lossy(line))? else {
                return Ok(());
            };
            let percent = status.percent();
            if status.status != last_status {
                tracing::info!("  {name}: {}", status.status);
                last_status = status.status.clone();
                last_percent = None;
            }
            // Log progress in 10% steps
            if let Some(pct) = percent {
                if last_percent.map_or(true, |prev| pct / 10 > prev / 10) {
                    tracing::info!("  {name}: {pct}%");
                    last_percent = Some(pct);
                }
            }
            if status.status == "success" {
                succeeded = true;
            }
            Ok(())
        };

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| InferenceError::transport(Operation::Pull, &e))?;
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                handle_line(line.as_slice())?;
            }
        }
        handle_line(buffer.as_slice())?;

        if succeeded {
            Ok(())
        } else {
            Err(InferenceError::new(
                Operation::Pull,
                format!("Pull of '{name}' ended before the server reported success"),
            ))
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let resp = self
            .client
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| InferenceError::transport(Operation::Chat, &e))?;

        if !resp.status().is_success() {
            return Err(error_from_response(Operation::Chat, resp).await);
        }

        resp.json()
            .await
            .map_err(|e| InferenceError::transport(Operation::Chat, &e))
    }
}
