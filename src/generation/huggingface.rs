//! Hugging Face Inference API backend.
//!
//! Sends `{"inputs": prompt, "parameters": {"max_new_tokens": N}}` to
//! `{base_url}/models/{model}`. In one-shot mode the answer is a JSON array
//! of `{"generated_text": ...}` objects; in streaming mode the request adds
//! `"stream": true` and the answer is a server-sent event stream whose
//! `data:` lines carry `{"token": {"text": ..., "special": ...}}`.

use crate::error::GenerationError;
use crate::generation::{Generation, GenerationMode, Generator};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Default Inference API root.
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Default model.
pub const DEFAULT_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

/// Default cap on generated tokens.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest error body kept in [`GenerationError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`HuggingFaceGenerator`].
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Model identifier, e.g. `owner/name`.
    pub model: String,
    /// Bearer token; requests are sent unauthenticated when `None`.
    pub api_key: Option<String>,
    /// Cap on generated tokens.
    pub max_new_tokens: u32,
    /// Whole-request deadline in one-shot mode; in streaming mode, the
    /// longest wait for headers or between two body chunks.
    pub timeout: Duration,
    /// One-shot or streaming delivery.
    pub mode: GenerationMode,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            mode: GenerationMode::OneShot,
        }
    }
}

impl HuggingFaceConfig {
    /// Returns the model endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Generator backed by the Hugging Face Inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceGenerator {
    /// Creates a generator with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Transport`] if the HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialise).
    pub fn new(config: HuggingFaceConfig) -> Result<Self, GenerationError> {
        // No whole-request deadline on the client: a healthy token stream may
        // outlive it. One-shot requests set their own in `send`.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &HuggingFaceConfig {
        &self.config
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "inputs": prompt,
            "parameters": { "max_new_tokens": self.config.max_new_tokens },
        });
        if self.config.mode == GenerationMode::Streaming {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, prompt: &str) -> Result<reqwest::Response, GenerationError> {
        let mut request = self
            .client
            .post(self.config.endpoint())
            .json(&self.request_body(prompt));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let timeout = self.config.timeout;
        let response = match self.config.mode {
            GenerationMode::OneShot => request.timeout(timeout).send().await,
            // Bounds the wait for headers; body reads are bounded per chunk
            // by the client's read timeout
            GenerationMode::Streaming => tokio::time::timeout(timeout, request.send())
                .await
                .map_err(|_| GenerationError::Timeout {
                    seconds: timeout.as_secs(),
                })?,
        }
        .map_err(|e| transport_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        tracing::debug!(
            model = %self.config.model,
            mode = self.config.mode.as_str(),
            prompt_len = prompt.len(),
            "sending generation request"
        );

        let response = self.send(prompt).await?;

        match self.config.mode {
            GenerationMode::OneShot => {
                let payload: Value = response
                    .json()
                    .await
                    .map_err(|e| transport_error(&e, self.config.timeout))?;
                extract_generated_text(&payload).map(Generation::Complete)
            }
            GenerationMode::Streaming => {
                let timeout = self.config.timeout;
                let mut body = response.bytes_stream();

                Ok(Generation::incremental(async_stream::stream! {
                    let mut buffer: Vec<u8> = Vec::new();

                    while let Some(chunk) = body.next().await {
                        let bytes = match chunk {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                yield Err(transport_error(&e, timeout));
                                return;
                            }
                        };
                        buffer.extend_from_slice(&bytes);

                        // Process complete lines only; a UTF-8 sequence may
                        // straddle two network chunks
                        while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=line_end).collect();
                            let line = String::from_utf8_lossy(&line);
                            match parse_event_line(&line) {
                                Ok(Some(text)) => yield Ok(text),
                                Ok(None) => {}
                                Err(e) => {
                                    yield Err(e);
                                    return;
                                }
                            }
                        }
                    }

                    // A final event without trailing newline
                    if !buffer.is_empty() {
                        let line = String::from_utf8_lossy(&buffer).into_owned();
                        match parse_event_line(&line) {
                            Ok(Some(text)) => yield Ok(text),
                            Ok(None) => {}
                            Err(e) => yield Err(e),
                        }
                    }
                }))
            }
        }
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    token: Option<StreamToken>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamToken {
    text: String,
    #[serde(default)]
    special: bool,
}

/// Pulls the reply out of a one-shot response.
///
/// Accepts both `[{"generated_text": ...}]` and a bare object.
///
/// # Errors
///
/// Returns [`GenerationError::Malformed`] when no string `generated_text`
/// is present, or [`GenerationError::Status`]-free backend errors reported
/// in an `error` field as malformed payloads.
pub fn extract_generated_text(payload: &Value) -> Result<String, GenerationError> {
    let first = match payload {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    if let Some(message) = first.and_then(|v| v.get("error")).and_then(Value::as_str) {
        return Err(GenerationError::Malformed(format!("backend error: {message}")));
    }

    first
        .and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::Malformed("missing generated_text".to_string()))
}

/// Parses one line of the streaming response.
///
/// Returns `Ok(None)` for blank lines, comments, non-data fields, special
/// tokens and the `[DONE]` sentinel.
///
/// # Errors
///
/// Returns [`GenerationError::Malformed`] for unparsable `data:` payloads and
/// for events carrying an `error` field.
pub fn parse_event_line(line: &str) -> Result<Option<String>, GenerationError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let event: StreamEvent = serde_json::from_str(data)
        .map_err(|e| GenerationError::Malformed(format!("invalid stream event: {e}")))?;

    if let Some(message) = event.error {
        return Err(GenerationError::Malformed(format!("backend error: {message}")));
    }

    Ok(event
        .token
        .filter(|token| !token.special)
        .map(|token| token.text))
}

fn transport_error(err: &reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else if err.is_decode() {
        GenerationError::Malformed(err.to_string())
    } else {
        GenerationError::Transport(err.to_string())
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
