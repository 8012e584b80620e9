//! Client for the Gemini `generateContent` API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::prompt::compose_request;
use super::{FieldExtractionClient, Result};
use crate::error::{ConfigError, ModelError, service_detail};
use crate::models::config::ModelConfig;

/// Longest pause between retries.
const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// Field extraction client backed by a Gemini model.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn send_once(&self, body: &Value) -> std::result::Result<Value, CallFailure> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CallFailure {
                error: ModelError::Transport(format!("model service unreachable: {}", e)),
                retryable: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallFailure {
                error: classify_failure(status, &text),
                retryable: is_retryable_status(status),
            });
        }

        response.json().await.map_err(|e| CallFailure {
            error: ModelError::Transport(format!("invalid model response: {}", e)),
            retryable: false,
        })
    }
}

/// A failed HTTP attempt and whether repeating it may help.
struct CallFailure {
    error: ModelError,
    retryable: bool,
}

#[async_trait]
impl FieldExtractionClient for GeminiClient {
    async fn query(&self, text: &str, schema_prompt: &str) -> Result<String> {
        let body = build_request(schema_prompt, text, self.temperature);
        let mut delay = self.retry_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let started = Instant::now();

            match self.send_once(&body).await {
                Ok(payload) => {
                    let reply = response_text(&payload)?;
                    info!(
                        "Model replied with {} characters in {}ms (attempt {})",
                        reply.len(),
                        started.elapsed().as_millis(),
                        attempt
                    );
                    return Ok(reply);
                }
                Err(failure) if failure.retryable && attempt <= self.max_retries => {
                    warn!(
                        "Model call failed on attempt {}: {}; retrying in {:?}",
                        attempt, failure.error, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}

/// Request body for a single-turn generateContent call.
fn build_request(schema_prompt: &str, document_text: &str, temperature: Option<f32>) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": compose_request(schema_prompt, document_text) }]
        }]
    });
    if let Some(t) = temperature {
        body["generationConfig"] = json!({ "temperature": t });
    }
    body
}

/// Concatenated text parts of the first candidate.
fn response_text(payload: &Value) -> Result<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array());

    let Some(parts) = parts else {
        let reason = payload
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
            .map(|r| format!("response blocked: {}", r))
            .or_else(|| {
                payload
                    .pointer("/candidates/0/finishReason")
                    .and_then(|r| r.as_str())
                    .map(|r| format!("model returned no content (finish reason {})", r))
            })
            .unwrap_or_else(|| "model returned no candidates".to_string());
        return Err(ModelError::Transport(reason));
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    debug!("Model response text: {} chars across {} parts", text.len(), parts.len());
    Ok(text)
}

/// Map a non-success HTTP status to a model error.
fn classify_failure(status: StatusCode, body: &str) -> ModelError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|m| m.as_str())
        .map(service_detail)
        .unwrap_or_else(|| service_detail(body));
    let service_status = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/status"))
        .and_then(|s| s.as_str())
        .unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS || service_status == "RESOURCE_EXHAUSTED" {
        ModelError::QuotaExceeded(message)
    } else {
        ModelError::Transport(format!("model service returned {}: {}", status, message))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
