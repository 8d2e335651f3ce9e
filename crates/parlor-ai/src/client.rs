// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini streaming API.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication, streaming SSE responses, and transient error retry.

use std::pin::Pin;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use parlor_config::model::AiConfig;
use parlor_core::ParlorError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, Content, GenerateChunk, GenerateRequest, GenerationConfig, Part,
};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP client for Gemini streaming generation.
///
/// Retries once on transient errors (429, 500, 503) before giving up.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_output_tokens: u32,
    temperature: f64,
    system_prompt: Option<String>,
    max_retries: u32,
}

impl GeminiClient {
    /// Build a client from config. `system_prompt` should already be
    /// resolved (see [`resolve_system_prompt`]). Returns an error when no
    /// API key is configured.
    pub fn new(config: &AiConfig, system_prompt: Option<String>) -> Result<Self, ParlorError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| ParlorError::Config("ai.api_key is not configured".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ParlorError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ParlorError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            system_prompt,
            max_retries: 1,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Stream a reply to the given conversation turns.
    ///
    /// Yields text chunks as they arrive; the stream ends when the provider
    /// closes it. On transient errors (429, 500, 503) before any byte is
    /// streamed, retries once after a 1-second delay.
    pub async fn stream_reply(
        &self,
        contents: Vec<Content>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String, ParlorError>> + Send>>, ParlorError> {
        let request = GenerateRequest {
            contents,
            system_instruction: self.system_prompt.as_ref().map(|prompt| Content {
                role: String::new(),
                parts: vec![Part {
                    text: prompt.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying generation request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ParlorError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "generation response received");

            if status.is_success() {
                return Ok(parse_chunk_stream(response));
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ParlorError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "Gemini API error ({}): {}",
                    api_err.error.status, api_err.error.message
                )
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(ParlorError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ParlorError::Provider {
            message: "generation request failed after retries".into(),
            source: None,
        }))
    }
}

/// Resolve the configured system prompt: a prompt file takes precedence over
/// the inline string.
pub fn resolve_system_prompt(config: &AiConfig) -> Result<Option<String>, ParlorError> {
    if let Some(path) = &config.system_prompt_file {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ParlorError::Config(format!("failed to read ai.system_prompt_file `{path}`: {e}"))
        })?;
        return Ok(Some(content));
    }
    Ok(config.system_prompt.clone())
}

/// Parses a streaming response into a stream of text chunks.
///
/// Gemini's SSE frames carry no event name, just JSON data. Frames without
/// text (finish markers, safety metadata) are skipped.
fn parse_chunk_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<String, ParlorError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::from_str::<GenerateChunk>(&event.data) {
                Ok(chunk) => chunk.text().map(Ok),
                Err(e) => Some(Err(ParlorError::Provider {
                    message: format!("failed to parse generation chunk: {e}"),
                    source: Some(Box::new(e)),
                })),
            },
            Err(e) => Some(Err(ParlorError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
