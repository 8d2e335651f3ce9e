// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Expo push API.
//!
//! Provides [`ExpoPushClient`] which handles request construction, token
//! shape validation, transient error retry, and the distinction between
//! transport failures and per-ticket provider rejections.

use std::time::Duration;

use parlor_config::model::PushConfig;
use parlor_core::ParlorError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{PushMessage, PushResponse, PushTicket};

/// HTTP client for Expo push delivery.
///
/// Retries once on transient errors (429, 500, 503). A 2xx response whose
/// ticket says `"error"` is a provider rejection, not a transport failure.
#[derive(Debug, Clone)]
pub struct ExpoPushClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl ExpoPushClient {
    pub fn new(config: &PushConfig) -> Result<Self, ParlorError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParlorError::Push {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: config.provider_url.clone(),
            max_retries: 1,
        })
    }

    /// Overrides the endpoint (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoint(mut self, url: String) -> Self {
        self.endpoint = url;
        self
    }

    /// Send one push message and return its delivery ticket.
    pub async fn send(&self, message: &PushMessage) -> Result<PushTicket, ParlorError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying push delivery after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(message)
                .send()
                .await
                .map_err(|e| ParlorError::Push {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "push response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| ParlorError::Push {
                    message: format!("failed to read push response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: PushResponse =
                    serde_json::from_str(&body).map_err(|e| ParlorError::Push {
                        message: format!("failed to parse push response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                let ticket = parsed.data.into_first().ok_or_else(|| ParlorError::Push {
                    message: "push response contained no ticket".into(),
                    source: None,
                })?;
                if ticket.is_ok() {
                    return Ok(ticket);
                }
                return Err(ParlorError::PushRejected {
                    message: ticket
                        .message
                        .clone()
                        .unwrap_or_else(|| "push rejected without a message".into()),
                    details: ticket.details.as_ref().map(|d| d.to_string()),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient push error, will retry");
                last_error = Some(ParlorError::Push {
                    message: format!("push provider returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            return Err(ParlorError::Push {
                message: format!("push provider returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ParlorError::Push {
            message: "push delivery failed after retries".into(),
            source: None,
        }))
    }
}

/// A well-formed Expo push token: `ExponentPushToken[...]` or
/// `ExpoPushToken[...]`.
pub fn is_valid_expo_token(token: &str) -> bool {
    (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']')
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
