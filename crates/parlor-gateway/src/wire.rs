// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire DTOs for the REST API and the `ParlorError` to status mapping.
//!
//! The wire speaks camelCase and relabels senders for the UI: `visitor`
//! becomes `contact` and `owner` becomes `user`. The store never sees those
//! labels; [`parlor_core::Sender::from_wire`] folds them back on input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parlor_core::{LogEntry, ParlorError, Sender};
use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Render a `ParlorError` as an HTTP response.
///
/// Store trouble is retryable (503); provider and push failures are upstream
/// problems (502), except a provider *rejection*, which means the relay sent
/// something broken and owns the failure (500).
pub fn error_response(err: ParlorError) -> Response {
    let status = match &err {
        ParlorError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ParlorError::Push { .. } | ParlorError::Provider { .. } => StatusCode::BAD_GATEWAY,
        ParlorError::PushRejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ParlorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ParlorError::Config(_) | ParlorError::Stream { .. } | ParlorError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::error!(error = %err, status = %status, "request failed");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Reject bad client input before any store access.
pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// One log entry as the UI sees it. `cursor` is the entry's log position and
/// doubles as the resumption cursor for sync and stream calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub conversation_id: String,
    pub text: String,
    pub sender: &'static str,
    pub sender_name: &'static str,
    pub timestamp: String,
    pub status: String,
    pub cursor: String,
}

impl WireMessage {
    pub fn from_entry(entry: &LogEntry, conversation_id: &str) -> Self {
        let (sender, sender_name) = wire_sender(entry.sender);
        Self {
            id: entry.message_id.clone(),
            conversation_id: conversation_id.to_string(),
            text: entry.text.clone(),
            sender,
            sender_name,
            timestamp: entry.timestamp.clone(),
            status: entry.status.to_string(),
            cursor: entry.position.to_string(),
        }
    }
}

/// UI-facing sender label and display name.
pub fn wire_sender(sender: Sender) -> (&'static str, &'static str) {
    match sender {
        Sender::Visitor => ("contact", "Website Visitor"),
        Sender::Owner => ("user", "Me"),
    }
}

// --- Request/response bodies ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub session_id: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub transient: bool,
    pub messages: Vec<IncomingMessage>,
}

pub fn default_conversation_id() -> String {
    "1".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub message_id: String,
    pub text: String,
    pub sender: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub success: bool,
    pub results: Vec<AppendResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResult {
    pub message_id: String,
    /// Absent for transient conversations, which store nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub session_id: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub transient: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
    pub session_id: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub messages: Vec<WireMessage>,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub session_id: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationsQuery {
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_order")]
    pub order: String,
}

pub fn default_sort() -> String {
    "timestamp".to_string()
}

pub fn default_order() -> String {
    "desc".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<WireConversation>,
    pub total: usize,
}

/// One inbox row. `id` is the composite `{sessionId}:{conversationId}` the
/// owner UI keys its list on.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConversation {
    pub id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub name: &'static str,
    pub last_message: String,
    pub timestamp: String,
    pub unread: u64,
    pub message_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadQuery {
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub message_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub token: String,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStreamRequest {
    pub message: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTurn {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{DeliveryStatus, LogPosition};

    #[test]
    fn wire_message_relabels_senders() {
        let entry = LogEntry {
            position: LogPosition(7),
            message_id: "m1".into(),
            text: "hi".into(),
            sender: Sender::Visitor,
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            status: DeliveryStatus::Sent,
        };
        let wire = WireMessage::from_entry(&entry, "1");
        assert_eq!(wire.sender, "contact");
        assert_eq!(wire.sender_name, "Website Visitor");
        assert_eq!(wire.cursor, "7");

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["conversationId"], "1");
        assert_eq!(json["id"], "m1");
    }

    #[test]
    fn owner_relabels_to_user() {
        assert_eq!(wire_sender(Sender::Owner), ("user", "Me"));
    }

    #[test]
    fn append_request_accepts_camel_case() {
        let json = r#"{
            "sessionId": "abc",
            "conversationId": "1",
            "messages": [{"messageId": "m1", "text": "hi", "sender": "contact"}]
        }"#;
        let req: AppendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.session_id, "abc");
        assert!(!req.transient);
        assert_eq!(req.messages[0].message_id, "m1");
        assert_eq!(req.messages[0].sender, "contact");
    }

    #[test]
    fn push_response_omits_skipped_when_false() {
        let resp = PushResponse {
            success: true,
            skipped: false,
            reason: None,
            ticket_id: Some("t1".into()),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("skipped"));
        assert!(json.contains("ticketId"));
    }
}
