// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the relay REST API.
//!
//! Input validation happens before any store access: a request missing its
//! session id or carrying an unparseable cursor is rejected with 400 without
//! touching SQLite.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parlor_core::{
    Conversation, Cursor, DeviceId, LogPosition, NewMessage, Sender, SessionId, SessionRecord,
};
use parlor_push::{is_valid_expo_token, PushData, PushMessage};
use tracing::{debug, warn};

use crate::server::GatewayState;
use crate::wire::*;

pub(crate) fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Conversation identity from wire parameters. Conversation "2" is the AI
/// lane and is transient whether or not the flag says so.
pub(crate) fn conversation_from(
    session_id: &str,
    conversation_id: &str,
    transient: bool,
) -> Conversation {
    let session = SessionId(session_id.to_string());
    if transient || conversation_id == "2" {
        Conversation::Transient {
            session,
            conversation_id: conversation_id.to_string(),
        }
    } else {
        Conversation::Persistent {
            session,
            conversation_id: conversation_id.to_string(),
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /v1/sessions
///
/// Mint a new visitor session: 32 hex chars, unverified bearer identifier.
pub async fn post_sessions(State(state): State<GatewayState>) -> Response {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let created_at = now_iso();
    let ttl_seconds = state.relay.session_ttl_secs;
    let expires_at = (chrono::Utc::now() + chrono::Duration::seconds(ttl_seconds as i64))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();

    let record = SessionRecord {
        id: SessionId(session_id.clone()),
        created_at: created_at.clone(),
        expires_at,
    };

    if let Err(e) = state.store.create_session(&record).await {
        return error_response(e);
    }

    debug!(session = %session_id, "session created");
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            created_at,
            ttl_seconds,
        }),
    )
        .into_response()
}

/// POST /v1/messages
///
/// Append a batch of messages. Transient conversations are acknowledged but
/// never stored. Visitor messages landing in conversation "1" trigger a
/// best-effort push fan-out; its failure never fails the append.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(body): Json<AppendRequest>,
) -> Response {
    if body.session_id.trim().is_empty() {
        return bad_request("sessionId is required");
    }
    if body.messages.is_empty() {
        return bad_request("messages must not be empty");
    }

    // Validate every message up front so a bad batch stores nothing.
    let mut parsed = Vec::with_capacity(body.messages.len());
    for msg in &body.messages {
        if msg.message_id.trim().is_empty() {
            return bad_request("messageId is required");
        }
        let Some(sender) = Sender::from_wire(&msg.sender) else {
            return bad_request(format!("unknown sender `{}`", msg.sender));
        };
        let status = match &msg.status {
            Some(s) => match s.parse() {
                Ok(status) => Some(status),
                Err(_) => return bad_request(format!("unknown status `{s}`")),
            },
            None => None,
        };
        parsed.push(NewMessage {
            message_id: msg.message_id.clone(),
            text: msg.text.clone(),
            sender,
            timestamp: msg.timestamp.clone().unwrap_or_else(now_iso),
            status,
        });
    }

    let conversation = conversation_from(&body.session_id, &body.conversation_id, body.transient);

    let Some(key) = conversation.key() else {
        // Transient lane: acknowledge without positions, store untouched.
        let results = parsed
            .iter()
            .map(|m| AppendResult {
                message_id: m.message_id.clone(),
                position: None,
            })
            .collect();
        return Json(AppendResponse {
            success: true,
            results,
        })
        .into_response();
    };

    let mut results = Vec::with_capacity(parsed.len());
    let mut visitor_preview: Option<String> = None;
    for msg in &parsed {
        match state.store.append(&key, msg).await {
            Ok(position) => {
                if msg.sender == Sender::Visitor {
                    visitor_preview = Some(msg.text.clone());
                }
                results.push(AppendResult {
                    message_id: msg.message_id.clone(),
                    position: Some(position.0),
                });
            }
            Err(e) => return error_response(e),
        }
    }

    // Owner-authored messages never fan out; neither do side conversations.
    if conversation.conversation_id() == "1" {
        if let Some(preview) = visitor_preview {
            let session = conversation.session().clone();
            let fan_out_state = state.clone();
            tokio::spawn(async move {
                match send_push(&fan_out_state, Some(&session), &preview, None, None).await {
                    Ok(Some(ticket)) => debug!(ticket = ?ticket.id, "push fan-out delivered"),
                    Ok(None) => debug!("push fan-out skipped: no token registered"),
                    Err(e) => warn!(error = %e, "push fan-out failed"),
                }
            });
        }
    }

    Json(AppendResponse {
        success: true,
        results,
    })
    .into_response()
}

/// GET /v1/messages
///
/// First-load read of the full (load-limit bounded) log, overlay merged.
pub async fn get_messages(
    State(state): State<GatewayState>,
    Query(q): Query<ConversationQuery>,
) -> Response {
    if q.session_id.trim().is_empty() {
        return bad_request("sessionId is required");
    }

    let conversation = conversation_from(&q.session_id, &q.conversation_id, q.transient);
    let Some(key) = conversation.key() else {
        return Json(MessagesResponse {
            success: true,
            messages: Vec::new(),
        })
        .into_response();
    };

    match state.store.read_all(&key).await {
        Ok(entries) => {
            let messages = entries
                .iter()
                .map(|e| WireMessage::from_entry(e, conversation.conversation_id()))
                .collect();
            Json(MessagesResponse {
                success: true,
                messages,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /v1/sync
///
/// Catch-up read: explicit cursor beats the stored device cursor beats the
/// start of the log. A changed cursor is persisted for the device so the next
/// sync resumes without a parameter.
pub async fn get_sync(
    State(state): State<GatewayState>,
    Query(q): Query<SyncQuery>,
) -> Response {
    if q.session_id.trim().is_empty() {
        return bad_request("sessionId is required");
    }

    let explicit = match &q.cursor {
        Some(raw) => match raw.parse::<Cursor>() {
            Ok(cursor) => Some(cursor),
            Err(e) => return bad_request(e.to_string()),
        },
        None => None,
    };

    let conversation = conversation_from(&q.session_id, &q.conversation_id, q.transient);
    let Some(key) = conversation.key() else {
        return Json(SyncResponse {
            success: true,
            messages: Vec::new(),
            cursor: explicit.unwrap_or(Cursor::Start).to_string(),
            has_more: false,
        })
        .into_response();
    };

    let device = q.device_id.as_ref().map(|d| DeviceId(d.clone()));

    let effective = match explicit {
        Some(cursor) => cursor,
        None => match &device {
            Some(device) => match state.store.get_cursor(device, &key).await {
                Ok(Some(position)) => Cursor::At(position),
                Ok(None) => Cursor::Start,
                Err(e) => return error_response(e),
            },
            None => Cursor::Start,
        },
    };

    let limit = state.relay.read_limit;
    let (entries, next) = match state.store.read_from(&key, effective, limit).await {
        Ok(result) => result,
        Err(e) => return error_response(e),
    };

    let has_more = entries.len() == limit;

    if let (Some(device), Cursor::At(position)) = (&device, next) {
        if next != effective {
            if let Err(e) = state.store.set_cursor(device, &key, position).await {
                // The sync result is still valid; the device just re-reads next time.
                warn!(error = %e, "failed to persist device cursor");
            }
        }
    }

    let messages = entries
        .iter()
        .map(|e| WireMessage::from_entry(e, conversation.conversation_id()))
        .collect();
    Json(SyncResponse {
        success: true,
        messages,
        cursor: next.to_string(),
        has_more,
    })
    .into_response()
}

/// GET /v1/conversations
///
/// Owner inbox: every live conversation across all sessions, with its last
/// message and unread count. Transient AI exchanges never persist, so they
/// never show up here.
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Query(q): Query<ConversationsQuery>,
) -> Response {
    if !matches!(q.sort.as_str(), "timestamp" | "unread") {
        return bad_request(format!("unknown sort `{}`", q.sort));
    }
    if !matches!(q.order.as_str(), "asc" | "desc") {
        return bad_request(format!("unknown order `{}`", q.order));
    }

    let summaries = match state.store.list_conversations().await {
        Ok(summaries) => summaries,
        Err(e) => return error_response(e),
    };

    let mut conversations: Vec<WireConversation> = summaries
        .into_iter()
        .map(|s| WireConversation {
            id: format!("{}:{}", s.session.0, s.conversation_id),
            session_id: s.session.0,
            conversation_id: s.conversation_id,
            name: "Website Visitor",
            last_message: s.last_message,
            timestamp: s.timestamp,
            unread: s.unread,
            message_count: s.message_count,
        })
        .collect();

    // ISO 8601 timestamps order lexicographically.
    match q.sort.as_str() {
        "unread" => conversations.sort_by(|a, b| a.unread.cmp(&b.unread)),
        _ => conversations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
    }
    if q.order == "desc" {
        conversations.reverse();
    }

    let total = conversations.len();
    Json(ConversationsResponse {
        success: true,
        conversations,
        total,
    })
    .into_response()
}

/// POST /v1/conversations/{id}/read
///
/// Mark messages read. Explicit ids when the caller knows them; an empty
/// body marks every visitor-authored message. Only conversation "1" has a
/// read overlay.
pub async fn post_mark_read(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Query(q): Query<MarkReadQuery>,
    body: Option<Json<MarkReadRequest>>,
) -> Response {
    if q.session_id.trim().is_empty() {
        return bad_request("sessionId is required");
    }
    if conversation_id != "1" {
        return bad_request("only conversation 1 tracks read status");
    }

    let session = SessionId(q.session_id.clone());
    let key = parlor_core::ConversationKey::new(&session, &conversation_id);

    let message_ids = body.and_then(|Json(b)| b.message_ids).unwrap_or_default();

    let result = if message_ids.is_empty() {
        state.store.mark_all_visitor_read(&key).await
    } else {
        state.store.mark_read(&key, &message_ids).await
    };

    match result {
        Ok(()) => Json(OkResponse { success: true }).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /v1/push/token
pub async fn put_push_token(
    State(state): State<GatewayState>,
    Json(body): Json<PushTokenRequest>,
) -> Response {
    if !is_valid_expo_token(&body.token) {
        return bad_request("token is not a valid Expo push token");
    }

    let ttl = body.ttl_seconds.map(Duration::from_secs);
    match state.store.set_push_token(&body.token, ttl).await {
        Ok(()) => Json(OkResponse { success: true }).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /v1/push/token
pub async fn delete_push_token(State(state): State<GatewayState>) -> Response {
    match state.store.delete_push_token().await {
        Ok(()) => Json(OkResponse { success: true }).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/push/token
pub async fn get_push_token(State(state): State<GatewayState>) -> Response {
    match state.store.get_push_token().await {
        Ok(token) => {
            let token_prefix = token
                .as_ref()
                .map(|t| t.chars().take(24).collect::<String>());
            Json(PushTokenStatus {
                configured: token.is_some(),
                token_prefix,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /v1/push
///
/// Explicit push delivery. No registered token is a success (`skipped`); a
/// malformed *stored* token is a server-side failure, unlike the 400 a client
/// gets for submitting one.
pub async fn post_push(
    State(state): State<GatewayState>,
    Json(body): Json<PushRequest>,
) -> Response {
    if body.message.trim().is_empty() {
        return bad_request("message is required");
    }

    let session = body.session_id.as_ref().map(|s| SessionId(s.clone()));
    match send_push(
        &state,
        session.as_ref(),
        &body.message,
        body.sender_name.as_deref(),
        body.timestamp.as_deref(),
    )
    .await
    {
        Ok(Some(ticket)) => Json(PushResponse {
            success: true,
            skipped: false,
            reason: None,
            ticket_id: ticket.id,
        })
        .into_response(),
        Ok(None) => Json(PushResponse {
            success: true,
            skipped: true,
            reason: Some("no push token registered".to_string()),
            ticket_id: None,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Deliver one push to the registered device, if any.
///
/// `Ok(None)` means no token is registered (not an error). The payload embeds
/// the conversation's tail position as `streamId` so the device can resume
/// from exactly the message that triggered the push.
pub(crate) async fn send_push(
    state: &GatewayState,
    session: Option<&SessionId>,
    preview: &str,
    sender_name: Option<&str>,
    timestamp: Option<&str>,
) -> Result<Option<parlor_push::PushTicket>, parlor_core::ParlorError> {
    let Some(token) = state.store.get_push_token().await? else {
        return Ok(None);
    };

    if !is_valid_expo_token(&token) {
        return Err(parlor_core::ParlorError::PushRejected {
            message: "stored push token is malformed".to_string(),
            details: None,
        });
    }

    let stream_id = match session {
        Some(session) => {
            let key = parlor_core::ConversationKey::new(session, "1");
            state
                .store
                .latest_position(&key)
                .await?
                .unwrap_or(LogPosition(0))
                .to_string()
        }
        None => "0".to_string(),
    };

    let message = PushMessage {
        to: token,
        title: sender_name.unwrap_or("Website Visitor").to_string(),
        body: preview.to_string(),
        sound: "default".to_string(),
        data: PushData {
            conversation_id: "1".to_string(),
            session_id: session.map(|s| s.0.clone()),
            stream_id,
            timestamp: timestamp.map(str::to_string),
        },
    };

    state.push.send(&message).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_two_is_always_transient() {
        let c = conversation_from("abc", "2", false);
        assert!(matches!(c, Conversation::Transient { .. }));
        assert!(c.key().is_none());
    }

    #[test]
    fn transient_flag_wins_over_conversation_id() {
        let c = conversation_from("abc", "1", true);
        assert!(c.key().is_none());
        // The wire echoes the id the client asked for, not the AI lane's.
        assert_eq!(c.conversation_id(), "1");
    }

    #[test]
    fn persistent_conversation_builds_a_key() {
        let c = conversation_from("abc", "1", false);
        assert_eq!(c.key().unwrap().0, "conv:abc:1");
        assert_eq!(c.conversation_id(), "1");
    }

    #[test]
    fn now_iso_has_millisecond_precision() {
        let ts = now_iso();
        // e.g. 2026-08-23T12:34:56.789Z
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[19..20], ".");
    }
}
