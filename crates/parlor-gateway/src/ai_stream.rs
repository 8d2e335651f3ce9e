// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient AI lane: relays a Gemini reply to the browser as SSE.
//!
//! Nothing on this path touches the message store. The caller sends the
//! visitor's message plus optional history; the reply streams back as
//! `start`, then `chunk` events, then a terminal `complete` carrying the
//! full accumulated text (or `error` if the provider stream breaks mid-way).

use std::convert::Infallible;
use std::pin::Pin;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use parlor_ai::Content;
use parlor_core::{ParlorError, Sender};
use serde::Serialize;

use crate::server::GatewayState;
use crate::wire::{bad_request, error_response, AiStreamRequest, ErrorResponse, HistoryTurn};

fn sse_json<T: Serialize>(name: &'static str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => Event::default()
            .event("error")
            .data(format!(r#"{{"error":"event serialization: {e}"}}"#)),
    }
}

/// Map wire history onto provider turns. Visitor turns become `user`
/// content, owner turns become `model` content (the AI speaks for the
/// owner's side in this lane).
fn contents_from(history: &[HistoryTurn], message: &str) -> Result<Vec<Content>, String> {
    let mut contents = Vec::with_capacity(history.len() + 1);
    for turn in history {
        let Some(sender) = Sender::from_wire(&turn.sender) else {
            return Err(format!("unknown sender `{}` in history", turn.sender));
        };
        contents.push(match sender {
            Sender::Visitor => Content::user(&turn.text),
            Sender::Owner => Content::model(&turn.text),
        });
    }
    contents.push(Content::user(message));
    Ok(contents)
}

type SseItem = Result<Event, Infallible>;
type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ParlorError>> + Send>>;

struct ReplyCtx {
    chunks: ChunkStream,
    message_id: String,
    accumulated: String,
    finished: bool,
}

fn relay_reply(chunks: ChunkStream, message_id: String) -> impl Stream<Item = SseItem> + Send {
    let start = sse_json(
        "start",
        &serde_json::json!({"messageId": message_id.clone()}),
    );

    let ctx = ReplyCtx {
        chunks,
        message_id,
        accumulated: String::new(),
        finished: false,
    };

    stream::once(async move { Ok(start) }).chain(stream::unfold(ctx, |mut ctx| async move {
        if ctx.finished {
            return None;
        }
        let event = match ctx.chunks.next().await {
            Some(Ok(text)) => {
                ctx.accumulated.push_str(&text);
                sse_json("chunk", &serde_json::json!({"text": text}))
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "provider stream failed mid-reply");
                ctx.finished = true;
                sse_json("error", &serde_json::json!({"error": e.to_string()}))
            }
            None => {
                ctx.finished = true;
                sse_json(
                    "complete",
                    &serde_json::json!({
                        "messageId": ctx.message_id,
                        "text": ctx.accumulated,
                    }),
                )
            }
        };
        Some((Ok(event), ctx))
    }))
}

/// POST /v1/ai/stream
pub async fn post_ai_stream(
    State(state): State<GatewayState>,
    Json(body): Json<AiStreamRequest>,
) -> Response {
    if body.message.trim().is_empty() {
        return bad_request("message is required");
    }

    let Some(ai) = state.ai.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "AI is not configured".to_string(),
            }),
        )
            .into_response();
    };

    let history = body.history.unwrap_or_default();
    let contents = match contents_from(&history, &body.message) {
        Ok(contents) => contents,
        Err(message) => return bad_request(message),
    };

    let message_id = body
        .message_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    // A failure before any byte streams is an ordinary upstream error, not
    // an SSE `error` event.
    match ai.stream_reply(contents).await {
        Ok(chunks) => Sse::new(relay_reply(chunks, message_id)).into_response(),
        Err(e) => error_response(e),
    }
}
