// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live SSE stream over a conversation tail.
//!
//! The stream is an explicit state machine driven by `futures::stream::unfold`.
//! Each unfold step handles exactly one state and yields zero or more SSE
//! events; [`advance`] is the pure transition function and carries no I/O, so
//! the protocol shape is unit-testable without a store.
//!
//! Protocol: `connected` first, then per iteration either `message` events
//! (entries arrived within the block budget), one `keepalive` (idle timeout),
//! or one `error` followed by a pause (store trouble). After the iteration
//! budget the stream emits a terminal `reconnect` and ends; reconnecting with
//! the last seen cursor is the designed contract, not a failure.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream, StreamExt};
use parlor_core::{ConversationKey, Cursor, LogEntry, RelayStore};
use serde::Serialize;

use crate::handlers::conversation_from;
use crate::server::GatewayState;
use crate::wire::{bad_request, StreamQuery, WireMessage};

/// Where the stream is in its lifecycle. One terminal `reconnect` event sits
/// between `Terminating` and `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Listening { iteration: usize },
    Emitting { iteration: usize },
    Keepalive { iteration: usize },
    Backoff { iteration: usize },
    Terminating,
    Done,
}

/// What a `Listening` step observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    Entries,
    Empty,
    Failed,
}

/// Pure transition function. `outcome` is only meaningful when leaving
/// `Listening`; every other transition ignores it.
pub fn advance(state: StreamState, budget: usize, outcome: Option<ListenOutcome>) -> StreamState {
    match state {
        StreamState::Connecting => StreamState::Listening { iteration: 1 },
        StreamState::Listening { iteration } => match outcome {
            Some(ListenOutcome::Entries) => StreamState::Emitting { iteration },
            Some(ListenOutcome::Failed) => StreamState::Backoff { iteration },
            Some(ListenOutcome::Empty) | None => StreamState::Keepalive { iteration },
        },
        StreamState::Emitting { iteration }
        | StreamState::Keepalive { iteration }
        | StreamState::Backoff { iteration } => {
            if iteration >= budget {
                StreamState::Terminating
            } else {
                StreamState::Listening {
                    iteration: iteration + 1,
                }
            }
        }
        StreamState::Terminating | StreamState::Done => StreamState::Done,
    }
}

/// Everything one stream instance carries between unfold steps.
pub(crate) struct StreamCtx {
    store: Arc<dyn RelayStore>,
    /// `None` for transient conversations: the store is never consulted and
    /// every iteration degenerates to a keepalive.
    key: Option<ConversationKey>,
    conversation_id: String,
    cursor: Cursor,
    pending: Vec<LogEntry>,
    error: Option<String>,
    /// Set by a Backoff step; the next Listening step pauses before its read
    /// so store errors never hot-loop.
    pause_before_listen: bool,
    budget: usize,
    block: Duration,
    error_pause: Duration,
    state: StreamState,
}

fn sse_json<T: Serialize>(name: &'static str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => Event::default()
            .event("error")
            .data(format!(r#"{{"error":"event serialization: {e}"}}"#)),
    }
}

type SseItem = Result<Event, Infallible>;

/// Run the state machine to completion, yielding SSE events.
pub(crate) fn drive(ctx: StreamCtx) -> impl Stream<Item = SseItem> + Send {
    stream::unfold(ctx, |mut ctx| async move {
        let events: Vec<SseItem> = match ctx.state {
            StreamState::Connecting => {
                ctx.state = advance(ctx.state, ctx.budget, None);
                vec![Ok(sse_json(
                    "connected",
                    &serde_json::json!({"status": "connected"}),
                ))]
            }
            StreamState::Listening { .. } => {
                if std::mem::take(&mut ctx.pause_before_listen) {
                    tokio::time::sleep(ctx.error_pause).await;
                }
                let outcome = match &ctx.key {
                    Some(key) => match ctx.store.follow_tail(key, ctx.cursor, ctx.block).await {
                        Ok(entries) if entries.is_empty() => ListenOutcome::Empty,
                        Ok(entries) => {
                            if let Some(last) = entries.last() {
                                ctx.cursor = Cursor::At(last.position);
                            }
                            ctx.pending = entries;
                            ListenOutcome::Entries
                        }
                        Err(e) => {
                            ctx.error = Some(e.to_string());
                            ListenOutcome::Failed
                        }
                    },
                    None => {
                        tokio::time::sleep(ctx.block).await;
                        ListenOutcome::Empty
                    }
                };
                ctx.state = advance(ctx.state, ctx.budget, Some(outcome));
                Vec::new()
            }
            StreamState::Emitting { .. } => {
                let conversation_id = ctx.conversation_id.clone();
                let events = ctx
                    .pending
                    .drain(..)
                    .map(|entry| {
                        Ok(sse_json(
                            "message",
                            &WireMessage::from_entry(&entry, &conversation_id),
                        ))
                    })
                    .collect();
                ctx.state = advance(ctx.state, ctx.budget, None);
                events
            }
            StreamState::Keepalive { .. } => {
                ctx.state = advance(ctx.state, ctx.budget, None);
                vec![Ok(sse_json(
                    "keepalive",
                    &serde_json::json!({"cursor": ctx.cursor.to_string()}),
                ))]
            }
            StreamState::Backoff { .. } => {
                let message = ctx.error.take().unwrap_or_else(|| "store error".to_string());
                tracing::warn!(error = %message, "stream iteration failed");
                ctx.pause_before_listen = true;
                ctx.state = advance(ctx.state, ctx.budget, None);
                vec![Ok(sse_json(
                    "error",
                    &serde_json::json!({"error": message}),
                ))]
            }
            StreamState::Terminating => {
                ctx.state = StreamState::Done;
                vec![Ok(sse_json(
                    "reconnect",
                    &serde_json::json!({"cursor": ctx.cursor.to_string()}),
                ))]
            }
            StreamState::Done => return None,
        };
        Some((events, ctx))
    })
    .flat_map(stream::iter)
}

/// GET /v1/stream
///
/// The cursor defaults to `Tail`: a fresh stream only sees messages appended
/// after it connects. Clients resuming after a `reconnect` pass the cursor
/// from the last event they saw.
pub async fn get_stream(
    State(state): State<GatewayState>,
    Query(q): Query<StreamQuery>,
) -> Response {
    if q.session_id.trim().is_empty() {
        return bad_request("sessionId is required");
    }

    let cursor = match &q.cursor {
        Some(raw) => match raw.parse::<Cursor>() {
            Ok(cursor) => cursor,
            Err(e) => return bad_request(e.to_string()),
        },
        None => Cursor::Tail,
    };

    let conversation = conversation_from(&q.session_id, &q.conversation_id, q.transient);
    let ctx = StreamCtx {
        store: state.store.clone(),
        key: conversation.key(),
        conversation_id: conversation.conversation_id().to_string(),
        cursor,
        pending: Vec::new(),
        error: None,
        pause_before_listen: false,
        budget: state.relay.stream_max_iterations as usize,
        block: Duration::from_millis(state.relay.stream_block_ms),
        error_pause: Duration::from_millis(state.relay.stream_error_pause_ms),
        state: StreamState::Connecting,
    };

    Sse::new(drive(ctx)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_always_moves_to_first_iteration() {
        let next = advance(StreamState::Connecting, 3, None);
        assert_eq!(next, StreamState::Listening { iteration: 1 });
    }

    #[test]
    fn listening_branches_on_outcome() {
        let at = StreamState::Listening { iteration: 2 };
        assert_eq!(
            advance(at, 3, Some(ListenOutcome::Entries)),
            StreamState::Emitting { iteration: 2 }
        );
        assert_eq!(
            advance(at, 3, Some(ListenOutcome::Empty)),
            StreamState::Keepalive { iteration: 2 }
        );
        assert_eq!(
            advance(at, 3, Some(ListenOutcome::Failed)),
            StreamState::Backoff { iteration: 2 }
        );
    }

    #[test]
    fn every_iteration_counts_against_the_budget() {
        // Emitting, keepalive and backoff all burn an iteration.
        for state in [
            StreamState::Emitting { iteration: 1 },
            StreamState::Keepalive { iteration: 1 },
            StreamState::Backoff { iteration: 1 },
        ] {
            assert_eq!(advance(state, 3, None), StreamState::Listening { iteration: 2 });
        }
    }

    #[test]
    fn budget_exhaustion_terminates() {
        let next = advance(StreamState::Keepalive { iteration: 3 }, 3, None);
        assert_eq!(next, StreamState::Terminating);
        assert_eq!(advance(next, 3, None), StreamState::Done);
    }

    #[test]
    fn budget_of_one_runs_exactly_one_iteration() {
        let mut state = StreamState::Connecting;
        let mut listens = 0;
        loop {
            state = match state {
                StreamState::Listening { .. } => {
                    listens += 1;
                    advance(state, 1, Some(ListenOutcome::Empty))
                }
                StreamState::Done => break,
                _ => advance(state, 1, None),
            };
        }
        assert_eq!(listens, 1);
    }

    #[tokio::test]
    async fn transient_stream_never_touches_the_store() {
        struct PanicStore;
        #[async_trait::async_trait]
        impl RelayStore for PanicStore {
            async fn append(
                &self,
                _: &ConversationKey,
                _: &parlor_core::NewMessage,
            ) -> Result<parlor_core::LogPosition, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn read_from(
                &self,
                _: &ConversationKey,
                _: Cursor,
                _: usize,
            ) -> Result<(Vec<LogEntry>, Cursor), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn read_all(
                &self,
                _: &ConversationKey,
            ) -> Result<Vec<LogEntry>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn follow_tail(
                &self,
                _: &ConversationKey,
                _: Cursor,
                _: Duration,
            ) -> Result<Vec<LogEntry>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn latest_position(
                &self,
                _: &ConversationKey,
            ) -> Result<Option<parlor_core::LogPosition>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn mark_read(
                &self,
                _: &ConversationKey,
                _: &[String],
            ) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn mark_all_visitor_read(
                &self,
                _: &ConversationKey,
            ) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn read_statuses(
                &self,
                _: &ConversationKey,
            ) -> Result<std::collections::HashSet<String>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn list_conversations(
                &self,
            ) -> Result<Vec<parlor_core::ConversationSummary>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn set_cursor(
                &self,
                _: &parlor_core::DeviceId,
                _: &ConversationKey,
                _: parlor_core::LogPosition,
            ) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn get_cursor(
                &self,
                _: &parlor_core::DeviceId,
                _: &ConversationKey,
            ) -> Result<Option<parlor_core::LogPosition>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn create_session(
                &self,
                _: &parlor_core::SessionRecord,
            ) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn get_session(
                &self,
                _: &parlor_core::SessionId,
            ) -> Result<Option<parlor_core::SessionRecord>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn set_push_token(
                &self,
                _: &str,
                _: Option<Duration>,
            ) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn get_push_token(&self) -> Result<Option<String>, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn delete_push_token(&self) -> Result<(), parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
            async fn purge_expired(&self) -> Result<u64, parlor_core::ParlorError> {
                panic!("transient stream consulted the store")
            }
        }

        let ctx = StreamCtx {
            store: Arc::new(PanicStore),
            key: None,
            conversation_id: "2".to_string(),
            cursor: Cursor::Tail,
            pending: Vec::new(),
            error: None,
            pause_before_listen: false,
            budget: 2,
            block: Duration::from_millis(5),
            error_pause: Duration::from_millis(5),
            state: StreamState::Connecting,
        };

        let events: Vec<_> = drive(ctx).collect().await;
        // connected + 2 keepalives + reconnect
        assert_eq!(events.len(), 4);
        let rendered: Vec<String> = events
            .into_iter()
            .map(|e| format!("{:?}", e.unwrap()))
            .collect();
        assert!(rendered[0].contains("connected"));
        assert!(rendered[1].contains("keepalive"));
        assert!(rendered[2].contains("keepalive"));
        assert!(rendered[3].contains("reconnect"));
    }
}
