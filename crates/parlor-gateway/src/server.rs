// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the relay API.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use parlor_ai::GeminiClient;
use parlor_config::model::RelayConfig;
use parlor_core::{ParlorError, RelayStore};
use parlor_push::ExpoPushClient;
use tower_http::cors::CorsLayer;

use crate::ai_stream;
use crate::handlers;
use crate::stream;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Message log, overlay, cursors, sessions, push token.
    pub store: Arc<dyn RelayStore>,
    /// Push delivery client. Always constructed; whether a push actually
    /// goes out depends on a token being registered.
    pub push: Arc<ExpoPushClient>,
    /// AI collaborator client; `None` when no API key is configured.
    pub ai: Option<Arc<GeminiClient>>,
    /// Retention and stream-budget knobs.
    pub relay: RelayConfig,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Build the full route table.
///
/// Exposed separately from [`start_server`] so integration tests can drive
/// the router with `tower::ServiceExt::oneshot` without binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/sessions", post(handlers::post_sessions))
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/messages", get(handlers::get_messages))
        .route("/v1/sync", get(handlers::get_sync))
        .route("/v1/stream", get(stream::get_stream))
        .route("/v1/conversations", get(handlers::get_conversations))
        .route(
            "/v1/conversations/{id}/read",
            post(handlers::post_mark_read),
        )
        .route("/v1/push/token", put(handlers::put_push_token))
        .route("/v1/push/token", get(handlers::get_push_token))
        .route("/v1/push/token", delete(handlers::delete_push_token))
        .route("/v1/push", post(handlers::post_push))
        .route("/v1/ai/stream", post(ai_stream::post_ai_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ParlorError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParlorError::Stream {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("relay listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParlorError::Stream {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
