// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor serve` command implementation.
//!
//! Opens the SQLite store, builds the push and AI clients, spawns the
//! TTL sweeper, and serves the gateway until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use parlor_ai::{resolve_system_prompt, GeminiClient};
use parlor_config::model::ParlorConfig;
use parlor_core::{ParlorError, RelayStore};
use parlor_gateway::{start_server, GatewayState};
use parlor_push::ExpoPushClient;
use parlor_store::{Database, SqliteRelayStore, StoreTuning};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `parlor serve` command.
pub async fn run_serve(config: ParlorConfig) -> Result<(), ParlorError> {
    init_tracing(&config.server.log_level);

    info!("starting parlor relay");

    if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParlorError::Config(format!(
                    "cannot create database directory `{}`: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let db = Database::open_with_journal(&config.storage.database_path, config.storage.wal_mode)
        .await?;
    let store = Arc::new(SqliteRelayStore::new(db, store_tuning(&config)));
    info!(path = %config.storage.database_path, wal = config.storage.wal_mode, "store opened");

    let push = Arc::new(ExpoPushClient::new(&config.push)?);

    let ai = if config.ai.api_key.is_some() {
        let prompt = resolve_system_prompt(&config.ai)?;
        let client = GeminiClient::new(&config.ai, prompt)?;
        info!(model = %config.ai.model, "AI lane enabled");
        Some(Arc::new(client))
    } else {
        info!("ai.api_key not configured; AI lane disabled");
        None
    };

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(run_sweeper(
        store.clone() as Arc<dyn RelayStore>,
        Duration::from_secs(config.relay.sweep_interval_secs),
        cancel.clone(),
    ));

    let state = GatewayState {
        store: store.clone() as Arc<dyn RelayStore>,
        push,
        ai,
        relay: config.relay.clone(),
        start_time: std::time::Instant::now(),
    };

    let shutdown_cancel = cancel.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
            return std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        shutdown_cancel.cancel();
    };

    let result = start_server(&config.server.host, config.server.port, state, shutdown).await;

    // Stop the sweeper and flush the store even when the server errored.
    cancel.cancel();
    let _ = sweeper.await;
    store.database().close().await?;
    info!("parlor relay stopped");

    result
}

/// Map `[relay]` and `[push]` configuration onto store retention knobs.
fn store_tuning(config: &ParlorConfig) -> StoreTuning {
    StoreTuning {
        session_ttl: Duration::from_secs(config.relay.session_ttl_secs),
        cursor_ttl: Duration::from_secs(config.relay.cursor_ttl_secs),
        token_ttl: Duration::from_secs(config.push.token_ttl_secs),
        read_limit: config.relay.read_limit,
        load_limit: config.relay.load_limit,
    }
}

/// Periodically reclaim expired sessions, conversations, overlay rows, and
/// cursors. SQLite rows do not expire on their own; reads filter them out and
/// this sweep reclaims the space.
async fn run_sweeper(
    store: Arc<dyn RelayStore>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval fires immediately; skip the startup tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.purge_expired().await {
                    Ok(0) => debug!("sweep: nothing expired"),
                    Ok(removed) => info!(removed, "sweep reclaimed expired rows"),
                    Err(e) => warn!(error = %e, "sweep failed"),
                }
            }
            _ = cancel.cancelled() => {
                info!("sweeper shutting down");
                break;
            }
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parlor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
