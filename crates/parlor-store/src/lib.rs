// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parlor chat relay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the [`SqliteRelayStore`]
//! implementation of [`parlor_core::RelayStore`]: append-only conversation
//! logs, the read-status overlay, device cursors, sessions, and the global
//! push token, all with row-level TTLs.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::{SqliteRelayStore, StoreTuning};
