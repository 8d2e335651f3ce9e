// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parlor chat relay.

use thiserror::Error;

/// The primary error type used across all Parlor crates.
///
/// A tail-follow that elapses with nothing new is NOT an error and has no
/// variant here -- it returns an empty batch. See `RelayStore::follow_tail`.
#[derive(Debug, Error)]
pub enum ParlorError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, serialization).
    /// Transient from the caller's perspective: surface a 5xx and let the
    /// client retry; never silently drop data.
    #[error("storage error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Live stream errors (event encoding, subscriber plumbing).
    #[error("stream error: {message}")]
    Stream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Push transport errors (provider unreachable, malformed response body).
    #[error("push transport error: {message}")]
    Push {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Per-notification errors reported by the push provider itself.
    /// Kept distinct from [`ParlorError::Push`] so callers can tell a dead
    /// token apart from a network blip.
    #[error("push rejected by provider: {message}")]
    PushRejected {
        message: String,
        details: Option<String>,
    },

    /// Text-generation provider errors (API failure, token limits).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
