// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlor chat relay.
//!
//! Provides the shared error type, the log/cursor/conversation data model,
//! and the [`RelayStore`] trait every storage backend implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ParlorError;
pub use traits::RelayStore;
pub use types::{
    Conversation, ConversationKey, ConversationSummary, Cursor, DeliveryStatus, DeviceId,
    LogEntry, LogPosition, NewMessage, Sender, SessionId, SessionRecord,
};
