// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait for the relay's shared state: the append-only message log,
//! the read-status overlay, the cursor registry, the session registry, and
//! the global push token.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::types::{
    ConversationKey, ConversationSummary, Cursor, DeviceId, LogEntry, LogPosition, NewMessage,
    SessionId, SessionRecord,
};

/// Backend for all cross-request relay state.
///
/// Every mutation is single-key (one conversation, one message id, one device
/// cursor); there are no multi-key transactions, which is what keeps the
/// connection-per-request model correct under concurrent writers.
///
/// All read paths (`read_from`, `read_all`, `follow_tail`) return entries with
/// the read-status overlay already merged: an overlay hit wins over the
/// entry's stored status.
#[async_trait]
pub trait RelayStore: Send + Sync {
    // --- Message log ---

    /// Append one entry to a conversation log, assigning a new strictly
    /// increasing position. Refreshes the conversation's TTL as a side
    /// effect. Never blocks on readers.
    async fn append(
        &self,
        key: &ConversationKey,
        msg: &NewMessage,
    ) -> Result<LogPosition, ParlorError>;

    /// Entries strictly after `cursor`, ascending, up to `limit`.
    ///
    /// The returned cursor is the position of the last entry, or the input
    /// cursor unchanged when nothing matched ("nothing new", not an error).
    /// A `Tail` cursor resolves to the current end of the log.
    async fn read_from(
        &self,
        key: &ConversationKey,
        cursor: Cursor,
        limit: usize,
    ) -> Result<(Vec<LogEntry>, Cursor), ParlorError>;

    /// Full ordered log, bounded by the implementation's load limit.
    /// First-load only.
    async fn read_all(&self, key: &ConversationKey) -> Result<Vec<LogEntry>, ParlorError>;

    /// Block up to `block` waiting for entries after `cursor`.
    ///
    /// Returns as soon as at least one entry exists; an empty batch on
    /// timeout is the expected steady state of an idle conversation, not an
    /// error. `Cursor::Tail` means "only entries appended after this call
    /// begins".
    async fn follow_tail(
        &self,
        key: &ConversationKey,
        cursor: Cursor,
        block: Duration,
    ) -> Result<Vec<LogEntry>, ParlorError>;

    /// Position of the newest entry, if any. Used by push fan-out to embed a
    /// resumption cursor in the notification payload.
    async fn latest_position(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<LogPosition>, ParlorError>;

    // --- Read-status overlay ---

    /// Mark the given message ids read. Idempotent: re-marking is a no-op
    /// success.
    async fn mark_read(
        &self,
        key: &ConversationKey,
        message_ids: &[String],
    ) -> Result<(), ParlorError>;

    /// Mark every visitor-authored message in the conversation read.
    /// Scans the full (TTL-bounded) log; prefer `mark_read` with explicit
    /// ids when the caller knows them.
    async fn mark_all_visitor_read(&self, key: &ConversationKey) -> Result<(), ParlorError>;

    /// Message ids currently marked read. Presence means read; the overlay
    /// never stores "unread".
    async fn read_statuses(
        &self,
        key: &ConversationKey,
    ) -> Result<HashSet<String>, ParlorError>;

    // --- Inbox ---

    /// Every live, nonempty conversation across all sessions, with its tail
    /// message and unread count. Feeds the owner's inbox; the order of the
    /// returned summaries is unspecified.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ParlorError>;

    // --- Cursor registry ---

    async fn set_cursor(
        &self,
        device: &DeviceId,
        key: &ConversationKey,
        position: LogPosition,
    ) -> Result<(), ParlorError>;

    async fn get_cursor(
        &self,
        device: &DeviceId,
        key: &ConversationKey,
    ) -> Result<Option<LogPosition>, ParlorError>;

    // --- Session registry ---

    async fn create_session(&self, session: &SessionRecord) -> Result<(), ParlorError>;

    async fn get_session(
        &self,
        id: &SessionId,
    ) -> Result<Option<SessionRecord>, ParlorError>;

    // --- Global push token ---

    async fn set_push_token(
        &self,
        token: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ParlorError>;

    async fn get_push_token(&self) -> Result<Option<String>, ParlorError>;

    async fn delete_push_token(&self) -> Result<(), ParlorError>;

    // --- Maintenance ---

    /// Delete expired sessions, conversations, overlay rows, and cursors.
    /// Returns the number of rows removed.
    async fn purge_expired(&self) -> Result<u64, ParlorError>;
}
