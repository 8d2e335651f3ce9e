// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`RelayStore`] implementation over SQLite.
//!
//! Blocking tail-follow is layered on top of plain reads with one
//! `tokio::sync::Notify` per conversation: appenders notify after commit,
//! followers re-read after each wakeup. The notify future is always created
//! before the read so an append landing between the two cannot be missed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

use parlor_core::{
    ConversationKey, ConversationSummary, Cursor, DeliveryStatus, DeviceId, LogEntry,
    LogPosition, NewMessage, ParlorError, RelayStore, SessionId, SessionRecord,
};

use crate::database::Database;
use crate::queries;

/// Retention and batch-size knobs, taken from `[relay]` configuration.
#[derive(Debug, Clone)]
pub struct StoreTuning {
    /// Lifetime of sessions, conversation logs, and overlay rows.
    pub session_ttl: Duration,
    /// Lifetime of device cursor rows.
    pub cursor_ttl: Duration,
    /// Default lifetime of the push token when the caller gives none.
    pub token_ttl: Duration,
    /// Batch cap for incremental reads.
    pub read_limit: usize,
    /// Batch cap for first-load reads and full-log scans.
    pub load_limit: usize,
}

impl Default for StoreTuning {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 60 * 60),
            cursor_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            token_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            read_limit: 100,
            load_limit: 1000,
        }
    }
}

pub struct SqliteRelayStore {
    db: Database,
    tuning: StoreTuning,
    wakers: DashMap<String, Arc<Notify>>,
}

impl SqliteRelayStore {
    pub fn new(db: Database, tuning: StoreTuning) -> Self {
        Self {
            db,
            tuning,
            wakers: DashMap::new(),
        }
    }

    /// Open the database at `path` and wrap it in a store.
    pub async fn open(path: &str, tuning: StoreTuning) -> Result<Self, ParlorError> {
        let db = Database::open(path).await?;
        Ok(Self::new(db, tuning))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn waker(&self, key: &ConversationKey) -> Arc<Notify> {
        self.wakers.entry(key.0.clone()).or_default().clone()
    }

    /// Resolve a cursor to the position reads should start strictly after.
    async fn resolve(&self, key: &ConversationKey, cursor: Cursor) -> Result<i64, ParlorError> {
        Ok(match cursor {
            Cursor::Start => 0,
            Cursor::At(position) => position.0,
            Cursor::Tail => queries::log::latest_position(&self.db, key)
                .await?
                .map(|p| p.0)
                .unwrap_or(0),
        })
    }

    /// Read after `after` and merge the read-status overlay on top.
    async fn read_merged(
        &self,
        key: &ConversationKey,
        after: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ParlorError> {
        let mut entries = queries::log::read_after(&self.db, key, after, limit).await?;
        if entries.is_empty() {
            return Ok(entries);
        }
        let overlay = queries::read_status::read_statuses(&self.db, key).await?;
        merge_overlay(&mut entries, &overlay);
        Ok(entries)
    }
}

/// Flip entry statuses to `Read` where the overlay has a row. The overlay
/// always wins over the stored status.
pub fn merge_overlay(entries: &mut [LogEntry], overlay: &HashSet<String>) {
    for entry in entries {
        if overlay.contains(&entry.message_id) {
            entry.status = DeliveryStatus::Read;
        }
    }
}

#[async_trait]
impl RelayStore for SqliteRelayStore {
    async fn append(
        &self,
        key: &ConversationKey,
        msg: &NewMessage,
    ) -> Result<LogPosition, ParlorError> {
        let ttl = self.tuning.session_ttl.as_secs();
        let position = queries::log::append_entry(&self.db, key, msg, ttl).await?;
        tracing::debug!(key = %key, position = %position, "appended log entry");
        if let Some(waker) = self.wakers.get(&key.0) {
            waker.notify_waiters();
        }
        Ok(position)
    }

    async fn read_from(
        &self,
        key: &ConversationKey,
        cursor: Cursor,
        limit: usize,
    ) -> Result<(Vec<LogEntry>, Cursor), ParlorError> {
        let after = self.resolve(key, cursor).await?;
        let entries = self.read_merged(key, after, limit).await?;
        let next = match entries.last() {
            Some(last) => Cursor::At(last.position),
            None => cursor,
        };
        Ok((entries, next))
    }

    async fn read_all(&self, key: &ConversationKey) -> Result<Vec<LogEntry>, ParlorError> {
        self.read_merged(key, 0, self.tuning.load_limit).await
    }

    async fn follow_tail(
        &self,
        key: &ConversationKey,
        cursor: Cursor,
        block: Duration,
    ) -> Result<Vec<LogEntry>, ParlorError> {
        let deadline = Instant::now() + block;
        let after = self.resolve(key, cursor).await?;
        let waker = self.waker(key);

        loop {
            let notified = waker.notified();
            let entries = self.read_merged(key, after, self.tuning.read_limit).await?;
            if !entries.is_empty() {
                return Ok(entries);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn latest_position(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<LogPosition>, ParlorError> {
        queries::log::latest_position(&self.db, key).await
    }

    async fn mark_read(
        &self,
        key: &ConversationKey,
        message_ids: &[String],
    ) -> Result<(), ParlorError> {
        let ttl = self.tuning.session_ttl.as_secs();
        queries::read_status::mark_read(&self.db, key, message_ids, ttl).await
    }

    async fn mark_all_visitor_read(&self, key: &ConversationKey) -> Result<(), ParlorError> {
        let ids =
            queries::log::visitor_message_ids(&self.db, key, self.tuning.load_limit).await?;
        let ttl = self.tuning.session_ttl.as_secs();
        queries::read_status::mark_read(&self.db, key, &ids, ttl).await
    }

    async fn read_statuses(
        &self,
        key: &ConversationKey,
    ) -> Result<HashSet<String>, ParlorError> {
        queries::read_status::read_statuses(&self.db, key).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ParlorError> {
        queries::conversations::list_conversations(&self.db).await
    }

    async fn set_cursor(
        &self,
        device: &DeviceId,
        key: &ConversationKey,
        position: LogPosition,
    ) -> Result<(), ParlorError> {
        let ttl = self.tuning.cursor_ttl.as_secs();
        queries::cursors::set_cursor(&self.db, device, key, position, ttl).await
    }

    async fn get_cursor(
        &self,
        device: &DeviceId,
        key: &ConversationKey,
    ) -> Result<Option<LogPosition>, ParlorError> {
        queries::cursors::get_cursor(&self.db, device, key).await
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), ParlorError> {
        queries::sessions::create_session(&self.db, session).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, ParlorError> {
        queries::sessions::get_session(&self.db, id).await
    }

    async fn set_push_token(
        &self,
        token: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ParlorError> {
        let ttl = ttl.unwrap_or(self.tuning.token_ttl).as_secs();
        queries::push_token::set_token(&self.db, token, ttl).await
    }

    async fn get_push_token(&self) -> Result<Option<String>, ParlorError> {
        queries::push_token::get_token(&self.db).await
    }

    async fn delete_push_token(&self) -> Result<(), ParlorError> {
        queries::push_token::delete_token(&self.db).await
    }

    async fn purge_expired(&self) -> Result<u64, ParlorError> {
        let removed = queries::maintenance::purge_expired(&self.db).await?;
        // Drop wakers for dead conversations so the registry cannot grow
        // unbounded. A strong count above one means a follower still holds
        // the Notify; it keeps working through its own Arc either way.
        let live = queries::maintenance::live_conversation_keys(&self.db).await?;
        self.wakers
            .retain(|key, waker| live.contains(key) || Arc::strong_count(waker) > 1);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::Sender;
    use tempfile::tempdir;

    async fn setup_store() -> (Arc<SqliteRelayStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteRelayStore::open(db_path.to_str().unwrap(), StoreTuning::default())
            .await
            .unwrap();
        (Arc::new(store), dir)
    }

    fn key(id: &str) -> ConversationKey {
        let session = SessionId("0123456789abcdef0123456789abcdef".to_string());
        ConversationKey::new(&session, id)
    }

    fn msg(id: &str, sender: Sender) -> NewMessage {
        NewMessage {
            message_id: id.to_string(),
            text: format!("body of {id}"),
            sender,
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            status: None,
        }
    }

    #[tokio::test]
    async fn read_from_resumes_where_the_last_batch_ended() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        for i in 0..5 {
            store.append(&k, &msg(&format!("m{i}"), Sender::Visitor)).await.unwrap();
        }

        let (first, cursor) = store.read_from(&k, Cursor::Start, 3).await.unwrap();
        assert_eq!(first.len(), 3);

        let (rest, _) = store.read_from(&k, cursor, 100).await.unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].message_id, "m3");
        assert!(first.last().unwrap().position < rest[0].position);
    }

    #[tokio::test]
    async fn read_from_empty_log_returns_the_input_cursor() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        let (entries, cursor) = store.read_from(&k, Cursor::Start, 100).await.unwrap();
        assert!(entries.is_empty());
        assert_eq!(cursor, Cursor::Start);
    }

    #[tokio::test]
    async fn tail_cursor_skips_existing_history() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        store.append(&k, &msg("old", Sender::Visitor)).await.unwrap();

        let (entries, _) = store.read_from(&k, Cursor::Tail, 100).await.unwrap();
        assert!(entries.is_empty());

        store.append(&k, &msg("new", Sender::Visitor)).await.unwrap();
        // Tail re-resolves at call time, so read from the known position instead.
        let batch = store
            .follow_tail(&k, Cursor::At(LogPosition(1)), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message_id, "new");
    }

    #[tokio::test]
    async fn overlay_wins_over_stored_status() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        store.append(&k, &msg("m1", Sender::Visitor)).await.unwrap();
        store.append(&k, &msg("m2", Sender::Visitor)).await.unwrap();
        store.mark_read(&k, &["m1".to_string()]).await.unwrap();

        let entries = store.read_all(&k).await.unwrap();
        assert_eq!(entries[0].status, DeliveryStatus::Read);
        assert_eq!(entries[1].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn marking_read_does_not_touch_the_log_rows() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        store.append(&k, &msg("m1", Sender::Visitor)).await.unwrap();
        let before = store.read_all(&k).await.unwrap();

        store.mark_read(&k, &["m1".to_string()]).await.unwrap();

        let after = store.read_all(&k).await.unwrap();
        assert_eq!(before[0].position, after[0].position);
        assert_eq!(before[0].text, after[0].text);
        assert_eq!(before[0].timestamp, after[0].timestamp);
        // Only the merged view changes.
        assert_eq!(after[0].status, DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn mark_all_visitor_read_skips_owner_messages() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        store.append(&k, &msg("v1", Sender::Visitor)).await.unwrap();
        store.append(&k, &msg("o1", Sender::Owner)).await.unwrap();

        store.mark_all_visitor_read(&k).await.unwrap();

        let entries = store.read_all(&k).await.unwrap();
        assert_eq!(entries[0].status, DeliveryStatus::Read);
        assert_eq!(entries[1].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn follow_tail_returns_immediately_when_entries_exist() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        store.append(&k, &msg("m1", Sender::Visitor)).await.unwrap();

        let start = std::time::Instant::now();
        let batch = store
            .follow_tail(&k, Cursor::Start, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn follow_tail_times_out_empty_on_an_idle_conversation() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        let batch = store
            .follow_tail(&k, Cursor::Tail, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn follow_tail_wakes_on_a_concurrent_append() {
        let (store, _dir) = setup_store().await;
        let k = key("1");

        let writer = store.clone();
        let write_key = k.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer
                .append(&write_key, &msg("late", Sender::Owner))
                .await
                .unwrap();
        });

        let batch = store
            .follow_tail(&k, Cursor::Tail, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message_id, "late");
    }

    #[tokio::test]
    async fn purge_prunes_wakers_of_expired_conversations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let tuning = StoreTuning {
            session_ttl: Duration::ZERO, // conversations expire on arrival
            ..StoreTuning::default()
        };
        let store = SqliteRelayStore::open(db_path.to_str().unwrap(), tuning)
            .await
            .unwrap();
        let k = key("1");

        store.append(&k, &msg("m1", Sender::Visitor)).await.unwrap();
        // A short tail-follow registers a waker for the conversation.
        store
            .follow_tail(&k, Cursor::Start, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(store.wakers.contains_key(&k.0));

        store.purge_expired().await.unwrap();
        assert!(store.wakers.is_empty());
    }

    #[test]
    fn merge_overlay_is_a_pure_status_rewrite() {
        let mut entries = vec![LogEntry {
            position: LogPosition(1),
            message_id: "m1".to_string(),
            text: "hi".to_string(),
            sender: Sender::Visitor,
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            status: DeliveryStatus::Sent,
        }];
        let mut overlay = HashSet::new();

        merge_overlay(&mut entries, &overlay);
        assert_eq!(entries[0].status, DeliveryStatus::Sent);

        overlay.insert("m1".to_string());
        merge_overlay(&mut entries, &overlay);
        assert_eq!(entries[0].status, DeliveryStatus::Read);
    }
}
