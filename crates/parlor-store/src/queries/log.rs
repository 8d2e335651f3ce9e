// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log operations.
//!
//! Positions come from SQLite's AUTOINCREMENT rowid: strictly increasing per
//! database, never reused. Every append refreshes the owning conversation's
//! expiry so an active conversation never ages out mid-exchange.

use parlor_core::{ConversationKey, DeliveryStatus, LogEntry, LogPosition, NewMessage, ParlorError, Sender};
use rusqlite::params;

use crate::database::Database;

/// Append one entry, returning its assigned position.
pub async fn append_entry(
    db: &Database,
    key: &ConversationKey,
    msg: &NewMessage,
    conversation_ttl_secs: u64,
) -> Result<LogPosition, ParlorError> {
    let key = key.0.clone();
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let status = msg.status.unwrap_or_default();
            tx.execute(
                "INSERT INTO log_entries (conv_key, message_id, text, sender, timestamp, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    msg.message_id,
                    msg.text,
                    msg.sender.to_string(),
                    msg.timestamp,
                    status.to_string(),
                ],
            )?;
            let position = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO conversations (conv_key, expires_at)
                 VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2))
                 ON CONFLICT(conv_key) DO UPDATE SET expires_at = excluded.expires_at",
                params![key, format!("+{conversation_ttl_secs} seconds")],
            )?;
            tx.commit()?;
            Ok(LogPosition(position))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Entries with position strictly greater than `after`, ascending, up to
/// `limit`. Statuses here are the stored fallbacks; callers merge the
/// read-status overlay on top.
pub async fn read_after(
    db: &Database,
    key: &ConversationKey,
    after: i64,
    limit: usize,
) -> Result<Vec<LogEntry>, ParlorError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT position, message_id, text, sender, timestamp, status
                 FROM log_entries
                 WHERE conv_key = ?1 AND position > ?2
                 ORDER BY position ASC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![key, after, limit as i64], map_entry_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Position of the newest entry in the conversation, if any.
pub async fn latest_position(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<LogPosition>, ParlorError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let max: Option<i64> = conn.query_row(
                "SELECT MAX(position) FROM log_entries WHERE conv_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(max.map(LogPosition))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Message ids of visitor-authored entries, oldest first, up to `limit`.
/// Feeds the "mark everything read" path.
pub async fn visitor_message_ids(
    db: &Database,
    key: &ConversationKey,
    limit: usize,
) -> Result<Vec<String>, ParlorError> {
    let key = key.0.clone();
    let sender = Sender::Visitor.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id FROM log_entries
                 WHERE conv_key = ?1 AND sender = ?2
                 ORDER BY position ASC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![key, sender, limit as i64], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogEntry> {
    let sender: String = row.get(3)?;
    let status: String = row.get(5)?;
    Ok(LogEntry {
        position: LogPosition(row.get(0)?),
        message_id: row.get(1)?,
        text: row.get(2)?,
        sender: sender.parse::<Sender>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        timestamp: row.get(4)?,
        status: status.parse::<DeliveryStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}
