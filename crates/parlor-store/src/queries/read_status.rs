// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-status overlay operations.
//!
//! The overlay only records "read": presence of a row means the message was
//! read, absence means the entry's stored status stands. Re-marking a message
//! refreshes the row's expiry, which makes mark operations idempotent.

use std::collections::HashSet;

use parlor_core::{ConversationKey, ParlorError};
use rusqlite::params;

use crate::database::Database;

/// Mark the given message ids read.
pub async fn mark_read(
    db: &Database,
    key: &ConversationKey,
    message_ids: &[String],
    ttl_secs: u64,
) -> Result<(), ParlorError> {
    if message_ids.is_empty() {
        return Ok(());
    }
    let key = key.0.clone();
    let message_ids = message_ids.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO read_status (conv_key, message_id, status, expires_at)
                     VALUES (?1, ?2, 'read', strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))
                     ON CONFLICT(conv_key, message_id) DO UPDATE SET expires_at = excluded.expires_at",
                )?;
                let modifier = format!("+{ttl_secs} seconds");
                for id in &message_ids {
                    stmt.execute(params![key, id, modifier])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Ids currently marked read in the conversation. Expired rows don't count.
pub async fn read_statuses(
    db: &Database,
    key: &ConversationKey,
) -> Result<HashSet<String>, ParlorError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id FROM read_status
                 WHERE conv_key = ?1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?;
            let rows = stmt.query_map(params![key], |row| row.get(0))?;
            let mut ids = HashSet::new();
            for row in rows {
                ids.insert(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
