// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbox listing across all conversations.
//!
//! A conversation appears once it holds at least one entry and disappears
//! when its row expires. Unread counts honor both the stored status and the
//! read-status overlay, same as the per-entry merge on the read paths.

use parlor_core::{ConversationKey, ConversationSummary, DeliveryStatus, ParlorError, Sender};
use rusqlite::params;

use crate::database::Database;

/// Every live conversation with at least one entry: its tail message, total
/// entry count, and unread count. Unordered.
pub async fn list_conversations(db: &Database) -> Result<Vec<ConversationSummary>, ParlorError> {
    let visitor = Sender::Visitor.to_string();
    let read = DeliveryStatus::Read.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.conv_key, l.text, l.timestamp,
                        (SELECT COUNT(*) FROM log_entries
                          WHERE conv_key = c.conv_key),
                        (SELECT COUNT(*) FROM log_entries e
                          WHERE e.conv_key = c.conv_key
                            AND e.sender = ?1
                            AND e.status != ?2
                            AND e.message_id NOT IN
                                (SELECT message_id FROM read_status r
                                  WHERE r.conv_key = c.conv_key
                                    AND r.expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                 FROM conversations c
                 JOIN log_entries l
                   ON l.conv_key = c.conv_key
                  AND l.position = (SELECT MAX(position) FROM log_entries
                                     WHERE conv_key = c.conv_key)
                 WHERE c.expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?;
            let rows = stmt.query_map(params![visitor, read], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u64>(3)?,
                    row.get::<_, u64>(4)?,
                ))
            })?;
            let mut summaries = Vec::new();
            for row in rows {
                let (conv_key, last_message, timestamp, message_count, unread) = row?;
                // Keys are only ever written through ConversationKey::new.
                let Some((session, conversation_id)) = ConversationKey(conv_key).parts() else {
                    continue;
                };
                summaries.push(ConversationSummary {
                    session,
                    conversation_id,
                    last_message,
                    timestamp,
                    unread,
                    message_count,
                });
            }
            Ok(summaries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
