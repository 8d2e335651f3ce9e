// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic cleanup of expired rows.
//!
//! Expiry is enforced lazily on the read paths; this sweep reclaims the space.
//! Log entries live exactly as long as their conversation row.

use std::collections::HashSet;

use parlor_core::ParlorError;

use crate::database::Database;

/// Delete every expired row. Returns the total number of rows removed.
pub async fn purge_expired(db: &Database) -> Result<u64, ParlorError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            let now = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";
            let mut removed = 0usize;

            removed += tx.execute(
                &format!(
                    "DELETE FROM log_entries WHERE conv_key IN
                     (SELECT conv_key FROM conversations WHERE expires_at <= {now})"
                ),
                [],
            )?;
            removed += tx.execute(
                &format!("DELETE FROM conversations WHERE expires_at <= {now}"),
                [],
            )?;
            removed += tx.execute(&format!("DELETE FROM sessions WHERE expires_at <= {now}"), [])?;
            removed += tx.execute(
                &format!("DELETE FROM read_status WHERE expires_at <= {now}"),
                [],
            )?;
            removed += tx.execute(
                &format!("DELETE FROM device_cursors WHERE expires_at <= {now}"),
                [],
            )?;
            removed += tx.execute(
                &format!("DELETE FROM push_token WHERE expires_at <= {now}"),
                [],
            )?;

            tx.commit()?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Keys of every conversation that has not expired yet.
pub async fn live_conversation_keys(db: &Database) -> Result<HashSet<String>, ParlorError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT conv_key FROM conversations
                 WHERE expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<HashSet<_>, _>>()?;
            Ok(keys)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
