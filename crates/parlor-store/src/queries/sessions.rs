// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry operations.
//!
//! Sessions carry their own expiry; an expired row is invisible to reads and
//! removed by the periodic sweep. Expiry never cascades to log entries.

use parlor_core::{ParlorError, SessionId, SessionRecord};
use rusqlite::params;

use crate::database::Database;

/// Persist a new session record.
pub async fn create_session(db: &Database, session: &SessionRecord) -> Result<(), ParlorError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, created_at, expires_at) VALUES (?1, ?2, ?3)",
                params![session.id.0, session.created_at, session.expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by id. Expired sessions are treated as absent.
pub async fn get_session(
    db: &Database,
    id: &SessionId,
) -> Result<Option<SessionRecord>, ParlorError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, expires_at FROM sessions
                 WHERE id = ?1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(SessionRecord {
                    id: SessionId(row.get(0)?),
                    created_at: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            });
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
