// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global push token storage. A single row (id = 1) holds the one token the
//! relay fans out to; registering a new token replaces the old one.

use parlor_core::ParlorError;
use rusqlite::params;

use crate::database::Database;

pub async fn set_token(db: &Database, token: &str, ttl_secs: u64) -> Result<(), ParlorError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO push_token (id, token, expires_at)
                 VALUES (1, ?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2))
                 ON CONFLICT(id) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at",
                params![token, format!("+{ttl_secs} seconds")],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_token(db: &Database) -> Result<Option<String>, ParlorError> {
    db.connection()
        .call(|conn| {
            let result = conn.query_row(
                "SELECT token FROM push_token
                 WHERE id = 1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
                |row| row.get(0),
            );
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete_token(db: &Database) -> Result<(), ParlorError> {
    db.connection()
        .call(|conn| {
            conn.execute("DELETE FROM push_token WHERE id = 1", [])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn set_get_delete_roundtrips() {
        let (db, _dir) = setup_db().await;

        assert!(get_token(&db).await.unwrap().is_none());

        set_token(&db, "ExponentPushToken[abc]", 60).await.unwrap();
        assert_eq!(
            get_token(&db).await.unwrap().as_deref(),
            Some("ExponentPushToken[abc]")
        );

        delete_token(&db).await.unwrap();
        assert!(get_token(&db).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn new_token_replaces_the_old_one() {
        let (db, _dir) = setup_db().await;

        set_token(&db, "ExponentPushToken[old]", 60).await.unwrap();
        set_token(&db, "ExponentPushToken[new]", 60).await.unwrap();

        assert_eq!(
            get_token(&db).await.unwrap().as_deref(),
            Some("ExponentPushToken[new]")
        );

        db.close().await.unwrap();
    }
}
