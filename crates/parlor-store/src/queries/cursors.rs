// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device cursor registry.
//!
//! One row per (device, conversation): the last log position a device has
//! confirmed. Writing refreshes the expiry; a stale cursor simply forces the
//! device through the first-load path again.

use parlor_core::{ConversationKey, DeviceId, LogPosition, ParlorError};
use rusqlite::params;

use crate::database::Database;

/// Record the position a device has caught up to.
pub async fn set_cursor(
    db: &Database,
    device: &DeviceId,
    key: &ConversationKey,
    position: LogPosition,
    ttl_secs: u64,
) -> Result<(), ParlorError> {
    let device = device.0.clone();
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO device_cursors (device_id, conv_key, position, expires_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?4))
                 ON CONFLICT(device_id, conv_key)
                 DO UPDATE SET position = excluded.position, expires_at = excluded.expires_at",
                params![device, key, position.0, format!("+{ttl_secs} seconds")],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The device's stored cursor, if present and not expired.
pub async fn get_cursor(
    db: &Database,
    device: &DeviceId,
    key: &ConversationKey,
) -> Result<Option<LogPosition>, ParlorError> {
    let device = device.0.clone();
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT position FROM device_cursors
                 WHERE device_id = ?1 AND conv_key = ?2
                   AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![device, key],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(position) => Ok(Some(LogPosition(position))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::SessionId;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn key(id: &str) -> ConversationKey {
        let session = SessionId("0123456789abcdef0123456789abcdef".to_string());
        ConversationKey::new(&session, id)
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let device = DeviceId("device-1".to_string());
        let k = key("1");

        set_cursor(&db, &device, &k, LogPosition(42), 60).await.unwrap();
        assert_eq!(
            get_cursor(&db, &device, &k).await.unwrap(),
            Some(LogPosition(42))
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn later_write_overwrites() {
        let (db, _dir) = setup_db().await;
        let device = DeviceId("device-1".to_string());
        let k = key("1");

        set_cursor(&db, &device, &k, LogPosition(1), 60).await.unwrap();
        set_cursor(&db, &device, &k, LogPosition(7), 60).await.unwrap();

        assert_eq!(
            get_cursor(&db, &device, &k).await.unwrap(),
            Some(LogPosition(7))
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cursors_are_scoped_per_device_and_conversation() {
        let (db, _dir) = setup_db().await;
        let d1 = DeviceId("device-1".to_string());
        let d2 = DeviceId("device-2".to_string());

        set_cursor(&db, &d1, &key("1"), LogPosition(5), 60).await.unwrap();

        assert!(get_cursor(&db, &d2, &key("1")).await.unwrap().is_none());
        assert!(get_cursor(&db, &d1, &key("2")).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
