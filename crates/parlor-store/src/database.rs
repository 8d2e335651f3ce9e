// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use parlor_core::ParlorError;

/// Handle to the relay database. Cheap to share behind an `Arc`.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ParlorError> {
        Self::open_with_journal(path, true).await
    }

    /// Like [`Database::open`] but with an explicit journal mode. WAL is the
    /// default; rollback journal only exists for filesystems where WAL
    /// misbehaves (network mounts).
    pub async fn open_with_journal(path: &str, wal: bool) -> Result<Self, ParlorError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(tokio_rusqlite::Error::from)
            .map_err(map_tr_err)?;

        let journal = if wal { "WAL" } else { "DELETE" };
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            ))?;
            crate::migrations::run_migrations(conn)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            Ok(())
        })
        .await
        .map_err(
            |e: tokio_rusqlite::Error<Box<dyn std::error::Error + Send + Sync>>| match e {
                tokio_rusqlite::Error::Error(source) => ParlorError::Store { source },
                tokio_rusqlite::Error::ConnectionClosed => {
                    map_tr_err(tokio_rusqlite::Error::ConnectionClosed)
                }
                tokio_rusqlite::Error::Close(inner) => {
                    map_tr_err(tokio_rusqlite::Error::Close(inner))
                }
                other => ParlorError::Store {
                    source: other.to_string().into(),
                },
            },
        )?;

        Ok(Self { conn })
    }

    /// The underlying async connection. All queries go through `call`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Flush and close the connection. Subsequent calls fail with
    /// `ConnectionClosed`.
    pub async fn close(&self) -> Result<(), ParlorError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.clone().close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the shared storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ParlorError {
    ParlorError::Store {
        source: Box::new(e),
    }
}
