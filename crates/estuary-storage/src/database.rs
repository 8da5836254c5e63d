// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use estuary_core::EstuaryError;
use tracing::debug;

use crate::migrations;

/// Handle to the correlation database.
///
/// Wraps a single `tokio_rusqlite::Connection`; all query modules accept
/// `&Database` and go through [`Database::connection`]. Migrations run
/// on a short-lived blocking connection before the async handle opens.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs,
    /// and runs any pending migrations.
    pub async fn open(path: &str) -> Result<Self, EstuaryError> {
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), EstuaryError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(map_sq_err)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(map_sq_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| EstuaryError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_sq_err)?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "correlation database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection. Further calls on
    /// this handle error out; use only at shutdown.
    pub async fn close(&self) -> Result<(), EstuaryError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        self.conn.clone().close().await.map_err(map_tr_err)
    }
}

/// Converts a tokio-rusqlite error into the storage error variant.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> EstuaryError {
    EstuaryError::Storage {
        source: Box::new(e),
    }
}

fn map_sq_err(e: rusqlite::Error) -> EstuaryError {
    EstuaryError::Storage {
        source: Box::new(e),
    }
}
