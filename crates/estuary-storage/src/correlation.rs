// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`CorrelationStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use estuary_core::{CorrelationRecord, CorrelationStore, EstuaryError};

use crate::database::Database;
use crate::queries::correlations;

/// SQLite-backed correlation store.
///
/// Wraps a [`Database`] handle and delegates to the typed query module.
/// All writes funnel through tokio-rusqlite's single background thread, so
/// no record write can be torn by a concurrent handler or by shutdown.
pub struct SqliteCorrelationStore {
    db: Database,
}

impl SqliteCorrelationStore {
    /// Opens the store, running migrations and an initial retention purge.
    pub async fn open(path: &str) -> Result<Self, EstuaryError> {
        let db = Database::open(path).await?;
        let removed = correlations::purge_older_than(&db, &correlations::retention_cutoff()).await?;
        if removed > 0 {
            debug!(removed, "pruned expired correlations at startup");
        }
        Ok(Self { db })
    }

    /// Prunes records past the retention horizon. Returns rows removed.
    pub async fn purge_expired(&self) -> Result<u64, EstuaryError> {
        correlations::purge_older_than(&self.db, &correlations::retention_cutoff()).await
    }

    /// Checkpoints and closes the underlying database.
    pub async fn close(&self) -> Result<(), EstuaryError> {
        self.db.close().await
    }
}

#[async_trait]
impl CorrelationStore for SqliteCorrelationStore {
    async fn record(&self, rec: &CorrelationRecord) -> Result<(), EstuaryError> {
        correlations::insert(&self.db, rec).await
    }

    async fn lookup(
        &self,
        source_chat_id: i64,
        source_message_id: i64,
    ) -> Result<Option<CorrelationRecord>, EstuaryError> {
        correlations::lookup(&self.db, source_chat_id, source_message_id).await
    }

    async fn purge_older_than(&self, cutoff: &str) -> Result<u64, EstuaryError> {
        correlations::purge_older_than(&self.db, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estuary_core::utc_timestamp;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_purges_expired_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let path = path.to_str().unwrap();

        // Seed an expired row through a raw database handle.
        let db = Database::open(path).await.unwrap();
        correlations::insert(
            &db,
            &CorrelationRecord {
                source_chat_id: -1,
                source_message_id: 1,
                dest_message_id: 2,
                dest_topic_id: 3,
                created_at: "2025-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
        db.close().await.unwrap();

        let store = SqliteCorrelationStore::open(path).await.unwrap();
        assert!(store.lookup(-1, 1).await.unwrap().is_none());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn trait_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trait.db");
        let store = SqliteCorrelationStore::open(path.to_str().unwrap()).await.unwrap();

        let rec = CorrelationRecord {
            source_chat_id: -100,
            source_message_id: 11,
            dest_message_id: 900,
            dest_topic_id: 42,
            created_at: utc_timestamp(),
        };
        store.record(&rec).await.unwrap();
        assert_eq!(store.lookup(-100, 11).await.unwrap(), Some(rec));
        assert_eq!(store.purge_expired().await.unwrap(), 0);

        store.close().await.unwrap();
    }
}
