// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation record CRUD and retention pruning.

use chrono::{SecondsFormat, TimeDelta, Utc};
use estuary_core::{CorrelationRecord, EstuaryError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Correlation records older than this are pruned; an edit arriving after
/// the horizon is a permanent no-op, not an error.
pub const RETENTION_HOURS: i64 = 48;

/// The RFC3339 cutoff before which records are eligible for pruning.
pub fn retention_cutoff() -> String {
    (Utc::now() - TimeDelta::hours(RETENTION_HOURS)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Insert a correlation record. Idempotent: the first record for a given
/// `(source_chat_id, source_message_id)` wins and later inserts are ignored.
pub async fn insert(db: &Database, rec: &CorrelationRecord) -> Result<(), EstuaryError> {
    let rec = rec.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO correlations
                     (source_chat_id, source_message_id, dest_message_id, dest_topic_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    rec.source_chat_id,
                    rec.source_message_id,
                    rec.dest_message_id,
                    rec.dest_topic_id,
                    rec.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up the correlation for a source message, if one exists.
pub async fn lookup(
    db: &Database,
    source_chat_id: i64,
    source_message_id: i64,
) -> Result<Option<CorrelationRecord>, EstuaryError> {
    db.connection()
        .call(move |conn| {
            let rec = conn
                .query_row(
                    "SELECT source_chat_id, source_message_id, dest_message_id, dest_topic_id, created_at
                     FROM correlations
                     WHERE source_chat_id = ?1 AND source_message_id = ?2",
                    params![source_chat_id, source_message_id],
                    |row| {
                        Ok(CorrelationRecord {
                            source_chat_id: row.get(0)?,
                            source_message_id: row.get(1)?,
                            dest_message_id: row.get(2)?,
                            dest_topic_id: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(rec)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete records created before `cutoff` (RFC3339). Returns rows removed.
pub async fn purge_older_than(db: &Database, cutoff: &str) -> Result<u64, EstuaryError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM correlations WHERE created_at < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use estuary_core::utc_timestamp;
    use tempfile::tempdir;

    async fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("correlations.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_rec(chat: i64, msg: i64, created_at: &str) -> CorrelationRecord {
        CorrelationRecord {
            source_chat_id: chat,
            source_message_id: msg,
            dest_message_id: 9000 + msg,
            dest_topic_id: 42,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_lookup_round_trip() {
        let (db, _dir) = open_db().await;
        let rec = make_rec(-100, 1, &utc_timestamp());
        insert(&db, &rec).await.unwrap();

        let found = lookup(&db, -100, 1).await.unwrap().unwrap();
        assert_eq!(found, rec);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lookup_miss_returns_none() {
        let (db, _dir) = open_db().await;
        assert!(lookup(&db, -100, 999).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_first_record() {
        let (db, _dir) = open_db().await;
        let first = make_rec(-100, 7, &utc_timestamp());
        let mut second = first.clone();
        second.dest_message_id = 12345;

        insert(&db, &first).await.unwrap();
        insert(&db, &second).await.unwrap();

        let found = lookup(&db, -100, 7).await.unwrap().unwrap();
        assert_eq!(found.dest_message_id, first.dest_message_id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_message_id_in_different_chats_does_not_collide() {
        let (db, _dir) = open_db().await;
        insert(&db, &make_rec(-100, 5, &utc_timestamp())).await.unwrap();
        insert(&db, &make_rec(-200, 5, &utc_timestamp())).await.unwrap();

        let a = lookup(&db, -100, 5).await.unwrap().unwrap();
        let b = lookup(&db, -200, 5).await.unwrap().unwrap();
        assert_ne!(a.source_chat_id, b.source_chat_id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_expired_records() {
        let (db, _dir) = open_db().await;
        insert(&db, &make_rec(-100, 1, "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert(&db, &make_rec(-100, 2, &utc_timestamp())).await.unwrap();

        let removed = purge_older_than(&db, &retention_cutoff()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(lookup(&db, -100, 1).await.unwrap().is_none());
        assert!(lookup(&db, -100, 2).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[test]
    fn cutoff_is_in_the_past() {
        assert!(retention_cutoff() < utc_timestamp());
    }
}
