// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage seams for the Mapping Store and the Correlation Store.
//!
//! Every access is a single atomic read-or-write keyed by either the
//! [`SourceKey`] or the source message id; no multi-step transaction ever
//! spans both stores.

use async_trait::async_trait;

use crate::error::EstuaryError;
use crate::types::{ChatSummary, CorrelationRecord, SourceKey, TopicMapping};

/// Durable (source chat, source thread) → destination topic store.
///
/// The `enabled` flags are toggled by an external administrative
/// collaborator; callers must re-read rather than cache them.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Chat-level record, if the chat has been seen before.
    async fn chat(&self, chat_id: i64) -> Result<Option<ChatSummary>, EstuaryError>;

    /// Registers a chat if unseen. Returns `true` when a new record was
    /// created, `false` when the chat was already known (no fields are
    /// overwritten in that case).
    async fn register_chat(&self, summary: &ChatSummary) -> Result<bool, EstuaryError>;

    /// The topic mapping for a key, with `enabled` reflecting both the
    /// chat-level and topic-level flags.
    async fn mapping(&self, key: SourceKey) -> Result<Option<TopicMapping>, EstuaryError>;

    /// Creates or replaces the mapping for a key. The last write wins.
    async fn upsert_mapping(&self, key: SourceKey, mapping: TopicMapping)
    -> Result<(), EstuaryError>;

    /// Removes a broken mapping so the next resolution recreates it.
    async fn remove_mapping(&self, key: SourceKey) -> Result<(), EstuaryError>;

    /// Toggles the enabled flag on a chat (`thread_id == None`) or on a
    /// single topic mapping. Returns `false` if the target is unknown.
    async fn set_enabled(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        enabled: bool,
    ) -> Result<bool, EstuaryError>;

    /// All known chats with their topic mappings, for the admin surface.
    async fn list_chats(
        &self,
    ) -> Result<Vec<(ChatSummary, Vec<(i64, TopicMapping)>)>, EstuaryError>;
}

/// Durable source-message → destination-message correlation store.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Records a correlation. Idempotent: at most one record ever exists
    /// per `(source_chat_id, source_message_id)`; the first write wins.
    async fn record(&self, rec: &CorrelationRecord) -> Result<(), EstuaryError>;

    async fn lookup(
        &self,
        source_chat_id: i64,
        source_message_id: i64,
    ) -> Result<Option<CorrelationRecord>, EstuaryError>;

    /// Deletes records created before `cutoff` (RFC3339). Returns the
    /// number of rows removed.
    async fn purge_older_than(&self, cutoff: &str) -> Result<u64, EstuaryError>;
}
