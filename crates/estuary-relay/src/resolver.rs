// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic resolution: maps a [`SourceKey`] to a live destination topic,
//! creating or repairing it as needed.
//!
//! Resolution never returns a topic id the destination has confirmed
//! dead, and never returns the destination's default stream.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use estuary_core::types::is_usable_topic_id;
use estuary_core::{
    ChatKind, ChatSummary, EstuaryError, ForumTransport, MappingStore, SourceKey, TopicMapping,
    utc_timestamp,
};

use crate::cache::ValidityCache;
use crate::naming;

/// Resolves source keys to destination topic ids.
///
/// Holds one async lock per key so concurrent arrivals for the same
/// source create at most one topic in-process; callers still re-resolve
/// on transmit failure rather than assuming resolution is serialized
/// across processes.
pub struct TopicResolver {
    transport: Arc<dyn ForumTransport>,
    mappings: Arc<dyn MappingStore>,
    cache: Arc<ValidityCache>,
    key_locks: Mutex<HashMap<SourceKey, Arc<Mutex<()>>>>,
}

impl TopicResolver {
    pub fn new(
        transport: Arc<dyn ForumTransport>,
        mappings: Arc<dyn MappingStore>,
        cache: Arc<ValidityCache>,
    ) -> Self {
        Self {
            transport,
            mappings,
            cache,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `key` to a live destination topic id.
    ///
    /// `Ok(None)` means relay is suppressed for this key (disabled chat,
    /// or a private source awaiting an administrative enable); the caller
    /// drops the message.
    pub async fn resolve(
        &self,
        key: SourceKey,
        chat_title: &str,
        chat_kind: ChatKind,
        thread_label: Option<&str>,
    ) -> Result<Option<i64>, EstuaryError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock_owned().await;

        // The enabled gate is re-read from the store on every resolution;
        // an admin may have toggled it since the last message.
        let chat_enabled = match self.mappings.chat(key.chat_id).await? {
            Some(chat) => chat.enabled,
            None => {
                let enabled = chat_kind.enabled_by_default();
                self.mappings
                    .register_chat(&ChatSummary {
                        chat_id: key.chat_id,
                        title: chat_title.to_string(),
                        kind: chat_kind,
                        enabled,
                    })
                    .await?;
                if !enabled {
                    info!(
                        chat_id = key.chat_id,
                        title = chat_title,
                        "registered new private source, relay paused until enabled"
                    );
                }
                enabled
            }
        };
        if !chat_enabled {
            debug!(key = %key, "relay disabled for source chat");
            return Ok(None);
        }

        if let Some(mapping) = self.mappings.mapping(key).await? {
            if !mapping.enabled {
                debug!(key = %key, "relay disabled for source thread");
                return Ok(None);
            }
            if let Some(topic_id) = mapping.topic_id {
                if is_usable_topic_id(topic_id) {
                    if self.cache.contains(key) {
                        return Ok(Some(topic_id));
                    }
                    if self.transport.probe_topic(topic_id).await? {
                        self.cache.mark(key);
                        return Ok(Some(topic_id));
                    }
                }
                info!(key = %key, topic_id, "stored topic is gone, rebuilding mapping");
                self.invalidate(key).await?;
            }
            // A mapping without a topic id is a registered-but-paused
            // source that has just been enabled; fall through to creation.
        }

        self.create(key, chat_title, thread_label).await.map(Some)
    }

    /// Drops the key from the validity cache and removes its mapping so
    /// the next resolution recreates the topic.
    pub async fn invalidate(&self, key: SourceKey) -> Result<(), EstuaryError> {
        self.cache.invalidate(key);
        self.mappings.remove_mapping(key).await
    }

    async fn create(
        &self,
        key: SourceKey,
        chat_title: &str,
        thread_label: Option<&str>,
    ) -> Result<i64, EstuaryError> {
        let name = naming::topic_name(chat_title, key.thread_id, thread_label);
        let topic_id = self.transport.create_topic(&name).await?;

        self.mappings
            .upsert_mapping(
                key,
                TopicMapping {
                    title: name.clone(),
                    topic_id: Some(topic_id),
                    enabled: true,
                    created_at: utc_timestamp(),
                },
            )
            .await?;

        // The marker identifies the source for operators browsing the
        // forum; losing it is not worth failing the resolution.
        let intro = format!("📢 {name}\nSource chat ID: {}", key.chat_id);
        if let Err(e) = self.transport.send_text(topic_id, &intro).await {
            warn!(error = %e, topic_id, "failed to post introductory marker");
        }

        self.cache.mark(key);
        info!(key = %key, topic_id, name = %name, "created destination topic");
        Ok(topic_id)
    }

    async fn key_lock(&self, key: SourceKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key).or_default().clone()
    }
}
