// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-file Mapping Store.
//!
//! One file, canonical nested `chat -> topics` layout with an explicit
//! schema version. Legacy flat files (`"<chatId>_<threadId>"` keys, no
//! version field) are migrated on first load. Every operation re-reads
//! the file so `enabled` toggles made by the admin CLI in another process
//! are always observed; writes go through a temp file + rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use estuary_core::{
    ChatKind, ChatSummary, EstuaryError, MappingStore, SourceKey, TopicMapping, utc_timestamp,
};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingFile {
    schema_version: u32,
    #[serde(default)]
    chats: BTreeMap<String, ChatEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatEntry {
    title: String,
    kind: ChatKind,
    enabled: bool,
    #[serde(default)]
    topics: BTreeMap<String, TopicEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicEntry {
    title: String,
    topic_id: Option<i64>,
    enabled: bool,
    created_at: String,
}

/// File-backed implementation of [`MappingStore`].
pub struct JsonMappingStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process. Cross-process
    // writers (the admin CLI) are expected to be humans, not racers.
    write_lock: Mutex<()>,
}

impl JsonMappingStore {
    /// Creates a store over `path`. The file is created lazily on the
    /// first write; a missing file reads as an empty store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<MappingFile, EstuaryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MappingFile {
                    schema_version: SCHEMA_VERSION,
                    chats: BTreeMap::new(),
                });
            }
            Err(e) => return Err(map_io(e)),
        };
        parse_mapping_file(&content)
    }

    async fn persist(&self, file: &MappingFile) -> Result<(), EstuaryError> {
        let rendered = serde_json::to_string_pretty(file).map_err(map_serde)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, rendered).await.map_err(map_io)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(map_io)?;
        Ok(())
    }
}

fn parse_mapping_file(content: &str) -> Result<MappingFile, EstuaryError> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(map_serde)?;
    if value.get("schema_version").is_some() {
        let file: MappingFile = serde_json::from_value(value).map_err(map_serde)?;
        if file.schema_version > SCHEMA_VERSION {
            return Err(EstuaryError::Config(format!(
                "mapping file schema version {} is newer than supported version {}",
                file.schema_version, SCHEMA_VERSION
            )));
        }
        Ok(file)
    } else {
        migrate_flat_layout(&value)
    }
}

/// Migrates the legacy flat layout (`"<chatId>_<threadId>"` keys mapping
/// straight to topic records) into the nested chat -> topics form.
///
/// Chat kind is unknowable from the flat file; migrated chats are treated
/// as groups and left enabled, matching how they behaved before.
fn migrate_flat_layout(value: &serde_json::Value) -> Result<MappingFile, EstuaryError> {
    let Some(object) = value.as_object() else {
        return Err(EstuaryError::Config(
            "mapping file is neither versioned nor a legacy flat object".to_string(),
        ));
    };

    let mut file = MappingFile {
        schema_version: SCHEMA_VERSION,
        chats: BTreeMap::new(),
    };

    for (key, record) in object {
        let Some((chat_part, thread_part)) = key.rsplit_once('_') else {
            warn!(key, "skipping unrecognized key in legacy mapping file");
            continue;
        };
        let (Ok(chat_id), Ok(thread_id)) = (chat_part.parse::<i64>(), thread_part.parse::<i64>())
        else {
            warn!(key, "skipping non-numeric key in legacy mapping file");
            continue;
        };

        let title = record
            .get("chat_title")
            .and_then(|v| v.as_str())
            .unwrap_or("(unknown)")
            .to_string();
        let topic_id = record.get("topic_id").and_then(|v| v.as_i64());
        let created_at = record
            .get("created_at")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(utc_timestamp);

        let chat = file
            .chats
            .entry(chat_id.to_string())
            .or_insert_with(|| ChatEntry {
                title: title.clone(),
                kind: ChatKind::Group,
                enabled: true,
                topics: BTreeMap::new(),
            });
        chat.topics.insert(
            thread_id.to_string(),
            TopicEntry {
                title,
                topic_id,
                enabled: true,
                created_at,
            },
        );
    }

    info!(
        chats = file.chats.len(),
        "migrated legacy flat mapping file to nested layout"
    );
    Ok(file)
}

#[async_trait]
impl MappingStore for JsonMappingStore {
    async fn chat(&self, chat_id: i64) -> Result<Option<ChatSummary>, EstuaryError> {
        let file = self.load().await?;
        Ok(file.chats.get(&chat_id.to_string()).map(|entry| ChatSummary {
            chat_id,
            title: entry.title.clone(),
            kind: entry.kind,
            enabled: entry.enabled,
        }))
    }

    async fn register_chat(&self, summary: &ChatSummary) -> Result<bool, EstuaryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let key = summary.chat_id.to_string();
        if file.chats.contains_key(&key) {
            return Ok(false);
        }
        file.chats.insert(
            key,
            ChatEntry {
                title: summary.title.clone(),
                kind: summary.kind,
                enabled: summary.enabled,
                topics: BTreeMap::new(),
            },
        );
        self.persist(&file).await?;
        debug!(
            chat_id = summary.chat_id,
            kind = %summary.kind,
            enabled = summary.enabled,
            "registered source chat"
        );
        Ok(true)
    }

    async fn mapping(&self, key: SourceKey) -> Result<Option<TopicMapping>, EstuaryError> {
        let file = self.load().await?;
        let Some(chat) = file.chats.get(&key.chat_id.to_string()) else {
            return Ok(None);
        };
        Ok(chat
            .topics
            .get(&key.thread_id.to_string())
            .map(|topic| TopicMapping {
                title: topic.title.clone(),
                topic_id: topic.topic_id,
                enabled: chat.enabled && topic.enabled,
                created_at: topic.created_at.clone(),
            }))
    }

    async fn upsert_mapping(
        &self,
        key: SourceKey,
        mapping: TopicMapping,
    ) -> Result<(), EstuaryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let chat = file
            .chats
            .entry(key.chat_id.to_string())
            .or_insert_with(|| ChatEntry {
                // The resolver registers chats before mapping them; this
                // fallback only fires if the file was edited externally.
                title: mapping.title.clone(),
                kind: ChatKind::Group,
                enabled: true,
                topics: BTreeMap::new(),
            });
        chat.topics.insert(
            key.thread_id.to_string(),
            TopicEntry {
                title: mapping.title,
                topic_id: mapping.topic_id,
                enabled: mapping.enabled,
                created_at: mapping.created_at,
            },
        );
        self.persist(&file).await
    }

    async fn remove_mapping(&self, key: SourceKey) -> Result<(), EstuaryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let Some(chat) = file.chats.get_mut(&key.chat_id.to_string()) else {
            return Ok(());
        };
        if chat.topics.remove(&key.thread_id.to_string()).is_some() {
            debug!(key = %key, "removed broken topic mapping");
            self.persist(&file).await?;
        }
        Ok(())
    }

    async fn set_enabled(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        enabled: bool,
    ) -> Result<bool, EstuaryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let Some(chat) = file.chats.get_mut(&chat_id.to_string()) else {
            return Ok(false);
        };
        match thread_id {
            None => chat.enabled = enabled,
            Some(thread_id) => {
                let Some(topic) = chat.topics.get_mut(&thread_id.to_string()) else {
                    return Ok(false);
                };
                topic.enabled = enabled;
            }
        }
        self.persist(&file).await?;
        Ok(true)
    }

    async fn list_chats(
        &self,
    ) -> Result<Vec<(ChatSummary, Vec<(i64, TopicMapping)>)>, EstuaryError> {
        let file = self.load().await?;
        let mut out = Vec::with_capacity(file.chats.len());
        for (chat_key, chat) in &file.chats {
            let Ok(chat_id) = chat_key.parse::<i64>() else {
                warn!(key = %chat_key, "skipping non-numeric chat key in mapping file");
                continue;
            };
            let summary = ChatSummary {
                chat_id,
                title: chat.title.clone(),
                kind: chat.kind,
                enabled: chat.enabled,
            };
            let mut topics = Vec::with_capacity(chat.topics.len());
            for (thread_key, topic) in &chat.topics {
                let Ok(thread_id) = thread_key.parse::<i64>() else {
                    continue;
                };
                topics.push((
                    thread_id,
                    TopicMapping {
                        title: topic.title.clone(),
                        topic_id: topic.topic_id,
                        enabled: chat.enabled && topic.enabled,
                        created_at: topic.created_at.clone(),
                    },
                ));
            }
            out.push((summary, topics));
        }
        Ok(out)
    }
}

fn map_io(e: std::io::Error) -> EstuaryError {
    EstuaryError::Storage {
        source: Box::new(e),
    }
}

fn map_serde(e: serde_json::Error) -> EstuaryError {
    EstuaryError::Storage {
        source: Box::new(e),
    }
}
