// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborators for relay core tests: a recording mock
//! transport and store implementations backed by hash maps.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use estuary_core::{
    ChatKind, ChatSummary, CorrelationRecord, CorrelationStore, EstuaryError, ForumTransport,
    InboundMessage, MappingStore, MediaDescriptor, MediaKind, SentMessage, SourceKey,
    TopicMapping, TransportError, TransportErrorKind, utc_timestamp,
};

/// One recorded transport invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(i64),
    CreateTopic(String),
    SendText { topic_id: i64, body: String },
    SendPhoto { topic_id: i64, caption: String },
    SendDocument { topic_id: i64, caption: String },
    SendVideo { topic_id: i64, caption: String },
    SendAudio { topic_id: i64, caption: String },
    EditText { message_id: i64, body: String },
    EditCaption { message_id: i64, body: String },
    Delete(i64),
}

/// Recording [`ForumTransport`] with injectable failure behavior.
///
/// Created topics get ids 100, 101, ...; sent messages get ids 1000,
/// 1001, ... and land in the requested topic unless a reroute is set.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    next_topic: AtomicI64,
    next_message: AtomicI64,
    dead_topics: Mutex<HashSet<i64>>,
    media_errors: Mutex<HashMap<i64, TransportErrorKind>>,
    text_errors: Mutex<HashMap<i64, TransportErrorKind>>,
    edit_error: Mutex<Option<TransportErrorKind>>,
    reroutes: Mutex<HashMap<i64, Option<i64>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_topic: AtomicI64::new(100),
            next_message: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn created_topics(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::CreateTopic(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes `probe_topic` report this topic as gone.
    pub fn mark_dead(&self, topic_id: i64) {
        self.dead_topics.lock().unwrap().insert(topic_id);
    }

    /// Makes media sends into this topic fail with the given kind.
    pub fn fail_media_sends(&self, topic_id: i64, kind: TransportErrorKind) {
        self.media_errors.lock().unwrap().insert(topic_id, kind);
    }

    /// Makes text sends into this topic fail with the given kind.
    pub fn fail_text_sends(&self, topic_id: i64, kind: TransportErrorKind) {
        self.text_errors.lock().unwrap().insert(topic_id, kind);
    }

    /// Makes every edit fail with the given kind.
    pub fn fail_edits(&self, kind: TransportErrorKind) {
        *self.edit_error.lock().unwrap() = Some(kind);
    }

    /// Makes sends into `topic_id` silently land in `actual` instead.
    pub fn reroute(&self, topic_id: i64, actual: Option<i64>) {
        self.reroutes.lock().unwrap().insert(topic_id, actual);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_sent(&self, topic_id: i64) -> SentMessage {
        let landing = self
            .reroutes
            .lock()
            .unwrap()
            .get(&topic_id)
            .copied()
            .unwrap_or(Some(topic_id));
        SentMessage {
            message_id: self.next_message.fetch_add(1, Ordering::SeqCst),
            topic_id: landing,
        }
    }

    fn media_send(
        &self,
        topic_id: i64,
        call: Call,
    ) -> Result<SentMessage, TransportError> {
        self.record(call);
        if let Some(kind) = self.media_errors.lock().unwrap().get(&topic_id) {
            return Err(TransportError::new(*kind, "injected media failure"));
        }
        Ok(self.next_sent(topic_id))
    }
}

#[async_trait]
impl ForumTransport for MockTransport {
    async fn probe_topic(&self, topic_id: i64) -> Result<bool, TransportError> {
        self.record(Call::Probe(topic_id));
        Ok(!self.dead_topics.lock().unwrap().contains(&topic_id))
    }

    async fn create_topic(&self, name: &str) -> Result<i64, TransportError> {
        self.record(Call::CreateTopic(name.to_string()));
        Ok(self.next_topic.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_text(&self, topic_id: i64, body: &str) -> Result<SentMessage, TransportError> {
        self.record(Call::SendText {
            topic_id,
            body: body.to_string(),
        });
        if let Some(kind) = self.text_errors.lock().unwrap().get(&topic_id) {
            return Err(TransportError::new(*kind, "injected text failure"));
        }
        Ok(self.next_sent(topic_id))
    }

    async fn send_photo(
        &self,
        topic_id: i64,
        _media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        self.media_send(
            topic_id,
            Call::SendPhoto {
                topic_id,
                caption: caption.to_string(),
            },
        )
    }

    async fn send_document(
        &self,
        topic_id: i64,
        _media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        self.media_send(
            topic_id,
            Call::SendDocument {
                topic_id,
                caption: caption.to_string(),
            },
        )
    }

    async fn send_video(
        &self,
        topic_id: i64,
        _media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        self.media_send(
            topic_id,
            Call::SendVideo {
                topic_id,
                caption: caption.to_string(),
            },
        )
    }

    async fn send_audio(
        &self,
        topic_id: i64,
        _media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        self.media_send(
            topic_id,
            Call::SendAudio {
                topic_id,
                caption: caption.to_string(),
            },
        )
    }

    async fn edit_text(&self, message_id: i64, body: &str) -> Result<(), TransportError> {
        self.record(Call::EditText {
            message_id,
            body: body.to_string(),
        });
        match *self.edit_error.lock().unwrap() {
            Some(kind) => Err(TransportError::new(kind, "injected edit failure")),
            None => Ok(()),
        }
    }

    async fn edit_caption(&self, message_id: i64, body: &str) -> Result<(), TransportError> {
        self.record(Call::EditCaption {
            message_id,
            body: body.to_string(),
        });
        match *self.edit_error.lock().unwrap() {
            Some(kind) => Err(TransportError::new(kind, "injected edit failure")),
            None => Ok(()),
        }
    }

    async fn delete_message(&self, message_id: i64) -> Result<(), TransportError> {
        self.record(Call::Delete(message_id));
        Ok(())
    }
}

#[derive(Debug)]
struct MemChat {
    title: String,
    kind: ChatKind,
    enabled: bool,
    topics: HashMap<i64, TopicMapping>,
}

/// Hash-map [`MappingStore`] for tests.
#[derive(Default)]
pub struct MemoryMappingStore {
    chats: Mutex<HashMap<i64, MemChat>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn chat(&self, chat_id: i64) -> Result<Option<ChatSummary>, EstuaryError> {
        Ok(self.chats.lock().unwrap().get(&chat_id).map(|c| ChatSummary {
            chat_id,
            title: c.title.clone(),
            kind: c.kind,
            enabled: c.enabled,
        }))
    }

    async fn register_chat(&self, summary: &ChatSummary) -> Result<bool, EstuaryError> {
        let mut chats = self.chats.lock().unwrap();
        if chats.contains_key(&summary.chat_id) {
            return Ok(false);
        }
        chats.insert(
            summary.chat_id,
            MemChat {
                title: summary.title.clone(),
                kind: summary.kind,
                enabled: summary.enabled,
                topics: HashMap::new(),
            },
        );
        Ok(true)
    }

    async fn mapping(&self, key: SourceKey) -> Result<Option<TopicMapping>, EstuaryError> {
        Ok(self.chats.lock().unwrap().get(&key.chat_id).and_then(|c| {
            c.topics.get(&key.thread_id).map(|t| TopicMapping {
                enabled: c.enabled && t.enabled,
                ..t.clone()
            })
        }))
    }

    async fn upsert_mapping(
        &self,
        key: SourceKey,
        mapping: TopicMapping,
    ) -> Result<(), EstuaryError> {
        let mut chats = self.chats.lock().unwrap();
        let chat = chats.entry(key.chat_id).or_insert_with(|| MemChat {
            title: mapping.title.clone(),
            kind: ChatKind::Group,
            enabled: true,
            topics: HashMap::new(),
        });
        chat.topics.insert(key.thread_id, mapping);
        Ok(())
    }

    async fn remove_mapping(&self, key: SourceKey) -> Result<(), EstuaryError> {
        if let Some(chat) = self.chats.lock().unwrap().get_mut(&key.chat_id) {
            chat.topics.remove(&key.thread_id);
        }
        Ok(())
    }

    async fn set_enabled(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        enabled: bool,
    ) -> Result<bool, EstuaryError> {
        let mut chats = self.chats.lock().unwrap();
        let Some(chat) = chats.get_mut(&chat_id) else {
            return Ok(false);
        };
        match thread_id {
            None => chat.enabled = enabled,
            Some(thread_id) => {
                let Some(topic) = chat.topics.get_mut(&thread_id) else {
                    return Ok(false);
                };
                topic.enabled = enabled;
            }
        }
        Ok(true)
    }

    async fn list_chats(
        &self,
    ) -> Result<Vec<(ChatSummary, Vec<(i64, TopicMapping)>)>, EstuaryError> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .map(|(chat_id, c)| {
                (
                    ChatSummary {
                        chat_id: *chat_id,
                        title: c.title.clone(),
                        kind: c.kind,
                        enabled: c.enabled,
                    },
                    c.topics
                        .iter()
                        .map(|(thread_id, t)| {
                            (
                                *thread_id,
                                TopicMapping {
                                    enabled: c.enabled && t.enabled,
                                    ..t.clone()
                                },
                            )
                        })
                        .collect(),
                )
            })
            .collect())
    }
}

/// Hash-map [`CorrelationStore`] for tests. First write wins.
#[derive(Default)]
pub struct MemoryCorrelationStore {
    records: Mutex<HashMap<(i64, i64), CorrelationRecord>>,
}

impl MemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl CorrelationStore for MemoryCorrelationStore {
    async fn record(&self, rec: &CorrelationRecord) -> Result<(), EstuaryError> {
        self.records
            .lock()
            .unwrap()
            .entry((rec.source_chat_id, rec.source_message_id))
            .or_insert_with(|| rec.clone());
        Ok(())
    }

    async fn lookup(
        &self,
        source_chat_id: i64,
        source_message_id: i64,
    ) -> Result<Option<CorrelationRecord>, EstuaryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(source_chat_id, source_message_id))
            .cloned())
    }

    async fn purge_older_than(&self, cutoff: &str) -> Result<u64, EstuaryError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, rec| rec.created_at.as_str() >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// A plain group text message.
pub fn text_message(chat_id: i64, id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        id,
        chat_id,
        chat_title: "Ops".to_string(),
        chat_kind: ChatKind::Group,
        sender_id: Some(7001),
        thread_id: None,
        thread_label: None,
        text: Some(text.to_string()),
        media: None,
        is_edit: false,
        is_service: false,
    }
}

/// A group message carrying media of the given kind and size.
pub fn media_message(chat_id: i64, id: i64, kind: MediaKind, file_size: u64) -> InboundMessage {
    let mut msg = text_message(chat_id, id, "caption");
    msg.media = Some(MediaDescriptor {
        kind,
        file_ref: format!("file-{id}"),
        file_size,
        file_name: Some("report.bin".to_string()),
        mime_type: None,
    });
    msg
}

/// A pre-seeded mapping pointing at `topic_id`.
pub fn seeded_mapping(topic_id: i64) -> TopicMapping {
    TopicMapping {
        title: "💬 Ops".to_string(),
        topic_id: Some(topic_id),
        enabled: true,
        created_at: utc_timestamp(),
    }
}
