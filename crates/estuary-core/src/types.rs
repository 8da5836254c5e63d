// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Estuary relay crates.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The destination forum's default ("General") stream. Messages are never
/// relayed into it; any stored topic id at or below this value is invalid.
pub const GENERAL_TOPIC_ID: i64 = 1;

/// Whether a destination topic id may be used as a relay target.
pub fn is_usable_topic_id(id: i64) -> bool {
    id > GENERAL_TOPIC_ID
}

/// Current UTC time as an RFC3339 string with millisecond precision.
///
/// Timestamps are stored as text in both stores; this single format keeps
/// them lexicographically comparable.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Identifies one logical conversation thread at the origin.
///
/// `thread_id == 0` denotes "no thread / main timeline". Immutable once a
/// message is received; the join key for both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    pub chat_id: i64,
    pub thread_id: i64,
}

impl SourceKey {
    /// Builds a key, normalizing an absent thread to `0`.
    pub fn new(chat_id: i64, thread_id: Option<i64>) -> Self {
        Self {
            chat_id,
            thread_id: thread_id.unwrap_or(0),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.chat_id, self.thread_id)
    }
}

/// The coarse kind of a source chat, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

impl ChatKind {
    /// Whether relay is enabled by default when this chat is first seen.
    ///
    /// Private chats start paused and require an explicit administrative
    /// enable; groups and channels relay immediately.
    pub fn enabled_by_default(self) -> bool {
        !matches!(self, ChatKind::Private)
    }
}

/// One persisted record per [`SourceKey`].
///
/// `topic_id == None` is a valid transient state: the source is known but
/// no destination topic has been created yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMapping {
    pub title: String,
    pub topic_id: Option<i64>,
    pub enabled: bool,
    pub created_at: String,
}

/// A chat-level view of the Mapping Store, used by the resolver and the
/// administrative CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: i64,
    pub title: String,
    pub kind: ChatKind,
    pub enabled: bool,
}

/// One record per successfully relayed source message, keyed by the
/// composite `(source_chat_id, source_message_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub source_chat_id: i64,
    pub source_message_id: i64,
    pub dest_message_id: i64,
    pub dest_topic_id: i64,
    pub created_at: String,
}

/// The media class of an inbound message, decided once at ingestion.
///
/// The Relay Dispatcher routes on this tag through a single dispatch
/// table; nothing downstream re-inspects MIME types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Document,
    Video,
    Audio,
}

impl MediaKind {
    /// Classifies a document-like attachment by its MIME type.
    ///
    /// `video/*` and `audio/*` route to the matching dedicated primitive;
    /// everything else (including a missing MIME type) is a plain document.
    pub fn from_mime(mime: Option<&str>) -> Self {
        match mime {
            Some(m) if m.starts_with("video/") => MediaKind::Video,
            Some(m) if m.starts_with("audio/") => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }
}

/// A media attachment described by transport metadata.
///
/// `file_ref` is an opaque handle the transport can re-send without the
/// core ever touching file bytes; `file_size` is the byte size the
/// transport reported, checked against the relay ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub file_ref: String,
    pub file_size: u64,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// An inbound event delivered by the receive-side transport.
///
/// New-message and edited-message feeds produce the same shape,
/// distinguished by `is_edit`.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: i64,
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_kind: ChatKind,
    pub sender_id: Option<i64>,
    pub thread_id: Option<i64>,
    pub thread_label: Option<String>,
    pub text: Option<String>,
    pub media: Option<MediaDescriptor>,
    pub is_edit: bool,
    pub is_service: bool,
}

impl InboundMessage {
    pub fn source_key(&self) -> SourceKey {
        SourceKey::new(self.chat_id, self.thread_id)
    }

    /// Whether the message carries anything worth relaying.
    pub fn has_content(&self) -> bool {
        self.media.is_some() || self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// What a send primitive reports back: the destination message id and the
/// topic the destination actually routed the message into (`None` means
/// the default stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: i64,
    pub topic_id: Option<i64>,
}
