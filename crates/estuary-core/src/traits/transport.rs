// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport collaborator seams.
//!
//! The relay core never constructs platform payloads; it talks to the
//! destination forum exclusively through these primitives, and consumes
//! inbound events through [`InboundSource`].

use async_trait::async_trait;

use crate::error::{EstuaryError, TransportError};
use crate::types::{InboundMessage, MediaDescriptor, SentMessage};

/// Send-side capability set against the destination forum.
///
/// Every method reports failures as a classified [`TransportError`]; the
/// relay core branches on [`TransportErrorKind`](crate::TransportErrorKind)
/// and never on message text.
#[async_trait]
pub trait ForumTransport: Send + Sync {
    /// Idempotent existence check for a destination topic.
    ///
    /// `Ok(false)` means the destination positively reported the topic as
    /// gone; ambiguous destination errors report `Ok(true)` so that an
    /// unreachable or grumpy destination does not churn mappings.
    async fn probe_topic(&self, topic_id: i64) -> Result<bool, TransportError>;

    /// Creates a destination topic and returns its id.
    async fn create_topic(&self, name: &str) -> Result<i64, TransportError>;

    async fn send_text(&self, topic_id: i64, body: &str) -> Result<SentMessage, TransportError>;

    async fn send_photo(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError>;

    async fn send_document(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError>;

    async fn send_video(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError>;

    async fn send_audio(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError>;

    async fn edit_text(&self, message_id: i64, body: &str) -> Result<(), TransportError>;

    async fn edit_caption(&self, message_id: i64, body: &str) -> Result<(), TransportError>;

    async fn delete_message(&self, message_id: i64) -> Result<(), TransportError>;
}

/// Receive-side feed of inbound events (new and edited messages).
#[async_trait]
pub trait InboundSource: Send + Sync {
    /// Waits for the next inbound event.
    ///
    /// Returns an error when the feed has closed; the engine treats that
    /// as a shutdown signal.
    async fn next_message(&self) -> Result<InboundMessage, EstuaryError>;
}
