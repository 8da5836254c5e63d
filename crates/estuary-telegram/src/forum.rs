// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send-side transport: [`ForumTransport`] over the Telegram Bot API.
//!
//! Every raw API failure is classified into a [`TransportErrorKind`]
//! here, at the boundary, so the relay core never has to match on error
//! message text.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, MessageId, Recipient, ThreadId};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use estuary_core::types::is_usable_topic_id;
use estuary_core::{
    ForumTransport, MediaDescriptor, SentMessage, TransportError, TransportErrorKind,
};

/// Destination-forum transport bound to one supergroup.
pub struct TelegramForum {
    bot: Bot,
    destination: ChatId,
}

impl TelegramForum {
    pub fn new(bot: Bot, destination_chat_id: i64) -> Self {
        Self {
            bot,
            destination: ChatId(destination_chat_id),
        }
    }

    fn recipient(&self) -> Recipient {
        Recipient::Id(self.destination)
    }
}

fn thread(topic_id: i64) -> ThreadId {
    ThreadId(MessageId(topic_id as i32))
}

fn message(message_id: i64) -> MessageId {
    MessageId(message_id as i32)
}

fn input_file(media: &MediaDescriptor) -> InputFile {
    InputFile::file_id(FileId(media.file_ref.clone()))
}

fn sent_message(msg: &Message) -> SentMessage {
    SentMessage {
        message_id: i64::from(msg.id.0),
        topic_id: msg.thread_id.map(|t| i64::from(t.0.0)),
    }
}

#[async_trait]
impl ForumTransport for TelegramForum {
    async fn probe_topic(&self, topic_id: i64) -> Result<bool, TransportError> {
        // The default stream is never a valid target; don't even ask.
        if !is_usable_topic_id(topic_id) {
            return Ok(false);
        }

        // A no-op editForumTopic is the cheapest idempotent existence
        // check the Bot API offers.
        match self
            .bot
            .edit_forum_topic(self.recipient(), thread(topic_id))
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match classify(&err) {
                TransportErrorKind::NotModified => Ok(true),
                TransportErrorKind::TopicInvalid => {
                    debug!(topic_id, "probe: destination reports topic gone");
                    Ok(false)
                }
                TransportErrorKind::Unavailable => Err(transport_err(err)),
                // Ambiguous API complaints do not kill a mapping.
                TransportErrorKind::Rejected => Ok(true),
            },
        }
    }

    async fn create_topic(&self, name: &str) -> Result<i64, TransportError> {
        let topic = self
            .bot
            .create_forum_topic(self.recipient(), name)
            .await
            .map_err(transport_err)?;
        Ok(i64::from(topic.thread_id.0.0))
    }

    async fn send_text(&self, topic_id: i64, body: &str) -> Result<SentMessage, TransportError> {
        let sent = self
            .bot
            .send_message(self.recipient(), body)
            .message_thread_id(thread(topic_id))
            .await
            .map_err(transport_err)?;
        Ok(sent_message(&sent))
    }

    async fn send_photo(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        let mut req = self
            .bot
            .send_photo(self.recipient(), input_file(media))
            .message_thread_id(thread(topic_id));
        if !caption.is_empty() {
            req = req.caption(caption.to_string());
        }
        let sent = req.await.map_err(transport_err)?;
        Ok(sent_message(&sent))
    }

    async fn send_document(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        let mut req = self
            .bot
            .send_document(self.recipient(), input_file(media))
            .message_thread_id(thread(topic_id));
        if !caption.is_empty() {
            req = req.caption(caption.to_string());
        }
        let sent = req.await.map_err(transport_err)?;
        Ok(sent_message(&sent))
    }

    async fn send_video(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        let mut req = self
            .bot
            .send_video(self.recipient(), input_file(media))
            .message_thread_id(thread(topic_id));
        if !caption.is_empty() {
            req = req.caption(caption.to_string());
        }
        let sent = req.await.map_err(transport_err)?;
        Ok(sent_message(&sent))
    }

    async fn send_audio(
        &self,
        topic_id: i64,
        media: &MediaDescriptor,
        caption: &str,
    ) -> Result<SentMessage, TransportError> {
        let mut req = self
            .bot
            .send_audio(self.recipient(), input_file(media))
            .message_thread_id(thread(topic_id));
        if !caption.is_empty() {
            req = req.caption(caption.to_string());
        }
        let sent = req.await.map_err(transport_err)?;
        Ok(sent_message(&sent))
    }

    async fn edit_text(&self, message_id: i64, body: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(self.destination, message(message_id), body)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn edit_caption(&self, message_id: i64, body: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_caption(self.destination, message(message_id))
            .caption(body.to_string())
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn delete_message(&self, message_id: i64) -> Result<(), TransportError> {
        self.bot
            .delete_message(self.destination, message(message_id))
            .await
            .map_err(transport_err)?;
        Ok(())
    }
}

fn transport_err(err: RequestError) -> TransportError {
    TransportError::with_source(classify(&err), err.to_string(), Box::new(err))
}

/// Maps a teloxide failure onto the structured error kinds the relay
/// core branches on.
pub fn classify(err: &RequestError) -> TransportErrorKind {
    match err {
        RequestError::Api(api) => classify_api(api),
        RequestError::Network(_) | RequestError::Io(_) => TransportErrorKind::Unavailable,
        RequestError::RetryAfter(_) => TransportErrorKind::Unavailable,
        _ => TransportErrorKind::Rejected,
    }
}

fn classify_api(api: &ApiError) -> TransportErrorKind {
    match api {
        ApiError::MessageNotModified => TransportErrorKind::NotModified,
        ApiError::Unknown(text) => classify_raw(text),
        _ => TransportErrorKind::Rejected,
    }
}

/// Classification of Bot API error strings teloxide does not give a
/// dedicated variant. This is the one place in the system where error
/// text is inspected.
fn classify_raw(text: &str) -> TransportErrorKind {
    let text = text.to_ascii_lowercase();
    if text.contains("not modified") || text.contains("not_modified") {
        TransportErrorKind::NotModified
    } else if text.contains("thread not found")
        || text.contains("topic not found")
        || text.contains("topic deleted")
        || text.contains("topic_deleted")
        || text.contains("topic_closed")
    {
        TransportErrorKind::TopicInvalid
    } else {
        TransportErrorKind::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_topic_errors_classify_as_invalid() {
        assert_eq!(
            classify_raw("Bad Request: message thread not found"),
            TransportErrorKind::TopicInvalid
        );
        assert_eq!(
            classify_raw("Bad Request: TOPIC_DELETED"),
            TransportErrorKind::TopicInvalid
        );
    }

    #[test]
    fn raw_not_modified_is_benign() {
        assert_eq!(
            classify_raw("Bad Request: TOPIC_NOT_MODIFIED"),
            TransportErrorKind::NotModified
        );
        assert_eq!(
            classify_raw("Bad Request: message is not modified"),
            TransportErrorKind::NotModified
        );
    }

    #[test]
    fn unknown_raw_errors_are_terminal() {
        assert_eq!(
            classify_raw("Bad Request: chat not found"),
            TransportErrorKind::Rejected
        );
    }

    #[test]
    fn api_not_modified_maps_to_kind() {
        let err = RequestError::from(ApiError::MessageNotModified);
        assert_eq!(classify(&err), TransportErrorKind::NotModified);
    }

    #[test]
    fn thread_and_message_ids_round_trip() {
        assert_eq!(thread(42).0.0, 42);
        assert_eq!(message(9001).0, 9001);
    }
}
