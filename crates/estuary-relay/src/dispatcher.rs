// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay dispatch: transmits a resolved message into its destination
//! topic, verifies where it landed, and records the correlation.
//!
//! At most one correlation record is ever stored per source message,
//! even when transmission needs the single rebuild-and-retry cycle.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use estuary_core::{
    CorrelationRecord, CorrelationStore, EstuaryError, ForumTransport, InboundMessage,
    MediaDescriptor, MediaKind, SentMessage, TransportError, TransportErrorKind, utc_timestamp,
};

use crate::resolver::TopicResolver;

/// Transmits admitted messages into their resolved destination topics.
pub struct RelayDispatcher {
    transport: Arc<dyn ForumTransport>,
    correlations: Arc<dyn CorrelationStore>,
    resolver: Arc<TopicResolver>,
    max_media_bytes: u64,
}

impl RelayDispatcher {
    pub fn new(
        transport: Arc<dyn ForumTransport>,
        correlations: Arc<dyn CorrelationStore>,
        resolver: Arc<TopicResolver>,
        max_media_bytes: u64,
    ) -> Self {
        Self {
            transport,
            correlations,
            resolver,
            max_media_bytes,
        }
    }

    /// Relays one inbound message.
    ///
    /// Destination failures are terminal for the message and are absorbed
    /// here (logged, `Ok(())`): one bad message must never stall the
    /// event loop. Only resolution/storage errors propagate.
    pub async fn relay(&self, msg: &InboundMessage) -> Result<(), EstuaryError> {
        let key = msg.source_key();
        let Some(mut topic_id) = self
            .resolver
            .resolve(key, &msg.chat_title, msg.chat_kind, msg.thread_label.as_deref())
            .await?
        else {
            debug!(key = %key, message_id = msg.id, "no destination topic, message dropped");
            return Ok(());
        };

        // Oversized media never reaches a send primitive and never earns
        // a correlation record; the topic gets a notice instead.
        if let Some(media) = &msg.media
            && media.file_size > self.max_media_bytes
        {
            warn!(
                key = %key,
                message_id = msg.id,
                size = media.file_size,
                ceiling = self.max_media_bytes,
                "media exceeds size ceiling, posting notice"
            );
            self.transport
                .send_text(topic_id, &oversize_notice(media, self.max_media_bytes))
                .await?;
            return Ok(());
        }

        let mut rebuilt = false;
        loop {
            match self.transmit(topic_id, msg).await {
                Ok(sent) if sent.topic_id == Some(topic_id) => {
                    self.correlations
                        .record(&CorrelationRecord {
                            source_chat_id: msg.chat_id,
                            source_message_id: msg.id,
                            dest_message_id: sent.message_id,
                            dest_topic_id: topic_id,
                            created_at: utc_timestamp(),
                        })
                        .await?;
                    debug!(
                        key = %key,
                        message_id = msg.id,
                        topic_id,
                        dest_message_id = sent.message_id,
                        "message relayed"
                    );
                    return Ok(());
                }
                Ok(stray) => {
                    // The destination silently rerouted (stale topic id):
                    // remove the stray copy before rebuilding.
                    warn!(
                        key = %key,
                        intended = topic_id,
                        landed = ?stray.topic_id,
                        "message landed outside the intended topic"
                    );
                    if let Err(e) = self.transport.delete_message(stray.message_id).await {
                        warn!(error = %e, "failed to delete stray message");
                    }
                }
                Err(e) if e.kind == TransportErrorKind::TopicInvalid => {
                    info!(key = %key, topic_id, "destination reports topic invalid");
                }
                Err(e) => {
                    error!(key = %key, message_id = msg.id, error = %e, "relay failed, message dropped");
                    return Ok(());
                }
            }

            if rebuilt {
                error!(
                    key = %key,
                    message_id = msg.id,
                    "relay failed again after rebuilding the topic, message dropped"
                );
                return Ok(());
            }
            rebuilt = true;

            self.resolver.invalidate(key).await?;
            match self
                .resolver
                .resolve(key, &msg.chat_title, msg.chat_kind, msg.thread_label.as_deref())
                .await?
            {
                Some(id) => topic_id = id,
                None => {
                    debug!(key = %key, "resolution suppressed after invalidation, message dropped");
                    return Ok(());
                }
            }
        }
    }

    /// Routes one transmission by media kind.
    async fn transmit(
        &self,
        topic_id: i64,
        msg: &InboundMessage,
    ) -> Result<SentMessage, TransportError> {
        let caption = msg.text.as_deref().unwrap_or("");
        let Some(media) = &msg.media else {
            return self.transport.send_text(topic_id, caption).await;
        };

        let sent = match media.kind {
            MediaKind::Photo => self.transport.send_photo(topic_id, media, caption).await,
            MediaKind::Document => self.transport.send_document(topic_id, media, caption).await,
            MediaKind::Video => self.transport.send_video(topic_id, media, caption).await,
            MediaKind::Audio => self.transport.send_audio(topic_id, media, caption).await,
        };

        match sent {
            Err(e) if e.kind == TransportErrorKind::Rejected && !caption.is_empty() => {
                // The destination refused the media itself; keep at least
                // the text so the message is not lost entirely.
                warn!(error = %e, topic_id, "media send rejected, falling back to text");
                self.transport
                    .send_text(topic_id, &format!("{caption}\n[media unavailable]"))
                    .await
            }
            other => other,
        }
    }
}

fn oversize_notice(media: &MediaDescriptor, ceiling: u64) -> String {
    let name = media.file_name.as_deref().unwrap_or("attachment");
    format!(
        "⚠️ {name} ({:.1} MiB) exceeds the {} MiB relay limit and was not forwarded.",
        media.file_size as f64 / (1024.0 * 1024.0),
        ceiling / (1024 * 1024),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ValidityCache;
    use estuary_core::MappingStore;
    use crate::testing::{
        Call, MemoryCorrelationStore, MemoryMappingStore, MockTransport, media_message,
        text_message,
    };

    const CEILING: u64 = 50 * 1024 * 1024;

    struct Fixture {
        transport: Arc<MockTransport>,
        mappings: Arc<MemoryMappingStore>,
        correlations: Arc<MemoryCorrelationStore>,
        dispatcher: RelayDispatcher,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let mappings = Arc::new(MemoryMappingStore::new());
        let correlations = Arc::new(MemoryCorrelationStore::new());
        let resolver = Arc::new(TopicResolver::new(
            transport.clone(),
            mappings.clone(),
            Arc::new(ValidityCache::new()),
        ));
        let dispatcher = RelayDispatcher::new(
            transport.clone(),
            correlations.clone(),
            resolver,
            CEILING,
        );
        Fixture {
            transport,
            mappings,
            correlations,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn first_message_creates_topic_and_correlation() {
        let f = fixture();
        let msg = text_message(100, 1, "hello");

        f.dispatcher.relay(&msg).await.unwrap();

        assert_eq!(f.transport.created_topics(), vec!["💬 Ops".to_string()]);
        // One marker send plus one content send.
        assert!(f.transport.calls().iter().any(|c| matches!(
            c,
            Call::SendText { topic_id: 100, body } if body == "hello"
        )));
        let rec = f.correlations.lookup(100, 1).await.unwrap().unwrap();
        assert_eq!(rec.dest_topic_id, 100);
        assert!(rec.dest_message_id >= 1000);
        assert_eq!(f.correlations.len(), 1);
    }

    #[tokio::test]
    async fn media_routes_through_matching_primitive() {
        let f = fixture();

        f.dispatcher
            .relay(&media_message(-100, 1, MediaKind::Photo, 1024))
            .await
            .unwrap();
        f.dispatcher
            .relay(&media_message(-100, 2, MediaKind::Video, 1024))
            .await
            .unwrap();
        f.dispatcher
            .relay(&media_message(-100, 3, MediaKind::Audio, 1024))
            .await
            .unwrap();
        f.dispatcher
            .relay(&media_message(-100, 4, MediaKind::Document, 1024))
            .await
            .unwrap();

        let calls = f.transport.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::SendPhoto { caption, .. } if caption == "caption")));
        assert!(calls.iter().any(|c| matches!(c, Call::SendVideo { .. })));
        assert!(calls.iter().any(|c| matches!(c, Call::SendAudio { .. })));
        assert!(calls.iter().any(|c| matches!(c, Call::SendDocument { .. })));
        assert_eq!(f.correlations.len(), 4);
    }

    #[tokio::test]
    async fn oversized_media_posts_notice_and_skips_correlation() {
        let f = fixture();
        let msg = media_message(-100, 1, MediaKind::Video, CEILING + 1);

        f.dispatcher.relay(&msg).await.unwrap();

        assert_eq!(
            f.transport.count_calls(|c| matches!(
                c,
                Call::SendPhoto { .. }
                    | Call::SendVideo { .. }
                    | Call::SendAudio { .. }
                    | Call::SendDocument { .. }
            )),
            0,
            "no media primitive may be reached"
        );
        assert!(f.transport.calls().iter().any(|c| matches!(
            c,
            Call::SendText { body, .. } if body.contains("exceeds the 50 MiB relay limit")
        )));
        assert_eq!(f.correlations.len(), 0);
    }

    #[tokio::test]
    async fn silent_reroute_deletes_stray_and_retries_once() {
        let f = fixture();
        let key = estuary_core::SourceKey::new(-100, None);
        // First created topic (100) swallows sends into the default stream.
        f.transport.reroute(100, None);

        f.dispatcher.relay(&text_message(-100, 1, "hi")).await.unwrap();

        // Stray copy deleted, mapping rebuilt as topic 101, resent there.
        assert_eq!(f.transport.count_calls(|c| matches!(c, Call::Delete(_))), 1);
        assert_eq!(f.transport.created_topics().len(), 2);
        let mapping = f.mappings.mapping(key).await.unwrap().unwrap();
        assert_eq!(mapping.topic_id, Some(101));
        let rec = f.correlations.lookup(-100, 1).await.unwrap().unwrap();
        assert_eq!(rec.dest_topic_id, 101);
        assert_eq!(f.correlations.len(), 1);
    }

    #[tokio::test]
    async fn topic_invalid_error_triggers_single_rebuild() {
        let f = fixture();
        f.transport.fail_text_sends(100, TransportErrorKind::TopicInvalid);

        f.dispatcher.relay(&text_message(-100, 1, "hi")).await.unwrap();

        assert_eq!(f.transport.created_topics().len(), 2);
        let rec = f.correlations.lookup(-100, 1).await.unwrap().unwrap();
        assert_eq!(rec.dest_topic_id, 101);
    }

    #[tokio::test]
    async fn second_failure_drops_the_message() {
        let f = fixture();
        f.transport.reroute(100, None);
        f.transport.reroute(101, None);

        f.dispatcher.relay(&text_message(-100, 1, "hi")).await.unwrap();

        assert_eq!(f.transport.created_topics().len(), 2, "exactly one rebuild");
        assert_eq!(f.transport.count_calls(|c| matches!(c, Call::Delete(_))), 2);
        assert_eq!(f.correlations.len(), 0);
    }

    #[tokio::test]
    async fn terminal_error_drops_without_retry() {
        let f = fixture();
        f.transport.fail_text_sends(100, TransportErrorKind::Unavailable);

        f.dispatcher.relay(&text_message(-100, 1, "hi")).await.unwrap();

        assert_eq!(f.transport.created_topics().len(), 1, "no rebuild");
        assert_eq!(f.correlations.len(), 0);
    }

    #[tokio::test]
    async fn rejected_media_falls_back_to_text() {
        let f = fixture();
        f.transport.fail_media_sends(100, TransportErrorKind::Rejected);

        f.dispatcher
            .relay(&media_message(-100, 1, MediaKind::Photo, 1024))
            .await
            .unwrap();

        assert!(f.transport.calls().iter().any(|c| matches!(
            c,
            Call::SendText { body, .. } if body == "caption\n[media unavailable]"
        )));
        assert_eq!(f.correlations.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_relay_keeps_one_correlation() {
        let f = fixture();
        let msg = text_message(-100, 1, "hi");

        f.dispatcher.relay(&msg).await.unwrap();
        f.dispatcher.relay(&msg).await.unwrap();

        assert_eq!(f.correlations.len(), 1);
    }
}
