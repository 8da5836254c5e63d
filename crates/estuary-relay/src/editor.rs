// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edit propagation: re-applies a source-side edit to the mirrored copy.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, warn};

use estuary_core::{
    CorrelationStore, EstuaryError, ForumTransport, InboundMessage, TransportErrorKind,
};

/// Applies source-message edits to their mirrored destination messages.
pub struct EditPropagator {
    transport: Arc<dyn ForumTransport>,
    correlations: Arc<dyn CorrelationStore>,
}

impl EditPropagator {
    pub fn new(transport: Arc<dyn ForumTransport>, correlations: Arc<dyn CorrelationStore>) -> Self {
        Self {
            transport,
            correlations,
        }
    }

    /// Propagates one edited message.
    ///
    /// A missing correlation (never relayed, or past the retention
    /// horizon) is a silent no-op. Failures are logged and dropped; a
    /// later edit of the same message retries independently.
    pub async fn propagate_edit(&self, msg: &InboundMessage) -> Result<(), EstuaryError> {
        let Some(rec) = self.correlations.lookup(msg.chat_id, msg.id).await? else {
            debug!(
                chat_id = msg.chat_id,
                message_id = msg.id,
                "edit without correlation, ignoring"
            );
            return Ok(());
        };

        let stamp = Local::now().format("%H:%M").to_string();
        let body = edited_body(msg.text.as_deref().unwrap_or(""), &stamp);

        let result = if msg.media.is_some() {
            self.transport.edit_caption(rec.dest_message_id, &body).await
        } else {
            self.transport.edit_text(rec.dest_message_id, &body).await
        };

        match result {
            Ok(()) => {
                debug!(
                    dest_message_id = rec.dest_message_id,
                    dest_topic_id = rec.dest_topic_id,
                    "edit propagated"
                );
                Ok(())
            }
            Err(e) if e.kind == TransportErrorKind::NotModified => Ok(()),
            Err(e) => {
                warn!(
                    error = %e,
                    dest_message_id = rec.dest_message_id,
                    "edit dropped"
                );
                Ok(())
            }
        }
    }
}

/// The edited text with a trailing local-time edit marker.
fn edited_body(text: &str, stamp: &str) -> String {
    format!("{text}\n\n✏️ {stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MemoryCorrelationStore, MockTransport, media_message, text_message};
    use estuary_core::{CorrelationRecord, MediaKind, utc_timestamp};

    struct Fixture {
        transport: Arc<MockTransport>,
        correlations: Arc<MemoryCorrelationStore>,
        editor: EditPropagator,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let correlations = Arc::new(MemoryCorrelationStore::new());
        let editor = EditPropagator::new(transport.clone(), correlations.clone());
        Fixture {
            transport,
            correlations,
            editor,
        }
    }

    async fn seed(f: &Fixture, chat_id: i64, message_id: i64, dest: i64) {
        f.correlations
            .record(&CorrelationRecord {
                source_chat_id: chat_id,
                source_message_id: message_id,
                dest_message_id: dest,
                dest_topic_id: 42,
                created_at: utc_timestamp(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn uncorrelated_edit_makes_no_transport_call() {
        let f = fixture();
        let mut msg = text_message(-100, 1, "new text");
        msg.is_edit = true;

        f.editor.propagate_edit(&msg).await.unwrap();

        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn text_edit_targets_stored_destination_with_marker() {
        let f = fixture();
        seed(&f, -100, 1, 9001).await;
        let mut msg = text_message(-100, 1, "corrected");
        msg.is_edit = true;

        f.editor.propagate_edit(&msg).await.unwrap();

        let calls = f.transport.calls();
        assert_eq!(calls.len(), 1);
        let Call::EditText { message_id, body } = &calls[0] else {
            panic!("expected EditText, got {:?}", calls[0]);
        };
        assert_eq!(*message_id, 9001);
        assert!(body.starts_with("corrected\n\n✏️ "));
    }

    #[tokio::test]
    async fn media_edit_uses_caption_primitive() {
        let f = fixture();
        seed(&f, -100, 5, 9002).await;
        let mut msg = media_message(-100, 5, MediaKind::Photo, 1024);
        msg.is_edit = true;
        msg.text = Some("new caption".to_string());

        f.editor.propagate_edit(&msg).await.unwrap();

        assert!(f.transport.calls().iter().any(|c| matches!(
            c,
            Call::EditCaption { message_id: 9002, body } if body.starts_with("new caption")
        )));
    }

    #[tokio::test]
    async fn not_modified_is_benign() {
        let f = fixture();
        seed(&f, -100, 1, 9001).await;
        f.transport.fail_edits(TransportErrorKind::NotModified);
        let mut msg = text_message(-100, 1, "same");
        msg.is_edit = true;

        assert!(f.editor.propagate_edit(&msg).await.is_ok());
    }

    #[tokio::test]
    async fn other_edit_failures_are_absorbed() {
        let f = fixture();
        seed(&f, -100, 1, 9001).await;
        f.transport.fail_edits(TransportErrorKind::Rejected);
        let mut msg = text_message(-100, 1, "same");
        msg.is_edit = true;

        // Dropped with a log line, never an error to the event loop.
        assert!(f.editor.propagate_edit(&msg).await.is_ok());
    }

    #[test]
    fn edited_body_appends_time_marker() {
        assert_eq!(edited_body("hi", "14:05"), "hi\n\n✏️ 14:05");
    }
}
