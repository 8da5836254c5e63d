// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay event loop.
//!
//! One handler task per inbound event; handlers for distinct messages run
//! concurrently, and each runs its resolve→relay (or lookup→edit)
//! sequence to completion or failure. On shutdown the loop stops
//! accepting events and drains in-flight handlers before returning.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use estuary_core::{InboundMessage, InboundSource};

use crate::admission::{AdmissionPolicy, AdmissionVerdict};
use crate::dispatcher::RelayDispatcher;
use crate::editor::EditPropagator;

/// Per-message pipeline: admission, then relay or edit propagation.
pub struct MessageHandler {
    admission: AdmissionPolicy,
    dispatcher: RelayDispatcher,
    editor: EditPropagator,
}

impl MessageHandler {
    pub fn new(
        admission: AdmissionPolicy,
        dispatcher: RelayDispatcher,
        editor: EditPropagator,
    ) -> Self {
        Self {
            admission,
            dispatcher,
            editor,
        }
    }

    /// Processes one inbound event to completion. Never panics the loop:
    /// every failure ends here as a log line.
    pub async fn handle(&self, msg: InboundMessage) {
        if msg.is_edit {
            if let Err(e) = self.editor.propagate_edit(&msg).await {
                warn!(
                    chat_id = msg.chat_id,
                    message_id = msg.id,
                    error = %e,
                    "edit propagation failed"
                );
            }
            return;
        }

        match self.admission.admit(&msg) {
            AdmissionVerdict::Admitted => {}
            verdict => {
                debug!(chat_id = msg.chat_id, message_id = msg.id, ?verdict, "message filtered");
                return;
            }
        }

        if !msg.has_content() {
            debug!(chat_id = msg.chat_id, message_id = msg.id, "nothing to relay");
            return;
        }

        if let Err(e) = self.dispatcher.relay(&msg).await {
            error!(
                chat_id = msg.chat_id,
                message_id = msg.id,
                error = %e,
                "relay failed"
            );
        }
    }
}

/// Pulls inbound events and fans them out to handler tasks.
pub struct RelayEngine {
    source: Arc<dyn InboundSource>,
    handler: Arc<MessageHandler>,
}

impl RelayEngine {
    pub fn new(source: Arc<dyn InboundSource>, handler: Arc<MessageHandler>) -> Self {
        Self { source, handler }
    }

    /// Runs until `cancel` fires or the inbound feed closes, then drains
    /// in-flight handlers.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut tasks = JoinSet::new();
        info!("relay engine started");

        loop {
            // Reap finished handlers so the set does not grow unbounded.
            while tasks.try_join_next().is_some() {}

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, no longer accepting events");
                    break;
                }
                next = self.source.next_message() => match next {
                    Ok(msg) => {
                        let handler = self.handler.clone();
                        tasks.spawn(async move { handler.handle(msg).await });
                    }
                    Err(e) => {
                        error!(error = %e, "inbound feed closed");
                        break;
                    }
                }
            }
        }

        let in_flight = tasks.len();
        if in_flight > 0 {
            info!(in_flight, "draining in-flight handlers");
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "handler task aborted");
            }
        }
        info!("relay engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::cache::ValidityCache;
    use crate::resolver::TopicResolver;
    use crate::testing::{
        Call, MemoryCorrelationStore, MemoryMappingStore, MockTransport, text_message,
    };
    use estuary_config::RelayConfig;
    use estuary_core::EstuaryError;

    /// Feeds a fixed script of messages, then blocks forever.
    struct ScriptedSource {
        queue: Mutex<VecDeque<InboundMessage>>,
    }

    #[async_trait]
    impl InboundSource for ScriptedSource {
        async fn next_message(&self) -> Result<InboundMessage, EstuaryError> {
            if let Some(msg) = self.queue.lock().await.pop_front() {
                return Ok(msg);
            }
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn engine_relays_then_propagates_edit_and_drains_on_cancel() {
        let transport = Arc::new(MockTransport::new());
        let mappings = Arc::new(MemoryMappingStore::new());
        let correlations = Arc::new(MemoryCorrelationStore::new());
        let resolver = Arc::new(TopicResolver::new(
            transport.clone(),
            mappings.clone(),
            Arc::new(ValidityCache::new()),
        ));
        let handler = Arc::new(MessageHandler::new(
            AdmissionPolicy::from_config(
                &RelayConfig {
                    destination_chat_id: -100999,
                    ..Default::default()
                },
                Some(1),
            ),
            RelayDispatcher::new(transport.clone(), correlations.clone(), resolver, 1024),
            EditPropagator::new(transport.clone(), correlations.clone()),
        ));

        let mut edit = text_message(-100, 1, "hello, edited");
        edit.is_edit = true;
        let source = Arc::new(ScriptedSource {
            queue: Mutex::new(VecDeque::from([text_message(-100, 1, "hello"), edit])),
        });

        let engine = RelayEngine::new(source, handler);
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let run = tokio::spawn(async move { engine.run(run_cancel).await });

        // Allow both events to flow through, then stop the loop.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        run.await.unwrap();

        assert_eq!(correlations.len(), 1);
        assert!(transport.calls().iter().any(|c| matches!(
            c,
            Call::EditText { body, .. } if body.starts_with("hello, edited")
        )));
    }

    #[tokio::test]
    async fn filtered_messages_do_not_touch_the_transport() {
        let transport = Arc::new(MockTransport::new());
        let correlations = Arc::new(MemoryCorrelationStore::new());
        let resolver = Arc::new(TopicResolver::new(
            transport.clone(),
            Arc::new(MemoryMappingStore::new()),
            Arc::new(ValidityCache::new()),
        ));
        let handler = MessageHandler::new(
            AdmissionPolicy::from_config(
                &RelayConfig {
                    destination_chat_id: -100999,
                    ..Default::default()
                },
                Some(424242),
            ),
            RelayDispatcher::new(transport.clone(), correlations.clone(), resolver, 1024),
            EditPropagator::new(transport.clone(), correlations.clone()),
        );

        // Excluded sender (the relay's own bot id).
        let mut own = text_message(-100, 1, "loop!");
        own.sender_id = Some(424242);
        handler.handle(own).await;

        // Admitted but empty.
        let mut empty = text_message(-100, 2, "");
        empty.text = None;
        handler.handle(empty).await;

        assert!(transport.calls().is_empty());
        assert_eq!(correlations.len(), 0);
    }
}
