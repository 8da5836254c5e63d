// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Estuary relay.
//!
//! The receive side long-polls the Bot API and converts new/edited
//! message feeds into transport-agnostic [`InboundMessage`] events; the
//! send side ([`TelegramForum`]) implements the forum-topic primitives
//! the relay core drives.

pub mod forum;
pub mod handler;
pub mod media;

use async_trait::async_trait;
use teloxide::dptree;
use teloxide::prelude::*;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use estuary_config::TelegramConfig;
use estuary_core::{EstuaryError, InboundMessage, InboundSource};

pub use forum::TelegramForum;

/// Long-polling receive side of the Telegram transport.
///
/// [`connect`](TelegramChannel::connect) starts a background dispatcher
/// that feeds an internal queue; the relay engine consumes it through
/// [`InboundSource`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Creates the channel. Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, EstuaryError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            EstuaryError::Config("telegram.bot_token is required to run the relay".into())
        })?;
        if token.is_empty() {
            return Err(EstuaryError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: Mutex::new(None),
        })
    }

    /// The underlying teloxide Bot, shared with the send side.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Starts long polling. Idempotent: a second call is a no-op.
    pub async fn connect(&self) -> Result<(), EstuaryError> {
        let mut handle_slot = self.polling_handle.lock().await;
        if handle_slot.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let new_tx = self.inbound_tx.clone();
        let edit_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = new_tx.clone();
                    async move {
                        deliver(&tx, &msg, false).await;
                        respond(())
                    }
                }))
                .branch(Update::filter_edited_message().endpoint(move |msg: Message| {
                    let tx = edit_tx.clone();
                    async move {
                        deliver(&tx, &msg, true).await;
                        respond(())
                    }
                }));

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        *handle_slot = Some(handle);
        Ok(())
    }

    /// Stops long polling. In-flight conversions finish on their own;
    /// queued events remain consumable until the channel is dropped.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.polling_handle.lock().await.take() {
            handle.abort();
            debug!("Telegram long polling stopped");
        }
    }
}

async fn deliver(tx: &mpsc::Sender<InboundMessage>, msg: &Message, is_edit: bool) {
    let inbound = handler::to_inbound(msg, is_edit);
    if tx.send(inbound).await.is_err() {
        warn!("inbound queue closed, dropping message");
    }
}

#[async_trait]
impl InboundSource for TelegramChannel {
    async fn next_message(&self) -> Result<InboundMessage, EstuaryError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| {
            EstuaryError::Internal("Telegram inbound queue closed".to_string())
        })
    }
}

/// The bot's own user id, recoverable from the token's numeric prefix.
///
/// Used to seed the excluded-sender set without an extra `getMe` round
/// trip at startup.
pub fn bot_user_id_from_token(token: &str) -> Option<i64> {
    token.split(':').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_bot_token() {
        let config = TelegramConfig { bot_token: None };
        assert!(TelegramChannel::new(&config).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        let config = TelegramConfig {
            bot_token: Some(String::new()),
        };
        assert!(TelegramChannel::new(&config).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11".into()),
        };
        assert!(TelegramChannel::new(&config).is_ok());
    }

    #[test]
    fn bot_user_id_parses_token_prefix() {
        assert_eq!(bot_user_id_from_token("123456:ABC-DEF"), Some(123456));
        assert_eq!(bot_user_id_from_token("garbage"), None);
        assert_eq!(bot_user_id_from_token(""), None);
    }
}
