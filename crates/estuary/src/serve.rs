// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `estuary serve` command implementation.
//!
//! Wires the stores, the Telegram transport, and the relay engine
//! together, installs signal handling, and runs a periodic correlation
//! retention purge alongside the event loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use estuary_config::EstuaryConfig;
use estuary_core::{
    CorrelationStore, EstuaryError, ForumTransport, InboundSource, MappingStore,
};
use estuary_relay::{
    AdmissionPolicy, EditPropagator, MessageHandler, RelayDispatcher, RelayEngine, TopicResolver,
    ValidityCache, shutdown,
};
use estuary_storage::{JsonMappingStore, SqliteCorrelationStore};
use estuary_telegram::{TelegramChannel, TelegramForum, bot_user_id_from_token};

/// Runs the relay daemon until SIGINT/SIGTERM.
pub async fn run_serve(config: EstuaryConfig) -> Result<(), EstuaryError> {
    init_tracing(&config.service.log_level);
    info!("starting estuary relay");

    if config.relay.destination_chat_id == 0 {
        eprintln!(
            "error: relay.destination_chat_id is required. Set it in estuary.toml or via ESTUARY_RELAY_DESTINATION_CHAT_ID."
        );
        return Err(EstuaryError::Config(
            "relay.destination_chat_id is not set".into(),
        ));
    }

    let channel = Arc::new(TelegramChannel::new(&config.telegram).map_err(|e| {
        eprintln!(
            "error: Telegram bot token required. Set telegram.bot_token in estuary.toml or via ESTUARY_TELEGRAM_BOT_TOKEN."
        );
        e
    })?);

    // Stores.
    let mappings: Arc<dyn MappingStore> =
        Arc::new(JsonMappingStore::new(&config.storage.mapping_path));
    let correlations = Arc::new(SqliteCorrelationStore::open(&config.storage.database_path).await?);
    info!(
        mapping_path = config.storage.mapping_path.as_str(),
        database_path = config.storage.database_path.as_str(),
        "stores opened"
    );

    // Send-side transport shares the receive side's Bot.
    let transport: Arc<dyn ForumTransport> = Arc::new(TelegramForum::new(
        channel.bot().clone(),
        config.relay.destination_chat_id,
    ));

    // Relay core.
    let self_id = config
        .telegram
        .bot_token
        .as_deref()
        .and_then(bot_user_id_from_token);
    if self_id.is_none() {
        warn!("could not derive bot id from token; self-messages rely on the destination filter");
    }
    let admission = AdmissionPolicy::from_config(&config.relay, self_id);
    let resolver = Arc::new(TopicResolver::new(
        transport.clone(),
        mappings.clone(),
        Arc::new(ValidityCache::new()),
    ));
    let handler = Arc::new(MessageHandler::new(
        admission,
        RelayDispatcher::new(
            transport.clone(),
            correlations.clone() as Arc<dyn CorrelationStore>,
            resolver,
            config.relay.max_media_bytes,
        ),
        EditPropagator::new(transport.clone(), correlations.clone()),
    ));

    channel.connect().await?;
    info!(
        destination = config.relay.destination_chat_id,
        only_allowlist = config.relay.only_allowlist,
        max_media_bytes = config.relay.max_media_bytes,
        "telegram transport connected"
    );

    let cancel = shutdown::install_signal_handler();

    // Periodic retention purge for the correlation store.
    {
        let purge_store = correlations.clone();
        let purge_cancel = cancel.clone();
        let interval_secs = config.service.purge_interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // Skip the immediate first tick; open() already purged.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match purge_store.purge_expired().await {
                            Ok(0) => debug!("retention purge: nothing to remove"),
                            Ok(removed) => info!(removed, "retention purge complete"),
                            Err(e) => warn!(error = %e, "retention purge failed (non-fatal)"),
                        }
                    }
                    _ = purge_cancel.cancelled() => {
                        info!("purge task shutting down");
                        break;
                    }
                }
            }
        });
    }

    let engine = RelayEngine::new(channel.clone() as Arc<dyn InboundSource>, handler);
    engine.run(cancel).await;

    // Engine has drained; stop polling and release store handles.
    channel.shutdown().await;
    if let Err(e) = correlations.close().await {
        warn!(error = %e, "correlation store close failed");
    }

    info!("estuary shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "estuary={log_level},estuary_relay={log_level},estuary_telegram={log_level},estuary_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
