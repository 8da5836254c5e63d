// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `estuary topics` command implementation.
//!
//! The administrative collaborator for the Mapping Store: lists known
//! source chats and toggles their `enabled` flags. The running daemon
//! re-reads the store on every resolution, so toggles take effect
//! without a restart.

use clap::{Args, Subcommand};

use estuary_config::EstuaryConfig;
use estuary_core::{EstuaryError, MappingStore};
use estuary_storage::JsonMappingStore;

/// Actions on source-chat mappings.
#[derive(Subcommand, Debug)]
pub enum TopicsAction {
    /// List known source chats and their destination topics.
    List,
    /// Enable relay for a source chat or a single thread.
    Enable(TopicsTarget),
    /// Disable relay for a source chat or a single thread.
    Disable(TopicsTarget),
}

/// Which mapping to toggle.
#[derive(Args, Debug)]
pub struct TopicsTarget {
    /// Source chat id.
    #[arg(long)]
    pub chat: i64,

    /// Source thread id; omit to target the whole chat.
    #[arg(long)]
    pub thread: Option<i64>,
}

pub async fn run_topics(config: &EstuaryConfig, action: TopicsAction) -> Result<(), EstuaryError> {
    let store = JsonMappingStore::new(&config.storage.mapping_path);
    match action {
        TopicsAction::List => list(&store).await,
        TopicsAction::Enable(target) => toggle(&store, &target, true).await,
        TopicsAction::Disable(target) => toggle(&store, &target, false).await,
    }
}

async fn list(store: &JsonMappingStore) -> Result<(), EstuaryError> {
    let chats = store.list_chats().await?;
    if chats.is_empty() {
        println!("no source chats registered yet");
        return Ok(());
    }

    for (summary, topics) in chats {
        println!(
            "{} [{}] {} - {}",
            summary.chat_id,
            summary.kind,
            gate(summary.enabled),
            summary.title,
        );
        for (thread_id, mapping) in topics {
            let topic = mapping
                .topic_id
                .map(|id| format!("topic {id}"))
                .unwrap_or_else(|| "no topic yet".to_string());
            println!(
                "  thread {thread_id}: {} {} - {}",
                topic,
                gate(mapping.enabled),
                mapping.title,
            );
        }
    }
    Ok(())
}

async fn toggle(
    store: &JsonMappingStore,
    target: &TopicsTarget,
    enabled: bool,
) -> Result<(), EstuaryError> {
    let changed = store
        .set_enabled(target.chat, target.thread, enabled)
        .await?;
    if !changed {
        return Err(EstuaryError::Config(match target.thread {
            Some(thread) => format!("unknown mapping {}_{thread}", target.chat),
            None => format!("unknown chat {}", target.chat),
        }));
    }

    match target.thread {
        Some(thread) => println!(
            "{} relay for thread {thread} of chat {}",
            gate(enabled),
            target.chat
        ),
        None => println!("{} relay for chat {}", gate(enabled), target.chat),
    }
    Ok(())
}

fn gate(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estuary_config::StorageConfig;
    use estuary_core::{ChatKind, ChatSummary};
    use tempfile::tempdir;

    fn config_with_store(dir: &tempfile::TempDir) -> EstuaryConfig {
        EstuaryConfig {
            storage: StorageConfig {
                mapping_path: dir
                    .path()
                    .join("mappings.json")
                    .to_string_lossy()
                    .into_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn toggle_flips_the_stored_flag() {
        let dir = tempdir().unwrap();
        let config = config_with_store(&dir);

        let store = JsonMappingStore::new(&config.storage.mapping_path);
        store
            .register_chat(&ChatSummary {
                chat_id: 500,
                title: "Alice".into(),
                kind: ChatKind::Private,
                enabled: false,
            })
            .await
            .unwrap();

        run_topics(
            &config,
            TopicsAction::Enable(TopicsTarget {
                chat: 500,
                thread: None,
            }),
        )
        .await
        .unwrap();

        assert!(store.chat(500).await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn toggling_an_unknown_chat_fails() {
        let dir = tempdir().unwrap();
        let config = config_with_store(&dir);

        let result = run_topics(
            &config,
            TopicsAction::Disable(TopicsTarget {
                chat: -404,
                thread: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_runs_on_an_empty_store() {
        let dir = tempdir().unwrap();
        let config = config_with_store(&dir);
        run_topics(&config, TopicsAction::List).await.unwrap();
    }
}
