// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Estuary - a Telegram many-to-one forum relay.
//!
//! This is the binary entry point for the relay daemon and its
//! administrative CLI.

mod serve;
mod topics;

use clap::{Parser, Subcommand};

use topics::TopicsAction;

/// Estuary - mirrors many Telegram conversations into one forum.
#[derive(Parser, Debug)]
#[command(name = "estuary", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay daemon.
    Serve,
    /// Inspect and toggle source-chat mappings.
    Topics {
        #[command(subcommand)]
        action: TopicsAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match estuary_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            estuary_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Topics { action }) => topics::run_topics(&config, action).await,
        None => {
            println!("estuary: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        super::Cli::command().debug_assert();
    }

    #[test]
    fn empty_config_is_valid_by_default() {
        let config = estuary_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.relay.destination_chat_id, 0);
        assert_eq!(config.service.log_level, "info");
    }
}
