//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches to the chat
//! REPL, the one-shot `say` command, and the history and config helpers.

pub mod chat;
pub mod health;
pub mod history;
pub mod render;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::data::BASE_URL_ENV;
use crate::core::config::Config;
use crate::core::history::{FileSnapshotStore, History};
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "A terminal client for a streaming chat backend")]
#[command(
    long_about = "Palaver sends your questions to a streaming chat backend and prints the \
reply as it arrives. The conversation is kept across restarts (the most recent \
messages only) until you reset it.\n\n\
Environment Variables:\n\
  PALAVER_BASE_URL  Backend base URL (overrides the config file)\n\
  PALAVER_LOG       Log filter directive, e.g. 'palaver=debug' (default: warn)\n\n\
Chat commands:\n\
  /stop             Stop the reply that is streaming\n\
  /reset            Stop any reply and forget the conversation\n\
  /quit             Leave the chat\n\
  Ctrl+C            Stop the streaming reply, or quit when idle"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL for this run
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Append diagnostics to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Neither load nor save the conversation history
    #[arg(long, global = true)]
    pub no_history: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Ask a single question and print the streamed reply
    Say {
        /// The question to ask
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// Print the saved conversation
    History,
    /// Delete the saved conversation
    Reset,
    /// Check that the backend is up
    Health,
    /// Set a configuration value
    Set {
        /// Configuration key (base-url, chat-path, health-path, history-limit, history-file, connect-timeout)
        key: String,
        /// Value to assign
        value: String,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to clear
        key: String,
    },
    /// Print the effective configuration
    Config,
}

/// Settings shared by every command that talks to the backend.
pub struct Backend {
    pub config: Config,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl Backend {
    pub fn new(config: Config, base_url_flag: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let env_url = std::env::var(BASE_URL_ENV).ok();
        let base_url = config.resolve_base_url(base_url_flag, env_url.as_deref());
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    pub fn chat_url(&self) -> String {
        self.config.chat_url(&self.base_url)
    }

    pub fn health_url(&self) -> String {
        self.config.health_url(&self.base_url)
    }

    /// File-backed history, unless disabled or no location is known.
    pub fn history(&self, disabled: bool) -> Option<History<FileSnapshotStore>> {
        if disabled {
            return None;
        }
        self.config.history_path().map(|path| {
            History::with_limit(FileSnapshotStore::new(path), self.config.history_limit())
        })
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let backend = Backend::new(config, args.base_url.as_deref())?;
            chat::run_chat(backend, args.no_history).await
        }
        Commands::Say { prompt } => {
            let backend = Backend::new(config, args.base_url.as_deref())?;
            say::run_say(backend, prompt).await
        }
        Commands::History => {
            let backend = Backend::new(config, args.base_url.as_deref())?;
            history::print_history(&backend);
            Ok(())
        }
        Commands::Reset => {
            let backend = Backend::new(config, args.base_url.as_deref())?;
            history::clear_history(&backend);
            Ok(())
        }
        Commands::Health => {
            let backend = Backend::new(config, args.base_url.as_deref())?;
            health::run_health(&backend).await
        }
        Commands::Set { key, value } => {
            let mut config = config;
            if let Err(err) = config.set_value(&key, &value) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = config;
            if let Err(err) = config.unset_value(&key) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Config => {
            config.print_all();
            if let Some(path) = Config::get_config_path() {
                println!();
                println!("Config file: {}", crate::core::config::path_display(path));
            }
            Ok(())
        }
    }
}
