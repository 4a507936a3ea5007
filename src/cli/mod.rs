//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod chat;
pub mod files;
pub mod settings;
pub mod version;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::HttpApi;
use crate::cli::ask::run_ask;
use crate::cli::chat::run_chat;
use crate::cli::files::run_files;
use crate::cli::settings::{print_config, set_config_value, unset_config_value};
use crate::cli::version::print_version_info;
use crate::core::config::{Config, ConfigOverrides, ResolvedConfig};
use crate::utils::logging::{init_tracing, TranscriptLog};

#[derive(Parser)]
#[command(name = "policychat")]
#[command(about = "Ask questions about HR policy documents from the terminal")]
#[command(
    long_about = "policychat talks to an HR policy assistant service. It streams answers \
to your questions and manages the policy documents the assistant draws on.\n\n\
Environment Variables (override the config file):\n\
  POLICYCHAT_API_BASE   Base URL of the assistant service\n\
  POLICYCHAT_API_KEY    Key sent in the X-API-Key header\n\
  POLICYCHAT_LOG        Diagnostic log filter (e.g. debug, policychat=trace)\n\n\
Controls (interactive chat):\n\
  Enter             Send the question\n\
  Ctrl+C            Stop the current answer, or quit when idle\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the assistant service
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// API key sent with every request
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Append the chat transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Wait for the whole answer instead of streaming it
        #[arg(long)]
        blocking: bool,
        /// The question to ask
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Manage uploaded policy documents
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set (multiple words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the saved configuration
    Config,
    /// Show version and build information
    Version,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum FilesCommand {
    /// List uploaded documents
    List,
    /// Delete a document by id
    Delete {
        /// Server-assigned file id
        file_id: String,
    },
    /// Upload a local document for indexing
    Upload {
        /// Path of the document to upload
        path: PathBuf,
    },
}

/// Everything a network command needs: resolved settings plus a client.
pub struct Session {
    pub resolved: ResolvedConfig,
    pub api: Arc<HttpApi>,
}

impl Session {
    fn open(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let overrides = ConfigOverrides {
            api_base: args.api_base.clone(),
            api_key: args.api_key.clone(),
        };
        let resolved = config.resolve(&overrides, |key| std::env::var(key).ok());
        if resolved.context.credential.is_placeholder() {
            tracing::warn!("no API key configured; using the development default");
        }
        let api = Arc::new(HttpApi::new(resolved.connect_timeout)?);
        Ok(Self { resolved, api })
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let transcript = match &args.log {
        Some(path) => Some(TranscriptLog::open(path)?),
        None => None,
    };

    match &args.command {
        None | Some(Commands::Chat) => run_chat(Session::open(&args)?, transcript).await,
        Some(Commands::Ask { question, blocking }) => {
            let question = question.join(" ");
            run_ask(Session::open(&args)?, &question, *blocking, transcript).await
        }
        Some(Commands::Files { command }) => run_files(Session::open(&args)?, command).await,
        Some(Commands::Set { key, value }) => set_config_value(key, &value.join(" ")),
        Some(Commands::Unset { key }) => unset_config_value(key),
        Some(Commands::Config) => print_config(),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
    }
}
