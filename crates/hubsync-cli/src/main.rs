//! HubSync CLI
//!
//! Command-line interface for HubSync - edit hub documents through a local
//! document store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hubsync_core::Config;

mod commands;
mod editor;
mod output;

use commands::document::Input;
use output::{Output, OutputFormat};

/// Environment variable holding the log filter
const LOG_ENV: &str = "HUBSYNC_LOG";

#[derive(Parser)]
#[command(name = "hubsync")]
#[command(about = "HubSync - edit hub documents through a local document store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List local documents
    #[command(alias = "ls")]
    List,
    /// Show a local document
    Show {
        /// Document ID
        id: String,
    },
    /// Store a JSON file as a local document
    Import {
        /// Document ID
        id: String,
        /// JSON file holding the document content
        file: PathBuf,
        /// Replace an existing local document
        #[arg(long)]
        force: bool,
    },
    /// Edit a document and save it through the hub
    Edit {
        /// Document ID
        id: String,
        /// Take the new content from a file instead of $EDITOR
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Create a new document on the hub
    #[command(alias = "add")]
    New {
        /// Document ID (prompted for when omitted)
        id: Option<String>,
        /// Take the content from a file instead of $EDITOR
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Replace the local copy of a document with the hub's copy
    Reload {
        /// Document ID
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Fetch a hub document that is not yet in the local store
    Pull {
        /// Document ID
        id: String,
    },
    /// Share a document's text
    Share {
        /// Document ID
        id: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show hub and local store status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, hub_url, database, database_name, request_timeout_secs)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Commands::List => commands::document::list(&config, &output),
        Commands::Show { id } => commands::document::show(&config, id, &output),
        Commands::Import { id, file, force } => {
            commands::document::import(&config, id, &file, force, &output)
        }
        Commands::Edit { id, file } => {
            commands::document::edit(&config, id, Input::from_file(file), &cancel, &output).await
        }
        Commands::New { id, file } => {
            commands::document::create(&config, id, Input::from_file(file), &cancel, &output)
                .await
        }
        Commands::Reload { id, yes } => {
            commands::document::reload(&config, id, yes, &cancel, &output).await
        }
        Commands::Pull { id } => commands::document::pull(&config, id, &cancel, &output).await,
        Commands::Share { id, output: path } => {
            commands::document::share(&config, id, path, &cancel, &output).await
        }
        Commands::Status => commands::status::show(&config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Log to stderr, filtered by HUBSYNC_LOG, then RUST_LOG, defaulting to warn
fn init_logging() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}
