//! Doctrail CLI
//!
//! Command-line interface for Doctrail - forwarded and received document tracking.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use doctrail_core::{Config, DocumentKind, DocumentStore, SyncStatus};

mod commands;
mod logging;
mod output;
mod prompt;

use commands::documents::DocumentFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "doctrail")]
#[command(about = "Doctrail - Track forwarded and received documents")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents
    #[command(alias = "ls")]
    List {
        /// Only documents of this kind
        #[arg(short, long)]
        kind: Option<DocumentKind>,
        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show document details
    Show {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Add a document (prompts for fields when none are given)
    Add {
        #[command(flatten)]
        fields: DocumentFields,
    },
    /// Edit a document
    Edit {
        /// Document ID (full or prefix)
        id: String,
        #[command(flatten)]
        fields: DocumentFields,
    },
    /// Delete documents
    #[command(alias = "rm")]
    Delete {
        /// Document IDs (full or prefix)
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import documents from a JSON array of field maps
    Import {
        /// File to import
        file: PathBuf,
    },
    /// Show sync status and document counts
    Status,
    /// Manage the remote mirror
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Sign in to the remote mirror
    Login {
        /// Account email
        #[arg(short, long)]
        email: Option<String>,
        /// Account password (or DOCTRAIL_PASSWORD; prompts if neither is set)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out of the remote mirror
    Logout {
        /// Also erase the local document cache
        #[arg(long)]
        clear: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Enable mirroring to a remote endpoint
    Set {
        /// Service URL
        endpoint: String,
        /// Project API key
        key: String,
    },
    /// Disable mirroring
    Clear {
        /// Also erase the local document cache
        #[arg(long)]
        purge: bool,
    },
    /// Check that the remote can be reached
    Test,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, log_level, request_timeout_secs)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    let store = DocumentStore::open(&config);
    let outcome = store.load().await.context("Failed to load documents")?;
    debug!("Initial load: {:?} ({})", outcome, store.status());
    if store.status() == SyncStatus::RemoteError {
        output.warn("Remote mirror unreachable; working from the local cache");
    }

    let result = run(cli.command, &store, &config, &output).await;

    // Push pending remote writes before exiting
    store.flush().await;

    result
}

async fn run(
    command: Commands,
    store: &DocumentStore,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        Commands::List { kind, search } => commands::documents::list(store, kind, search, output),
        Commands::Show { id } => commands::documents::show(store, id, output),
        Commands::Add { fields } => commands::documents::add(store, fields, output),
        Commands::Edit { id, fields } => commands::documents::edit(store, id, fields, output),
        Commands::Delete { ids, yes } => commands::documents::delete(store, ids, yes, output),
        Commands::Import { file } => commands::documents::import(store, &file, output),
        Commands::Status => commands::status::show(store, config, output).await,
        Commands::Remote { command } => handle_remote_command(command, store, output).await,
        Commands::Login { email, password } => {
            commands::auth::login(store, email, password, output).await
        }
        Commands::Logout { clear } => commands::auth::logout(store, clear, output).await,
        Commands::Config { .. } => Ok(()), // Handled before the store is opened
    }
}

async fn handle_remote_command(
    command: RemoteCommands,
    store: &DocumentStore,
    output: &Output,
) -> Result<()> {
    match command {
        RemoteCommands::Set { endpoint, key } => {
            commands::remote::set(store, endpoint, key, output).await
        }
        RemoteCommands::Clear { purge } => commands::remote::clear(store, purge, output),
        RemoteCommands::Test => commands::remote::test(store, output).await,
    }
}
