//! rl CLI
//!
//! Command-line interface for rl - a local read-later link store.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rl_core::{Config, LinkDraft, LinkStore, ListOptions, ReadStatus, StoreError};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "rl")]
#[command(about = "rl - save links now, read them later")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log store activity to stderr (or the configured log file)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this database file instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Use this config file instead of ~/.config/rl/config.toml
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a link (or update the one saved for the same URL)
    Add {
        /// URL to save
        url: String,
        /// Title
        #[arg(short, long, default_value = "")]
        title: String,
        /// Note
        #[arg(short, long, default_value = "")]
        note: String,
        /// Comma separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// List links (unread by default)
    #[command(alias = "ls")]
    List {
        /// Show only read links
        #[arg(long, conflicts_with = "all")]
        read: bool,
        /// Show read and unread links
        #[arg(short, long)]
        all: bool,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Show at most this many links
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Open a link in the default browser
    Open {
        /// Link ID
        id: String,
    },
    /// Mark a link as read
    Done {
        /// Link ID
        id: String,
    },
    /// Mark a link as unread
    Undo {
        /// Link ID
        id: String,
    },
    /// Delete links
    #[command(alias = "delete")]
    Rm {
        /// Link IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Export all links as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import links from a JSON export
    Import {
        /// JSON file produced by `rl export`
        file: PathBuf,
    },
    /// Full-text search over URL, title, note and tags
    #[command(alias = "search")]
    Grep {
        /// Search terms (FTS5 query syntax)
        #[arg(required = true)]
        query: Vec<String>,
    },
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
        /// Configuration key (data_dir, db_path, busy_timeout_ms, timezone, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let format = OutputFormat::from_flags(cli.json, cli.quiet);

    // Config commands work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        let output = Output::new(format, Default::default());
        return handle_config_command(command.clone(), cli.config_file.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    if let Some(path) = cli.db_path {
        config.db_path = Some(path);
    }

    init_logging(&config, cli.verbose);

    let output = Output::new(format, config.timezone);
    let mut store = LinkStore::open(&config)
        .with_context(|| format!("Failed to open database {:?}", config.database_path()))?;
    debug!("Using database {:?}", config.database_path());

    match cli.command {
        Commands::Add {
            url,
            title,
            note,
            tags,
        } => {
            let draft = LinkDraft::new(url).title(title).note(note).tags(&tags);
            commands::link::add(&mut store, draft, &output)
        }
        Commands::List {
            read,
            all,
            tag,
            limit,
        } => {
            let read_status = if all {
                ReadStatus::All
            } else if read {
                ReadStatus::Read
            } else {
                ReadStatus::Unread
            };
            let opts = ListOptions {
                read_status,
                tag,
                limit,
            };
            commands::link::list(&store, opts, &output)
        }
        Commands::Open { id } => commands::link::open(&store, &id, &output),
        Commands::Done { id } => commands::link::done(&mut store, &id, &output),
        Commands::Undo { id } => commands::link::undo(&mut store, &id, &output),
        Commands::Rm { ids } => commands::link::remove(&mut store, &ids, &output),
        Commands::Export { output: path } => {
            commands::link::export(&store, path.as_deref(), &output)
        }
        Commands::Import { file } => commands::link::import(&mut store, &file, &output),
        Commands::Grep { query } => commands::link::search(&store, &query.join(" "), &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// RUST_LOG wins when set. Otherwise rl's own crates log at `warn`, or
/// `debug` with --verbose. Logs go to `log_file` when configured.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rl_core={},rl_cli={}", level, level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    let _ = match &config.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                builder.with_writer(std::io::stderr).try_init()
            }
        },
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

/// Print an error chain with a hint when one applies
fn report_error(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);

    let suggestion = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .and_then(StoreError::recovery_suggestion);
    if let Some(hint) = suggestion {
        eprintln!("Hint: {}", hint);
    }
}
