//! NoteSync CLI - Command-line interface for NoteSync
//!
//! Provides commands for:
//! - Managing sync targets and groups
//! - Running syncs, on demand or on a schedule
//! - Fetching single files of folder targets
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    add::AddCommand, completions::CompletionsCommand, config::ConfigCommand, edit::EditCommand,
    fetch::FetchCommand, group::GroupCommand, list::ListCommand, remove::RemoveCommand,
    show::ShowCommand, sync::SyncCommand, watch::WatchCommand, Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "notesync",
    version,
    about = "Keep local copies of notes published behind public links"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a sync target
    Add(AddCommand),
    /// Add a group to organize targets
    Group(GroupCommand),
    /// Change a target's title, URL or parent
    Edit(EditCommand),
    /// Remove a target and its local copy
    Remove(RemoveCommand),
    /// List targets as a tree
    List(ListCommand),
    /// Show details of one target
    Show(ShowCommand),
    /// Synchronize targets now
    Sync(SyncCommand),
    /// Download one file of a folder target
    Fetch(FetchCommand),
    /// Sync all targets periodically until interrupted
    Watch(WatchCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter when `RUST_LOG` is not set
fn default_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    match verbose {
        0 if quiet => "warn".to_string(),
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = Context::new(cli.config.clone(), OutputFormat::from_json_flag(cli.json));
    let config = ctx.load_config();

    // Setup tracing
    let filter = default_filter(cli.verbose, cli.quiet, &config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Add(cmd) => cmd.execute(&ctx).await,
        Commands::Group(cmd) => cmd.execute(&ctx).await,
        Commands::Edit(cmd) => cmd.execute(&ctx).await,
        Commands::Remove(cmd) => cmd.execute(&ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Show(cmd) => cmd.execute(&ctx).await,
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Fetch(cmd) => cmd.execute(&ctx).await,
        Commands::Watch(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
