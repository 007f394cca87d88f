//! Cardsync CLI - Mirror GitHub issues onto a Trello board
//!
//! Issues assigned to or mentioning the user become cards, their comments
//! become card comments, and cards of issues that left the open set are
//! archived.

mod commands;

use std::path::PathBuf;

use cardsync_core::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CheckArgs, ConfigArgs, SyncArgs};

/// Cardsync: keep a Trello board in step with your GitHub issues
#[derive(Parser, Debug)]
#[command(name = "cardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/cardsync/config.toml)
    #[arg(short, long, global = true, env = "CARDSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync open issues onto the board
    #[command(visible_alias = "s")]
    Sync(SyncArgs),

    /// Connect to GitHub and Trello and validate the configuration
    Check(CheckArgs),

    /// Show current configuration
    Config(ConfigArgs),

    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_with_overrides(cli.config.as_deref())?;

    if cli.verbose {
        tracing::debug!(
            board = %config.trello.board,
            user = ?config.github.user,
            org = ?config.github.org,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Sync(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Check(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Config(args)) => {
            args.execute(&config, cli.config.as_deref())?;
        }
        Some(Commands::Version) => {
            println!("cardsync {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("Cardsync - Mirror GitHub issues onto a Trello board");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
