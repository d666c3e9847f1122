//! shopsync: mirror a storefront into a local tree and back.
//!
//! # Usage
//!
//! ```text
//! shopsync list [themes|assets|pages|blogs|menus|scripts|redirects] [--theme <name>]
//! shopsync pull [KIND...] [--theme <name>] [--force] [-n] [--filter-created <ts>]
//! shopsync push [KIND...] [--theme <name>] [--force] [-n]
//! shopsync init <theme> [--simple|--details] [--no-git]
//! shopsync publish --theme <name>
//! shopsync serve [--theme <name>] [--no-git]
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    init::InitArgs, list::ListArgs, publish::PublishArgs, pull::PullArgs, push::PushArgs,
    serve::ServeArgs, Globals,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "shopsync",
    version,
    about = "Sync a storefront's themes and content with a local directory",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List themes, or the remote records of one kind.
    List(ListArgs),

    /// Pull remote changes into the output directory (defaults to the published theme).
    Pull(PullArgs),

    /// Push local changes up to the store (defaults to the published theme).
    Push(PushArgs),

    /// Rebuild a theme's edit history locally, one git commit per change set.
    Init(InitArgs),

    /// Make a theme the published one.
    Publish(PublishArgs),

    /// Upload edits to an ephemeral development theme as they happen.
    Serve(ServeArgs),
}

impl Commands {
    async fn run(self, globals: &Globals) -> Result<()> {
        match self {
            Commands::List(args) => args.run(globals).await,
            Commands::Pull(args) => args.run(globals).await,
            Commands::Push(args) => args.run(globals).await,
            Commands::Init(args) => args.run(globals).await,
            Commands::Publish(args) => args.run(globals).await,
            Commands::Serve(args) => args.run(globals).await,
        }
    }
}

fn init_tracing(globals: &Globals) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if globals.debug {
        "debug"
    } else if globals.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.globals);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(cli.command.run(&cli.globals))
}
