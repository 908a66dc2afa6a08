mod context;
mod evidence;
mod scores;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::context::RunContext;
use crate::evidence::EvidenceCommands;
use crate::scores::ScoreCommands;

#[derive(Debug, Parser)]
#[command(name = "conductdb-cli")]
#[command(about = "conductdb command line interface")]
struct Cli {
    /// Reference tables file; overrides `CONDUCTDB_REFERENCE_PATH`
    #[arg(long, global = true)]
    reference: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deduplicate and verify batches of events
    Evidence {
        #[command(subcommand)]
        command: EvidenceCommands,
    },
    /// Score brands and inspect confidence or community outlook
    Score {
        #[command(subcommand)]
        command: ScoreCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("conductdb-cli: pass a subcommand, or --help for usage");
        return Ok(());
    };

    let ctx = RunContext::load(cli.reference.as_deref())?;
    match command {
        Commands::Evidence { command } => evidence::run(&ctx, command),
        Commands::Score { command } => scores::run(&ctx, command).await,
    }
}

#[cfg(test)]
mod tests;
