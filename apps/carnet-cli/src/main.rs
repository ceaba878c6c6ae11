//! carnet CLI - Reconcile contact batches against a directory
//!
//! This CLI enables operators to:
//! - Preview the operations a batch would trigger
//! - Apply creates, updates, and adoptions to the directory
//! - Prune managed entries that dropped out of the batch
//! - Provision the per-list dynamic distribution group

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod logging;

use error::CliResult;

/// carnet - Contact list reconciliation
#[derive(Parser)]
#[command(name = "carnet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a CSV contact batch against the directory
    Sync(commands::sync::SyncArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_logging("info");

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
    }
}
