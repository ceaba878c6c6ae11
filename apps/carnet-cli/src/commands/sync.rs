//! Sync command - Reconcile a CSV contact batch against the directory

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use carnet_directory::memory::MemoryDirectory;
use carnet_directory::traits::Directory;
use carnet_engine::{RunOptions, SyncRun};
use carnet_source::{Batch, BatchReader, ColumnMap, Delimiter};

use crate::error::{CliError, CliResult};

/// Arguments for the sync command
#[derive(Args)]
pub struct SyncArgs {
    /// Path to the CSV contact batch
    pub csv: PathBuf,

    /// List identity the batch belongs to
    #[arg(long)]
    pub list: String,

    /// Write the planned operations instead of previewing them
    #[arg(long)]
    pub apply: bool,

    /// Hide (or delete) managed entries of this list that left the batch
    #[arg(long)]
    pub prune: bool,

    /// Delete pruned entries outright instead of hiding them
    #[arg(long, requires = "prune")]
    pub hard_delete: bool,

    /// Run against an empty in-memory directory
    #[arg(long)]
    pub offline: bool,

    /// Mail domain for the distribution group address
    #[arg(long)]
    pub mail_domain: Option<String>,

    /// JSON file with column mapping overrides
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Field delimiter (','  ';'  'tab'  '|'); sniffed from the header when absent
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Provision the per-list distribution group (default)
    #[arg(long, overrides_with = "no_group")]
    pub group: bool,

    /// Skip distribution group provisioning
    #[arg(long, overrides_with = "group")]
    pub no_group: bool,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs) -> CliResult<()> {
    let batch = load_batch(&args)?;

    let options = RunOptions::new(&args.list)
        .with_apply(args.apply)
        .with_prune(args.prune)
        .with_hard_delete(args.hard_delete)
        .with_group(!args.no_group)
        .with_mail_domain(args.mail_domain.clone());

    let directory = backend(&args)?;
    let run = SyncRun::new(directory.as_ref(), options);
    let summary = run.execute(batch.records).await?;

    print!("{summary}");

    if summary.has_failures() {
        return Err(CliError::PartialFailure {
            failed: summary.failed,
        });
    }

    Ok(())
}

/// Load the batch, logging per-row rejects without aborting.
fn load_batch(args: &SyncArgs) -> CliResult<Batch> {
    let mapping = match &args.mapping {
        Some(path) => ColumnMap::from_json_file(path)?,
        None => ColumnMap::default(),
    };

    let mut reader = BatchReader::new().with_mapping(mapping);
    if let Some(value) = &args.delimiter {
        reader = reader.with_delimiter(Delimiter::parse(value)?);
    }

    let batch = reader.read_path(&args.csv)?;
    info!(
        path = %args.csv.display(),
        records = batch.records.len(),
        rejected = batch.errors.len(),
        delimiter = %batch.delimiter,
        "batch loaded"
    );
    for row in &batch.errors {
        warn!(line = row.line_number, "row rejected: {}", row.message);
    }

    Ok(batch)
}

/// Pick the directory backend for this run.
fn backend(args: &SyncArgs) -> CliResult<Box<dyn Directory>> {
    if args.offline {
        return Ok(Box::new(MemoryDirectory::new()));
    }
    Err(CliError::Validation(
        "no remote directory backend is configured in this build; run with --offline".to_string(),
    ))
}
