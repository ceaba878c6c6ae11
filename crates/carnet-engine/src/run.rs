//! Run orchestration
//!
//! Sequence of a run: connectivity check, group provisioning, snapshot,
//! keyed records, identifier-less records, then orphan removal. Every
//! remote call is awaited to completion before the next one starts.

use tracing::{info, instrument, warn};

use carnet_directory::traits::Directory;
use carnet_source::SourceRecord;

use crate::error::{EngineError, EngineResult};
use crate::groups::GroupProvisioner;
use crate::index::BatchIndex;
use crate::options::RunOptions;
use crate::reconcile::{log_decision, Reconciler};
use crate::removal::{self, RemovalMode};
use crate::report::{Decision, PlannedAction, ProcessedRecord, RunSummary};
use crate::snapshot::DirectorySnapshot;

/// A full reconciliation run over one batch.
pub struct SyncRun<'a> {
    directory: &'a dyn Directory,
    options: RunOptions,
}

impl<'a> SyncRun<'a> {
    pub fn new(directory: &'a dyn Directory, options: RunOptions) -> Self {
        Self { directory, options }
    }

    /// Execute the run and return its summary.
    ///
    /// Errors only on run-fatal conditions: unreachable directory, failed
    /// snapshot, failed group provisioning. Per-record failures land in
    /// the summary instead.
    #[instrument(skip_all, fields(list = %self.options.list_id, records = records.len()))]
    pub async fn execute(&self, records: Vec<SourceRecord>) -> EngineResult<RunSummary> {
        self.directory
            .test_connection()
            .await
            .map_err(EngineError::Connectivity)?;
        info!(
            backend = self.directory.backend_name(),
            "directory connection verified"
        );

        let mut summary = RunSummary::new(&self.options.list_id, !self.options.apply);

        if self.options.provision_group {
            let provisioner = GroupProvisioner::new(self.directory, &self.options);
            summary.group = Some(provisioner.ensure().await?);
        }

        let snapshot = DirectorySnapshot::fetch(self.directory).await?;
        let index = BatchIndex::build(&self.options.list_id, records);
        summary.duplicate_keys = index.duplicate_keys();
        info!(
            managed = snapshot.len(),
            keyed = index.keyed().count(),
            unkeyed = index.unkeyed().count(),
            "reconciling batch against directory"
        );

        let reconciler = Reconciler::new(self.directory, &self.options);
        for (key, record) in index.keyed() {
            let processed = reconciler.process(Some(key), record, &snapshot).await;
            summary.add(processed);
        }
        for record in index.unkeyed() {
            let processed = reconciler.process(None, record, &snapshot).await;
            summary.add(processed);
        }

        if self.options.prune {
            self.remove_orphans(&snapshot, &index, &mut summary).await;
        }

        summary.finish();
        info!(
            created = summary.created,
            updated = summary.updated,
            hidden = summary.hidden,
            removed = summary.removed,
            conflicts = summary.conflicts,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }

    async fn remove_orphans(
        &self,
        snapshot: &DirectorySnapshot,
        index: &BatchIndex,
        summary: &mut RunSummary,
    ) {
        let mode = self.options.removal_mode();
        let action = match mode {
            RemovalMode::Hide => PlannedAction::Hide,
            RemovalMode::Delete => PlannedAction::Delete,
        };

        for entry in removal::plan(snapshot, index, &self.options.list_id, mode) {
            let decision = Decision {
                line: None,
                sync_key: entry.tags.sync_key.clone(),
                display_name: Some(entry.display_name.clone()),
                email: entry.external_email.clone(),
                action,
            };
            log_decision(&decision);

            if !self.options.apply {
                info!(id = %entry.id, action = %action, "would remove orphaned entry");
                summary.add(ProcessedRecord::completed(decision));
                continue;
            }

            let result = match mode {
                RemovalMode::Hide => self.directory.set_visibility(&entry.id, true).await,
                RemovalMode::Delete => self.directory.delete_entry(&entry.id).await,
            };
            match result {
                Ok(()) => summary.add(ProcessedRecord::completed(decision)),
                Err(err) => {
                    warn!(id = %entry.id, error = %err, "orphan removal failed");
                    summary.add(ProcessedRecord::failed(
                        decision,
                        format!("removal failed: {err}"),
                    ));
                }
            }
        }
    }
}
