//! Reconciliation engine: decides and executes the minimal set of
//! directory operations that make a contact list match its source batch.
//!
//! A run walks a fixed sequence:
//!
//! 1. connectivity check, then dynamic group provisioning;
//! 2. snapshot of every managed entry, indexed by key and by address;
//! 3. one decision per record: create, update, adopt, or skip;
//! 4. optional removal of entries that dropped out of the batch.
//!
//! Preview mode walks the same sequence without issuing a single write,
//! and an offline run points the engine at an empty in-memory directory.

pub mod email;
pub mod error;
pub mod groups;
pub mod index;
pub mod naming;
pub mod options;
pub mod reconcile;
pub mod removal;
pub mod report;
pub mod run;
pub mod snapshot;

pub use error::{EngineError, EngineResult};
pub use index::{BatchIndex, SyncKey};
pub use options::RunOptions;
pub use reconcile::Reconciler;
pub use removal::RemovalMode;
pub use report::{GroupOutcome, PlannedAction, ProcessedRecord, RecordStatus, RunSummary};
pub use run::SyncRun;
pub use snapshot::DirectorySnapshot;
