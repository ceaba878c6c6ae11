//! Orphan removal planning

use carnet_directory::entry::DirectoryEntry;

use crate::index::BatchIndex;
use crate::snapshot::DirectorySnapshot;

/// What happens to entries of the list that dropped out of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Reassert hidden on orphaned entries, keeping them addressable.
    Hide,
    /// Delete orphaned entries permanently.
    Delete,
}

/// Select the orphaned entries of one list.
///
/// Scope rules:
/// - only entries tagged with the current list identity;
/// - entries without a sync key never become removal candidates;
/// - in hide mode, entries already hidden are left alone.
pub fn plan<'a>(
    snapshot: &'a DirectorySnapshot,
    index: &BatchIndex,
    list_id: &str,
    mode: RemovalMode,
) -> Vec<&'a DirectoryEntry> {
    snapshot
        .entries()
        .filter(|entry| entry.tags.list_id == list_id)
        .filter(|entry| {
            entry
                .tags
                .sync_key
                .as_deref()
                .map(str::trim)
                .is_some_and(|key| !key.is_empty() && !index.contains_key(key))
        })
        .filter(|entry| mode == RemovalMode::Delete || !entry.hidden)
        .collect()
}
