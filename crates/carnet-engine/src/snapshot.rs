//! Indexed snapshot of the managed directory entries

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;

use tracing::{debug, warn};

use carnet_directory::entry::DirectoryEntry;
use carnet_directory::traits::Directory;

use crate::email;
use crate::error::{EngineError, EngineResult};

/// All entries owned by this process, across every list identity,
/// indexed by synchronization key and by normalized external email.
///
/// Rebuilt from scratch at the start of every run; never mutated while
/// a run is in flight.
#[derive(Debug, Default)]
pub struct DirectorySnapshot {
    entries: Vec<DirectoryEntry>,
    by_key: HashMap<String, usize>,
    by_email: HashMap<String, usize>,
}

impl DirectorySnapshot {
    /// Fetch the managed entries from the directory and index them.
    pub async fn fetch(directory: &dyn Directory) -> EngineResult<Self> {
        let entries = directory
            .list_managed()
            .await
            .map_err(EngineError::SnapshotFailed)?;
        debug!(entries = entries.len(), "fetched managed directory entries");
        Ok(Self::from_entries(entries))
    }

    /// An empty snapshot, the offline substitute for [`Self::fetch`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index a pre-fetched entry set.
    ///
    /// Collisions keep the first entry seen: a later entry sharing a key
    /// or an address stays in the snapshot but is not reachable through
    /// that index.
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        let mut snapshot = Self {
            entries,
            ..Self::default()
        };

        for (pos, entry) in snapshot.entries.iter().enumerate() {
            if let Some(key) = entry
                .tags
                .sync_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
            {
                match snapshot.by_key.entry(key.to_string()) {
                    MapEntry::Vacant(slot) => {
                        slot.insert(pos);
                    }
                    MapEntry::Occupied(_) => {
                        warn!(key, id = %entry.id, "several entries share a synchronization key, keeping the first");
                    }
                }
            }

            if let Some(address) = entry
                .external_email
                .as_deref()
                .and_then(|a| email::normalize(email::strip_address_type(a)))
            {
                match snapshot.by_email.entry(address) {
                    MapEntry::Vacant(slot) => {
                        slot.insert(pos);
                    }
                    MapEntry::Occupied(slot) => {
                        warn!(address = %slot.key(), id = %entry.id, "several entries share an external address, keeping the first");
                    }
                }
            }
        }

        snapshot
    }

    pub fn by_key(&self, key: &str) -> Option<&DirectoryEntry> {
        self.by_key.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn by_email(&self, normalized: &str) -> Option<&DirectoryEntry> {
        self.by_email.get(normalized).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
