//! Batch indexing by synchronization key

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use carnet_source::SourceRecord;

use crate::email;

/// Separator between the list identity and the record identifier.
pub const KEY_SEPARATOR: char = ':';

/// Synchronization key tying a directory entry to a batch record.
///
/// Formatted as `<list>:<identifier>`. Entries are matched by key first
/// and by email address second, so the key is what makes repeated runs
/// idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncKey(String);

impl SyncKey {
    pub fn new(list_id: &str, identifier: &str) -> Self {
        Self(format!("{list_id}{KEY_SEPARATOR}{identifier}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SyncKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where a record lives inside the index.
#[derive(Debug)]
enum RecordRef {
    Keyed(SyncKey),
    Unkeyed(usize),
}

/// A batch split into keyed records (by synchronization key, input order
/// preserved) and identifier-less records, with a secondary index by the
/// record's resolved email address.
#[derive(Debug, Default)]
pub struct BatchIndex {
    keyed: IndexMap<SyncKey, SourceRecord>,
    unkeyed: Vec<SourceRecord>,
    by_email: HashMap<String, RecordRef>,
    duplicate_keys: usize,
}

impl BatchIndex {
    /// Index a batch under a list identity.
    ///
    /// Duplicate identifiers keep the last occurrence; each replaced
    /// occurrence is counted and logged. Records sharing one resolved
    /// address keep the first occurrence in the email index.
    pub fn build(list_id: &str, records: Vec<SourceRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            match record.identifier() {
                Some(id) => {
                    let key = SyncKey::new(list_id, id);
                    if let Some(replaced) = index.keyed.insert(key.clone(), record) {
                        index.duplicate_keys += 1;
                        warn!(
                            key = %key,
                            replaced_line = replaced.line_number,
                            "duplicate identifier in batch, keeping the last occurrence"
                        );
                    }
                }
                None => index.unkeyed.push(record),
            }
        }

        let refs: Vec<(Option<String>, RecordRef)> = index
            .keyed
            .iter()
            .map(|(key, record)| (resolved_address(record), RecordRef::Keyed(key.clone())))
            .chain(
                index
                    .unkeyed
                    .iter()
                    .enumerate()
                    .map(|(pos, record)| (resolved_address(record), RecordRef::Unkeyed(pos))),
            )
            .collect();
        for (address, record_ref) in refs {
            let Some(address) = address else { continue };
            if index.by_email.contains_key(&address) {
                warn!(address, "several records resolve to the same address");
            } else {
                index.by_email.insert(address, record_ref);
            }
        }

        index
    }

    /// Check whether a raw key string belongs to this batch.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keyed.contains_key(key)
    }

    /// Look up the record that resolved to a normalized address.
    pub fn by_email(&self, normalized: &str) -> Option<&SourceRecord> {
        match self.by_email.get(normalized)? {
            RecordRef::Keyed(key) => self.keyed.get(key.as_str()),
            RecordRef::Unkeyed(pos) => self.unkeyed.get(*pos),
        }
    }

    pub fn keyed(&self) -> impl Iterator<Item = (&SyncKey, &SourceRecord)> {
        self.keyed.iter()
    }

    pub fn unkeyed(&self) -> impl Iterator<Item = &SourceRecord> {
        self.unkeyed.iter()
    }

    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    pub fn len(&self) -> usize {
        self.keyed.len() + self.unkeyed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolved_address(record: &SourceRecord) -> Option<String> {
    email::normalize_candidates(record.email_candidates())
}

/// Serialize the extra columns of a record as a compact JSON object,
/// preserving column order. `None` when the record has none.
pub fn extras_payload(record: &SourceRecord) -> Option<String> {
    if record.extras.is_empty() {
        return None;
    }
    match serde_json::to_string(&record.extras) {
        Ok(json) => Some(json),
        Err(err) => {
            warn!(
                line = record.line_number,
                error = %err,
                "failed to serialize extra columns, dropping the payload"
            );
            None
        }
    }
}

/// Aggregate free-text notes and extra columns into a single notes block,
/// one `Name: value` line per extra column.
pub fn notes_block(record: &SourceRecord) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    if let Some(notes) = record.notes.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(notes.to_string());
    }
    for (name, value) in &record.extras {
        let value = value.trim();
        if !value.is_empty() {
            lines.push(format!("{name}: {value}"));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
