//! Reconciliation Run Tests
//!
//! End-to-end runs of `SyncRun` against the in-memory directory:
//! - creation, key matching, email fallback and adoption
//! - skip paths (missing email, invalid email, address conflicts)
//! - orphan removal in hide and delete modes
//! - preview mode and write failure isolation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use carnet_directory::entry::{
    ContactCard, DirectoryEntry, DynamicGroup, DynamicGroupSpec, EntryTags, NewContact, Recipient,
    RecipientKind, RemoteId,
};
use carnet_directory::error::{DirectoryError, DirectoryResult};
use carnet_directory::filter::GroupFilter;
use carnet_directory::memory::MemoryDirectory;
use carnet_directory::traits::Directory;
use carnet_engine::{EngineError, RunOptions, RunSummary, SyncRun};
use carnet_source::SourceRecord;

// =============================================================================
// Manual Mock Directory Implementation
// =============================================================================

/// Directory wrapper that can be told to fail specific operations and
/// counts the write calls it forwards.
pub struct FlakyDirectory {
    inner: MemoryDirectory,
    fail_create: AtomicBool,
    fail_update_identity: AtomicBool,
    fail_set_extras: AtomicBool,
    fail_set_email: AtomicBool,
    fail_find_group: AtomicBool,
    create_calls: AtomicUsize,
    update_identity_calls: AtomicUsize,
    visibility_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FlakyDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryDirectory::new(),
            fail_create: AtomicBool::new(false),
            fail_update_identity: AtomicBool::new(false),
            fail_set_extras: AtomicBool::new(false),
            fail_set_email: AtomicBool::new(false),
            fail_find_group: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            update_identity_calls: AtomicUsize::new(0),
            visibility_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_create_error(self) -> Self {
        self.fail_create.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_update_identity_error(self) -> Self {
        self.fail_update_identity.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_extras_error(self) -> Self {
        self.fail_set_extras.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_email_error(self) -> Self {
        self.fail_set_email.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_group_error(self) -> Self {
        self.fail_find_group.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_update_identity_error(&self, fail: bool) {
        self.fail_update_identity.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryDirectory {
        &self.inner
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_identity_calls(&self) -> usize {
        self.update_identity_calls.load(Ordering::SeqCst)
    }

    pub fn visibility_calls(&self) -> usize {
        self.visibility_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for FlakyDirectory {
    fn backend_name(&self) -> &str {
        "flaky"
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        self.inner.test_connection().await
    }

    async fn list_managed(&self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.inner.list_managed().await
    }

    async fn find_recipients(&self, address: &str) -> DirectoryResult<Vec<Recipient>> {
        self.inner.find_recipients(address).await
    }

    async fn create_contact(&self, contact: &NewContact) -> DirectoryResult<RemoteId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DirectoryError::unavailable("creation refused"));
        }
        self.inner.create_contact(contact).await
    }

    async fn update_identity(
        &self,
        id: &RemoteId,
        display_name: &str,
        tags: &EntryTags,
    ) -> DirectoryResult<()> {
        self.update_identity_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update_identity.load(Ordering::SeqCst) {
            return Err(DirectoryError::unavailable("identity update refused"));
        }
        self.inner.update_identity(id, display_name, tags).await
    }

    async fn set_external_email(&self, id: &RemoteId, address: &str) -> DirectoryResult<()> {
        if self.fail_set_email.load(Ordering::SeqCst) {
            return Err(DirectoryError::validation_rejected("address refused"));
        }
        self.inner.set_external_email(id, address).await
    }

    async fn set_extras(&self, id: &RemoteId, payload: Option<&str>) -> DirectoryResult<()> {
        if self.fail_set_extras.load(Ordering::SeqCst) {
            return Err(DirectoryError::unavailable("extras write refused"));
        }
        self.inner.set_extras(id, payload).await
    }

    async fn set_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()> {
        self.visibility_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set_visibility(id, hidden).await
    }

    async fn update_contact_card(&self, id: &RemoteId, card: &ContactCard) -> DirectoryResult<()> {
        self.inner.update_contact_card(id, card).await
    }

    async fn delete_entry(&self, id: &RemoteId) -> DirectoryResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_entry(id).await
    }

    async fn find_group(&self, name: &str) -> DirectoryResult<Option<DynamicGroup>> {
        if self.fail_find_group.load(Ordering::SeqCst) {
            return Err(DirectoryError::unavailable("group lookup refused"));
        }
        self.inner.find_group(name).await
    }

    async fn create_group(&self, spec: &DynamicGroupSpec) -> DirectoryResult<RemoteId> {
        self.inner.create_group(spec).await
    }

    async fn update_group_filter(&self, id: &RemoteId, filter: &GroupFilter) -> DirectoryResult<()> {
        self.inner.update_group_filter(id, filter).await
    }

    async fn set_group_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()> {
        self.inner.set_group_visibility(id, hidden).await
    }
}

// =============================================================================
// Test Fixtures & Helpers
// =============================================================================

fn record(id: Option<&str>, first: &str, last: &str, email: Option<&str>) -> SourceRecord {
    SourceRecord {
        line_number: 2,
        id: id.map(String::from),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        email: email.map(String::from),
        ..SourceRecord::default()
    }
}

fn preview_options() -> RunOptions {
    RunOptions::new("Sport")
}

fn apply_options() -> RunOptions {
    RunOptions::new("Sport").with_apply(true)
}

async fn seed_managed(
    directory: &MemoryDirectory,
    list: &str,
    key: Option<&str>,
    display: &str,
    email: Option<&str>,
    hidden: bool,
) -> RemoteId {
    let tags = EntryTags::new(list, key.map(String::from));
    let mut entry = DirectoryEntry::new(RemoteId::new("placeholder"), display, tags);
    entry.external_email = email.map(String::from);
    entry.hidden = hidden;
    directory.seed_entry(entry, ContactCard::default()).await
}

async fn execute(
    directory: &dyn Directory,
    options: RunOptions,
    records: Vec<SourceRecord>,
) -> RunSummary {
    SyncRun::new(directory, options)
        .execute(records)
        .await
        .expect("run should not abort")
}

async fn managed_by_key(directory: &MemoryDirectory, key: &str) -> DirectoryEntry {
    directory
        .entries()
        .await
        .into_iter()
        .find(|e| e.tags.sync_key.as_deref() == Some(key))
        .expect("entry with key should exist")
}

// =============================================================================
// Creation Tests
// =============================================================================

mod creation_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_record_creates_tagged_entry() {
        let directory = MemoryDirectory::new();
        let mut rec = record(Some("42"), "Jean", "Dupont", Some("jean.dupont@example.com"));
        rec.city = Some("Lyon".to_string());
        rec.extras.insert("Zone".to_string(), "Nord".to_string());

        let summary = execute(&directory, apply_options(), vec![rec]).await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);
        assert!(!summary.preview);

        let entry = managed_by_key(&directory, "Sport:42").await;
        assert!(entry.is_managed());
        assert_eq!(entry.tags.list_id, "Sport");
        assert_eq!(entry.display_name, "Jean Dupont");
        assert_eq!(entry.external_email.as_deref(), Some("jean.dupont@example.com"));
        assert_eq!(entry.extras.as_deref(), Some(r#"{"Zone":"Nord"}"#));

        let card = directory.card(&entry.id).await.expect("card should exist");
        assert_eq!(card.city.as_deref(), Some("Lyon"));
        assert_eq!(card.notes.as_deref(), Some("Zone: Nord"));
    }

    #[tokio::test]
    async fn test_identifier_less_record_creates_keyless_entry() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(None, "Marie", "Curie", Some("marie@example.com"))],
        )
        .await;

        assert_eq!(summary.created, 1);
        let entries = directory.entries().await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_managed());
        assert!(entries[0].tags.sync_key.is_none());
    }

    #[tokio::test]
    async fn test_create_failure_marks_record_failed() {
        let directory = FlakyDirectory::new().with_create_error();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.created, 0);
        assert_eq!(summary.failed, 1);
        assert!(directory.inner().entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_tagging_failure_heals_on_next_run() {
        let directory = FlakyDirectory::new().with_update_identity_error();
        let batch = || vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))];

        let summary = execute(&directory, apply_options(), batch()).await;
        assert_eq!(summary.failed, 1);
        // The contact exists but the tagging write was refused.
        assert_eq!(directory.inner().entries().await.len(), 1);
        assert!(directory.inner().list_managed().await.unwrap().is_empty());

        directory.set_update_identity_error(false);
        let summary = execute(&directory, apply_options(), batch()).await;
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);

        let entries = directory.inner().entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tags.sync_key.as_deref(), Some("Sport:42"));
    }
}

// =============================================================================
// Matching & Update Tests
// =============================================================================

mod matching_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let directory = MemoryDirectory::new();
        let batch = || {
            vec![
                record(Some("1"), "Jean", "Dupont", Some("jean@example.com")),
                record(Some("2"), "Marie", "Curie", Some("marie@example.com")),
            ]
        };

        let first = execute(&directory, apply_options(), batch()).await;
        assert_eq!(first.created, 2);
        assert_eq!(first.group, Some(carnet_engine::GroupOutcome::Created));

        let second = execute(&directory, apply_options(), batch()).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(second.failed, 0);
        assert_eq!(second.group, Some(carnet_engine::GroupOutcome::Unchanged));
        assert_eq!(directory.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_key_match_updates_and_unhides() {
        let directory = MemoryDirectory::new();
        let id = seed_managed(
            &directory,
            "Sport",
            Some("Sport:7"),
            "Old Name",
            Some("old@example.com"),
            true,
        )
        .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("7"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);

        let entry = directory.entry(&id).await.unwrap();
        assert!(!entry.hidden);
        assert_eq!(entry.display_name, "Jean Dupont");
        assert_eq!(entry.external_email.as_deref(), Some("jean@example.com"));
    }

    #[tokio::test]
    async fn test_email_match_stamps_missing_key() {
        let directory = MemoryDirectory::new();
        let id = seed_managed(
            &directory,
            "Sport",
            None,
            "Jean Dupont",
            Some("jean@example.com"),
            false,
        )
        .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.updated, 1);
        let entry = directory.entry(&id).await.unwrap();
        assert_eq!(entry.tags.sync_key.as_deref(), Some("Sport:42"));
    }

    #[tokio::test]
    async fn test_email_match_ignores_case_and_whitespace() {
        let directory = MemoryDirectory::new();
        seed_managed(
            &directory,
            "Sport",
            Some("Sport:9"),
            "Jean Dupont",
            Some("SMTP:Jean.Dupont@Example.com"),
            false,
        )
        .await;

        // Different identifier, so the key misses and the email matches.
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("99"), "Jean", "Dupont", Some(" Jean.Dupont@EXAMPLE.com "))],
        )
        .await;

        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(directory.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_identifier_less_record_never_matches_by_key() {
        let directory = MemoryDirectory::new();
        seed_managed(
            &directory,
            "Sport",
            Some("Sport:"),
            "Keyed Oddity",
            Some("oddity@example.com"),
            false,
        )
        .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(None, "Marie", "Curie", Some("marie@example.com"))],
        )
        .await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(directory.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_keep_last_record() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options(),
            vec![
                record(Some("42"), "Jean", "Dupont", Some("first@example.com")),
                record(Some("42"), "Jean", "Dupont", Some("second@example.com")),
            ],
        )
        .await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.duplicate_keys, 1);
        let entry = managed_by_key(&directory, "Sport:42").await;
        assert_eq!(entry.external_email.as_deref(), Some("second@example.com"));
    }

    #[tokio::test]
    async fn test_update_failure_marks_record_failed() {
        let directory = FlakyDirectory::new();
        seed_managed(
            directory.inner(),
            "Sport",
            Some("Sport:7"),
            "Old Name",
            Some("old@example.com"),
            false,
        )
        .await;

        let directory = directory.with_update_identity_error();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("7"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 1);
        let entry = managed_by_key(directory.inner(), "Sport:7").await;
        assert_eq!(entry.display_name, "Old Name");
    }

    #[tokio::test]
    async fn test_extras_failure_does_not_fail_record() {
        let directory = FlakyDirectory::new().with_extras_error();
        seed_managed(
            directory.inner(),
            "Sport",
            Some("Sport:7"),
            "Jean Dupont",
            Some("jean@example.com"),
            false,
        )
        .await;

        let mut rec = record(Some("7"), "Jean", "Dupont", Some("jean@example.com"));
        rec.extras.insert("Zone".to_string(), "Nord".to_string());
        let summary = execute(&directory, apply_options(), vec![rec]).await;

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_rejected_address_update_is_tolerated() {
        let directory = FlakyDirectory::new().with_email_error();
        seed_managed(
            directory.inner(),
            "Sport",
            Some("Sport:7"),
            "Jean Dupont",
            Some("old@example.com"),
            false,
        )
        .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("7"), "Jean", "Dupont", Some("new@example.com"))],
        )
        .await;

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);
        let entry = managed_by_key(directory.inner(), "Sport:7").await;
        assert_eq!(entry.external_email.as_deref(), Some("old@example.com"));
    }
}

// =============================================================================
// Conflict & Adoption Tests
// =============================================================================

mod conflict_tests {
    use super::*;

    #[tokio::test]
    async fn test_adopts_single_foreign_mail_contact() {
        let directory = MemoryDirectory::new();
        let id = directory
            .seed_foreign_contact("Jean Dupont", "jean@example.com")
            .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.conflicts, 0);

        let entry = directory.entry(&id).await.unwrap();
        assert!(entry.is_managed());
        assert_eq!(entry.tags.sync_key.as_deref(), Some("Sport:42"));
        assert!(!entry.hidden);
    }

    #[tokio::test]
    async fn test_mailbox_owner_is_a_conflict() {
        let directory = MemoryDirectory::new();
        directory
            .seed_recipient(RecipientKind::UserMailbox, "Jean Interne", "jean@example.com")
            .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.created, 0);
        assert_eq!(summary.conflicts, 1);
        assert!(directory.entries().await.is_empty());

        let conflict = &summary.records[0];
        assert!(conflict.detail.as_deref().unwrap().contains("user_mailbox"));
    }

    #[tokio::test]
    async fn test_multiple_recipients_are_a_conflict() {
        let directory = MemoryDirectory::new();
        directory
            .seed_foreign_contact("Jean Contact", "jean@example.com")
            .await;
        directory
            .seed_recipient(RecipientKind::DistributionGroup, "Equipe", "jean@example.com")
            .await;

        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean@example.com"))],
        )
        .await;

        assert_eq!(summary.conflicts, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 0);
    }
}

// =============================================================================
// Skip & Normalization Tests
// =============================================================================

mod skip_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_email_is_skipped() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", None)],
        )
        .await;

        assert_eq!(summary.skipped_missing_email, 1);
        assert_eq!(summary.created, 0);
        assert!(directory.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email_is_skipped_with_diagnostic() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("not an address"))],
        )
        .await;

        assert_eq!(summary.skipped_invalid_email, 1);
        assert_eq!(summary.skipped_missing_email, 0);
        let skip = &summary.records[0];
        assert!(skip.detail.as_deref().unwrap().contains("not an address"));
    }

    #[tokio::test]
    async fn test_secondary_candidate_used_when_primary_invalid() {
        let directory = MemoryDirectory::new();
        let mut rec = record(Some("42"), "Jean", "Dupont", Some("broken@@example.com"));
        rec.email_alt = Some("jean.perso@example.com".to_string());

        let summary = execute(&directory, apply_options(), vec![rec]).await;

        assert_eq!(summary.created, 1);
        let entry = managed_by_key(&directory, "Sport:42").await;
        assert_eq!(entry.external_email.as_deref(), Some("jean.perso@example.com"));
    }

    #[tokio::test]
    async fn test_doubled_dots_are_repaired() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options(),
            vec![record(Some("42"), "Jean", "Dupont", Some("jean..dupont@ex..ample..com"))],
        )
        .await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped_invalid_email, 0);
        let entry = managed_by_key(&directory, "Sport:42").await;
        assert_eq!(entry.external_email.as_deref(), Some("jean.dupont@ex.ample.com"));
    }
}

// =============================================================================
// Removal Tests
// =============================================================================

mod removal_tests {
    use super::*;

    async fn seeded_lists(directory: &MemoryDirectory) {
        seed_managed(
            directory,
            "Sport",
            Some("Sport:1"),
            "Reste",
            Some("reste@example.com"),
            false,
        )
        .await;
        seed_managed(
            directory,
            "Sport",
            Some("Sport:2"),
            "Parti",
            Some("parti@example.com"),
            false,
        )
        .await;
        seed_managed(
            directory,
            "Culture",
            Some("Culture:9"),
            "Autre Liste",
            Some("autre@example.com"),
            false,
        )
        .await;
    }

    fn batch_with_one() -> Vec<SourceRecord> {
        vec![record(Some("1"), "Reste", "Ici", Some("reste@example.com"))]
    }

    #[tokio::test]
    async fn test_prune_hides_orphans_of_current_list_only() {
        let directory = MemoryDirectory::new();
        seeded_lists(&directory).await;

        let summary = execute(
            &directory,
            apply_options().with_prune(true),
            batch_with_one(),
        )
        .await;

        assert_eq!(summary.hidden, 1);
        assert_eq!(summary.removed, 0);
        assert_eq!(directory.entries().await.len(), 3);

        let orphan = managed_by_key(&directory, "Sport:2").await;
        assert!(orphan.hidden);
        let other_list = managed_by_key(&directory, "Culture:9").await;
        assert!(!other_list.hidden);
    }

    #[tokio::test]
    async fn test_hard_delete_removes_orphans() {
        let directory = MemoryDirectory::new();
        seeded_lists(&directory).await;

        let summary = execute(
            &directory,
            apply_options().with_prune(true).with_hard_delete(true),
            batch_with_one(),
        )
        .await;

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.hidden, 0);

        let remaining = directory.entries().await;
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .all(|e| e.tags.sync_key.as_deref() != Some("Sport:2")));
    }

    #[tokio::test]
    async fn test_second_prune_run_changes_nothing() {
        let directory = MemoryDirectory::new();
        seeded_lists(&directory).await;

        let first = execute(
            &directory,
            apply_options().with_prune(true),
            batch_with_one(),
        )
        .await;
        assert_eq!(first.hidden, 1);

        let second = execute(
            &directory,
            apply_options().with_prune(true),
            batch_with_one(),
        )
        .await;
        assert_eq!(second.hidden, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn test_keyless_entries_are_never_removed() {
        let directory = MemoryDirectory::new();
        seed_managed(
            &directory,
            "Sport",
            None,
            "Sans Cle",
            Some("sanscle@example.com"),
            false,
        )
        .await;

        let summary = execute(
            &directory,
            apply_options().with_prune(true).with_hard_delete(true),
            Vec::new(),
        )
        .await;

        assert_eq!(summary.removed, 0);
        assert_eq!(summary.hidden, 0);
        assert_eq!(directory.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_orphans_stay_without_prune_flag() {
        let directory = MemoryDirectory::new();
        seeded_lists(&directory).await;

        let summary = execute(&directory, apply_options(), batch_with_one()).await;

        assert_eq!(summary.hidden, 0);
        assert_eq!(summary.removed, 0);
        assert!(!managed_by_key(&directory, "Sport:2").await.hidden);
    }
}

// =============================================================================
// Preview, Offline & Group Tests
// =============================================================================

mod preview_tests {
    use super::*;

    #[tokio::test]
    async fn test_preview_computes_decisions_without_writes() {
        let directory = FlakyDirectory::new();
        seed_managed(
            directory.inner(),
            "Sport",
            Some("Sport:1"),
            "Jean Dupont",
            Some("jean@example.com"),
            false,
        )
        .await;
        seed_managed(
            directory.inner(),
            "Sport",
            Some("Sport:2"),
            "Parti",
            Some("parti@example.com"),
            false,
        )
        .await;

        let summary = execute(
            &directory,
            preview_options().with_prune(true).with_hard_delete(true),
            vec![
                record(Some("1"), "Jean", "Dupont", Some("jean@example.com")),
                record(Some("3"), "Marie", "Curie", Some("marie@example.com")),
            ],
        )
        .await;

        assert!(summary.preview);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.removed, 1);

        assert_eq!(directory.create_calls(), 0);
        assert_eq!(directory.update_identity_calls(), 0);
        assert_eq!(directory.visibility_calls(), 0);
        assert_eq!(directory.delete_calls(), 0);
        assert_eq!(directory.inner().entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_offline_run_reports_everything_as_new() {
        // Offline substitutes an empty in-memory directory.
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            preview_options(),
            vec![
                record(Some("1"), "Jean", "Dupont", Some("jean@example.com")),
                record(None, "Marie", "Curie", Some("marie@example.com")),
            ],
        )
        .await;

        assert_eq!(summary.created, 2);
        assert!(directory.entries().await.is_empty());
        assert!(directory.groups().await.is_empty());
    }
}

mod group_tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_run_provisions_group() {
        let directory = MemoryDirectory::new();
        let summary = execute(
            &directory,
            apply_options().with_mail_domain(Some("ville.example.org".to_string())),
            Vec::new(),
        )
        .await;

        assert_eq!(summary.group, Some(carnet_engine::GroupOutcome::Created));
        let groups = directory.groups().await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Contacts-Sport");
        assert_eq!(
            groups[0].address.as_deref(),
            Some("contacts-sport@ville.example.org")
        );
        assert_eq!(groups[0].filter, GroupFilter::list_scope("Sport"));
    }

    #[tokio::test]
    async fn test_no_group_flag_skips_provisioning() {
        let directory = MemoryDirectory::new();
        let summary = execute(&directory, apply_options().with_group(false), Vec::new()).await;

        assert_eq!(summary.group, None);
        assert!(directory.groups().await.is_empty());
    }

    #[tokio::test]
    async fn test_group_failure_aborts_the_run() {
        let directory = FlakyDirectory::new().with_group_error();
        let result = SyncRun::new(&directory, apply_options())
            .execute(vec![record(Some("1"), "Jean", "Dupont", Some("jean@example.com"))])
            .await;

        match result {
            Err(EngineError::GroupProvisioning { list, .. }) => assert_eq!(list, "Sport"),
            other => panic!("expected group provisioning failure, got {other:?}"),
        }
        assert!(directory.inner().entries().await.is_empty());
    }
}
