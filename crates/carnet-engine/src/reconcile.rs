//! The reconciliation decision engine
//!
//! One record at a time: resolve identity, match against the snapshot,
//! decide NEW / UPDATE / ADOPT / SKIP, then execute. Preview walks the
//! exact same path and only suppresses the writes.

use tracing::{debug, info, instrument, warn};

use carnet_directory::entry::{ContactCard, DirectoryEntry, EntryTags, NewContact, RemoteId};
use carnet_directory::traits::Directory;
use carnet_source::SourceRecord;

use crate::email;
use crate::index::{self, SyncKey};
use crate::naming;
use crate::options::RunOptions;
use crate::report::{Decision, PlannedAction, ProcessedRecord};
use crate::snapshot::DirectorySnapshot;

pub struct Reconciler<'a> {
    directory: &'a dyn Directory,
    list_id: &'a str,
    apply: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a dyn Directory, options: &'a RunOptions) -> Self {
        Self {
            directory,
            list_id: &options.list_id,
            apply: options.apply,
        }
    }

    /// Reconcile one record against the snapshot.
    ///
    /// `key` is present for records that carried a source identifier;
    /// identifier-less records are matched by email only.
    #[instrument(skip(self, key, record, snapshot), fields(line = record.line_number))]
    pub async fn process(
        &self,
        key: Option<&SyncKey>,
        record: &SourceRecord,
        snapshot: &DirectorySnapshot,
    ) -> ProcessedRecord {
        let display_name = naming::display_name(record);
        let address = email::normalize_candidates(record.email_candidates());

        let matched = key
            .and_then(|k| snapshot.by_key(k.as_str()))
            .or_else(|| address.as_deref().and_then(|a| snapshot.by_email(a)));

        if let Some(entry) = matched {
            return self
                .update_entry(key, record, entry, display_name, address)
                .await;
        }

        let Some(address) = address else {
            return skip_unusable_email(key, record, display_name);
        };

        let recipients = match self.directory.find_recipients(&address).await {
            Ok(recipients) => recipients,
            Err(err) => {
                let decision = decision_for(
                    record,
                    key,
                    display_name.as_deref(),
                    Some(&address),
                    PlannedAction::Create,
                );
                warn!(email = %address, error = %err, "recipient lookup failed");
                return ProcessedRecord::failed(decision, format!("recipient lookup failed: {err}"));
            }
        };

        match recipients.as_slice() {
            [] => self.create_entry(key, record, display_name, address).await,
            [single] if single.kind.is_adoptable() => {
                let id = single.id.clone();
                self.adopt_recipient(key, record, id, display_name, address)
                    .await
            }
            _ => {
                let kinds: Vec<&str> = recipients.iter().map(|r| r.kind.as_str()).collect();
                let decision = decision_for(
                    record,
                    key,
                    display_name.as_deref(),
                    Some(&address),
                    PlannedAction::SkipConflict,
                );
                log_decision(&decision);
                ProcessedRecord::skipped(
                    decision,
                    format!("address already in use by: {}", kinds.join(", ")),
                )
            }
        }
    }

    /// Reassert identity, visibility and mirrored data on a matched entry.
    ///
    /// Every field is rewritten even when unchanged, converging entries
    /// that drifted through manual edits.
    async fn update_entry(
        &self,
        key: Option<&SyncKey>,
        record: &SourceRecord,
        entry: &DirectoryEntry,
        display_name: Option<String>,
        address: Option<String>,
    ) -> ProcessedRecord {
        // Identifier-less records keep whatever key the entry already
        // carries; overwriting it would orphan the entry for removal
        // protection purposes.
        let effective_key = match key {
            Some(k) => Some(k.to_string()),
            None => entry.tags.sync_key.clone(),
        };
        let display_name = display_name.unwrap_or_else(|| entry.display_name.clone());

        let decision = Decision {
            line: Some(record.line_number),
            sync_key: effective_key.clone(),
            display_name: Some(display_name.clone()),
            email: address.clone(),
            action: PlannedAction::Update,
        };
        log_decision(&decision);

        if !self.apply {
            info!(id = %entry.id, "would update directory entry");
            return ProcessedRecord::completed(decision);
        }

        let tags = EntryTags::new(self.list_id, effective_key);
        if let Err(err) = self
            .directory
            .update_identity(&entry.id, &display_name, &tags)
            .await
        {
            warn!(id = %entry.id, error = %err, "identity update failed");
            return ProcessedRecord::failed(decision, format!("identity update failed: {err}"));
        }

        if entry.hidden {
            if let Err(err) = self.directory.set_visibility(&entry.id, false).await {
                warn!(id = %entry.id, error = %err, "unhide failed");
                return ProcessedRecord::failed(decision, format!("unhide failed: {err}"));
            }
        }

        self.stamp_extras(&entry.id, record).await;
        if let Some(address) = &address {
            self.refresh_external_email(entry, address).await;
        }
        self.mirror_card(&entry.id, record).await;

        ProcessedRecord::completed(decision)
    }

    /// Create a new entry, stamp it, and mirror the secondary data.
    async fn create_entry(
        &self,
        key: Option<&SyncKey>,
        record: &SourceRecord,
        display_name: Option<String>,
        address: String,
    ) -> ProcessedRecord {
        // A record reaches this point only with a usable address, and the
        // display name chain falls back to the raw email candidate.
        let display_name = display_name.unwrap_or_else(|| address.clone());
        let short_name = naming::short_name(&display_name, record.identifier().unwrap_or(""));

        let decision = decision_for(
            record,
            key,
            Some(&display_name),
            Some(&address),
            PlannedAction::Create,
        );
        log_decision(&decision);

        if !self.apply {
            info!(name = %short_name, "would create directory entry");
            return ProcessedRecord::completed(decision);
        }

        let contact = NewContact {
            name: short_name,
            display_name: display_name.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            external_email: address,
        };
        let id = match self.directory.create_contact(&contact).await {
            Ok(id) => id,
            Err(err) => {
                warn!(name = %contact.name, error = %err, "contact creation failed");
                return ProcessedRecord::failed(decision, format!("creation failed: {err}"));
            }
        };

        let tags = EntryTags::new(self.list_id, decision.sync_key.clone());
        if let Err(err) = self
            .directory
            .update_identity(&id, &display_name, &tags)
            .await
        {
            // The entry exists but is untagged; the next run adopts it
            // back through its address.
            warn!(id = %id, error = %err, "tagging of the new entry failed");
            return ProcessedRecord::failed(decision, format!("tagging failed: {err}"));
        }

        self.stamp_extras(&id, record).await;
        self.mirror_card(&id, record).await;

        ProcessedRecord::completed(decision)
    }

    /// Take ownership of an existing plain mail contact.
    async fn adopt_recipient(
        &self,
        key: Option<&SyncKey>,
        record: &SourceRecord,
        id: RemoteId,
        display_name: Option<String>,
        address: String,
    ) -> ProcessedRecord {
        let display_name = display_name.unwrap_or_else(|| address.clone());

        let decision = decision_for(
            record,
            key,
            Some(&display_name),
            Some(&address),
            PlannedAction::Adopt,
        );
        log_decision(&decision);

        if !self.apply {
            info!(id = %id, "would adopt existing mail contact");
            return ProcessedRecord::completed(decision);
        }

        let tags = EntryTags::new(self.list_id, decision.sync_key.clone());
        if let Err(err) = self
            .directory
            .update_identity(&id, &display_name, &tags)
            .await
        {
            warn!(id = %id, error = %err, "adoption failed");
            return ProcessedRecord::failed(decision, format!("adoption failed: {err}"));
        }

        // The recipient lookup does not expose visibility, so reassert it.
        if let Err(err) = self.directory.set_visibility(&id, false).await {
            warn!(id = %id, error = %err, "unhide failed");
            return ProcessedRecord::failed(decision, format!("unhide failed: {err}"));
        }

        self.stamp_extras(&id, record).await;
        self.mirror_card(&id, record).await;

        ProcessedRecord::completed(decision)
    }

    async fn stamp_extras(&self, id: &RemoteId, record: &SourceRecord) {
        let payload = index::extras_payload(record);
        if let Err(err) = self.directory.set_extras(id, payload.as_deref()).await {
            debug!(id = %id, error = %err, "extras payload write failed, continuing");
        }
    }

    /// Update the external address when it differs, tolerating rejection.
    async fn refresh_external_email(&self, entry: &DirectoryEntry, address: &str) {
        let current = entry
            .external_email
            .as_deref()
            .and_then(|a| email::normalize(email::strip_address_type(a)));
        if current.as_deref() == Some(address) {
            return;
        }
        if let Err(err) = self.directory.set_external_email(&entry.id, address).await {
            warn!(id = %entry.id, error = %err, "external address update failed, keeping the current one");
        }
    }

    async fn mirror_card(&self, id: &RemoteId, record: &SourceRecord) {
        let card = contact_card(record);
        if let Err(err) = self.directory.update_contact_card(id, &card).await {
            debug!(id = %id, error = %err, "contact card mirroring failed, continuing");
        }
    }
}

/// Build the contact card mirrored onto an entry.
pub fn contact_card(record: &SourceRecord) -> ContactCard {
    ContactCard {
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        title: record.title.clone(),
        department: record.department.clone(),
        company: record.organization.clone(),
        street: record.street.clone(),
        postal_code: record.postal_code.clone(),
        city: record.city.clone(),
        phone: record.phone.clone(),
        mobile: record.mobile.clone(),
        notes: index::notes_block(record),
    }
}

fn skip_unusable_email(
    key: Option<&SyncKey>,
    record: &SourceRecord,
    display_name: Option<String>,
) -> ProcessedRecord {
    let (action, detail) = if record.has_email_candidate() {
        let raw: Vec<&str> = record.email_candidates().collect();
        (
            PlannedAction::SkipInvalidEmail,
            format!("no candidate survived validation: {}", raw.join(", ")),
        )
    } else {
        (PlannedAction::SkipMissingEmail, "no email candidate supplied".to_string())
    };

    let decision = decision_for(record, key, display_name.as_deref(), None, action);
    log_decision(&decision);
    ProcessedRecord::skipped(decision, detail)
}

fn decision_for(
    record: &SourceRecord,
    key: Option<&SyncKey>,
    display_name: Option<&str>,
    email: Option<&str>,
    action: PlannedAction,
) -> Decision {
    Decision {
        line: Some(record.line_number),
        sync_key: key.map(|k| k.to_string()),
        display_name: display_name.map(String::from),
        email: email.map(String::from),
        action,
    }
}

pub(crate) fn log_decision(decision: &Decision) {
    info!(
        key = decision.sync_key.as_deref().unwrap_or("-"),
        name = decision.display_name.as_deref().unwrap_or("-"),
        email = decision.email.as_deref().unwrap_or("-"),
        action = decision.action.as_str(),
        "reconciliation decision"
    );
}
