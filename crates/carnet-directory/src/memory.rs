//! In-memory directory backend
//!
//! Backs offline runs and the engine test suites. Behaves like a small
//! directory service: short names are unique, lookups are case-insensitive
//! on addresses, and mutations fail on missing objects.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entry::{
    ContactCard, DirectoryEntry, DynamicGroup, DynamicGroupSpec, EntryTags, NewContact, Recipient,
    RecipientKind, RemoteId,
};
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::GroupFilter;
use crate::traits::Directory;

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, DirectoryEntry>,
    /// Short internal names, unique across the directory.
    names: HashMap<String, String>,
    cards: HashMap<String, ContactCard>,
    /// Recipient objects that are not mail contacts (mailboxes, groups).
    foreign: Vec<Recipient>,
    groups: HashMap<String, DynamicGroup>,
}

/// A [`Directory`] living entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<State>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry as-is, allocating a remote id.
    ///
    /// Test seeding; use [`Directory::create_contact`] for the real flow.
    pub async fn seed_entry(&self, mut entry: DirectoryEntry, card: ContactCard) -> RemoteId {
        let id = RemoteId::new(Uuid::new_v4().to_string());
        entry.id = id.clone();
        let mut state = self.state.write().await;
        state
            .names
            .insert(id.as_str().to_string(), entry.display_name.clone());
        state.cards.insert(id.as_str().to_string(), card);
        state.entries.insert(id.as_str().to_string(), entry);
        id
    }

    /// Insert an unmanaged mail contact, as if created outside this tool.
    pub async fn seed_foreign_contact(&self, display_name: &str, address: &str) -> RemoteId {
        let id = RemoteId::new(Uuid::new_v4().to_string());
        let entry = DirectoryEntry::new(id.clone(), display_name, EntryTags::default())
            .with_email(address);
        let mut state = self.state.write().await;
        state
            .names
            .insert(id.as_str().to_string(), display_name.to_string());
        state
            .cards
            .insert(id.as_str().to_string(), ContactCard::default());
        state.entries.insert(id.as_str().to_string(), entry);
        id
    }

    /// Insert a recipient that is not a mail contact (mailbox, group...).
    pub async fn seed_recipient(&self, kind: RecipientKind, display_name: &str, address: &str) {
        let recipient = Recipient {
            id: RemoteId::new(Uuid::new_v4().to_string()),
            display_name: display_name.to_string(),
            kind,
            email: Some(address.to_string()),
        };
        self.state.write().await.foreign.push(recipient);
    }

    /// Snapshot of all entries, managed or not.
    pub async fn entries(&self) -> Vec<DirectoryEntry> {
        self.state.read().await.entries.values().cloned().collect()
    }

    /// Get one entry by id.
    pub async fn entry(&self, id: &RemoteId) -> Option<DirectoryEntry> {
        self.state.read().await.entries.get(id.as_str()).cloned()
    }

    /// Get the contact card of an entry.
    pub async fn card(&self, id: &RemoteId) -> Option<ContactCard> {
        self.state.read().await.cards.get(id.as_str()).cloned()
    }

    /// Snapshot of all groups.
    pub async fn groups(&self) -> Vec<DynamicGroup> {
        self.state.read().await.groups.values().cloned().collect()
    }
}

fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl Directory for MemoryDirectory {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        Ok(())
    }

    async fn list_managed(&self) -> DirectoryResult<Vec<DirectoryEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .filter(|e| e.is_managed())
            .cloned()
            .collect())
    }

    async fn find_recipients(&self, address: &str) -> DirectoryResult<Vec<Recipient>> {
        let state = self.state.read().await;
        let mut found: Vec<Recipient> = state
            .entries
            .values()
            .filter(|e| {
                e.external_email
                    .as_deref()
                    .is_some_and(|a| same_address(a, address))
            })
            .map(|e| Recipient {
                id: e.id.clone(),
                display_name: e.display_name.clone(),
                kind: RecipientKind::MailContact,
                email: e.external_email.clone(),
            })
            .collect();
        found.extend(
            state
                .foreign
                .iter()
                .filter(|r| r.email.as_deref().is_some_and(|a| same_address(a, address)))
                .cloned(),
        );
        Ok(found)
    }

    async fn create_contact(&self, contact: &NewContact) -> DirectoryResult<RemoteId> {
        let mut state = self.state.write().await;
        if state.names.values().any(|n| n == &contact.name) {
            return Err(DirectoryError::already_exists(&contact.name));
        }

        let id = RemoteId::new(Uuid::new_v4().to_string());
        let entry = DirectoryEntry::new(id.clone(), &contact.display_name, EntryTags::default())
            .with_email(&contact.external_email);
        let card = ContactCard {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            ..ContactCard::default()
        };
        state.names.insert(id.as_str().to_string(), contact.name.clone());
        state.cards.insert(id.as_str().to_string(), card);
        state.entries.insert(id.as_str().to_string(), entry);
        Ok(id)
    }

    async fn update_identity(
        &self,
        id: &RemoteId,
        display_name: &str,
        tags: &EntryTags,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::entry_not_found(id.as_str()))?;
        entry.display_name = display_name.to_string();
        entry.tags = tags.clone();
        Ok(())
    }

    async fn set_external_email(&self, id: &RemoteId, address: &str) -> DirectoryResult<()> {
        if !address.contains('@') {
            return Err(DirectoryError::validation_rejected(format!(
                "not an smtp address: {address}"
            )));
        }
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::entry_not_found(id.as_str()))?;
        entry.external_email = Some(address.to_string());
        Ok(())
    }

    async fn set_extras(&self, id: &RemoteId, payload: Option<&str>) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::entry_not_found(id.as_str()))?;
        entry.extras = payload.map(String::from);
        Ok(())
    }

    async fn set_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::entry_not_found(id.as_str()))?;
        entry.hidden = hidden;
        Ok(())
    }

    async fn update_contact_card(&self, id: &RemoteId, card: &ContactCard) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if !state.entries.contains_key(id.as_str()) {
            return Err(DirectoryError::entry_not_found(id.as_str()));
        }
        state.cards.insert(id.as_str().to_string(), card.clone());
        Ok(())
    }

    async fn delete_entry(&self, id: &RemoteId) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if state.entries.remove(id.as_str()).is_none() {
            return Err(DirectoryError::entry_not_found(id.as_str()));
        }
        state.names.remove(id.as_str());
        state.cards.remove(id.as_str());
        Ok(())
    }

    async fn find_group(&self, name: &str) -> DirectoryResult<Option<DynamicGroup>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.name == name).cloned())
    }

    async fn create_group(&self, spec: &DynamicGroupSpec) -> DirectoryResult<RemoteId> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.name == spec.name) {
            return Err(DirectoryError::already_exists(&spec.name));
        }
        let id = RemoteId::new(Uuid::new_v4().to_string());
        let group = DynamicGroup {
            id: id.clone(),
            name: spec.name.clone(),
            filter: spec.filter.clone(),
            hidden: spec.hidden,
            address: spec.address.clone(),
        };
        state.groups.insert(id.as_str().to_string(), group);
        Ok(id)
    }

    async fn update_group_filter(
        &self,
        id: &RemoteId,
        filter: &GroupFilter,
    ) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::group_not_found(id.as_str()))?;
        group.filter = filter.clone();
        Ok(())
    }

    async fn set_group_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(id.as_str())
            .ok_or_else(|| DirectoryError::group_not_found(id.as_str()))?;
        group.hidden = hidden;
        Ok(())
    }
}
