//! Directory service contract
//!
//! The single seam between the reconciliation engine and a concrete
//! address-book backend. Implementations talk to a remote directory;
//! [`MemoryDirectory`](crate::memory::MemoryDirectory) backs offline runs
//! and tests.

use async_trait::async_trait;

use crate::entry::{
    ContactCard, DirectoryEntry, DynamicGroup, DynamicGroupSpec, EntryTags, NewContact, Recipient,
    RemoteId,
};
use crate::error::DirectoryResult;
use crate::filter::GroupFilter;

/// Operations the reconciliation engine needs from an address-book
/// directory.
///
/// Every method maps to one remote call. Implementations must not retry on
/// their own; the engine decides what a failure means for the record being
/// processed.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Get a short name for the backend, used in logs.
    fn backend_name(&self) -> &str;

    /// Verify the session before a run starts.
    ///
    /// A failure here aborts the whole run.
    async fn test_connection(&self) -> DirectoryResult<()>;

    /// List every entry carrying the ownership marker, across all lists.
    ///
    /// The result feeds the pre-run snapshot; entries without the marker
    /// are invisible to the engine.
    async fn list_managed(&self) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Find every recipient object whose address matches, of any kind.
    ///
    /// Used for the conflict check before creating a contact. Matching is
    /// case-insensitive on the address part.
    async fn find_recipients(&self, address: &str) -> DirectoryResult<Vec<Recipient>>;

    /// Create a new mail contact.
    ///
    /// # Returns
    /// The remote identifier of the created entry. The entry carries no
    /// provenance tags yet; the caller stamps them with
    /// [`update_identity`](Directory::update_identity).
    async fn create_contact(&self, contact: &NewContact) -> DirectoryResult<RemoteId>;

    /// Reassert display name and provenance tags on an entry.
    ///
    /// This is the primary write of an update: a failure marks the record
    /// as failed.
    async fn update_identity(
        &self,
        id: &RemoteId,
        display_name: &str,
        tags: &EntryTags,
    ) -> DirectoryResult<()>;

    /// Set the external email address of an entry.
    async fn set_external_email(&self, id: &RemoteId, address: &str) -> DirectoryResult<()>;

    /// Set or clear the serialized extras payload of an entry.
    async fn set_extras(&self, id: &RemoteId, payload: Option<&str>) -> DirectoryResult<()>;

    /// Hide or expose an entry in address lists.
    async fn set_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()>;

    /// Mirror personal and organizational fields onto the contact card.
    async fn update_contact_card(&self, id: &RemoteId, card: &ContactCard) -> DirectoryResult<()>;

    /// Permanently delete an entry.
    async fn delete_entry(&self, id: &RemoteId) -> DirectoryResult<()>;

    /// Find a dynamic distribution group by name.
    async fn find_group(&self, name: &str) -> DirectoryResult<Option<DynamicGroup>>;

    /// Create a dynamic distribution group.
    async fn create_group(&self, spec: &DynamicGroupSpec) -> DirectoryResult<RemoteId>;

    /// Replace the membership filter of a group.
    async fn update_group_filter(
        &self,
        id: &RemoteId,
        filter: &GroupFilter,
    ) -> DirectoryResult<()>;

    /// Hide or expose a group in address lists.
    async fn set_group_visibility(&self, id: &RemoteId, hidden: bool) -> DirectoryResult<()>;
}
