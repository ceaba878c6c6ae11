//! Directory object model
//!
//! Entries, provenance tags, recipients, and dynamic group definitions.

use serde::{Deserialize, Serialize};

use crate::filter::GroupFilter;

/// Marker stored in the first provenance tag of every entry this tool owns.
///
/// Entries without this marker are never updated, hidden, or deleted.
pub const MANAGED_BY_TAG: &str = "carnet";

/// Attribute names used by provenance tags and group filters.
pub mod tag_names {
    /// Ownership marker attribute.
    pub const MANAGED_BY: &str = "managed_by";
    /// Source list identity attribute.
    pub const LIST_ID: &str = "list_id";
    /// Stable sync key attribute (`<list>:<record id>`).
    pub const SYNC_KEY: &str = "sync_key";
    /// Serialized extra-fields payload attribute.
    pub const EXTRAS: &str = "extras";
}

/// Opaque identifier of an object in the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a remote identifier from its string form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Provenance tags stamped on every managed entry.
///
/// The sync key is absent for entries created from records that carried no
/// source identifier; those entries are matched by email only and are never
/// considered by the removal planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTags {
    /// Ownership marker, [`MANAGED_BY_TAG`] for managed entries.
    pub managed_by: String,
    /// Identity of the source list the entry belongs to.
    pub list_id: String,
    /// Stable key `<list>:<record id>`, if the source record had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_key: Option<String>,
}

impl EntryTags {
    /// Create managed tags for the given list and optional sync key.
    pub fn new(list_id: impl Into<String>, sync_key: Option<String>) -> Self {
        Self {
            managed_by: MANAGED_BY_TAG.to_string(),
            list_id: list_id.into(),
            sync_key,
        }
    }

    /// Check whether the ownership marker is present.
    pub fn is_managed(&self) -> bool {
        self.managed_by == MANAGED_BY_TAG
    }
}

/// A mail-enabled contact entry as seen in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Remote identifier.
    pub id: RemoteId,
    /// Display name shown in address lists.
    pub display_name: String,
    /// External email address, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_email: Option<String>,
    /// Whether the entry is hidden from address lists.
    pub hidden: bool,
    /// Provenance tags.
    pub tags: EntryTags,
    /// Serialized extra-fields payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>,
}

impl DirectoryEntry {
    /// Create a visible entry with the given identity fields.
    pub fn new(id: RemoteId, display_name: impl Into<String>, tags: EntryTags) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            external_email: None,
            hidden: false,
            tags,
            extras: None,
        }
    }

    /// Set the external email address.
    #[must_use]
    pub fn with_email(mut self, address: impl Into<String>) -> Self {
        self.external_email = Some(address.into());
        self
    }

    /// Mark the entry hidden from address lists.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Set the serialized extras payload.
    #[must_use]
    pub fn with_extras(mut self, payload: impl Into<String>) -> Self {
        self.extras = Some(payload.into());
        self
    }

    /// Check whether the ownership marker is present.
    pub fn is_managed(&self) -> bool {
        self.tags.is_managed()
    }
}

/// Payload for creating a new mail contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    /// Short internal name, unique within the directory.
    pub name: String,
    /// Display name shown in address lists.
    pub display_name: String,
    /// Given name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// External email address.
    pub external_email: String,
}

/// Personal and organizational fields mirrored onto a contact entry.
///
/// All fields are optional; the directory keeps whatever was last written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ContactCard {
    /// Check whether every field is absent.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.title.is_none()
            && self.department.is_none()
            && self.company.is_none()
            && self.street.is_none()
            && self.postal_code.is_none()
            && self.city.is_none()
            && self.phone.is_none()
            && self.mobile.is_none()
            && self.notes.is_none()
    }
}

/// Kind of recipient object found during an address conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    /// Plain mail contact (external address, no mailbox).
    MailContact,
    /// Mail-enabled user without a mailbox.
    MailUser,
    /// User mailbox.
    UserMailbox,
    /// Shared mailbox.
    SharedMailbox,
    /// Static distribution group.
    DistributionGroup,
    /// Dynamic distribution group.
    DynamicGroup,
    /// Any recipient kind not modeled above.
    Other,
}

impl RecipientKind {
    /// Get the string form of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::MailContact => "mail_contact",
            RecipientKind::MailUser => "mail_user",
            RecipientKind::UserMailbox => "user_mailbox",
            RecipientKind::SharedMailbox => "shared_mailbox",
            RecipientKind::DistributionGroup => "distribution_group",
            RecipientKind::DynamicGroup => "dynamic_group",
            RecipientKind::Other => "other",
        }
    }

    /// Check whether an existing recipient of this kind may be adopted as a
    /// managed entry. Only plain mail contacts qualify; every other kind is
    /// an address conflict.
    pub fn is_adoptable(&self) -> bool {
        matches!(self, RecipientKind::MailContact)
    }
}

impl std::fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recipient object matched by address during a conflict check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Remote identifier.
    pub id: RemoteId,
    /// Display name.
    pub display_name: String,
    /// Recipient kind.
    pub kind: RecipientKind,
    /// Primary address, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Desired state of a per-list dynamic distribution group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGroupSpec {
    /// Group display name.
    pub name: String,
    /// Short alias for the group address, if an address is synthesized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Full group address, if a mail domain is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Membership filter.
    pub filter: GroupFilter,
    /// Whether the group is hidden from address lists. Always false for
    /// provisioned groups; kept explicit so drift can be corrected.
    pub hidden: bool,
}

impl DynamicGroupSpec {
    /// Create a visible group with the given name and filter.
    pub fn new(name: impl Into<String>, filter: GroupFilter) -> Self {
        Self {
            name: name.into(),
            alias: None,
            address: None,
            filter,
            hidden: false,
        }
    }

    /// Set the alias and full address.
    #[must_use]
    pub fn with_address(mut self, alias: impl Into<String>, address: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self.address = Some(address.into());
        self
    }
}

/// A dynamic distribution group as seen in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGroup {
    /// Remote identifier.
    pub id: RemoteId,
    /// Group display name.
    pub name: String,
    /// Membership filter currently in effect.
    pub filter: GroupFilter,
    /// Whether the group is hidden from address lists.
    pub hidden: bool,
    /// Group address, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_managed_marker() {
        let tags = EntryTags::new("Sport", Some("Sport:42".to_string()));
        assert!(tags.is_managed());
        assert_eq!(tags.list_id, "Sport");
        assert_eq!(tags.sync_key.as_deref(), Some("Sport:42"));

        let foreign = EntryTags::default();
        assert!(!foreign.is_managed());
    }

    #[test]
    fn test_entry_builder() {
        let entry = DirectoryEntry::new(
            RemoteId::new("abc"),
            "Jean Dupont",
            EntryTags::new("Sport", None),
        )
        .with_email("jean@example.com")
        .hidden();

        assert_eq!(entry.display_name, "Jean Dupont");
        assert_eq!(entry.external_email.as_deref(), Some("jean@example.com"));
        assert!(entry.hidden);
        assert!(entry.is_managed());
        assert!(entry.extras.is_none());
    }

    #[test]
    fn test_only_mail_contacts_are_adoptable() {
        assert!(RecipientKind::MailContact.is_adoptable());
        for kind in [
            RecipientKind::MailUser,
            RecipientKind::UserMailbox,
            RecipientKind::SharedMailbox,
            RecipientKind::DistributionGroup,
            RecipientKind::DynamicGroup,
            RecipientKind::Other,
        ] {
            assert!(!kind.is_adoptable(), "{kind} must not be adoptable");
        }
    }

    #[test]
    fn test_contact_card_emptiness() {
        let card = ContactCard::default();
        assert!(card.is_empty());

        let card = ContactCard {
            city: Some("Lyon".to_string()),
            ..ContactCard::default()
        };
        assert!(!card.is_empty());
    }

    #[test]
    fn test_group_spec_address() {
        let spec = DynamicGroupSpec::new("Contacts-Sport", GroupFilter::list_scope("Sport"))
            .with_address("contacts-sport", "contacts-sport@example.org");
        assert_eq!(spec.alias.as_deref(), Some("contacts-sport"));
        assert_eq!(spec.address.as_deref(), Some("contacts-sport@example.org"));
        assert!(!spec.hidden);
    }
}
