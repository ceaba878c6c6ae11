//! # Directory Contract
//!
//! Core abstractions for talking to an address-book directory service.
//!
//! This crate defines the objects the reconciliation engine reads and
//! writes (mail contacts, recipients, dynamic distribution groups), the
//! provenance tags that mark an entry as owned by this tool, and the
//! [`Directory`](traits::Directory) trait every backend implements.
//!
//! ## Architecture
//!
//! - [`traits::Directory`] - the single async contract backends implement
//! - [`entry`] - entries, tags, recipients, group definitions
//! - [`filter::GroupFilter`] - membership predicates for dynamic groups
//! - [`error::DirectoryError`] - errors with transient/permanent classification
//! - [`memory::MemoryDirectory`] - in-memory backend for offline runs and tests
//!
//! Entries created or adopted by the engine carry four provenance tags: an
//! ownership marker, the source list identity, a stable sync key, and a
//! serialized payload of extra source fields. Everything else in the
//! directory is invisible to the engine.

pub mod entry;
pub mod error;
pub mod filter;
pub mod memory;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use carnet_directory::prelude::*;
/// ```
pub mod prelude {
    pub use crate::entry::{
        tag_names, ContactCard, DirectoryEntry, DynamicGroup, DynamicGroupSpec, EntryTags,
        NewContact, Recipient, RecipientKind, RemoteId, MANAGED_BY_TAG,
    };
    pub use crate::error::{DirectoryError, DirectoryResult};
    pub use crate::filter::GroupFilter;
    pub use crate::memory::MemoryDirectory;
    pub use crate::traits::Directory;
}
