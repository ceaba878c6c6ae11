//! Membership filters for dynamic groups
//!
//! A small predicate language over entry attributes. Group provisioning
//! compares the remote filter against the desired one structurally, so the
//! serialized form is part of the contract.

use serde::{Deserialize, Serialize};

use crate::entry::{tag_names, DirectoryEntry};

/// Filter predicate over directory entry attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupFilter {
    /// Match entries where the attribute equals the value.
    Equals { attribute: String, value: String },

    /// Match entries where the attribute has any non-empty value.
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<GroupFilter> },

    /// Logical NOT of a filter.
    Not { filter: Box<GroupFilter> },
}

impl GroupFilter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        GroupFilter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute has a value) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        GroupFilter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: GroupFilter) -> Self {
        GroupFilter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    pub fn and_with(self, other: GroupFilter) -> Self {
        match self {
            GroupFilter::And { mut filters } => {
                filters.push(other);
                GroupFilter::And { filters }
            }
            _ => GroupFilter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Filter selecting every managed entry of the given list.
    pub fn list_scope(list_id: impl Into<String>) -> Self {
        GroupFilter::eq(tag_names::LIST_ID, list_id)
    }

    /// Evaluate this filter against an entry.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            GroupFilter::Equals { attribute, value } => {
                attribute_value(entry, attribute).is_some_and(|v| v == value)
            }
            GroupFilter::Present { attribute } => {
                attribute_value(entry, attribute).is_some_and(|v| !v.is_empty())
            }
            GroupFilter::And { filters } => filters.iter().all(|f| f.matches(entry)),
            GroupFilter::Not { filter } => !filter.matches(entry),
        }
    }
}

fn attribute_value<'a>(entry: &'a DirectoryEntry, attribute: &str) -> Option<&'a str> {
    match attribute {
        tag_names::MANAGED_BY => Some(entry.tags.managed_by.as_str()),
        tag_names::LIST_ID => Some(entry.tags.list_id.as_str()),
        tag_names::SYNC_KEY => entry.tags.sync_key.as_deref(),
        tag_names::EXTRAS => entry.extras.as_deref(),
        "display_name" => Some(entry.display_name.as_str()),
        "external_email" => entry.external_email.as_deref(),
        _ => None,
    }
}
