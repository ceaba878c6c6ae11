//! Typed source records
//!
//! One record per data row of the batch, with schema fields typed and all
//! remaining columns preserved in order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single contact record from the source batch.
///
/// Every field is trimmed during parsing; blank fields are absent. The
/// `extras` map holds the non-empty values of columns outside the schema,
/// in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// 1-based line number (header = 1, first data row = 2).
    pub line_number: i32,
    /// Stable record identifier within the source list, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Fixed phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Mobile phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    /// Primary email candidate, raw as found in the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Secondary email candidate, raw as found in the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Non-schema columns, in source order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extras: IndexMap<String, String>,
}

impl SourceRecord {
    /// Raw email candidates in priority order: primary column first, then
    /// the secondary one. Blank candidates are skipped.
    pub fn email_candidates(&self) -> impl Iterator<Item = &str> {
        self.email
            .as_deref()
            .into_iter()
            .chain(self.email_alt.as_deref())
            .filter(|c| !c.trim().is_empty())
    }

    /// Check whether any non-blank email candidate exists.
    pub fn has_email_candidate(&self) -> bool {
        self.email_candidates().next().is_some()
    }

    /// The record identifier, if non-blank.
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
