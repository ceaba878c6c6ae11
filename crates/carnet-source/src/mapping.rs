//! Column mapping
//!
//! Resolves logical record fields to header names. The default mapping
//! matches the production export (French Microsoft Lists headers); a JSON
//! file can override any subset of it for other locales.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// Logical field names accepted in mapping overrides.
pub const LOGICAL_FIELDS: &[&str] = &[
    "id",
    "first_name",
    "last_name",
    "organization",
    "title",
    "department",
    "street",
    "postal_code",
    "city",
    "phone",
    "mobile",
    "email",
    "email_alt",
    "notes",
];

/// Header name for each logical record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub title: String,
    pub department: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub mobile: String,
    pub email: String,
    pub email_alt: String,
    pub notes: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            first_name: "Prénom".to_string(),
            last_name: "Nom".to_string(),
            organization: "Organisation".to_string(),
            title: "Fonction".to_string(),
            department: "Département".to_string(),
            street: "Adresse_1".to_string(),
            postal_code: "Code_postal".to_string(),
            city: "Commune".to_string(),
            phone: "Tel_Fixe".to_string(),
            mobile: "Tel_Mobile".to_string(),
            email: "Mail_Pro".to_string(),
            email_alt: "Mail_Perso".to_string(),
            notes: "Notes".to_string(),
        }
    }
}

impl ColumnMap {
    /// Apply overrides keyed by logical field name.
    ///
    /// Unknown logical names are rejected so a typo in a mapping file
    /// surfaces immediately instead of silently dropping a column.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> SourceResult<()> {
        for (field, header) in overrides {
            let slot = match field.as_str() {
                "id" => &mut self.id,
                "first_name" => &mut self.first_name,
                "last_name" => &mut self.last_name,
                "organization" => &mut self.organization,
                "title" => &mut self.title,
                "department" => &mut self.department,
                "street" => &mut self.street,
                "postal_code" => &mut self.postal_code,
                "city" => &mut self.city,
                "phone" => &mut self.phone,
                "mobile" => &mut self.mobile,
                "email" => &mut self.email,
                "email_alt" => &mut self.email_alt,
                "notes" => &mut self.notes,
                other => {
                    return Err(SourceError::InvalidMapping {
                        message: format!(
                            "unknown field '{other}'; valid fields: {}",
                            LOGICAL_FIELDS.join(", ")
                        ),
                    })
                }
            };
            *slot = header.clone();
        }
        Ok(())
    }

    /// Build a mapping from the default preset plus JSON overrides.
    ///
    /// The JSON document is a flat object: `{"email": "E-Mail", ...}`.
    pub fn from_json_str(json: &str) -> SourceResult<Self> {
        let overrides: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| SourceError::InvalidMapping {
                message: e.to_string(),
            })?;
        let mut map = Self::default();
        map.apply_overrides(&overrides)?;
        Ok(map)
    }

    /// Load a mapping override file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Resolve header positions for every logical field.
    ///
    /// Matching is case-insensitive on trimmed header names. The first
    /// occurrence binds the field; later duplicates fall through to the
    /// extras list like any unmapped column.
    pub fn resolve(&self, headers: &[String]) -> ResolvedColumns {
        let mut resolved = ResolvedColumns::default();
        for (idx, raw) in headers.iter().enumerate() {
            let header = raw.trim();
            let slot = self.slot_for(header, &resolved);
            match slot {
                Some(slot) => *slot_mut(&mut resolved, slot) = Some(idx),
                None => {
                    if !header.is_empty() {
                        resolved.extras.push((header.to_string(), idx));
                    }
                }
            }
        }
        resolved
    }

    fn slot_for(&self, header: &str, resolved: &ResolvedColumns) -> Option<Slot> {
        // Unicode-aware compare: headers like Prénom and Département must
        // match regardless of case.
        let eq = |mapped: &str| {
            let mapped = mapped.trim();
            mapped == header || mapped.to_lowercase() == header.to_lowercase()
        };

        if resolved.id.is_none() && eq(&self.id) {
            Some(Slot::Id)
        } else if resolved.first_name.is_none() && eq(&self.first_name) {
            Some(Slot::FirstName)
        } else if resolved.last_name.is_none() && eq(&self.last_name) {
            Some(Slot::LastName)
        } else if resolved.organization.is_none() && eq(&self.organization) {
            Some(Slot::Organization)
        } else if resolved.title.is_none() && eq(&self.title) {
            Some(Slot::Title)
        } else if resolved.department.is_none() && eq(&self.department) {
            Some(Slot::Department)
        } else if resolved.street.is_none() && eq(&self.street) {
            Some(Slot::Street)
        } else if resolved.postal_code.is_none() && eq(&self.postal_code) {
            Some(Slot::PostalCode)
        } else if resolved.city.is_none() && eq(&self.city) {
            Some(Slot::City)
        } else if resolved.phone.is_none() && eq(&self.phone) {
            Some(Slot::Phone)
        } else if resolved.mobile.is_none() && eq(&self.mobile) {
            Some(Slot::Mobile)
        } else if resolved.email.is_none() && eq(&self.email) {
            Some(Slot::Email)
        } else if resolved.email_alt.is_none() && eq(&self.email_alt) {
            Some(Slot::EmailAlt)
        } else if resolved.notes.is_none() && eq(&self.notes) {
            Some(Slot::Notes)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Id,
    FirstName,
    LastName,
    Organization,
    Title,
    Department,
    Street,
    PostalCode,
    City,
    Phone,
    Mobile,
    Email,
    EmailAlt,
    Notes,
}

fn slot_mut(resolved: &mut ResolvedColumns, slot: Slot) -> &mut Option<usize> {
    match slot {
        Slot::Id => &mut resolved.id,
        Slot::FirstName => &mut resolved.first_name,
        Slot::LastName => &mut resolved.last_name,
        Slot::Organization => &mut resolved.organization,
        Slot::Title => &mut resolved.title,
        Slot::Department => &mut resolved.department,
        Slot::Street => &mut resolved.street,
        Slot::PostalCode => &mut resolved.postal_code,
        Slot::City => &mut resolved.city,
        Slot::Phone => &mut resolved.phone,
        Slot::Mobile => &mut resolved.mobile,
        Slot::Email => &mut resolved.email,
        Slot::EmailAlt => &mut resolved.email_alt,
        Slot::Notes => &mut resolved.notes,
    }
}

/// Header index of each logical field, plus unmapped columns in order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    pub id: Option<usize>,
    pub first_name: Option<usize>,
    pub last_name: Option<usize>,
    pub organization: Option<usize>,
    pub title: Option<usize>,
    pub department: Option<usize>,
    pub street: Option<usize>,
    pub postal_code: Option<usize>,
    pub city: Option<usize>,
    pub phone: Option<usize>,
    pub mobile: Option<usize>,
    pub email: Option<usize>,
    pub email_alt: Option<usize>,
    pub notes: Option<usize>,
    /// Unmapped columns: (header name, index), in source order.
    pub extras: Vec<(String, usize)>,
}

impl ResolvedColumns {
    /// Number of schema fields found in the header.
    pub fn schema_hits(&self) -> usize {
        [
            self.id,
            self.first_name,
            self.last_name,
            self.organization,
            self.title,
            self.department,
            self.street,
            self.postal_code,
            self.city,
            self.phone,
            self.mobile,
            self.email,
            self.email_alt,
            self.notes,
        ]
        .iter()
        .filter(|idx| idx.is_some())
        .count()
    }
}
