//! Display name resolution and short name synthesis

use carnet_source::SourceRecord;

/// Maximum length of a synthesized short name, in characters.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length kept from a record identifier in a short name suffix.
const MAX_SUFFIX_LENGTH: usize = 10;

/// Resolve the display name of a record.
///
/// Fallback chain: both names, a single name, the organization, the first
/// non-blank email candidate. `None` only when the record carries nothing
/// usable at all.
pub fn display_name(record: &SourceRecord) -> Option<String> {
    let first = record.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let last = record.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (first, last) {
        (Some(first), Some(last)) => return Some(format!("{first} {last}")),
        (Some(single), None) | (None, Some(single)) => return Some(single.to_string()),
        (None, None) => {}
    }

    if let Some(org) = record
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(org.to_string());
    }

    record.email_candidates().next().map(|c| c.trim().to_string())
}

/// Derive the short name suffix from a record identifier.
///
/// Keeps alphanumerics and hyphens only; when longer than ten characters
/// the last ten are kept, the stable end of sequence-style identifiers.
pub fn short_suffix(identifier: &str) -> String {
    let filtered: Vec<char> = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let start = filtered.len().saturating_sub(MAX_SUFFIX_LENGTH);
    filtered[start..].iter().collect()
}

/// Synthesize the short internal name for a new entry.
///
/// The display part is truncated so the combined name never exceeds
/// [`MAX_NAME_LENGTH`] characters.
pub fn short_name(display_name: &str, identifier: &str) -> String {
    let suffix = short_suffix(identifier);
    if suffix.is_empty() {
        return truncate_chars(display_name, MAX_NAME_LENGTH).trim_end().to_string();
    }

    let budget = MAX_NAME_LENGTH - suffix.chars().count() - 1;
    let display_part = truncate_chars(display_name, budget);
    format!("{} {}", display_part.trim_end(), suffix)
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
