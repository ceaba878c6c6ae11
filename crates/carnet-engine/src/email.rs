//! Email normalization and repair
//!
//! Source batches carry addresses typed by hand: stray spaces, mixed case,
//! doubled dots. Normalization produces the canonical form used for
//! matching and for the directory write; the repair pass recovers the
//! common typos instead of skipping the record.

/// Maximum address length accepted.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Characters allowed in the local part of a normalized address.
const LOCAL_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789._%+-";

/// Characters allowed in the domain of a normalized address.
const DOMAIN_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789.-";

/// Normalize a raw address candidate.
///
/// Strips all whitespace, lower-cases, validates, and when validation
/// fails makes one repair attempt (collapse dot runs, trim edge dots)
/// before giving up.
pub fn normalize(raw: &str) -> Option<String> {
    let squeezed: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if squeezed.is_empty() {
        return None;
    }
    if is_valid(&squeezed) {
        return Some(squeezed);
    }
    let repaired = repair(&squeezed);
    if is_valid(&repaired) {
        Some(repaired)
    } else {
        None
    }
}

/// Normalize the first candidate that survives validation.
pub fn normalize_candidates<'a>(candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates.filter_map(normalize).next()
}

/// Remove an address-type prefix (`smtp:`) from a directory-side address.
///
/// Directory exports prefix proxy addresses with their type; the prefix is
/// never part of the address identity.
pub fn strip_address_type(address: &str) -> &str {
    if let Some(idx) = address.find(':') {
        if address[..idx].eq_ignore_ascii_case("smtp") {
            return &address[idx + 1..];
        }
    }
    address
}

/// Validate an already-squeezed, lower-cased address.
pub fn is_valid(address: &str) -> bool {
    if address.is_empty() || address.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if address.contains(char::is_whitespace) {
        return false;
    }

    let mut parts = address.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    if domain.contains('@') || local.is_empty() || domain.is_empty() {
        return false;
    }

    if !local.chars().all(|c| LOCAL_CHARS.contains(c)) {
        return false;
    }
    if !domain.chars().all(|c| DOMAIN_CHARS.contains(c)) {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }
    if address.contains("..") {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    if domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }

    true
}

/// One repair attempt: collapse runs of dots and trim edge dots on both
/// sides of the '@' independently.
fn repair(address: &str) -> String {
    let Some((local, domain)) = address.split_once('@') else {
        return address.to_string();
    };
    format!("{}@{}", clean_part(local), clean_part(domain))
}

fn clean_part(part: &str) -> String {
    let mut cleaned = String::with_capacity(part.len());
    let mut last_was_dot = false;
    for c in part.chars() {
        if c == '.' {
            if last_was_dot {
                continue;
            }
            last_was_dot = true;
        } else {
            last_was_dot = false;
        }
        cleaned.push(c);
    }
    cleaned.trim_matches('.').to_string()
}
