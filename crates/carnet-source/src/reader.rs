//! Batch reading
//!
//! Loads a CSV contact batch into typed records. Handles the encodings and
//! delimiters seen in real exports: UTF-8 with or without BOM, Windows-1252
//! fallback, and comma/semicolon/tab/pipe separators with sniffing.

use std::borrow::Cow;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{RowError, SourceError, SourceResult};
use crate::mapping::{ColumnMap, ResolvedColumns};
use crate::record::SourceRecord;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Field delimiter of a CSV batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Comma (,)
    #[default]
    Comma,
    /// Semicolon (;), common in European exports
    Semicolon,
    /// Tab character (\t)
    Tab,
    /// Pipe character (|)
    Pipe,
}

impl Delimiter {
    /// Convert to the byte form the csv crate expects.
    #[must_use]
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    /// Parse a delimiter from string input.
    pub fn parse(s: &str) -> SourceResult<Self> {
        match s {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            "\t" | "tab" | "\\t" => Ok(Delimiter::Tab),
            "|" | "pipe" => Ok(Delimiter::Pipe),
            _ => Err(SourceError::InvalidDelimiter {
                value: s.to_string(),
            }),
        }
    }

    /// Guess the delimiter from the header line by occurrence count.
    ///
    /// Ties favor the comma. Quoting is ignored; a header row with quoted
    /// separators inside column names is not a case the exports produce.
    pub fn sniff(header_line: &str) -> Self {
        let candidates = [
            (Delimiter::Comma, header_line.matches(',').count()),
            (Delimiter::Semicolon, header_line.matches(';').count()),
            (Delimiter::Tab, header_line.matches('\t').count()),
            (Delimiter::Pipe, header_line.matches('|').count()),
        ];
        candidates
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .filter(|(_, count)| *count > 0)
            .map(|(delim, _)| delim)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Comma => write!(f, ","),
            Delimiter::Semicolon => write!(f, ";"),
            Delimiter::Tab => write!(f, "\\t"),
            Delimiter::Pipe => write!(f, "|"),
        }
    }
}

/// A fully loaded source batch.
#[derive(Debug)]
pub struct Batch {
    /// Successfully parsed records.
    pub records: Vec<SourceRecord>,
    /// Rows that failed to parse.
    pub errors: Vec<RowError>,
    /// Total data rows (excluding header), failed ones included.
    pub total_rows: usize,
    /// Header names as found in the source.
    pub headers: Vec<String>,
    /// Delimiter actually used.
    pub delimiter: Delimiter,
}

/// Reads CSV batches into [`SourceRecord`]s.
#[derive(Debug, Default)]
pub struct BatchReader {
    mapping: ColumnMap,
    delimiter: Option<Delimiter>,
}

impl BatchReader {
    /// Create a reader with the default column mapping and delimiter
    /// sniffing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given column mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: ColumnMap) -> Self {
        self.mapping = mapping;
        self
    }

    /// Force a delimiter instead of sniffing the header line.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Load a batch from a file.
    pub fn read_path(&self, path: impl AsRef<Path>) -> SourceResult<Batch> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.read_bytes(&bytes)
    }

    /// Load a batch from raw bytes.
    pub fn read_bytes(&self, bytes: &[u8]) -> SourceResult<Batch> {
        let text = decode(bytes)?;
        if text.trim().is_empty() {
            return Err(SourceError::Empty);
        }

        let delimiter = match self.delimiter {
            Some(d) => d,
            None => {
                let header_line = text.lines().next().unwrap_or("");
                let sniffed = Delimiter::sniff(header_line);
                debug!(delimiter = %sniffed, "sniffed batch delimiter");
                sniffed
            }
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter.as_byte())
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let columns = self.mapping.resolve(&headers);
        if columns.schema_hits() == 0 {
            return Err(SourceError::HeaderMismatch { headers });
        }

        let mut records = Vec::new();
        let mut errors = Vec::new();
        let mut total_rows = 0usize;

        for (idx, result) in reader.records().enumerate() {
            let line_number = (idx + 2) as i32;
            total_rows += 1;

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(line = line_number, error = %e, "skipping malformed row");
                    errors.push(RowError {
                        line_number,
                        message: format!("failed to parse row: {e}"),
                    });
                    continue;
                }
            };

            records.push(build_record(&row, &columns, line_number));
        }

        if total_rows == 0 {
            return Err(SourceError::Empty);
        }

        Ok(Batch {
            records,
            errors,
            total_rows,
            headers,
            delimiter,
        })
    }
}

/// Decode batch bytes as UTF-8, falling back to Windows-1252.
///
/// Exports from older Office installs still arrive in Windows-1252; the
/// fallback keeps accented names intact instead of rejecting the file.
fn decode(bytes: &[u8]) -> SourceResult<Cow<'_, str>> {
    let bytes = strip_utf8_bom(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Cow::Borrowed(text));
    }
    let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors {
        return Err(SourceError::Decode);
    }
    debug!("batch decoded as windows-1252");
    Ok(text)
}

/// Strip the UTF-8 BOM from the beginning of data if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(UTF8_BOM) {
        &data[UTF8_BOM.len()..]
    } else {
        data
    }
}

fn build_record(
    row: &csv::StringRecord,
    columns: &ResolvedColumns,
    line_number: i32,
) -> SourceRecord {
    let field = |idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| row.get(i))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let mut extras = indexmap::IndexMap::new();
    for (name, idx) in &columns.extras {
        if let Some(value) = row.get(*idx) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                extras.insert(name.clone(), trimmed.to_string());
            }
        }
    }

    SourceRecord {
        line_number,
        id: field(columns.id),
        first_name: field(columns.first_name),
        last_name: field(columns.last_name),
        organization: field(columns.organization),
        title: field(columns.title),
        department: field(columns.department),
        street: field(columns.street),
        postal_code: field(columns.postal_code),
        city: field(columns.city),
        phone: field(columns.phone),
        mobile: field(columns.mobile),
        email: field(columns.email),
        email_alt: field(columns.email_alt),
        notes: field(columns.notes),
        extras,
    }
}
