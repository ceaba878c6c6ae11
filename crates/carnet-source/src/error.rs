//! Source batch error types

use thiserror::Error;

/// Error that can occur while loading a source batch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bytes are neither valid UTF-8 nor valid Windows-1252 text.
    #[error("batch is not valid UTF-8 or Windows-1252 text")]
    Decode,

    /// The CSV structure itself could not be read.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The batch has no data rows.
    #[error("batch contains no data rows")]
    Empty,

    /// No schema column was found in the header row.
    #[error("no schema column found in header {headers:?}; check delimiter and column mapping")]
    HeaderMismatch { headers: Vec<String> },

    /// A column mapping override is malformed.
    #[error("invalid column mapping: {message}")]
    InvalidMapping { message: String },

    /// A delimiter string is not one of the supported values.
    #[error("invalid delimiter '{value}'; valid values: ',', ';', '\\t', '|'")]
    InvalidDelimiter { value: String },
}

/// Result type for source batch loading.
pub type SourceResult<T> = Result<T, SourceError>;

/// Per-row parse error. Rows that fail to parse are reported and skipped;
/// they never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line number (header = 1, first data row = 2).
    pub line_number: i32,
    pub message: String,
}
