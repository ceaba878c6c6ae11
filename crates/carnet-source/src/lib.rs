//! # Source Batch Loading
//!
//! Turns a CSV contact export into typed [`SourceRecord`]s.
//!
//! The loader copes with what real exports actually contain: UTF-8 with or
//! without BOM, Windows-1252 leftovers, four different delimiters, short
//! rows, and locale-specific column names. Column names resolve through a
//! [`ColumnMap`]; the default preset matches the production French export
//! and any subset can be overridden from a JSON file.
//!
//! Rows that fail to parse are reported per row and skipped; only
//! structural problems (unreadable file, unknown encoding, no recognizable
//! column at all) abort the load.

pub mod error;
pub mod mapping;
pub mod reader;
pub mod record;

pub use error::{RowError, SourceError, SourceResult};
pub use mapping::{ColumnMap, ResolvedColumns};
pub use reader::{Batch, BatchReader, Delimiter};
pub use record::SourceRecord;
