//! Snapshot encoding.
//!
//! Turns the raw upstream export into the bytes of a snapshot file:
//! - csv: re-written comma-delimited with a header row
//! - parquet: column types inferred from every row, compressed
//!
//! Both formats append a `request_date` column stamped with the run time.
//! The same modules read finished snapshots back for the catalog and for
//! coverage.

pub mod columnar;
pub mod delimited;

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column appended to every snapshot.
pub const STAMP_COLUMN: &str = "request_date";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Parquet,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Csv, Format::Parquet];

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Zstd,
    Snappy,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Delimiter {
    Auto,
    Byte(u8),
}

impl TryFrom<String> for Delimiter {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "auto" => Ok(Delimiter::Auto),
            "tab" | "\\t" => Ok(Delimiter::Byte(b'\t')),
            s if s.len() == 1 && s.is_ascii() => Ok(Delimiter::Byte(s.as_bytes()[0])),
            other => Err(format!(
                "delimiter must be \"auto\" or a single ASCII character, got {other:?}"
            )),
        }
    }
}

impl Delimiter {
    pub fn resolve(self, body: &[u8]) -> u8 {
        match self {
            Delimiter::Byte(b) => b,
            Delimiter::Auto => sniff_delimiter(body),
        }
    }
}

/// Picks the delimiter from the header line: the most frequent of `;`, `,`
/// and tab, falling back to `,`.
pub fn sniff_delimiter(body: &[u8]) -> u8 {
    let header = body.split(|&b| b == b'\n').next().unwrap_or_default();

    let mut best = (b',', 0usize);
    for candidate in [b';', b',', b'\t'] {
        let count = header.iter().filter(|&&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// A snapshot ready to be written.
#[derive(Debug)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub row_count: u64,
    pub columns: Vec<String>,
}

/// What the catalog needs to know about a snapshot already on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub columns: Vec<String>,
    pub row_count: u64,
    pub requested_at: Option<NaiveDateTime>,
}

pub fn encode(
    body: &[u8],
    delimiter: Delimiter,
    format: Format,
    compression: Compression,
    requested_at: NaiveDateTime,
) -> Result<Encoded> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::EmptyExport);
    }

    let delimiter = delimiter.resolve(body);
    log::debug!("input delimiter {:?}", delimiter as char);

    match format {
        Format::Csv => delimited::encode(body, delimiter, requested_at),
        Format::Parquet => columnar::encode(body, delimiter, compression, requested_at),
    }
}

pub fn inspect(path: &Path, format: Format) -> Result<Inspection> {
    match format {
        Format::Csv => delimited::inspect(path),
        Format::Parquet => columnar::inspect(path),
    }
}

pub fn read_request_date(path: &Path, format: Format) -> Result<Option<NaiveDateTime>> {
    match format {
        Format::Csv => delimited::read_request_date(path),
        Format::Parquet => columnar::read_request_date(path),
    }
}

fn check_collision<'a>(mut names: impl Iterator<Item = &'a str>) -> Result<()> {
    if names.any(|name| name == STAMP_COLUMN) {
        return Err(Error::ColumnCollision(STAMP_COLUMN.to_string()));
    }
    Ok(())
}
