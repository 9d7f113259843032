use chrono::{DateTime, NaiveDateTime};

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1_024;
    const MB: u64 = KB * 1_024;
    const GB: u64 = MB * 1_024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Stamp format written into csv snapshots.
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn format_stamp(stamp: NaiveDateTime) -> String {
    stamp.format(STAMP_FORMAT).to_string()
}

/// Parses a stamp as written by us or by older tooling (space separator,
/// missing fraction).
pub fn parse_stamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn stamp_to_micros(stamp: NaiveDateTime) -> i64 {
    stamp.and_utc().timestamp_micros()
}

pub fn micros_to_stamp(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

pub fn display_stamp(micros: i64) -> String {
    micros_to_stamp(micros)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
