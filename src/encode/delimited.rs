//! CSV snapshots.

use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ByteRecord, ReaderBuilder, StringRecord, Writer};

use super::{check_collision, Encoded, Inspection, STAMP_COLUMN};
use crate::error::{Error, Result};
use crate::util::{format_stamp, parse_stamp};

pub fn encode(body: &[u8], delimiter: u8, requested_at: NaiveDateTime) -> Result<Encoded> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    check_collision(headers.iter())?;

    let mut columns: Vec<String> = headers.iter().map(str::to_string).collect();
    columns.push(STAMP_COLUMN.to_string());

    let mut writer = Writer::from_writer(Vec::with_capacity(body.len() + body.len() / 4));
    writer.write_record(&columns)?;

    let stamp = format_stamp(requested_at);
    let mut record = ByteRecord::new();
    let mut row_count: u64 = 0;

    while reader.read_byte_record(&mut record)? {
        record.push_field(stamp.as_bytes());
        writer.write_byte_record(&record)?;
        row_count += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))?;

    Ok(Encoded {
        bytes,
        row_count,
        columns,
    })
}

pub fn inspect(path: &Path) -> Result<Inspection> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let stamp_index = headers.iter().position(|h| h == STAMP_COLUMN);

    let mut requested_at = None;
    let mut row_count: u64 = 0;
    let mut record = StringRecord::new();

    while reader.read_record(&mut record)? {
        if row_count == 0 {
            requested_at = stamp_index
                .and_then(|i| record.get(i))
                .and_then(parse_stamp);
        }
        row_count += 1;
    }

    Ok(Inspection {
        columns: headers.iter().map(str::to_string).collect(),
        row_count,
        requested_at,
    })
}

pub fn read_request_date(path: &Path) -> Result<Option<NaiveDateTime>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let Some(index) = reader.headers()?.iter().position(|h| h == STAMP_COLUMN) else {
        return Ok(None);
    };

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(None);
    }
    Ok(record.get(index).and_then(parse_stamp))
}
