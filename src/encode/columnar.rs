//! Parquet snapshots.
//!
//! Column types come from arrow's csv inference over the whole export, so a
//! column that turns non-numeric on the last row still lands as a string.
//! The stamp is a `Timestamp(Microsecond)` without a time zone, matching
//! the naive local time written into csv snapshots.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, TimestampMicrosecondArray};
use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, FieldRef, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use super::{check_collision, Compression, Encoded, Inspection, STAMP_COLUMN};
use crate::error::{Error, Result};
use crate::util::{micros_to_stamp, stamp_to_micros};

const BATCH_SIZE: usize = 8_192;

impl Compression {
    fn to_parquet(self) -> ParquetCompression {
        match self {
            Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::None => ParquetCompression::UNCOMPRESSED,
        }
    }
}

pub fn encode(
    body: &[u8],
    delimiter: u8,
    compression: Compression,
    requested_at: NaiveDateTime,
) -> Result<Encoded> {
    let format = CsvFormat::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (inferred, _) = format.infer_schema(Cursor::new(body), None)?;
    check_collision(inferred.fields().iter().map(|f| f.name().as_str()))?;

    let mut fields: Vec<FieldRef> = inferred.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(
        STAMP_COLUMN,
        DataType::Timestamp(TimeUnit::Microsecond, None),
        false,
    )));
    let stamped = Arc::new(Schema::new(fields));
    let columns = stamped.fields().iter().map(|f| f.name().clone()).collect();

    let reader = ReaderBuilder::new(Arc::new(inferred))
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(body))?;

    let props = WriterProperties::builder()
        .set_compression(compression.to_parquet())
        .build();
    let mut writer = ArrowWriter::try_new(Vec::new(), stamped.clone(), Some(props))?;

    let micros = stamp_to_micros(requested_at);
    let mut row_count: u64 = 0;

    for batch in reader {
        let batch = batch?;
        let rows = batch.num_rows();

        let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();
        arrays.push(Arc::new(TimestampMicrosecondArray::from(vec![micros; rows])));

        writer.write(&RecordBatch::try_new(stamped.clone(), arrays)?)?;
        row_count += rows as u64;
    }

    let bytes = writer.into_inner()?;

    Ok(Encoded {
        bytes,
        row_count,
        columns,
    })
}

pub fn inspect(path: &Path) -> Result<Inspection> {
    let builder = open(path)?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let row_count = builder.metadata().file_metadata().num_rows().max(0) as u64;
    let requested_at = first_stamp(builder)?;

    Ok(Inspection {
        columns,
        row_count,
        requested_at,
    })
}

pub fn read_request_date(path: &Path) -> Result<Option<NaiveDateTime>> {
    first_stamp(open(path)?)
}

fn open(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(ParquetRecordBatchReaderBuilder::try_new(file)?)
}

fn first_stamp(builder: ParquetRecordBatchReaderBuilder<File>) -> Result<Option<NaiveDateTime>> {
    let Ok(index) = builder.schema().index_of(STAMP_COLUMN) else {
        return Ok(None);
    };

    let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
    let mut reader = builder
        .with_projection(mask)
        .with_batch_size(1)
        .with_limit(1)
        .build()?;

    let Some(batch) = reader.next().transpose()? else {
        return Ok(None);
    };

    let Some(stamps) = batch
        .column(0)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
    else {
        log::warn!("{STAMP_COLUMN} column is not a microsecond timestamp");
        return Ok(None);
    };

    if stamps.is_empty() || stamps.is_null(0) {
        return Ok(None);
    }
    Ok(micros_to_stamp(stamps.value(0)))
}
