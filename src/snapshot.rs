//! Glue between snapshot files and catalog entries.

use std::fs;

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::archive::{self, Archive, SnapshotFile};
use crate::encode::{self, Encoded};
use crate::error::{Error, Result};
use crate::store::{Snapshot, Store};
use crate::util::stamp_to_micros;

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Catalog entry for a snapshot a fetch just wrote.
pub fn fresh_entry(
    file: &SnapshotFile,
    encoded: &Encoded,
    requested_at: NaiveDateTime,
    upstream_sha256: String,
) -> Snapshot {
    Snapshot {
        id: file.id,
        file_name: file.file_name(),
        format: file.format,
        requested_at: stamp_to_micros(requested_at),
        size_bytes: encoded.bytes.len() as u64,
        row_count: encoded.row_count,
        file_sha256: sha256_hex(&encoded.bytes),
        upstream_sha256: Some(upstream_sha256),
    }
}

/// Catalog entry rebuilt from a file on disk. The upstream hash is lost.
pub fn entry_from_file(file: &SnapshotFile) -> Result<(Snapshot, Vec<String>)> {
    let bytes = fs::read(&file.path).map_err(|e| Error::io(&file.path, e))?;
    let inspection = encode::inspect(&file.path, file.format)?;

    let requested_at = match inspection.requested_at {
        Some(stamp) => stamp,
        None => archive::requested_at(file)?,
    };

    let snapshot = Snapshot {
        id: file.id,
        file_name: file.file_name(),
        format: file.format,
        requested_at: stamp_to_micros(requested_at),
        size_bytes: bytes.len() as u64,
        row_count: inspection.row_count,
        file_sha256: sha256_hex(&bytes),
        upstream_sha256: None,
    };

    Ok((snapshot, inspection.columns))
}

/// Rebuilds the whole catalog from the data directory.
pub fn reindex(archive: &Archive, store: &mut Store) -> Result<usize> {
    let files = archive.snapshots()?;
    let mut entries = Vec::with_capacity(files.len());

    for file in &files {
        log::debug!("indexing {}", file.path.display());
        entries.push(entry_from_file(file)?);
    }

    store.replace_all(&entries)?;
    log::info!(
        "indexed {} snapshots from {}",
        entries.len(),
        archive.dir().display()
    );
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{Compression, Delimiter, Format};
    use chrono::NaiveDate;

    const EXPORT: &[u8] = b"date;train_no;od_happy_card\n2024-06-02;6201;OUI\n2024-06-02;6611;NON\n";

    fn stamp(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(4, 0, 0)
            .unwrap()
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reindex_matches_fresh_entries_except_upstream_hash() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::open(dir.path()).unwrap();
        let mut fresh = Vec::new();

        for (id, format) in [(1, Format::Csv), (2, Format::Parquet)] {
            let encoded =
                encode::encode(EXPORT, Delimiter::Auto, format, Compression::Zstd, stamp(id as u32))
                    .unwrap();
            let file = archive.write(id, format, &encoded.bytes).unwrap();
            fresh.push(fresh_entry(&file, &encoded, stamp(id as u32), sha256_hex(EXPORT)));
        }

        let mut store = Store::open_in_memory().unwrap();
        assert_eq!(reindex(&archive, &mut store).unwrap(), 2);

        let mut listed = store.list_snapshots().unwrap();
        listed.reverse();
        for (indexed, mut expected) in listed.into_iter().zip(fresh) {
            expected.upstream_sha256 = None;
            assert_eq!(indexed, expected);
        }

        assert_eq!(
            store.load_snapshot_columns(2).unwrap(),
            vec!["date", "train_no", "od_happy_card", "request_date"]
        );
    }
}
