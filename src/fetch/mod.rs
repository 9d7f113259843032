//! Daily fetch: download, encode, write the next snapshot, record it.

pub mod file;
pub mod http;

use chrono::NaiveDateTime;

use crate::archive::{self, Archive};
use crate::config::Config;
use crate::encode;
use crate::error::Result;
use crate::snapshot::{fresh_entry, sha256_hex};
use crate::store::{Snapshot, Store};
use crate::util::format_bytes;

pub use file::FileSource;
pub use http::HttpSource;

/// Where the raw export comes from.
pub trait Source {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Vec<u8>>;
}

#[derive(Debug)]
pub enum Outcome {
    Written(Snapshot),
    /// Upstream body identical to the latest snapshot and `skip_unchanged` set.
    Unchanged { duplicate_of: u64 },
    DryRun {
        file_name: String,
        row_count: u64,
        size_bytes: u64,
    },
}

/// Runs one fetch. `now` is read once the download has completed, so a slow
/// or retried download is stamped with the time the data was received.
pub fn run<F>(
    config: &Config,
    source: &dyn Source,
    store: &mut Store,
    now: F,
    dry_run: bool,
) -> Result<Outcome>
where
    F: FnOnce() -> NaiveDateTime,
{
    let archive = Archive::at(&config.archive.data_dir);

    log::info!("fetching {}", source.describe());
    let body = source.fetch()?;
    let requested_at = now();
    log::info!("received {}", format_bytes(body.len() as u64));

    let upstream_sha256 = sha256_hex(&body);
    if let Some(latest) = store.get_latest_snapshot()? {
        if latest.upstream_sha256.as_deref() == Some(upstream_sha256.as_str()) {
            log::warn!("export is byte-identical to snapshot {}", latest.id);
            if config.archive.skip_unchanged {
                return Ok(Outcome::Unchanged {
                    duplicate_of: latest.id,
                });
            }
        }
    }

    let format = config.archive.format;
    let encoded = encode::encode(
        &body,
        config.source.delimiter,
        format,
        config.archive.compression,
        requested_at,
    )?;
    let id = archive.next_id()?;

    if dry_run {
        return Ok(Outcome::DryRun {
            file_name: archive::file_name(id, format),
            row_count: encoded.row_count,
            size_bytes: encoded.bytes.len() as u64,
        });
    }

    let file = archive.write(id, format, &encoded.bytes)?;
    let snapshot = fresh_entry(&file, &encoded, requested_at, upstream_sha256);
    store.save_snapshot(&snapshot, &encoded.columns)?;

    log::info!(
        "wrote {} ({} rows, {})",
        file.path.display(),
        snapshot.row_count,
        format_bytes(snapshot.size_bytes)
    );
    Ok(Outcome::Written(snapshot))
}
