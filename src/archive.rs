//! Flat data directory of numbered snapshot files.
//!
//! A snapshot is `<id>.<ext>` where `id` is a positive integer with no
//! leading zeros and `ext` is a known [`Format`] extension. Anything else in
//! the directory is ignored. Files are only ever added, never rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use walkdir::WalkDir;

use crate::encode::{self, Format};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotFile {
    pub id: u64,
    pub path: PathBuf,
    pub format: Format,
}

impl SnapshotFile {
    pub fn file_name(&self) -> String {
        file_name(self.id, self.format)
    }
}

pub fn file_name(id: u64, format: Format) -> String {
    format!("{id}.{}", format.extension())
}

/// Parses `<id>.<ext>`; returns `None` for anything that is not a snapshot.
pub fn parse_file_name(path: &Path) -> Option<(u64, Format)> {
    let format = Format::from_extension(path.extension()?.to_str()?)?;
    let stem = path.file_stem()?.to_str()?;
    let id: u64 = stem.parse().ok()?;

    if id == 0 || stem != id.to_string() {
        return None;
    }
    Some((id, format))
}

pub struct Archive {
    dir: PathBuf,
}

impl Archive {
    /// Opens the data directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Archive { dir })
    }

    /// Refers to the data directory without creating it. A missing
    /// directory reads as an empty archive until the first write.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Archive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All snapshot files, ordered by id.
    pub fn snapshots(&self) -> Result<Vec<SnapshotFile>> {
        let mut files = Vec::new();
        if !self.dir.exists() {
            return Ok(files);
        }

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.dir).to_path_buf();
                Error::io(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some((id, format)) = parse_file_name(entry.path()) {
                files.push(SnapshotFile {
                    id,
                    path: entry.into_path(),
                    format,
                });
            }
        }

        files.sort_by_key(|f| (f.id, f.format.extension()));
        Ok(files)
    }

    pub fn next_id(&self) -> Result<u64> {
        match self.snapshots()?.last() {
            None => Ok(1),
            Some(f) => f.id.checked_add(1).ok_or(Error::OutOfRange(f.id)),
        }
    }

    /// Writes a new snapshot. The bytes go to a hidden `.partial` file first
    /// and are renamed into place once flushed, so a crash never leaves a
    /// truncated `<id>.<ext>` behind. A partial file left by an earlier
    /// crash is overwritten.
    pub fn write(&self, id: u64, format: Format, bytes: &[u8]) -> Result<SnapshotFile> {
        let name = file_name(id, format);
        let target = self.dir.join(&name);
        let partial = self.dir.join(format!(".{name}.partial"));

        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        if target.exists() {
            return Err(Error::io(
                &target,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "snapshot already exists"),
            ));
        }

        let result = write_partial(&partial, bytes)
            .and_then(|()| fs::rename(&partial, &target).map_err(|e| Error::io(&target, e)));

        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        log::debug!("wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(SnapshotFile {
            id,
            path: target,
            format,
        })
    }

    /// Request time of every snapshot, in id order.
    pub fn request_dates(&self) -> Result<Vec<(SnapshotFile, NaiveDateTime)>> {
        self.snapshots()?
            .into_iter()
            .map(|file| {
                let requested_at = requested_at(&file)?;
                Ok((file, requested_at))
            })
            .collect()
    }
}

fn write_partial(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(bytes).map_err(|e| Error::io(path, e))?;
    file.sync_all().map_err(|e| Error::io(path, e))
}

/// The stamp inside the file, or its modification time when the file has
/// no rows or no stamp column.
pub fn requested_at(file: &SnapshotFile) -> Result<NaiveDateTime> {
    if let Some(stamp) = encode::read_request_date(&file.path, file.format)? {
        return Ok(stamp);
    }

    log::debug!("{}: no request_date, using mtime", file.path.display());
    let modified = fs::metadata(&file.path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(&file.path, e))?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}
