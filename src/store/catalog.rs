use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::path::Path;

use crate::encode::Format;
use crate::error::{Error, Result};

/// Snapshot metadata stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: u64,
    pub file_name: String,
    pub format: Format,
    /// Microseconds since the epoch of the naive local request time.
    pub requested_at: i64,
    pub size_bytes: u64,
    pub row_count: u64,
    pub file_sha256: String,
    /// Hash of the raw download; unknown for reindexed snapshots.
    pub upstream_sha256: Option<String>,
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY,
            file_name TEXT NOT NULL,
            format TEXT NOT NULL,
            requested_at INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            row_count INTEGER NOT NULL,
            file_sha256 TEXT NOT NULL,
            upstream_sha256 TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS columns (
            snapshot_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY(snapshot_id, position),
            FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(())
}

/// Catalog handle. Open once per command, reuse across all operations.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    /// Save a snapshot and its column names. An existing entry with the
    /// same id is replaced only when it describes the same file.
    pub fn save_snapshot(&mut self, snapshot: &Snapshot, columns: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT file_sha256 FROM snapshots WHERE id = ?1",
                params![to_sql_int(snapshot.id)?],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some_and(|sha| sha != snapshot.file_sha256) {
            return Err(Error::CatalogConflict(snapshot.id));
        }

        insert_snapshot(&tx, snapshot, columns)?;
        tx.commit()?;
        Ok(())
    }

    /// Drop every entry and insert the given snapshots in one transaction.
    pub fn replace_all(&mut self, snapshots: &[(Snapshot, Vec<String>)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM columns", [])?;
        tx.execute("DELETE FROM snapshots", [])?;

        for (snapshot, columns) in snapshots {
            insert_snapshot(&tx, snapshot, columns)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// List all snapshots, newest first
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_name, format, requested_at, size_bytes, row_count, file_sha256, upstream_sha256
             FROM snapshots
             ORDER BY id DESC",
        )?;

        let snapshots = stmt
            .query_map([], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(snapshots)
    }

    /// Get a specific snapshot by ID
    pub fn get_snapshot(&self, id: u64) -> Result<Option<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_name, format, requested_at, size_bytes, row_count, file_sha256, upstream_sha256
             FROM snapshots
             WHERE id = ?1",
        )?;

        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(snapshot_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Get the most recent snapshot
    pub fn get_latest_snapshot(&self) -> Result<Option<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_name, format, requested_at, size_bytes, row_count, file_sha256, upstream_sha256
             FROM snapshots
             ORDER BY id DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;

        if let Some(row) = rows.next()? {
            Ok(Some(snapshot_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Load column names for a snapshot, in file order
    pub fn load_snapshot_columns(&self, snapshot_id: u64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM columns
             WHERE snapshot_id = ?1
             ORDER BY position",
        )?;

        let columns = stmt
            .query_map(params![to_sql_int(snapshot_id)?], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(columns)
    }
}

fn insert_snapshot(tx: &Transaction, snapshot: &Snapshot, columns: &[String]) -> Result<()> {
    let id = to_sql_int(snapshot.id)?;

    tx.execute("DELETE FROM columns WHERE snapshot_id = ?1", params![id])?;
    tx.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;

    tx.execute(
        "INSERT INTO snapshots (id, file_name, format, requested_at, size_bytes, row_count, file_sha256, upstream_sha256)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            snapshot.file_name,
            snapshot.format.as_str(),
            snapshot.requested_at,
            to_sql_int(snapshot.size_bytes)?,
            to_sql_int(snapshot.row_count)?,
            snapshot.file_sha256,
            snapshot.upstream_sha256.as_deref()
        ],
    )?;

    let mut stmt = tx.prepare_cached(
        "INSERT INTO columns (snapshot_id, position, name) VALUES (?1, ?2, ?3)",
    )?;
    for (position, name) in columns.iter().enumerate() {
        stmt.execute(params![id, position as i64, name])?;
    }

    Ok(())
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::OutOfRange(value))
}

fn snapshot_from_row(row: &Row) -> rusqlite::Result<Snapshot> {
    let format_str: String = row.get(2)?;
    let format = Format::from_extension(&format_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown snapshot format '{format_str}'").into(),
        )
    })?;

    Ok(Snapshot {
        id: row.get::<_, i64>(0)?.max(0) as u64,
        file_name: row.get(1)?,
        format,
        requested_at: row.get(3)?,
        size_bytes: row.get::<_, i64>(4)?.max(0) as u64,
        row_count: row.get::<_, i64>(5)?.max(0) as u64,
        file_sha256: row.get(6)?,
        upstream_sha256: row.get(7)?,
    })
}
