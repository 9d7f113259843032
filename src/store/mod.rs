//! SQLite snapshot catalog.
//!
//! Indexes the archive in a local SQLite database with two tables:
//! - snapshots: id, file name, format, request time, size, rows, hashes
//! - columns: snapshot_id, position, name
//!
//! Supports:
//! - Recording every snapshot a fetch writes
//! - Listing snapshots and loading one by id
//! - Rebuilding everything from the data directory (reindex)
//!
//! The data directory stays authoritative; the catalog can always be rebuilt.

pub mod catalog;
pub mod diff;

pub use catalog::{Snapshot, Store};
