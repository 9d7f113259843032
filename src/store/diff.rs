//! Snapshot comparison.
//!
//! Compares the catalog entries of two snapshots:
//! - row count and file size deltas
//! - whether the upstream download was byte-identical (when both hashes are known)
//! - columns added or removed, matched by name

use std::collections::HashSet;

use serde::Serialize;

use super::catalog::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnChange {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDiff {
    pub name: String,
    pub change: ColumnChange,
}

#[derive(Debug, Serialize)]
pub struct DiffResult {
    pub from_id: u64,
    pub to_id: u64,
    pub from_requested_at: i64,
    pub to_requested_at: i64,
    pub row_delta: i64,
    pub size_delta: i64,
    pub identical_upstream: Option<bool>,
    pub columns: Vec<ColumnDiff>,
}

impl DiffResult {
    pub fn added_columns(&self) -> impl Iterator<Item = &str> {
        self.columns_with(ColumnChange::Added)
    }

    pub fn removed_columns(&self) -> impl Iterator<Item = &str> {
        self.columns_with(ColumnChange::Removed)
    }

    fn columns_with(&self, change: ColumnChange) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(move |c| c.change == change)
            .map(|c| c.name.as_str())
    }
}

fn delta(from: u64, to: u64) -> i64 {
    let from = i64::try_from(from).unwrap_or(i64::MAX);
    let to = i64::try_from(to).unwrap_or(i64::MAX);
    to.saturating_sub(from)
}

/// Compare two snapshots and their column lists. Added columns keep the
/// order of `to_columns`, removed ones the order of `from_columns`.
pub fn compare_snapshots(
    from: &Snapshot,
    from_columns: &[String],
    to: &Snapshot,
    to_columns: &[String],
) -> DiffResult {
    let identical_upstream = match (&from.upstream_sha256, &to.upstream_sha256) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    };

    let from_set: HashSet<&str> = from_columns.iter().map(String::as_str).collect();
    let to_set: HashSet<&str> = to_columns.iter().map(String::as_str).collect();

    let added = to_columns
        .iter()
        .filter(|c| !from_set.contains(c.as_str()))
        .map(|c| ColumnDiff {
            name: c.clone(),
            change: ColumnChange::Added,
        });

    let removed = from_columns
        .iter()
        .filter(|c| !to_set.contains(c.as_str()))
        .map(|c| ColumnDiff {
            name: c.clone(),
            change: ColumnChange::Removed,
        });

    DiffResult {
        from_id: from.id,
        to_id: to.id,
        from_requested_at: from.requested_at,
        to_requested_at: to.requested_at,
        row_delta: delta(from.row_count, to.row_count),
        size_delta: delta(from.size_bytes, to.size_bytes),
        identical_upstream,
        columns: added.chain(removed).collect(),
    }
}
