//! Terminal tables for snapshots, coverage and diffs.

use crate::coverage::Coverage;
use crate::store::diff::DiffResult;
use crate::store::Snapshot;
use crate::util::{display_stamp, format_bytes};

pub fn render_snapshots(snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return String::from("No snapshots catalogued. Run 'tgvmax-archive fetch' or 'reindex'.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<6} {:<20} {:<8} {:>10} {:>12}\n",
        "ID", "Requested", "Format", "Rows", "Size"
    ));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    for snapshot in snapshots {
        output.push_str(&format!(
            "{:<6} {:<20} {:<8} {:>10} {:>12}\n",
            snapshot.id,
            display_stamp(snapshot.requested_at),
            snapshot.format.as_str(),
            snapshot.row_count,
            format_bytes(snapshot.size_bytes)
        ));
    }

    output
}

pub fn render_coverage(coverage: &Coverage) -> String {
    let (Some(first), Some(last)) = (coverage.first_day, coverage.last_day) else {
        return String::from("Archive is empty.\n");
    };

    let mut output = format!(
        "Total of {} days of data ({} snapshots) with {} days missing between {first} and {last}\n",
        coverage.archived_days, coverage.snapshot_count, coverage.missing_days
    );

    if coverage.gaps.is_empty() {
        output.push_str("No gaps.\n");
        return output;
    }

    output.push_str(&format!("\n{} gaps:\n", coverage.gaps.len()));
    for gap in &coverage.gaps {
        let plural = if gap.missing_days == 1 { "" } else { "s" };
        output.push_str(&format!(
            "  {} .. {}  ({} day{plural} missing)\n",
            gap.after, gap.before, gap.missing_days
        ));
    }

    output
}

fn signed(delta: i64) -> String {
    if delta >= 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

fn signed_bytes(delta: i64) -> String {
    let sign = if delta >= 0 { "+" } else { "-" };
    format!("{sign}{}", format_bytes(delta.unsigned_abs()))
}

pub fn render_diff(result: &DiffResult) -> String {
    let mut output = String::new();

    output.push_str("Comparing snapshots:\n");
    output.push_str(&format!(
        "  From: #{} ({})\n",
        result.from_id,
        display_stamp(result.from_requested_at)
    ));
    output.push_str(&format!(
        "  To:   #{} ({})\n\n",
        result.to_id,
        display_stamp(result.to_requested_at)
    ));

    output.push_str(&format!("  rows: {}\n", signed(result.row_delta)));
    output.push_str(&format!("  size: {}\n", signed_bytes(result.size_delta)));

    let upstream = match result.identical_upstream {
        Some(true) => "identical",
        Some(false) => "changed",
        None => "unknown",
    };
    output.push_str(&format!("  upstream export: {upstream}\n"));

    for name in result.added_columns() {
        output.push_str(&format!("  [+] column {name}\n"));
    }
    for name in result.removed_columns() {
        output.push_str(&format!("  [-] column {name}\n"));
    }

    output
}
