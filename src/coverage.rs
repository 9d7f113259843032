//! Archive coverage: which days have a snapshot and which are missing.
//!
//! A day counts as archived when at least one snapshot was requested on it.
//! Two archived days more than one day apart form a gap.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    /// Last archived day before the gap.
    pub after: NaiveDate,
    /// First archived day after the gap.
    pub before: NaiveDate,
    pub missing_days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub snapshot_count: usize,
    pub archived_days: usize,
    pub missing_days: u64,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub last_request: Option<NaiveDateTime>,
    pub gaps: Vec<Gap>,
}

impl Coverage {
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// Calendar days from first to last snapshot, inclusive.
    pub fn span_days(&self) -> u64 {
        match (self.first_day, self.last_day) {
            (Some(first), Some(last)) => (last - first).num_days().max(0) as u64 + 1,
            _ => 0,
        }
    }
}

pub fn compute(requests: &[NaiveDateTime]) -> Coverage {
    let mut days: Vec<NaiveDate> = requests.iter().map(NaiveDateTime::date).collect();
    days.sort_unstable();
    days.dedup();

    let gaps: Vec<Gap> = days
        .windows(2)
        .filter_map(|pair| {
            let step = (pair[1] - pair[0]).num_days();
            (step > 1).then(|| Gap {
                after: pair[0],
                before: pair[1],
                missing_days: (step - 1) as u64,
            })
        })
        .collect();

    Coverage {
        snapshot_count: requests.len(),
        archived_days: days.len(),
        missing_days: gaps.iter().map(|g| g.missing_days).sum(),
        first_day: days.first().copied(),
        last_day: days.last().copied(),
        last_request: requests.iter().max().copied(),
        gaps,
    }
}
