//! Period-of-day buckets.
//!
//! A coarse label ("morning", "noon", ...) used to group doses for display
//! and for batch check-in actions. Classification never decides whether a
//! dose is due — only how it is grouped.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::plan::DoseOccurrence;

/// Period-of-day label. `All` is a display-only aggregate ("show every
/// bucket"); `classify` never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Morning,
    Noon,
    Evening,
    Night,
    Other,
    All,
}

impl TimeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Evening => "evening",
            Self::Night => "night",
            Self::Other => "other",
            Self::All => "all",
        }
    }

    /// Human-readable name for section headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Noon => "Noon",
            Self::Evening => "Evening",
            Self::Night => "Night",
            Self::Other => "Other",
            Self::All => "All",
        }
    }
}

/// Map a wall-clock time to its period-of-day bucket.
///
/// Boundaries are closed-open: [6,11) morning, [11,14) noon, [17,20)
/// evening, [20,24) plus [0,2) night. The remaining hours (2-6, 14-17)
/// fall into `Other`.
pub fn classify(time: NaiveTime) -> TimeBucket {
    match time.hour() {
        6..=10 => TimeBucket::Morning,
        11..=13 => TimeBucket::Noon,
        17..=19 => TimeBucket::Evening,
        20..=23 | 0..=1 => TimeBucket::Night,
        _ => TimeBucket::Other,
    }
}

/// Group a day plan by bucket, preserving the time order within each group.
pub fn group_by_bucket(
    occurrences: Vec<DoseOccurrence>,
) -> BTreeMap<TimeBucket, Vec<DoseOccurrence>> {
    let mut groups: BTreeMap<TimeBucket, Vec<DoseOccurrence>> = BTreeMap::new();
    for occurrence in occurrences {
        groups
            .entry(classify(occurrence.time))
            .or_default()
            .push(occurrence);
    }
    groups
}
