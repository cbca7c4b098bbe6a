//! Weekly medication schedules and the derived daily agenda.
//!
//! Three collaborating pieces: recurrence rules ([`rule`]), the pure
//! day-plan generator ([`plan`]) that expands rule sets into a time-sorted
//! list of dose occurrences, and the period-of-day classifier ([`bucket`])
//! used to group occurrences for display and batch check-in. Everything here
//! is synchronous and side-effect free; persistence lives in `crate::db`.

pub mod bucket;
pub mod plan;
pub mod rule;

pub use bucket::{classify, group_by_bucket, TimeBucket};
pub use plan::{
    generate_day_plan, CompletionSet, CompletionSource, DoseOccurrence, DoseStatus,
    UnknownCompletion,
};
pub use rule::{ScheduleRule, ScheduleRuleSet};

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Rejected schedule input. Always raised synchronously, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid time '{value}' (expected HH:MM)")]
    InvalidTime { value: String },

    #[error("invalid weekday {value} (expected 1-7, Monday = 1)")]
    InvalidWeekday { value: u8 },

    #[error("weekday set must not be empty")]
    EmptyWeekdays,

    #[error("a rule at {time} already covers weekday {weekday}")]
    OverlappingRule { time: NaiveTime, weekday: u8 },

    #[error("invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
}

/// Parse wall-clock text in the wire/storage format "HH:MM".
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| ValidationError::InvalidTime {
        value: s.to_string(),
    })
}

/// Format a wall-clock time back to "HH:MM".
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse calendar-date text in the wire/storage format "YYYY-MM-DD".
pub fn parse_plan_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_round_trip() {
        let t = parse_clock_time("08:30").unwrap();
        assert_eq!(format_clock_time(t), "08:30");
    }

    #[test]
    fn clock_time_rejects_malformed_input() {
        for bad in ["24:00", "8am", "08:60", "", "08:00:00"] {
            let err = parse_clock_time(bad).unwrap_err();
            assert_eq!(
                err,
                ValidationError::InvalidTime {
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn plan_date_parses_iso_format() {
        let d = parse_plan_date("2025-03-05").unwrap();
        assert_eq!(d.to_string(), "2025-03-05");
    }

    #[test]
    fn plan_date_rejects_malformed_input() {
        for bad in ["2025-13-01", "05/03/2025", "yesterday", ""] {
            assert!(matches!(
                parse_plan_date(bad),
                Err(ValidationError::InvalidDate { .. })
            ));
        }
    }
}
