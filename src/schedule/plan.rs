//! Day-plan generation.
//!
//! Expands a collection of medications' rule sets into the concrete,
//! time-sorted agenda of dose occurrences for one calendar date, merging in
//! completion state from a read-only oracle. A pure projection: callers
//! re-run it with a fresh completion snapshot after every check-in.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Medication;

/// Completion state of one occurrence.
///
/// Absence of a check-in record is `Pending` — the dose is still expected.
/// `Unknown` means the completion source could not answer; callers must
/// render it distinctly from `Pending` rather than coercing it to
/// "not taken".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Taken,
    Pending,
    Unknown,
}

impl DoseStatus {
    pub fn is_taken(self) -> bool {
        matches!(self, Self::Taken)
    }
}

/// Read-only oracle answering whether a dose was checked in.
pub trait CompletionSource {
    fn status(&self, medication_id: Uuid, date: NaiveDate, time: NaiveTime) -> DoseStatus;
}

/// Completion lookup backed by a plain set of (medication, date, time) keys:
/// present means taken, absent means pending.
#[derive(Debug, Clone, Default)]
pub struct CompletionSet {
    taken: HashSet<(Uuid, NaiveDate, NaiveTime)>,
}

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, medication_id: Uuid, date: NaiveDate, time: NaiveTime) {
        self.taken.insert((medication_id, date, time));
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

impl CompletionSource for CompletionSet {
    fn status(&self, medication_id: Uuid, date: NaiveDate, time: NaiveTime) -> DoseStatus {
        if self.taken.contains(&(medication_id, date, time)) {
            DoseStatus::Taken
        } else {
            DoseStatus::Pending
        }
    }
}

/// Oracle for the case where completion data could not be resolved at all:
/// every lookup answers `Unknown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownCompletion;

impl CompletionSource for UnknownCompletion {
    fn status(&self, _: Uuid, _: NaiveDate, _: NaiveTime) -> DoseStatus {
        DoseStatus::Unknown
    }
}

/// One concrete dose due at a specific date and time. Derived, immutable,
/// never persisted — regenerated on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseOccurrence {
    pub medication_id: Uuid,
    pub medication_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub dose: f64,
    pub dose_unit: String,
    pub require_photo: bool,
    pub status: DoseStatus,
}

/// Expand `medications` into the day's agenda for `date`.
///
/// Inactive medications and empty rule sets contribute nothing. The dose of
/// each occurrence is the rule-level override when present, otherwise the
/// medication default. Occurrences are ordered by time ascending; equal
/// times keep the medication input order (stable sort).
pub fn generate_day_plan(
    medications: &[Medication],
    date: NaiveDate,
    completion: &dyn CompletionSource,
) -> Vec<DoseOccurrence> {
    let mut occurrences = Vec::new();

    for med in medications {
        if !med.is_active {
            continue;
        }
        for rule in med.schedule.rules_due_on(date) {
            occurrences.push(DoseOccurrence {
                medication_id: med.id,
                medication_name: med.name.clone(),
                date,
                time: rule.time,
                dose: rule.dose.unwrap_or(med.default_dose),
                dose_unit: rule
                    .dose_unit
                    .clone()
                    .unwrap_or_else(|| med.dose_unit.clone()),
                require_photo: rule.require_photo,
                status: completion.status(med.id, date, rule.time),
            });
        }
    }

    occurrences.sort_by_key(|o| o.time);
    occurrences
}
