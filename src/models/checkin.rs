use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CheckinStatus;

/// A completion record: one dose acted upon (taken, skipped or missed).
///
/// `planned_time` links the check-in back to the agenda slot it settles;
/// make-up entries record a reason alongside the late `actual_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub planned_time: Option<NaiveDateTime>,
    pub actual_time: NaiveDateTime,
    pub dose: Option<f64>,
    pub dose_unit: Option<String>,
    pub status: CheckinStatus,
    pub is_makeup: bool,
    pub makeup_reason: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<CheckinPhoto>,
}

/// A photo attached to a check-in. Only the URL and ordering live here;
/// upload and encoding are the surrounding application's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinPhoto {
    pub id: Uuid,
    pub checkin_id: Uuid,
    pub photo_url: String,
    pub sort_order: i32,
}

/// Standard make-up reasons offered by the check-in flow.
pub const MAKEUP_REASONS: &[&str] = &[
    "Forgot to bring medication",
    "Paused while feeling unwell",
    "Dose adjusted by doctor",
    "Ran out of stock",
    "Other",
];
