use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted row of the materialized daily agenda.
///
/// Rows are created once per due (user, medication, date, time) by the
/// materializer and then carry the mutable `is_taken` flag that check-in
/// actions flip. `medication_name` is joined in for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub plan_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub dose: f64,
    pub dose_unit: String,
    pub is_taken: bool,
}
