//! Check-in records: the ground truth a dose was acted upon.
//!
//! Check-ins append-only; the agenda's `is_taken` flag is derived state,
//! the check-in row is the record of what actually happened (including
//! late make-up entries with a reason).

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{enums::CheckinStatus, Checkin, CheckinPhoto, DailyPlan};
use crate::schedule::CompletionSet;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn insert_checkin(conn: &Connection, checkin: &Checkin) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO checkins (id, user_id, medication_id, plan_id, planned_time, actual_time,
         dose, dose_unit, status, is_makeup, makeup_reason, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            checkin.id.to_string(),
            checkin.user_id.to_string(),
            checkin.medication_id.to_string(),
            checkin.plan_id.map(|id| id.to_string()),
            checkin.planned_time.map(|t| t.format(DATETIME_FMT).to_string()),
            checkin.actual_time.format(DATETIME_FMT).to_string(),
            checkin.dose,
            checkin.dose_unit,
            checkin.status.as_str(),
            checkin.is_makeup as i32,
            checkin.makeup_reason,
            checkin.notes,
        ],
    )?;

    for photo in &checkin.photos {
        conn.execute(
            "INSERT INTO checkin_photos (id, checkin_id, photo_url, sort_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                photo.id.to_string(),
                checkin.id.to_string(),
                photo.photo_url,
                photo.sort_order,
            ],
        )?;
    }
    Ok(())
}

/// Record a check-in settling one agenda slot: the plan's date and time
/// become `planned_time`, its dose is what was (or would have been) taken.
pub fn record_plan_checkin(
    conn: &Connection,
    plan: &DailyPlan,
    actual_time: NaiveDateTime,
    status: CheckinStatus,
) -> Result<Checkin, StoreError> {
    let checkin = Checkin {
        id: Uuid::new_v4(),
        user_id: plan.user_id,
        medication_id: plan.medication_id,
        plan_id: Some(plan.id),
        planned_time: Some(plan.plan_date.and_time(plan.scheduled_time)),
        actual_time,
        dose: Some(plan.dose),
        dose_unit: Some(plan.dose_unit.clone()),
        status,
        is_makeup: false,
        makeup_reason: None,
        notes: None,
        photos: Vec::new(),
    };
    insert_checkin(conn, &checkin)?;
    Ok(checkin)
}

/// Check-ins whose actual time falls in [from, to], newest first.
pub fn fetch_checkins_between(
    conn: &Connection,
    user_id: &Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Checkin>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, medication_id, plan_id, planned_time, actual_time,
                dose, dose_unit, status, is_makeup, makeup_reason, notes
         FROM checkins
         WHERE user_id = ?1 AND date(actual_time) BETWEEN ?2 AND ?3
         ORDER BY actual_time DESC",
    )?;
    let rows = stmt
        .query_map(
            params![user_id.to_string(), from.to_string(), to.to_string()],
            checkin_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut checkins = Vec::new();
    for row in rows {
        let mut checkin = checkin_from_row(row)?;
        checkin.photos = fetch_photos(conn, &checkin.id)?;
        checkins.push(checkin);
    }
    Ok(checkins)
}

/// Completed check-ins for one date as a completion oracle for the pure
/// day-plan generator. Keys use the planned slot, truncated to the minute,
/// so they line up with rule times.
pub fn completion_set_for_date(
    conn: &Connection,
    user_id: &Uuid,
    date: NaiveDate,
) -> Result<CompletionSet, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT medication_id, planned_time
         FROM checkins
         WHERE user_id = ?1 AND status = 'completed'
           AND planned_time IS NOT NULL AND date(planned_time) = ?2",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string(), date.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut completion = CompletionSet::new();
    for (medication_id, planned_time) in rows {
        let medication_id: Uuid = medication_id.parse().unwrap_or_else(|_| Uuid::nil());
        let planned = parse_datetime(&planned_time, "planned_time")?;
        let time = planned.time();
        let time = time.with_second(0).unwrap_or(time);
        completion.insert(medication_id, planned.date(), time);
    }
    Ok(completion)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct CheckinRow {
    id: String,
    user_id: String,
    medication_id: String,
    plan_id: Option<String>,
    planned_time: Option<String>,
    actual_time: String,
    dose: Option<f64>,
    dose_unit: Option<String>,
    status: String,
    is_makeup: i32,
    makeup_reason: Option<String>,
    notes: Option<String>,
}

fn checkin_row(row: &rusqlite::Row) -> rusqlite::Result<CheckinRow> {
    Ok(CheckinRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        medication_id: row.get(2)?,
        plan_id: row.get(3)?,
        planned_time: row.get(4)?,
        actual_time: row.get(5)?,
        dose: row.get(6)?,
        dose_unit: row.get(7)?,
        status: row.get(8)?,
        is_makeup: row.get(9)?,
        makeup_reason: row.get(10)?,
        notes: row.get(11)?,
    })
}

fn checkin_from_row(row: CheckinRow) -> Result<Checkin, StoreError> {
    Ok(Checkin {
        id: row.id.parse().unwrap_or_else(|_| Uuid::nil()),
        user_id: row.user_id.parse().unwrap_or_else(|_| Uuid::nil()),
        medication_id: row.medication_id.parse().unwrap_or_else(|_| Uuid::nil()),
        plan_id: row.plan_id.and_then(|id| id.parse().ok()),
        planned_time: row
            .planned_time
            .and_then(|t| NaiveDateTime::parse_from_str(&t, DATETIME_FMT).ok()),
        actual_time: parse_datetime(&row.actual_time, "actual_time")?,
        dose: row.dose,
        dose_unit: row.dose_unit,
        status: CheckinStatus::from_str(&row.status)?,
        is_makeup: row.is_makeup != 0,
        makeup_reason: row.makeup_reason,
        notes: row.notes,
        photos: Vec::new(),
    })
}

fn fetch_photos(conn: &Connection, checkin_id: &Uuid) -> Result<Vec<CheckinPhoto>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, checkin_id, photo_url, sort_order
         FROM checkin_photos WHERE checkin_id = ?1
         ORDER BY sort_order ASC",
    )?;
    let rows = stmt
        .query_map(params![checkin_id.to_string()], |row| {
            Ok(CheckinPhoto {
                id: row
                    .get::<_, String>(0)?
                    .parse()
                    .unwrap_or_else(|_| Uuid::nil()),
                checkin_id: row
                    .get::<_, String>(1)?
                    .parse()
                    .unwrap_or_else(|_| Uuid::nil()),
                photo_url: row.get(2)?,
                sort_order: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn parse_datetime(s: &str, field: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|_| StoreError::InvalidEnum {
        field: field.into(),
        value: s.into(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
