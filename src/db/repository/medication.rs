//! Medication CRUD and schedule-rule persistence.
//!
//! Rules live in the `schedules` table, one row per recurrence entry with
//! the weekday set stored as a JSON array; writes replace a medication's
//! rules wholesale, which keeps the table in step with the validated
//! in-memory `ScheduleRuleSet`.

use std::collections::BTreeSet;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{enums::Frequency, Medication};
use crate::schedule::{format_clock_time, parse_clock_time, ScheduleRule, ScheduleRuleSet};

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO medications (id, user_id, name, alias, category, form, specification,
         stock, stock_unit, default_dose, dose_unit, frequency, image_url, notes, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            med.id.to_string(),
            med.user_id.to_string(),
            med.name,
            med.alias,
            med.category,
            med.form,
            med.specification,
            med.stock,
            med.stock_unit,
            med.default_dose,
            med.dose_unit,
            med.frequency.as_str(),
            med.image_url,
            med.notes,
            med.is_active as i32,
        ],
    )?;
    replace_schedule_rules(conn, &med.id, &med.schedule)
}

pub fn update_medication(conn: &Connection, med: &Medication) -> Result<(), StoreError> {
    let affected = conn.execute(
        "UPDATE medications
         SET name = ?2, alias = ?3, category = ?4, form = ?5, specification = ?6,
             stock = ?7, stock_unit = ?8, default_dose = ?9, dose_unit = ?10,
             frequency = ?11, image_url = ?12, notes = ?13, is_active = ?14,
             updated_at = datetime('now')
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.alias,
            med.category,
            med.form,
            med.specification,
            med.stock,
            med.stock_unit,
            med.default_dose,
            med.dose_unit,
            med.frequency.as_str(),
            med.image_url,
            med.notes,
            med.is_active as i32,
        ],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication".into(),
            id: med.id.to_string(),
        });
    }
    replace_schedule_rules(conn, &med.id, &med.schedule)
}

/// Delete a medication along with its rules and materialized plans.
/// Refused while check-in history exists — deactivate instead.
pub fn delete_medication(conn: &Connection, id: &Uuid) -> Result<(), StoreError> {
    let history: u32 = conn.query_row(
        "SELECT COUNT(*) FROM checkins WHERE medication_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    if history > 0 {
        return Err(StoreError::ConstraintViolation(
            "medication has check-in history; deactivate it instead".into(),
        ));
    }

    let affected = conn.execute(
        "DELETE FROM medications WHERE id = ?1",
        params![id.to_string()],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn set_medication_active(
    conn: &Connection,
    id: &Uuid,
    is_active: bool,
) -> Result<(), StoreError> {
    let affected = conn.execute(
        "UPDATE medications SET is_active = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id.to_string(), is_active as i32],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Option<Medication>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, alias, category, form, specification, stock,
             stock_unit, default_dose, dose_unit, frequency, image_url, notes, is_active
             FROM medications WHERE id = ?1",
            params![id.to_string()],
            medication_row,
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(medication_from_row(conn, row)?)),
        None => Ok(None),
    }
}

/// All of one user's medications, active first, newest first within a group.
pub fn list_medications(conn: &Connection, user_id: &Uuid) -> Result<Vec<Medication>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, alias, category, form, specification, stock,
         stock_unit, default_dose, dose_unit, frequency, image_url, notes, is_active
         FROM medications WHERE user_id = ?1
         ORDER BY is_active DESC, created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string()], medication_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| medication_from_row(conn, row))
        .collect()
}

/// One user's active medications.
pub fn list_active_medications(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Medication>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, alias, category, form, specification, stock,
         stock_unit, default_dose, dose_unit, frequency, image_url, notes, is_active
         FROM medications WHERE user_id = ?1 AND is_active = 1
         ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string()], medication_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| medication_from_row(conn, row))
        .collect()
}

/// Every active medication regardless of owner — the materializer walks
/// all users in one pass.
pub fn list_all_active_medications(conn: &Connection) -> Result<Vec<Medication>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, alias, category, form, specification, stock,
         stock_unit, default_dose, dose_unit, frequency, image_url, notes, is_active
         FROM medications WHERE is_active = 1
         ORDER BY user_id ASC, created_at ASC",
    )?;
    let rows = stmt
        .query_map([], medication_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| medication_from_row(conn, row))
        .collect()
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct MedicationRow {
    id: String,
    user_id: String,
    name: String,
    alias: Option<String>,
    category: Option<String>,
    form: Option<String>,
    specification: Option<String>,
    stock: Option<i64>,
    stock_unit: String,
    default_dose: f64,
    dose_unit: String,
    frequency: String,
    image_url: Option<String>,
    notes: Option<String>,
    is_active: i32,
}

fn medication_row(row: &rusqlite::Row) -> rusqlite::Result<MedicationRow> {
    Ok(MedicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        alias: row.get(3)?,
        category: row.get(4)?,
        form: row.get(5)?,
        specification: row.get(6)?,
        stock: row.get(7)?,
        stock_unit: row.get(8)?,
        default_dose: row.get(9)?,
        dose_unit: row.get(10)?,
        frequency: row.get(11)?,
        image_url: row.get(12)?,
        notes: row.get(13)?,
        is_active: row.get(14)?,
    })
}

fn medication_from_row(conn: &Connection, row: MedicationRow) -> Result<Medication, StoreError> {
    let id: Uuid = row.id.parse().unwrap_or_else(|_| Uuid::nil());
    Ok(Medication {
        id,
        user_id: row.user_id.parse().unwrap_or_else(|_| Uuid::nil()),
        name: row.name,
        alias: row.alias,
        category: row.category,
        form: row.form,
        specification: row.specification,
        stock: row.stock.and_then(|v| u32::try_from(v).ok()),
        stock_unit: row.stock_unit,
        default_dose: row.default_dose,
        dose_unit: row.dose_unit,
        frequency: Frequency::from_str(&row.frequency)?,
        schedule: load_schedule_rules(conn, &id)?,
        image_url: row.image_url,
        notes: row.notes,
        is_active: row.is_active != 0,
    })
}

fn replace_schedule_rules(
    conn: &Connection,
    medication_id: &Uuid,
    schedule: &ScheduleRuleSet,
) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM schedules WHERE medication_id = ?1",
        params![medication_id.to_string()],
    )?;
    for rule in schedule.rules() {
        let days = serde_json::to_string(&rule.weekdays).map_err(|e| StoreError::InvalidEnum {
            field: "days".into(),
            value: e.to_string(),
        })?;
        conn.execute(
            "INSERT INTO schedules (id, medication_id, time, days, dose, dose_unit, require_photo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                medication_id.to_string(),
                format_clock_time(rule.time),
                days,
                rule.dose,
                rule.dose_unit,
                rule.require_photo as i32,
            ],
        )?;
    }
    Ok(())
}

fn load_schedule_rules(
    conn: &Connection,
    medication_id: &Uuid,
) -> Result<ScheduleRuleSet, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT time, days, dose, dose_unit, require_photo
         FROM schedules WHERE medication_id = ?1
         ORDER BY time ASC",
    )?;
    let rows = stmt
        .query_map(params![medication_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i32>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rules = Vec::new();
    for (time, days, dose, dose_unit, require_photo) in rows {
        let weekdays: BTreeSet<u8> =
            serde_json::from_str(&days).map_err(|_| StoreError::InvalidEnum {
                field: "days".into(),
                value: days.clone(),
            })?;
        rules.push(ScheduleRule {
            time: parse_clock_time(&time)?,
            weekdays,
            dose,
            dose_unit,
            require_photo: require_photo != 0,
        });
    }
    ScheduleRuleSet::from_rules(rules).map_err(StoreError::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
