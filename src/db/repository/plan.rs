//! Daily-plan materialization and queries.
//!
//! One row is materialized per due (user, medication, date, time); the row
//! then carries the mutable `is_taken` flag that check-in actions flip.
//! Materialization is idempotent so the nightly job and an on-demand call
//! can race without duplicating anyone's agenda.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::medication::list_all_active_medications;
use crate::db::StoreError;
use crate::models::DailyPlan;
use crate::schedule::{classify, format_clock_time, parse_clock_time, parse_plan_date, TimeBucket};

/// Expand every active medication's rules into `daily_plans` rows for
/// `date`. Existing rows are kept untouched; returns how many were inserted.
pub fn materialize_daily_plans(conn: &Connection, date: NaiveDate) -> Result<u32, StoreError> {
    let medications = list_all_active_medications(conn)?;
    let mut inserted = 0u32;

    for med in &medications {
        for rule in med.schedule.rules_due_on(date) {
            let time = format_clock_time(rule.time);
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM daily_plans
                 WHERE user_id = ?1 AND medication_id = ?2
                   AND plan_date = ?3 AND scheduled_time = ?4",
                params![
                    med.user_id.to_string(),
                    med.id.to_string(),
                    date.to_string(),
                    time
                ],
                |row| row.get(0),
            )?;
            if exists {
                continue;
            }

            conn.execute(
                "INSERT INTO daily_plans
                 (id, user_id, medication_id, plan_date, scheduled_time, dose, dose_unit, is_taken)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                params![
                    Uuid::new_v4().to_string(),
                    med.user_id.to_string(),
                    med.id.to_string(),
                    date.to_string(),
                    time,
                    rule.dose.unwrap_or(med.default_dose),
                    rule.dose_unit.clone().unwrap_or_else(|| med.dose_unit.clone()),
                ],
            )?;
            inserted += 1;
        }
    }

    tracing::info!("materialized {inserted} daily plans for {date}");
    Ok(inserted)
}

/// One user's agenda for a date, ordered by scheduled time.
pub fn fetch_plans_for_date(
    conn: &Connection,
    user_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<DailyPlan>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.medication_id, m.name, p.plan_date,
                p.scheduled_time, p.dose, p.dose_unit, p.is_taken
         FROM daily_plans p
         LEFT JOIN medications m ON p.medication_id = m.id
         WHERE p.user_id = ?1 AND p.plan_date = ?2
         ORDER BY p.scheduled_time ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string(), date.to_string()], plan_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(plan_from_row).collect()
}

/// One user's full plan history: newest date first, time ascending within
/// a date.
pub fn fetch_all_plans(conn: &Connection, user_id: &Uuid) -> Result<Vec<DailyPlan>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.medication_id, m.name, p.plan_date,
                p.scheduled_time, p.dose, p.dose_unit, p.is_taken
         FROM daily_plans p
         LEFT JOIN medications m ON p.medication_id = m.id
         WHERE p.user_id = ?1
         ORDER BY p.plan_date DESC, p.scheduled_time ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id.to_string()], plan_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(plan_from_row).collect()
}

/// Mark one plan taken. Idempotent: re-marking a taken plan succeeds
/// without touching the row again. Unknown plan ids are an error.
pub fn mark_plan_taken(
    conn: &Connection,
    user_id: &Uuid,
    plan_id: &Uuid,
) -> Result<DailyPlan, StoreError> {
    let row = conn
        .query_row(
            "SELECT p.id, p.user_id, p.medication_id, m.name, p.plan_date,
                    p.scheduled_time, p.dose, p.dose_unit, p.is_taken
             FROM daily_plans p
             LEFT JOIN medications m ON p.medication_id = m.id
             WHERE p.id = ?1 AND p.user_id = ?2",
            params![plan_id.to_string(), user_id.to_string()],
            plan_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Err(StoreError::NotFound {
            entity_type: "daily_plan".into(),
            id: plan_id.to_string(),
        });
    };
    let mut plan = plan_from_row(row)?;

    if !plan.is_taken {
        conn.execute(
            "UPDATE daily_plans SET is_taken = 1, updated_at = datetime('now') WHERE id = ?1",
            params![plan_id.to_string()],
        )?;
        plan.is_taken = true;
    }
    Ok(plan)
}

/// Mark every still-pending plan in one time bucket taken for a date
/// ("all morning doses"). Returns how many rows changed.
pub fn mark_bucket_taken(
    conn: &Connection,
    user_id: &Uuid,
    date: NaiveDate,
    bucket: TimeBucket,
) -> Result<u32, StoreError> {
    let plans = fetch_plans_for_date(conn, user_id, date)?;
    let mut updated = 0u32;

    for plan in plans {
        if plan.is_taken || classify(plan.scheduled_time) != bucket {
            continue;
        }
        conn.execute(
            "UPDATE daily_plans SET is_taken = 1, updated_at = datetime('now') WHERE id = ?1",
            params![plan.id.to_string()],
        )?;
        updated += 1;
    }

    tracing::debug!(
        "bucket check-in: {updated} plans marked taken ({} on {date})",
        bucket.as_str()
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct PlanRow {
    id: String,
    user_id: String,
    medication_id: String,
    medication_name: Option<String>,
    plan_date: String,
    scheduled_time: String,
    dose: f64,
    dose_unit: String,
    is_taken: i32,
}

fn plan_row(row: &rusqlite::Row) -> rusqlite::Result<PlanRow> {
    Ok(PlanRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        medication_id: row.get(2)?,
        medication_name: row.get(3)?,
        plan_date: row.get(4)?,
        scheduled_time: row.get(5)?,
        dose: row.get(6)?,
        dose_unit: row.get(7)?,
        is_taken: row.get(8)?,
    })
}

fn plan_from_row(row: PlanRow) -> Result<DailyPlan, StoreError> {
    Ok(DailyPlan {
        id: row.id.parse().unwrap_or_else(|_| Uuid::nil()),
        user_id: row.user_id.parse().unwrap_or_else(|_| Uuid::nil()),
        medication_id: row.medication_id.parse().unwrap_or_else(|_| Uuid::nil()),
        medication_name: row.medication_name,
        plan_date: parse_plan_date(&row.plan_date)?,
        scheduled_time: parse_clock_time(&row.scheduled_time)?,
        dose: row.dose,
        dose_unit: row.dose_unit,
        is_taken: row.is_taken != 0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::medication::insert_medication;
    use crate::db::repository::user::create_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Medication;
    use crate::schedule::ScheduleRule;

    fn t(s: &str) -> chrono::NaiveTime {
        parse_clock_time(s).unwrap()
    }

    // 2025-03-05 is a Wednesday.
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    fn insert_med_with_times(conn: &Connection, name: &str, times: &[&str]) -> Medication {
        let user = create_user(conn, &format!("owner-of-{name}")).unwrap();
        let mut med = Medication::new(user.id, name);
        for time in times {
            med.schedule.add_rule(ScheduleRule::daily(t(time))).unwrap();
        }
        insert_medication(conn, &med).unwrap();
        med
    }

    #[test]
    fn materialization_creates_one_row_per_due_time() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00", "20:00"]);

        let inserted = materialize_daily_plans(&conn, wednesday()).unwrap();
        assert_eq!(inserted, 2);

        let plans = fetch_plans_for_date(&conn, &med.user_id, wednesday()).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].scheduled_time, t("08:00"));
        assert_eq!(plans[1].scheduled_time, t("20:00"));
        assert!(plans.iter().all(|p| !p.is_taken));
        assert_eq!(plans[0].medication_name.as_deref(), Some("Metformin"));
    }

    #[test]
    fn materialization_is_idempotent() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00"]);

        assert_eq!(materialize_daily_plans(&conn, wednesday()).unwrap(), 1);
        assert_eq!(materialize_daily_plans(&conn, wednesday()).unwrap(), 0);

        let plans = fetch_plans_for_date(&conn, &med.user_id, wednesday()).unwrap();
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn materialization_respects_weekdays() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "alice").unwrap();
        let mut med = Medication::new(user.id, "Alendronate");
        // Saturday-only dose.
        med.schedule.add_rule(ScheduleRule::on_days(t("08:00"), [6])).unwrap();
        insert_medication(&conn, &med).unwrap();

        assert_eq!(materialize_daily_plans(&conn, wednesday()).unwrap(), 0);

        let saturday = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert_eq!(materialize_daily_plans(&conn, saturday).unwrap(), 1);
    }

    #[test]
    fn materialization_uses_rule_dose_override() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "alice").unwrap();
        let mut med = Medication::new(user.id, "Insulin");
        med.default_dose = 10.0;
        med.dose_unit = "IU".into();
        let mut evening = ScheduleRule::daily(t("20:00"));
        evening.dose = Some(14.0);
        med.schedule.add_rule(ScheduleRule::daily(t("08:00"))).unwrap();
        med.schedule.add_rule(evening).unwrap();
        insert_medication(&conn, &med).unwrap();

        materialize_daily_plans(&conn, wednesday()).unwrap();

        let plans = fetch_plans_for_date(&conn, &user.id, wednesday()).unwrap();
        assert_eq!(plans[0].dose, 10.0);
        assert_eq!(plans[1].dose, 14.0);
        assert_eq!(plans[1].dose_unit, "IU");
    }

    #[test]
    fn inactive_medication_not_materialized() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00"]);
        crate::db::repository::medication::set_medication_active(&conn, &med.id, false).unwrap();

        assert_eq!(materialize_daily_plans(&conn, wednesday()).unwrap(), 0);
    }

    #[test]
    fn mark_taken_is_idempotent() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00"]);
        materialize_daily_plans(&conn, wednesday()).unwrap();

        let plans = fetch_plans_for_date(&conn, &med.user_id, wednesday()).unwrap();
        let plan_id = plans[0].id;

        let taken = mark_plan_taken(&conn, &med.user_id, &plan_id).unwrap();
        assert!(taken.is_taken);

        // Second call: still fine, still taken.
        let again = mark_plan_taken(&conn, &med.user_id, &plan_id).unwrap();
        assert!(again.is_taken);
    }

    #[test]
    fn mark_taken_unknown_plan_fails() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "alice").unwrap();
        assert!(matches!(
            mark_plan_taken(&conn, &user.id, &Uuid::new_v4()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn mark_taken_scoped_to_owner() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00"]);
        materialize_daily_plans(&conn, wednesday()).unwrap();
        let plans = fetch_plans_for_date(&conn, &med.user_id, wednesday()).unwrap();

        let stranger = create_user(&conn, "mallory").unwrap();
        assert!(matches!(
            mark_plan_taken(&conn, &stranger.id, &plans[0].id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn bucket_checkin_only_touches_that_bucket() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["07:00", "08:30", "21:00"]);
        materialize_daily_plans(&conn, wednesday()).unwrap();

        let updated =
            mark_bucket_taken(&conn, &med.user_id, wednesday(), TimeBucket::Morning).unwrap();
        assert_eq!(updated, 2);

        let plans = fetch_plans_for_date(&conn, &med.user_id, wednesday()).unwrap();
        assert!(plans[0].is_taken);
        assert!(plans[1].is_taken);
        assert!(!plans[2].is_taken);

        // Re-running finds nothing pending in the bucket.
        let again =
            mark_bucket_taken(&conn, &med.user_id, wednesday(), TimeBucket::Morning).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn history_ordered_newest_date_first() {
        let conn = open_memory_database().unwrap();
        let med = insert_med_with_times(&conn, "Metformin", &["08:00", "20:00"]);

        let thursday = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        materialize_daily_plans(&conn, wednesday()).unwrap();
        materialize_daily_plans(&conn, thursday).unwrap();

        let all = fetch_all_plans(&conn, &med.user_id).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].plan_date, thursday);
        assert_eq!(all[0].scheduled_time, t("08:00"));
        assert_eq!(all[1].scheduled_time, t("20:00"));
        assert_eq!(all[2].plan_date, wednesday());
    }

    #[test]
    fn agenda_merges_medications_by_time() {
        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, "alice").unwrap();
        let mut a = Medication::new(user.id, "Metformin");
        a.schedule.add_rule(ScheduleRule::daily(t("08:00"))).unwrap();
        let mut b = Medication::new(user.id, "Lisinopril");
        b.schedule.add_rule(ScheduleRule::daily(t("07:30"))).unwrap();
        insert_medication(&conn, &a).unwrap();
        insert_medication(&conn, &b).unwrap();

        materialize_daily_plans(&conn, wednesday()).unwrap();

        let plans = fetch_plans_for_date(&conn, &user.id, wednesday()).unwrap();
        assert_eq!(plans[0].medication_name.as_deref(), Some("Lisinopril"));
        assert_eq!(plans[1].medication_name.as_deref(), Some("Metformin"));
    }
}
