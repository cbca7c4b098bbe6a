//! Adherence statistics over materialized daily plans.
//!
//! The rate is the share of planned doses marked taken in a date range.
//! Banding thresholds match the app's traffic-light display: 90 and above
//! is good, 70 and above fair, anything lower poor.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::StoreError;

/// Aggregate adherence over a date range. `rate` is a percentage; an empty
/// range has rate 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceStats {
    pub total_doses: u32,
    pub taken_doses: u32,
    pub rate: f64,
}

impl AdherenceStats {
    pub fn from_counts(taken: u32, total: u32) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            f64::from(taken) / f64::from(total) * 100.0
        };
        Self {
            total_doses: total,
            taken_doses: taken,
            rate,
        }
    }

    pub fn compliance(&self) -> ComplianceLevel {
        ComplianceLevel::from_rate(self.rate)
    }
}

/// Traffic-light banding for an adherence rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    Good,
    Fair,
    Poor,
}

impl ComplianceLevel {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 90.0 {
            Self::Good
        } else if rate >= 70.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Display color for this band.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Good => "#10B981",
            Self::Fair => "#F59E0B",
            Self::Poor => "#EF4444",
        }
    }
}

/// Per-medication adherence line for a breakdown view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAdherence {
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub stats: AdherenceStats,
}

/// One user's adherence across [from, to] inclusive.
pub fn adherence_between(
    conn: &Connection,
    user_id: &Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<AdherenceStats, StoreError> {
    let (total, taken): (u32, u32) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_taken), 0)
         FROM daily_plans
         WHERE user_id = ?1 AND plan_date BETWEEN ?2 AND ?3",
        params![user_id.to_string(), from.to_string(), to.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(AdherenceStats::from_counts(taken, total))
}

/// Per-medication breakdown of the same range, worst adherence first.
pub fn adherence_by_medication(
    conn: &Connection,
    user_id: &Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MedicationAdherence>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT p.medication_id, m.name, COUNT(*), COALESCE(SUM(p.is_taken), 0)
         FROM daily_plans p
         LEFT JOIN medications m ON p.medication_id = m.id
         WHERE p.user_id = ?1 AND p.plan_date BETWEEN ?2 AND ?3
         GROUP BY p.medication_id
         ORDER BY CAST(COALESCE(SUM(p.is_taken), 0) AS REAL) / COUNT(*) ASC, m.name ASC",
    )?;
    let rows = stmt
        .query_map(
            params![user_id.to_string(), from.to_string(), to.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(id, name, total, taken)| MedicationAdherence {
            medication_id: id.parse().unwrap_or_else(|_| Uuid::nil()),
            medication_name: name,
            stats: AdherenceStats::from_counts(taken, total),
        })
        .collect())
}
