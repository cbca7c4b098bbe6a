//! Care relations: who may see whose adherence.
//!
//! A relation is created either directly from an invite code or by
//! accepting a supervision request. Reads of a supervised user's agenda
//! go through [`fetch_supervised_plans`], which checks the relation first —
//! the adherence data of another user is never reachable without one.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::{plan, user};
use crate::db::StoreError;
use crate::models::{
    enums::{RelationType, RequestStatus, SupervisionStatus},
    DailyPlan, Supervision, SupervisionRequest,
};

/// People this user cares for (active relations only).
pub fn list_my_cares(conn: &Connection, user_id: &Uuid) -> Result<Vec<Supervision>, StoreError> {
    fetch_supervisions(
        conn,
        "s.supervisor_id = ?1 AND s.status = 'active'",
        user_id,
    )
}

/// People caring for this user (active relations only).
pub fn list_cares_me(conn: &Connection, user_id: &Uuid) -> Result<Vec<Supervision>, StoreError> {
    fetch_supervisions(
        conn,
        "s.supervised_id = ?1 AND s.status = 'active'",
        user_id,
    )
}

/// Start caring for the user who owns `invite_code`.
pub fn add_care(
    conn: &Connection,
    supervisor_id: &Uuid,
    invite_code: &str,
    relation_type: RelationType,
) -> Result<Supervision, StoreError> {
    let supervised = user::find_user_by_invite_code(conn, invite_code)?.ok_or_else(|| {
        StoreError::NotFound {
            entity_type: "user".into(),
            id: invite_code.to_string(),
        }
    })?;

    if supervised.id == *supervisor_id {
        return Err(StoreError::ConstraintViolation(
            "cannot add a care relation to yourself".into(),
        ));
    }

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM supervisions
         WHERE supervisor_id = ?1 AND supervised_id = ?2",
        params![supervisor_id.to_string(), supervised.id.to_string()],
        |row| row.get(0),
    )?;
    if exists {
        return Err(StoreError::ConstraintViolation(
            "care relation already exists".into(),
        ));
    }

    insert_supervision(conn, supervisor_id, &supervised.id, relation_type)
}

/// Set a relation active/blocked. The supervised user controls this.
pub fn set_care_status(
    conn: &Connection,
    supervised_id: &Uuid,
    supervisor_id: &Uuid,
    status: SupervisionStatus,
) -> Result<(), StoreError> {
    let affected = conn.execute(
        "UPDATE supervisions SET status = ?3
         WHERE supervisor_id = ?1 AND supervised_id = ?2",
        params![
            supervisor_id.to_string(),
            supervised_id.to_string(),
            status.as_str()
        ],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound {
            entity_type: "supervision".into(),
            id: format!("{supervisor_id}->{supervised_id}"),
        });
    }
    Ok(())
}

/// A supervised user's agenda for a date, readable only through an active
/// care relation.
pub fn fetch_supervised_plans(
    conn: &Connection,
    supervisor_id: &Uuid,
    supervised_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<DailyPlan>, StoreError> {
    let related: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM supervisions
         WHERE supervisor_id = ?1 AND supervised_id = ?2 AND status = 'active'",
        params![supervisor_id.to_string(), supervised_id.to_string()],
        |row| row.get(0),
    )?;
    if !related {
        return Err(StoreError::ConstraintViolation(
            "no active care relation with this user".into(),
        ));
    }
    plan::fetch_plans_for_date(conn, supervised_id, date)
}

// ---------------------------------------------------------------------------
// Supervision requests
// ---------------------------------------------------------------------------

/// Ask to become the supervisor of the user who owns `invite_code`.
pub fn create_supervision_request(
    conn: &Connection,
    sender_id: &Uuid,
    invite_code: &str,
    message: Option<&str>,
) -> Result<SupervisionRequest, StoreError> {
    let receiver = user::find_user_by_invite_code(conn, invite_code)?.ok_or_else(|| {
        StoreError::NotFound {
            entity_type: "user".into(),
            id: invite_code.to_string(),
        }
    })?;

    if receiver.id == *sender_id {
        return Err(StoreError::ConstraintViolation(
            "cannot request to care for yourself".into(),
        ));
    }

    let request = SupervisionRequest {
        id: Uuid::new_v4(),
        sender_id: *sender_id,
        receiver_id: receiver.id,
        message: message.map(String::from),
        status: RequestStatus::Pending,
        processed_at: None,
    };
    conn.execute(
        "INSERT INTO supervision_requests (id, sender_id, receiver_id, message, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            request.id.to_string(),
            request.sender_id.to_string(),
            request.receiver_id.to_string(),
            request.message,
            request.status.as_str(),
        ],
    )?;
    Ok(request)
}

/// Requests waiting on this user's decision.
pub fn list_pending_requests(
    conn: &Connection,
    receiver_id: &Uuid,
) -> Result<Vec<SupervisionRequest>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, message, status, processed_at
         FROM supervision_requests
         WHERE receiver_id = ?1 AND status = 'pending'
         ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![receiver_id.to_string()], request_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(request_from_row).collect()
}

/// Accept or reject a pending request. Accepting creates the relation
/// (the sender becomes this user's supervisor).
pub fn respond_to_request(
    conn: &Connection,
    receiver_id: &Uuid,
    request_id: &Uuid,
    accept: bool,
    relation_type: RelationType,
) -> Result<SupervisionRequest, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, sender_id, receiver_id, message, status, processed_at
             FROM supervision_requests
             WHERE id = ?1 AND receiver_id = ?2",
            params![request_id.to_string(), receiver_id.to_string()],
            request_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Err(StoreError::NotFound {
            entity_type: "supervision_request".into(),
            id: request_id.to_string(),
        });
    };
    let mut request = request_from_row(row)?;

    if request.status != RequestStatus::Pending {
        return Err(StoreError::ConstraintViolation(
            "request already processed".into(),
        ));
    }

    let status = if accept {
        RequestStatus::Accepted
    } else {
        RequestStatus::Rejected
    };
    conn.execute(
        "UPDATE supervision_requests
         SET status = ?2, processed_at = datetime('now')
         WHERE id = ?1",
        params![request_id.to_string(), status.as_str()],
    )?;
    request.status = status;

    if accept {
        insert_supervision(conn, &request.sender_id, receiver_id, relation_type)?;
    }
    Ok(request)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn insert_supervision(
    conn: &Connection,
    supervisor_id: &Uuid,
    supervised_id: &Uuid,
    relation_type: RelationType,
) -> Result<Supervision, StoreError> {
    let supervision = Supervision {
        id: Uuid::new_v4(),
        supervisor_id: *supervisor_id,
        supervised_id: *supervised_id,
        relation_type,
        status: SupervisionStatus::Active,
        supervisor_name: user::get_user(conn, supervisor_id)?.map(|u| u.username),
        supervised_name: user::get_user(conn, supervised_id)?.map(|u| u.username),
    };
    conn.execute(
        "INSERT INTO supervisions (id, supervisor_id, supervised_id, relation_type, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            supervision.id.to_string(),
            supervision.supervisor_id.to_string(),
            supervision.supervised_id.to_string(),
            supervision.relation_type.as_str(),
            supervision.status.as_str(),
        ],
    )?;
    Ok(supervision)
}

fn fetch_supervisions(
    conn: &Connection,
    filter: &str,
    user_id: &Uuid,
) -> Result<Vec<Supervision>, StoreError> {
    let sql = format!(
        "SELECT s.id, s.supervisor_id, s.supervised_id, s.relation_type, s.status,
                a.username AS supervisor_name, b.username AS supervised_name
         FROM supervisions s
         LEFT JOIN users a ON s.supervisor_id = a.id
         LEFT JOIN users b ON s.supervised_id = b.id
         WHERE {filter}
         ORDER BY s.created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut supervisions = Vec::new();
    for (id, supervisor_id, supervised_id, relation_type, status, a, b) in rows {
        supervisions.push(Supervision {
            id: id.parse().unwrap_or_else(|_| Uuid::nil()),
            supervisor_id: supervisor_id.parse().unwrap_or_else(|_| Uuid::nil()),
            supervised_id: supervised_id.parse().unwrap_or_else(|_| Uuid::nil()),
            relation_type: RelationType::from_str(&relation_type)?,
            status: SupervisionStatus::from_str(&status)?,
            supervisor_name: a,
            supervised_name: b,
        });
    }
    Ok(supervisions)
}

struct RequestRow {
    id: String,
    sender_id: String,
    receiver_id: String,
    message: Option<String>,
    status: String,
    processed_at: Option<String>,
}

fn request_row(row: &rusqlite::Row) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        message: row.get(3)?,
        status: row.get(4)?,
        processed_at: row.get(5)?,
    })
}

fn request_from_row(row: RequestRow) -> Result<SupervisionRequest, StoreError> {
    Ok(SupervisionRequest {
        id: row.id.parse().unwrap_or_else(|_| Uuid::nil()),
        sender_id: row.sender_id.parse().unwrap_or_else(|_| Uuid::nil()),
        receiver_id: row.receiver_id.parse().unwrap_or_else(|_| Uuid::nil()),
        message: row.message,
        status: RequestStatus::from_str(&row.status)?,
        processed_at: row
            .processed_at
            .and_then(|t| NaiveDateTime::parse_from_str(&t, "%Y-%m-%d %H:%M:%S").ok()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
