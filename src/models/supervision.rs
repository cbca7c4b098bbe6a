use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RelationType, RequestStatus, SupervisionStatus};

/// A care relation: `supervisor` may view `supervised`'s adherence.
/// Usernames are joined in for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supervision {
    pub id: Uuid,
    pub supervisor_id: Uuid,
    pub supervised_id: Uuid,
    pub relation_type: RelationType,
    pub status: SupervisionStatus,
    pub supervisor_name: Option<String>,
    pub supervised_name: Option<String>,
}

/// A pending ask to become someone's supervisor. Accepting creates the
/// `Supervision` row; rejecting only records the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub processed_at: Option<NaiveDateTime>,
}
