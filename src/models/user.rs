use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account as this library sees it: identity plus the invite code other
/// users redeem to start a care relation. Credentials never enter this
/// layer — authentication happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub invite_code: String,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}
