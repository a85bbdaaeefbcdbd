use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

/// Platform role. Anything that does not deserialize to a known role maps
/// to `Unknown`, which the access validator denies by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operations,
    Gp,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Operations and admin bypass ownership checks everywhere.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Operations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

/// Login session record. The monitoring engine only touches sessions in
/// the hourly maintenance sweep that purges expired ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}
