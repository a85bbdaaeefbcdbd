use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CovenantBreach,
    CovenantWarning,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Urgent,
    High,
    Normal,
}

/// Reference to the entity a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Facility(Uuid),
    Covenant(Uuid),
}

/// An addressed, typed alert record. Created only by the notification
/// fan-out; immutable once written except for the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<EntityRef>,
    pub priority: NotificationPriority,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        related: Option<EntityRef>,
        priority: NotificationPriority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Notification {
            id: Uuid::new_v4(),
            recipient_id,
            kind,
            title: title.into(),
            message: message.into(),
            related,
            priority,
            read: false,
            created_at,
        }
    }
}
