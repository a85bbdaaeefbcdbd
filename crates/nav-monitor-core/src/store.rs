//! Persistence seam for the monitoring engine.
//!
//! The engine only ever performs single-record reads and writes; there are
//! no multi-record transactions across a batch. `MemoryStore` is the
//! in-process implementation used by the CLI and the test suites; a
//! relational backend would implement the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::NavMonitorError;
use crate::model::{CashFlow, Covenant, Facility, Notification, Role, Session, User};
use crate::risk::PortfolioSnapshot;
use crate::types::{CovenantId, FacilityId, NotificationId, UserId};
use crate::NavMonitorResult;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn facility(&self, id: FacilityId) -> NavMonitorResult<Option<Facility>>;
    async fn facilities(&self) -> NavMonitorResult<Vec<Facility>>;

    async fn covenant(&self, id: CovenantId) -> NavMonitorResult<Option<Covenant>>;
    async fn covenants(&self) -> NavMonitorResult<Vec<Covenant>>;
    /// Covenants with `next_check <= now`.
    async fn covenants_due(&self, now: DateTime<Utc>) -> NavMonitorResult<Vec<Covenant>>;
    async fn covenants_for_facility(
        &self,
        facility_id: FacilityId,
    ) -> NavMonitorResult<Vec<Covenant>>;
    /// Replace a covenant record; errors with NotFound if it was never
    /// inserted.
    async fn update_covenant(&self, covenant: Covenant) -> NavMonitorResult<()>;

    async fn cash_flows(&self) -> NavMonitorResult<Vec<CashFlow>>;

    async fn users_with_roles(&self, roles: &[Role]) -> NavMonitorResult<Vec<User>>;

    async fn insert_notification(&self, notification: Notification) -> NavMonitorResult<()>;
    /// Notifications for one recipient, newest first.
    async fn notifications_for(&self, user: UserId) -> NavMonitorResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: NotificationId) -> NavMonitorResult<()>;
    /// Returns the number of notifications flipped to read.
    async fn mark_all_read(&self, user: UserId) -> NavMonitorResult<usize>;
    async fn delete_notification(&self, id: NotificationId) -> NavMonitorResult<()>;

    /// Drop sessions whose expiry has passed; returns the purge count.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> NavMonitorResult<usize>;

    /// Point-in-time snapshot for the risk aggregator.
    async fn snapshot(&self) -> NavMonitorResult<PortfolioSnapshot>;
}

// ---------------------------------------------------------------------------
// Portfolio data file
// ---------------------------------------------------------------------------

/// Serializable portfolio state, the load format for `MemoryStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioData {
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub covenants: Vec<Covenant>,
    #[serde(default)]
    pub cash_flows: Vec<CashFlow>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    facilities: HashMap<FacilityId, Facility>,
    covenants: HashMap<CovenantId, Covenant>,
    cash_flows: Vec<CashFlow>,
    users: HashMap<UserId, User>,
    notifications: HashMap<NotificationId, Notification>,
    sessions: HashMap<uuid::Uuid, Session>,
}

/// Tokio-`RwLock`-backed store for tests and the CLI.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn from_data(data: PortfolioData) -> Self {
        let mut inner = StoreInner::default();
        for f in data.facilities {
            inner.facilities.insert(f.id, f);
        }
        for c in data.covenants {
            inner.covenants.insert(c.id, c);
        }
        inner.cash_flows = data.cash_flows;
        for u in data.users {
            inner.users.insert(u.id, u);
        }
        for s in data.sessions {
            inner.sessions.insert(s.id, s);
        }
        MemoryStore {
            inner: RwLock::new(inner),
        }
    }

    pub async fn insert_facility(&self, facility: Facility) {
        self.inner.write().await.facilities.insert(facility.id, facility);
    }

    pub async fn insert_covenant(&self, covenant: Covenant) {
        self.inner.write().await.covenants.insert(covenant.id, covenant);
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn insert_session(&self, session: Session) {
        self.inner.write().await.sessions.insert(session.id, session);
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn all_notifications(&self) -> Vec<Notification> {
        let inner = self.inner.read().await;
        let mut all: Vec<Notification> = inner.notifications.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn facility(&self, id: FacilityId) -> NavMonitorResult<Option<Facility>> {
        Ok(self.inner.read().await.facilities.get(&id).cloned())
    }

    async fn facilities(&self) -> NavMonitorResult<Vec<Facility>> {
        Ok(self.inner.read().await.facilities.values().cloned().collect())
    }

    async fn covenant(&self, id: CovenantId) -> NavMonitorResult<Option<Covenant>> {
        Ok(self.inner.read().await.covenants.get(&id).cloned())
    }

    async fn covenants(&self) -> NavMonitorResult<Vec<Covenant>> {
        Ok(self.inner.read().await.covenants.values().cloned().collect())
    }

    async fn covenants_due(&self, now: DateTime<Utc>) -> NavMonitorResult<Vec<Covenant>> {
        Ok(self
            .inner
            .read()
            .await
            .covenants
            .values()
            .filter(|c| c.is_due(now))
            .cloned()
            .collect())
    }

    async fn covenants_for_facility(
        &self,
        facility_id: FacilityId,
    ) -> NavMonitorResult<Vec<Covenant>> {
        Ok(self
            .inner
            .read()
            .await
            .covenants
            .values()
            .filter(|c| c.facility_id == facility_id)
            .cloned()
            .collect())
    }

    async fn update_covenant(&self, covenant: Covenant) -> NavMonitorResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.covenants.contains_key(&covenant.id) {
            return Err(NavMonitorError::NotFound {
                entity: "covenant".into(),
                id: covenant.id,
            });
        }
        inner.covenants.insert(covenant.id, covenant);
        Ok(())
    }

    async fn cash_flows(&self) -> NavMonitorResult<Vec<CashFlow>> {
        Ok(self.inner.read().await.cash_flows.clone())
    }

    async fn users_with_roles(&self, roles: &[Role]) -> NavMonitorResult<Vec<User>> {
        let mut users: Vec<User> = self
            .inner
            .read()
            .await
            .users
            .values()
            .filter(|u| roles.contains(&u.role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn insert_notification(&self, notification: Notification) -> NavMonitorResult<()> {
        self.inner
            .write()
            .await
            .notifications
            .insert(notification.id, notification);
        Ok(())
    }

    async fn notifications_for(&self, user: UserId) -> NavMonitorResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == user)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> NavMonitorResult<()> {
        let mut inner = self.inner.write().await;
        match inner.notifications.get_mut(&id) {
            Some(n) => {
                n.read = true;
                Ok(())
            }
            None => Err(NavMonitorError::NotFound {
                entity: "notification".into(),
                id,
            }),
        }
    }

    async fn mark_all_read(&self, user: UserId) -> NavMonitorResult<usize> {
        let mut inner = self.inner.write().await;
        let mut flipped = 0;
        for n in inner.notifications.values_mut() {
            if n.recipient_id == user && !n.read {
                n.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete_notification(&self, id: NotificationId) -> NavMonitorResult<()> {
        let mut inner = self.inner.write().await;
        match inner.notifications.remove(&id) {
            Some(_) => Ok(()),
            None => Err(NavMonitorError::NotFound {
                entity: "notification".into(),
                id,
            }),
        }
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> NavMonitorResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.expires_at > now);
        Ok(before - inner.sessions.len())
    }

    async fn snapshot(&self) -> NavMonitorResult<PortfolioSnapshot> {
        let inner = self.inner.read().await;
        Ok(PortfolioSnapshot {
            facilities: inner.facilities.values().cloned().collect(),
            covenants: inner.covenants.values().cloned().collect(),
            cash_flows: inner.cash_flows.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityRef, NotificationKind, NotificationPriority};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn notification(recipient: UserId, created_at: DateTime<Utc>) -> Notification {
        Notification::new(
            recipient,
            NotificationKind::General,
            "title",
            "message",
            Some(EntityRef::Facility(Uuid::new_v4())),
            NotificationPriority::Normal,
            created_at,
        )
    }

    #[tokio::test]
    async fn test_notifications_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let older = notification(user, now() - Duration::hours(2));
        let newer = notification(user, now());
        store.insert_notification(older.clone()).await.unwrap();
        store.insert_notification(newer.clone()).await.unwrap();

        let list = store.notifications_for(user).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
    }

    #[tokio::test]
    async fn test_mark_read_and_mark_all_read() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let n1 = notification(user, now());
        let n2 = notification(user, now());
        store.insert_notification(n1.clone()).await.unwrap();
        store.insert_notification(n2.clone()).await.unwrap();

        store.mark_notification_read(n1.id).await.unwrap();
        let flipped = store.mark_all_read(user).await.unwrap();
        assert_eq!(flipped, 1, "only the unread notification should flip");
        assert!(store
            .notifications_for(user)
            .await
            .unwrap()
            .iter()
            .all(|n| n.read));
    }

    #[tokio::test]
    async fn test_mark_read_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.mark_notification_read(Uuid::new_v4()).await.unwrap_err();
        match err {
            NavMonitorError::NotFound { entity, .. } => assert_eq!(entity, "notification"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_notification() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let n = notification(user, now());
        store.insert_notification(n.clone()).await.unwrap();
        store.delete_notification(n.id).await.unwrap();
        assert!(store.notifications_for(user).await.unwrap().is_empty());
        assert!(store.delete_notification(n.id).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store
            .insert_session(Session {
                id: Uuid::new_v4(),
                user_id: user,
                expires_at: now() - Duration::minutes(5),
            })
            .await;
        store
            .insert_session(Session {
                id: Uuid::new_v4(),
                user_id: user,
                expires_at: now() + Duration::hours(8),
            })
            .await;

        let purged = store.purge_expired_sessions(now()).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_covenant_missing_is_not_found() {
        let store = MemoryStore::new();
        let c = crate::engine::test_support::sample_covenant(Uuid::new_v4(), now());
        let err = store.update_covenant(c).await.unwrap_err();
        assert!(matches!(err, NavMonitorError::NotFound { .. }));
    }
}
