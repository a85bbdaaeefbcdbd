//! Notification fan-out planning.
//!
//! Planning is pure: given a covenant status transition and the recipient
//! set, it decides which notification records to create. The driver owns
//! the ordering guarantees (notify only after the covenant update is
//! durable, flip `breach_notified` only after the breach alerts are
//! stored), so a crash between steps can duplicate an alert but never
//! lose one silently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::model::{
    Covenant, CovenantStatus, EntityRef, Facility, Notification, NotificationKind,
    NotificationPriority, User,
};

/// One covenant status change observed by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: CovenantStatus,
    pub to: CovenantStatus,
}

impl StatusTransition {
    /// A breach alert goes out on Breach status unless one was already
    /// sent for this breach episode.
    pub fn needs_breach_alert(&self, breach_already_notified: bool) -> bool {
        self.to == CovenantStatus::Breach && !breach_already_notified
    }

    /// A warning alert goes out only on entering the warning band from
    /// the compliant side. A covenant recovering from breach into the
    /// band is improving and stays quiet.
    pub fn needs_warning_alert(&self) -> bool {
        self.to == CovenantStatus::Warning && self.from == CovenantStatus::Compliant
    }
}

/// Build the notification records for one transition.
///
/// Breach: urgent, to every staff user plus the owning GP if assigned.
/// Warning entry: high priority, staff only. Anything else: nothing.
pub fn plan_notifications(
    covenant: &Covenant,
    facility: &Facility,
    transition: StatusTransition,
    breach_already_notified: bool,
    current_value: Decimal,
    staff: &[User],
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let related = Some(EntityRef::Covenant(covenant.id));

    if transition.needs_breach_alert(breach_already_notified) {
        let title = format!("Covenant breach: {}", covenant.name);
        let message = format!(
            "Covenant '{}' on facility '{}' is in breach: current value {} against threshold {}.",
            covenant.name, facility.name, current_value, covenant.threshold
        );
        let mut recipients: Vec<_> = staff.iter().map(|u| u.id).collect();
        if let Some(gp) = facility.gp_id {
            if !recipients.contains(&gp) {
                recipients.push(gp);
            }
        }
        return recipients
            .into_iter()
            .map(|recipient| {
                Notification::new(
                    recipient,
                    NotificationKind::CovenantBreach,
                    title.clone(),
                    message.clone(),
                    related,
                    NotificationPriority::Urgent,
                    now,
                )
            })
            .collect();
    }

    if transition.needs_warning_alert() {
        let title = format!("Covenant warning: {}", covenant.name);
        let message = format!(
            "Covenant '{}' on facility '{}' has entered its warning band: current value {} against threshold {}.",
            covenant.name, facility.name, current_value, covenant.threshold
        );
        return staff
            .iter()
            .map(|u| {
                Notification::new(
                    u.id,
                    NotificationKind::CovenantWarning,
                    title.clone(),
                    message.clone(),
                    related,
                    NotificationPriority::High,
                    now,
                )
            })
            .collect();
    }

    Vec::new()
}
