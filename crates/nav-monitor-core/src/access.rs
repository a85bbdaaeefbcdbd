//! Ownership-based access validation for facility-scoped operations.
//!
//! A single total function replaces role-string checks scattered across
//! endpoints: every facility-scoped request goes through `authorize`, and
//! any role the policy does not recognize is denied. Existence is checked
//! before ownership so a missing facility is a 404 for every role, while
//! a GP probing another GP's facility gets a non-leaking 403.

use serde::{Deserialize, Serialize};

use crate::model::Role;
use crate::types::UserId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Ownership state of the resource under authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOwner {
    /// The referenced resource does not exist.
    Missing,
    /// The resource exists but no GP has been assigned yet.
    Unassigned,
    /// The resource is owned by this GP user.
    OwnedBy(UserId),
}

/// Facility-scoped action being attempted. Carried for audit context;
/// the policy itself is uniform across actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityAction {
    View,
    Update,
    RequestDraw,
    CheckCovenants,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Granted,
    NotFound,
    OwnerUnassigned,
    WrongOwner,
    RoleDenied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub status_code: u16,
    pub reason: AccessReason,
    pub message: String,
}

impl AccessDecision {
    fn allow() -> Self {
        AccessDecision {
            allowed: true,
            status_code: 200,
            reason: AccessReason::Granted,
            message: "access granted".into(),
        }
    }

    fn deny(status_code: u16, reason: AccessReason, message: &str) -> Self {
        AccessDecision {
            allowed: false,
            status_code,
            reason,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Authorize `actor` (with `role`) to perform `action` on a resource with
/// the given ownership state.
///
/// Policy order: missing resource -> 404 before any ownership comparison;
/// operations/admin -> allow; GP -> allow only when the resource is owned
/// by the actor, with distinct denials for unassigned ownership and wrong
/// owner; any other role -> deny. Total: there is no fallthrough to allow.
pub fn authorize(
    owner: &ResourceOwner,
    actor: UserId,
    role: Role,
    action: FacilityAction,
) -> AccessDecision {
    let _ = action;
    match owner {
        ResourceOwner::Missing => {
            AccessDecision::deny(404, AccessReason::NotFound, "facility not found")
        }
        _ if role.is_staff() => AccessDecision::allow(),
        ResourceOwner::Unassigned => match role {
            Role::Gp => AccessDecision::deny(
                403,
                AccessReason::OwnerUnassigned,
                "this facility has not been assigned to a GP yet; \
                 an operator must assign ownership before it can be accessed",
            ),
            _ => AccessDecision::deny(403, AccessReason::RoleDenied, "access denied"),
        },
        ResourceOwner::OwnedBy(gp) => match role {
            Role::Gp if *gp == actor => AccessDecision::allow(),
            Role::Gp => AccessDecision::deny(
                403,
                AccessReason::WrongOwner,
                "you can only access your own facilities",
            ),
            _ => AccessDecision::deny(403, AccessReason::RoleDenied, "access denied"),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
