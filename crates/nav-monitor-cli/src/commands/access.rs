use clap::{Args, ValueEnum};
use serde_json::Value;
use uuid::Uuid;

use nav_monitor_core::access::{self, FacilityAction, ResourceOwner};
use nav_monitor_core::model::Role;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Admin,
    Operations,
    Gp,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Operations => Role::Operations,
            RoleArg::Gp => Role::Gp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    View,
    Update,
    RequestDraw,
    CheckCovenants,
    Delete,
}

impl From<ActionArg> for FacilityAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::View => FacilityAction::View,
            ActionArg::Update => FacilityAction::Update,
            ActionArg::RequestDraw => FacilityAction::RequestDraw,
            ActionArg::CheckCovenants => FacilityAction::CheckCovenants,
            ActionArg::Delete => FacilityAction::Delete,
        }
    }
}

/// Arguments for the facility access check. Exactly one of --owner,
/// --unassigned, or --missing describes the facility's ownership state.
#[derive(Args)]
pub struct AuthorizeArgs {
    /// Acting user id
    #[arg(long)]
    pub actor: Uuid,

    /// Acting user's role
    #[arg(long)]
    pub role: RoleArg,

    /// Action being attempted
    #[arg(long, default_value = "view")]
    pub action: ActionArg,

    /// GP user id that owns the facility
    #[arg(long, conflicts_with_all = ["unassigned", "missing"])]
    pub owner: Option<Uuid>,

    /// The facility exists but no GP has been assigned
    #[arg(long, conflicts_with = "missing")]
    pub unassigned: bool,

    /// The facility does not exist
    #[arg(long)]
    pub missing: bool,
}

pub fn run_authorize(args: AuthorizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let owner = if args.missing {
        ResourceOwner::Missing
    } else if args.unassigned {
        ResourceOwner::Unassigned
    } else if let Some(gp) = args.owner {
        ResourceOwner::OwnedBy(gp)
    } else {
        return Err("one of --owner, --unassigned, or --missing is required".into());
    };

    let decision = access::authorize(&owner, args.actor, args.role.into(), args.action.into());
    Ok(serde_json::to_value(decision)?)
}
