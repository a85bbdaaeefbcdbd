use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{FacilityId, Money, Rate, UserId};

/// Lifecycle status of a credit facility. Facilities are never deleted,
/// only status-transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityStatus {
    Pending,
    Active,
    Closed,
    Matured,
    Defaulted,
}

/// A NAV-lending credit line.
///
/// `outstanding_balance` is the exposure figure used by all concentration
/// math. `ltv_ratio` is stored as a percentage (14.0 = 14%), matching how
/// covenant thresholds for LTV are quoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    /// Owning GP. None means the facility has not yet been assigned to a
    /// GP user; GP-role access is denied until an operator assigns one.
    pub gp_id: Option<UserId>,
    pub name: String,
    pub principal: Money,
    pub outstanding_balance: Money,
    pub interest_rate: Rate,
    /// Loan-to-NAV ratio as a percentage.
    pub ltv_ratio: Rate,
    /// Latest fund NAV reported by the fund administrator, if synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_nav: Option<Money>,
    pub maturity_date: NaiveDate,
    pub status: FacilityStatus,
    /// Fund sector, used for concentration grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Fund vintage year, used for concentration grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    pub fn is_active(&self) -> bool {
        self.status == FacilityStatus::Active
    }

    /// NAV implied by the current LTV ratio and outstanding balance:
    /// `outstanding / (ltv% / 100)`. None when LTV is zero or negative.
    pub fn implied_nav(&self) -> Option<Money> {
        if self.ltv_ratio <= Decimal::ZERO {
            return None;
        }
        Some(self.outstanding_balance / (self.ltv_ratio / dec!(100)))
    }
}
