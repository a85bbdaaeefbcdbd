use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CovenantId, FacilityId};

/// Comparison applied as `current_value <operator> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl ComparisonOperator {
    pub fn satisfied(&self, current: Decimal, threshold: Decimal) -> bool {
        match self {
            ComparisonOperator::LessThan => current < threshold,
            ComparisonOperator::LessThanEqual => current <= threshold,
            ComparisonOperator::GreaterThan => current > threshold,
            ComparisonOperator::GreaterThanEqual => current >= threshold,
        }
    }

    /// Upper-bound covenants cap a metric (e.g. max LTV); lower-bound
    /// covenants floor it (e.g. minimum NAV). The warning band is applied
    /// on the stressed side of the threshold accordingly.
    pub fn is_upper_bound(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::LessThan | ComparisonOperator::LessThanEqual
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantStatus {
    Compliant,
    Warning,
    Breach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantType {
    LtvRatio,
    MinimumNav,
    Diversification,
    Custom,
}

/// Where the batch driver reads the covenant's current measured value from.
/// Modelled as a closed sum type so evaluation is exhaustively checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantSource {
    /// The facility's loan-to-NAV ratio field.
    LtvFromFacility,
    /// Latest NAV synced from the fund administrator, carried on the
    /// facility record.
    NavFromFundAdmin,
    /// Value posted by an operator through the manual check operation;
    /// the driver re-uses the last posted value.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl CheckFrequency {
    pub fn period_days(&self) -> i64 {
        match self {
            CheckFrequency::Daily => 1,
            CheckFrequency::Weekly => 7,
            CheckFrequency::Monthly => 30,
            CheckFrequency::Quarterly => 90,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::days(self.period_days())
    }
}

/// A monitored compliance rule attached to exactly one facility.
///
/// `status` is always derivable from (operator, threshold, current_value)
/// plus the warning band; it is only ever written by the evaluator or a
/// manual operator override. `breach_notified` guarantees at-most-one
/// breach fan-out per breach episode and resets only once the covenant
/// has returned to compliant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Covenant {
    pub id: CovenantId,
    pub facility_id: FacilityId,
    pub name: String,
    pub covenant_type: CovenantType,
    pub operator: ComparisonOperator,
    pub threshold: Decimal,
    /// Last observed measured value. None means the covenant has never
    /// been checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    pub status: CovenantStatus,
    pub source: CovenantSource,
    pub check_frequency: CheckFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    pub next_check: DateTime<Utc>,
    pub breach_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Covenant {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_check <= now
    }
}
