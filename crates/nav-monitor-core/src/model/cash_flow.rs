use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{FacilityId, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowStatus {
    Scheduled,
    Paid,
    Overdue,
    Partial,
    Waived,
}

/// A scheduled or realized payment obligation on a facility. Input to the
/// risk aggregator's payment-performance metrics; the monitoring engine
/// never mutates cash flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlow {
    pub id: Uuid,
    pub facility_id: FacilityId,
    pub due_date: NaiveDate,
    pub principal_due: Money,
    pub interest_due: Money,
    pub total_due: Money,
    pub paid_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    pub status: CashFlowStatus,
}

impl CashFlow {
    /// Unpaid remainder, floored at zero.
    pub fn outstanding_due(&self) -> Money {
        (self.total_due - self.paid_amount).max(Decimal::ZERO)
    }
}
