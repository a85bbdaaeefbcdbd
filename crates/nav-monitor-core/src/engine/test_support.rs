//! Shared fixtures for the engine and store test suites.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::model::{
    CheckFrequency, ComparisonOperator, Covenant, CovenantSource, CovenantStatus, CovenantType,
    Facility, FacilityStatus, Role, User,
};

pub fn sample_facility() -> Facility {
    let now = Utc::now();
    Facility {
        id: Uuid::new_v4(),
        gp_id: None,
        name: "Fund I Facility".into(),
        principal: dec!(25_000_000),
        outstanding_balance: dec!(18_000_000),
        interest_rate: dec!(0.085),
        ltv_ratio: dec!(14.0),
        latest_nav: Some(dec!(128_571_428.57)),
        maturity_date: NaiveDate::from_ymd_opt(2027, 3, 31).unwrap(),
        status: FacilityStatus::Active,
        sector: Some("buyout".into()),
        vintage_year: Some(2021),
        created_at: now,
        updated_at: now,
    }
}

/// An upper-bound LTV covenant (max 15%) due immediately.
pub fn sample_covenant(facility_id: Uuid, now: DateTime<Utc>) -> Covenant {
    Covenant {
        id: Uuid::new_v4(),
        facility_id,
        name: "Max LTV 15%".into(),
        covenant_type: CovenantType::LtvRatio,
        operator: ComparisonOperator::LessThanEqual,
        threshold: dec!(15),
        current_value: None,
        status: CovenantStatus::Compliant,
        source: CovenantSource::LtvFromFacility,
        check_frequency: CheckFrequency::Daily,
        last_checked: None,
        next_check: now,
        breach_notified: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_user(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: match role {
            Role::Admin => "admin".into(),
            Role::Operations => "ops".into(),
            Role::Gp => "gp".into(),
            Role::Unknown => "unknown".into(),
        },
        role,
    }
}
