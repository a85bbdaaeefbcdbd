use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::StressBands;
use crate::error::NavMonitorError;
use crate::model::{ComparisonOperator, Covenant, CovenantType, Facility};
use crate::types::{with_metadata, ComputationOutput, FacilityId, Money, Rate, RiskLevel};
use crate::NavMonitorResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Projected LTV for one facility under one NAV-decline shock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockProjection {
    /// NAV decline as a fraction (0.20 = -20%).
    pub shock: Rate,
    /// Projected LTV as a percentage.
    pub projected_ltv: Rate,
    /// Whether the projected LTV violates the facility's LTV covenant.
    pub breaches_threshold: bool,
}

/// Stress outcome for one facility across all shocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityStress {
    pub facility_id: FacilityId,
    pub name: String,
    pub current_ltv: Rate,
    pub implied_nav: Money,
    /// LTV covenant threshold, when the facility has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv_threshold: Option<Decimal>,
    pub projections: Vec<ShockProjection>,
    /// Classification from the severest shock's projected LTV.
    pub recommendation: RiskLevel,
}

/// Per-shock portfolio rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockSummary {
    pub shock: Rate,
    /// Facilities whose LTV covenant holds today but fails under this shock.
    pub newly_breaching: usize,
    /// All facilities whose covenant fails under this shock.
    pub total_breaching: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestOutput {
    pub shocks: Vec<ShockSummary>,
    pub facilities: Vec<FacilityStress>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// NAV-decline stress test over active facilities.
///
/// Implied NAV is backed out of the current LTV
/// (`outstanding / (ltv% / 100)`); each shock rescales it and the
/// projected LTV is `outstanding / (implied_nav * (1 - shock))`,
/// expressed as a percentage.
pub fn stress_test(
    facilities: &[Facility],
    covenants: &[Covenant],
    shocks: &[Rate],
    bands: &StressBands,
) -> NavMonitorResult<ComputationOutput<StressTestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_shocks(shocks)?;
    let mut sorted_shocks = shocks.to_vec();
    sorted_shocks.sort();
    let severe_shock = sorted_shocks.last().copied().unwrap_or(Decimal::ZERO);

    let mut facility_results: Vec<FacilityStress> = Vec::new();
    let mut newly_breaching = vec![0usize; sorted_shocks.len()];
    let mut total_breaching = vec![0usize; sorted_shocks.len()];

    for facility in facilities.iter().filter(|f| f.is_active()) {
        let implied_nav = match facility.implied_nav() {
            Some(nav) => nav,
            None => {
                warnings.push(format!(
                    "Facility '{}' has no positive LTV; excluded from stress test.",
                    facility.name
                ));
                continue;
            }
        };

        let ltv_cov = ltv_covenant_bound(covenants, facility.id);

        let projections: Vec<ShockProjection> = sorted_shocks
            .iter()
            .map(|&shock| {
                let projected_ltv = project_ltv(facility.outstanding_balance, implied_nav, shock);
                // Breach is whatever the covenant's own operator says it
                // is, strictness included.
                let breaches_threshold = ltv_cov
                    .map(|(op, t)| !op.satisfied(projected_ltv, t))
                    .unwrap_or(false);
                ShockProjection {
                    shock,
                    projected_ltv,
                    breaches_threshold,
                }
            })
            .collect();

        if let Some((op, threshold)) = ltv_cov {
            let currently_compliant = op.satisfied(facility.ltv_ratio, threshold);
            for (i, projection) in projections.iter().enumerate() {
                if projection.breaches_threshold {
                    total_breaching[i] += 1;
                    if currently_compliant {
                        newly_breaching[i] += 1;
                    }
                }
            }
        }

        let severe_ltv = project_ltv(facility.outstanding_balance, implied_nav, severe_shock);
        let recommendation = classify_stress(severe_ltv, ltv_cov, bands);

        facility_results.push(FacilityStress {
            facility_id: facility.id,
            name: facility.name.clone(),
            current_ltv: facility.ltv_ratio,
            implied_nav: implied_nav.round_dp(2),
            ltv_threshold: ltv_cov.map(|(_, t)| t),
            projections,
            recommendation,
        });
    }

    let shock_summaries: Vec<ShockSummary> = sorted_shocks
        .iter()
        .enumerate()
        .map(|(i, &shock)| ShockSummary {
            shock,
            newly_breaching: newly_breaching[i],
            total_breaching: total_breaching[i],
        })
        .collect();

    let output = StressTestOutput {
        shocks: shock_summaries,
        facilities: facility_results,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "NAV Decline Stress Test — projected LTV under fund-value shocks",
        &serde_json::json!({
            "shocks": sorted_shocks.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "critical_ltv_band": bands.critical_ltv.to_string(),
            "warning_ltv_band": bands.warning_ltv.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_shocks(shocks: &[Rate]) -> NavMonitorResult<()> {
    if shocks.is_empty() {
        return Err(NavMonitorError::InsufficientData(
            "At least one NAV-decline shock is required.".into(),
        ));
    }
    for shock in shocks {
        if *shock <= Decimal::ZERO || *shock >= Decimal::ONE {
            return Err(NavMonitorError::InvalidInput {
                field: "shocks".into(),
                reason: format!("Shock {shock} must be strictly between 0 and 1"),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `outstanding / (nav * (1 - shock))` as a percentage, 2dp.
fn project_ltv(outstanding: Money, implied_nav: Money, shock: Rate) -> Rate {
    let stressed_nav = implied_nav * (Decimal::ONE - shock);
    if stressed_nav <= Decimal::ZERO {
        return dec!(100);
    }
    (outstanding / stressed_nav * dec!(100)).round_dp(2)
}

/// Operator and threshold of the first upper-bound LTV covenant attached
/// to the facility.
fn ltv_covenant_bound(
    covenants: &[Covenant],
    facility_id: FacilityId,
) -> Option<(ComparisonOperator, Decimal)> {
    covenants
        .iter()
        .find(|c| {
            c.facility_id == facility_id
                && c.covenant_type == CovenantType::LtvRatio
                && c.operator.is_upper_bound()
        })
        .map(|c| (c.operator, c.threshold))
}

/// Recommendation bands against the severe-shock projected LTV: above the
/// critical band -> critical, above the warning band -> high, failing the
/// facility's own covenant -> medium, otherwise low.
fn classify_stress(
    severe_ltv: Rate,
    ltv_cov: Option<(ComparisonOperator, Decimal)>,
    bands: &StressBands,
) -> RiskLevel {
    if severe_ltv > bands.critical_ltv {
        RiskLevel::Critical
    } else if severe_ltv > bands.warning_ltv {
        RiskLevel::High
    } else if ltv_cov
        .map(|(op, t)| !op.satisfied(severe_ltv, t))
        .unwrap_or(false)
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CheckFrequency, ComparisonOperator, CovenantSource, CovenantStatus, FacilityStatus,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn facility(outstanding: Decimal, ltv: Decimal) -> Facility {
        Facility {
            id: Uuid::new_v4(),
            gp_id: None,
            name: "Fund I".into(),
            principal: outstanding,
            outstanding_balance: outstanding,
            interest_rate: dec!(0.08),
            ltv_ratio: ltv,
            latest_nav: None,
            maturity_date: NaiveDate::from_ymd_opt(2028, 1, 1).unwrap(),
            status: FacilityStatus::Active,
            sector: None,
            vintage_year: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ltv_covenant(facility_id: Uuid, threshold: Decimal) -> Covenant {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Covenant {
            id: Uuid::new_v4(),
            facility_id,
            name: "Max LTV".into(),
            covenant_type: CovenantType::LtvRatio,
            operator: ComparisonOperator::LessThan,
            threshold,
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

    // -----------------------------------------------------------------------
    // 1. Worked scenario: 18M at 14% LTV, 15% threshold
    // -----------------------------------------------------------------------
    #[test]
    fn test_stress_scenario_18m_at_14_pct() {
        let f = facility(dec!(18_000_000), dec!(14));
        let cov = ltv_covenant(f.id, dec!(15));

        let out = stress_test(
            &[f],
            &[cov],
            &[dec!(0.20), dec!(0.40)],
            &StressBands::default(),
        )
        .unwrap();
        let fr = &out.result.facilities[0];

        // implied NAV ~ 128.57M
        let nav_diff = (fr.implied_nav - dec!(128_571_428.57)).abs();
        assert!(nav_diff < dec!(0.01), "implied NAV ~128.57M, got {}", fr.implied_nav);

        // -20% -> 17.5%; -40% -> 23.33%
        assert_eq!(fr.projections[0].projected_ltv, dec!(17.50));
        assert_eq!(fr.projections[1].projected_ltv, dec!(23.33));
        assert!(fr.projections[0].breaches_threshold);
        assert!(fr.projections[1].breaches_threshold);

        // Current 14% is compliant, so the facility counts as newly
        // breaching under both shocks.
        for summary in &out.result.shocks {
            assert_eq!(summary.newly_breaching, 1);
            assert_eq!(summary.total_breaching, 1);
        }
    }

    // -----------------------------------------------------------------------
    // 2. Already-breaching facility is total but not newly breaching
    // -----------------------------------------------------------------------
    #[test]
    fn test_already_breaching_not_counted_as_new() {
        let f = facility(dec!(20_000_000), dec!(16));
        let cov = ltv_covenant(f.id, dec!(15));

        let out = stress_test(&[f], &[cov], &[dec!(0.20)], &StressBands::default()).unwrap();
        let summary = &out.result.shocks[0];
        assert_eq!(summary.total_breaching, 1);
        assert_eq!(summary.newly_breaching, 0);
    }

    #[test]
    fn test_strict_operator_breaches_exactly_at_threshold() {
        // 12% LTV at -20% projects exactly 15.00; a strict `<` covenant
        // counts the boundary itself as a breach.
        let f = facility(dec!(15_000_000), dec!(12));
        let cov = ltv_covenant(f.id, dec!(15));

        let out = stress_test(&[f], &[cov], &[dec!(0.20)], &StressBands::default()).unwrap();
        let projection = &out.result.facilities[0].projections[0];
        assert_eq!(projection.projected_ltv, dec!(15.00));
        assert!(projection.breaches_threshold);
        assert_eq!(out.result.shocks[0].total_breaching, 1);
        assert_eq!(out.result.shocks[0].newly_breaching, 1);
    }

    #[test]
    fn test_inclusive_operator_compliant_exactly_at_threshold() {
        let f = facility(dec!(15_000_000), dec!(12));
        let mut cov = ltv_covenant(f.id, dec!(15));
        cov.operator = ComparisonOperator::LessThanEqual;

        let out = stress_test(&[f], &[cov], &[dec!(0.20)], &StressBands::default()).unwrap();
        assert!(!out.result.facilities[0].projections[0].breaches_threshold);
        assert_eq!(out.result.shocks[0].total_breaching, 0);
    }

    #[test]
    fn test_current_ltv_at_strict_threshold_is_already_breaching() {
        // 15% against `< 15` fails today, so the shocked breach is not new.
        let f = facility(dec!(15_000_000), dec!(15));
        let cov = ltv_covenant(f.id, dec!(15));

        let out = stress_test(&[f], &[cov], &[dec!(0.20)], &StressBands::default()).unwrap();
        assert_eq!(out.result.shocks[0].total_breaching, 1);
        assert_eq!(out.result.shocks[0].newly_breaching, 0);
    }

    // -----------------------------------------------------------------------
    // 3. Recommendation bands
    // -----------------------------------------------------------------------
    #[test]
    fn test_recommendation_critical_above_80() {
        // 60% LTV at -40% shock -> 60/0.6 = 100% projected
        let f = facility(dec!(60_000_000), dec!(60));
        let out = stress_test(&[f], &[], &[dec!(0.40)], &StressBands::default()).unwrap();
        assert_eq!(out.result.facilities[0].recommendation, RiskLevel::Critical);
    }

    #[test]
    fn test_recommendation_high_above_70() {
        // 45% at -40% -> 75% projected
        let f = facility(dec!(45_000_000), dec!(45));
        let out = stress_test(&[f], &[], &[dec!(0.40)], &StressBands::default()).unwrap();
        assert_eq!(out.result.facilities[0].recommendation, RiskLevel::High);
    }

    #[test]
    fn test_recommendation_medium_when_covenant_breaches() {
        // 14% at -40% -> 23.33%, above 15% covenant but under the bands
        let f = facility(dec!(18_000_000), dec!(14));
        let cov = ltv_covenant(f.id, dec!(15));
        let out = stress_test(&[f], &[cov], &[dec!(0.40)], &StressBands::default()).unwrap();
        assert_eq!(out.result.facilities[0].recommendation, RiskLevel::Medium);
    }

    #[test]
    fn test_recommendation_low_when_resilient() {
        // 5% at -40% -> 8.33%, under a 15% threshold
        let f = facility(dec!(5_000_000), dec!(5));
        let cov = ltv_covenant(f.id, dec!(15));
        let out = stress_test(&[f], &[cov], &[dec!(0.40)], &StressBands::default()).unwrap();
        assert_eq!(out.result.facilities[0].recommendation, RiskLevel::Low);
    }

    // -----------------------------------------------------------------------
    // 4. Exclusions and validation
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_ltv_facility_excluded_with_warning() {
        let f = facility(dec!(10_000_000), Decimal::ZERO);
        let out = stress_test(&[f], &[], &[dec!(0.20)], &StressBands::default()).unwrap();
        assert!(out.result.facilities.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("no positive LTV")));
    }

    #[test]
    fn test_inactive_facility_excluded() {
        let mut f = facility(dec!(10_000_000), dec!(12));
        f.status = FacilityStatus::Defaulted;
        let out = stress_test(&[f], &[], &[dec!(0.20)], &StressBands::default()).unwrap();
        assert!(out.result.facilities.is_empty());
    }

    #[test]
    fn test_empty_shocks_rejected() {
        let err = stress_test(&[], &[], &[], &StressBands::default()).unwrap_err();
        match err {
            NavMonitorError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_shock_rejected() {
        for bad in [dec!(0), dec!(1), dec!(1.5), dec!(-0.2)] {
            let err = stress_test(&[], &[], &[bad], &StressBands::default()).unwrap_err();
            match err {
                NavMonitorError::InvalidInput { field, .. } => assert_eq!(field, "shocks"),
                other => panic!("Expected InvalidInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_facility_without_ltv_covenant_not_in_breach_counts() {
        let f = facility(dec!(18_000_000), dec!(14));
        let out = stress_test(&[f], &[], &[dec!(0.40)], &StressBands::default()).unwrap();
        assert_eq!(out.result.shocks[0].total_breaching, 0);
        assert_eq!(out.result.shocks[0].newly_breaching, 0);
        assert!(!out.result.facilities[0].projections[0].breaches_threshold);
    }
}
