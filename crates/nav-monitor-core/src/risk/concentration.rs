use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::model::Facility;
use crate::types::{with_metadata, ComputationOutput, ConcentrationLevel, Money, Rate};
use crate::NavMonitorResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// HHI scale when shares are expressed in percent: a single-exposure
/// portfolio scores 100² = 10000.
pub const HHI_SCALE: Decimal = dec!(10000);

const HHI_MODERATE_FLOOR: Decimal = dec!(1500);
const HHI_HIGH_FLOOR: Decimal = dec!(2500);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Top-N exposure concentration over active facilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNConcentration {
    pub n: usize,
    /// Sum of the N largest outstanding balances.
    pub exposure: Money,
    /// That sum as a percentage of total outstanding.
    pub ratio_pct: Rate,
}

/// One group's share of total exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupShare {
    pub group: String,
    pub exposure: Money,
    pub share_pct: Rate,
}

/// Herfindahl-Hirschman index over one grouping dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhiReport {
    pub hhi: Decimal,
    pub level: ConcentrationLevel,
    /// 10000 / HHI — the number of equal-sized exposures that would
    /// produce the same index.
    pub effective_exposures: Decimal,
    pub shares: Vec<GroupShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationOutput {
    pub top5: TopNConcentration,
    pub by_gp: HhiReport,
    pub by_sector: HhiReport,
    pub by_vintage: HhiReport,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Sum of squared percent shares, 0–10000 scale.
pub fn hhi(shares_pct: &[Decimal]) -> Decimal {
    shares_pct.iter().map(|s| s * s).sum()
}

/// Fixed boundaries: <1500 low, <2500 moderate, else high.
pub fn classify_hhi(index: Decimal) -> ConcentrationLevel {
    if index < HHI_MODERATE_FLOOR {
        ConcentrationLevel::Low
    } else if index < HHI_HIGH_FLOOR {
        ConcentrationLevel::Moderate
    } else {
        ConcentrationLevel::High
    }
}

/// Top-N concentration over active facilities, sorted descending by
/// outstanding balance.
pub fn top_n_concentration(facilities: &[Facility], n: usize) -> TopNConcentration {
    let mut balances: Vec<Money> = facilities
        .iter()
        .filter(|f| f.is_active())
        .map(|f| f.outstanding_balance)
        .collect();
    balances.sort_by(|a, b| b.cmp(a));

    let total: Money = balances.iter().sum();
    let exposure: Money = balances.iter().take(n).sum();
    let ratio_pct = if total.is_zero() {
        Decimal::ZERO
    } else {
        (exposure / total * dec!(100)).round_dp(2)
    };

    TopNConcentration {
        n,
        exposure,
        ratio_pct,
    }
}

/// Full concentration breakdown: top-5 ratio plus HHI by GP, sector, and
/// vintage over active-facility exposure shares.
pub fn concentration_analysis(
    facilities: &[Facility],
) -> NavMonitorResult<ComputationOutput<ConcentrationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let active: Vec<&Facility> = facilities.iter().filter(|f| f.is_active()).collect();
    if active.is_empty() {
        warnings.push("No active facilities; concentration metrics are all zero.".into());
    }

    let top5 = top_n_concentration(facilities, 5);

    let by_gp = hhi_by(&active, |f| {
        f.gp_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unassigned".into())
    });
    let by_sector = hhi_by(&active, |f| {
        f.sector.clone().unwrap_or_else(|| "unclassified".into())
    });
    let by_vintage = hhi_by(&active, |f| {
        f.vintage_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".into())
    });

    let output = ConcentrationOutput {
        top5,
        by_gp,
        by_sector,
        by_vintage,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Concentration Analysis — top-5 exposure ratio and Herfindahl index by GP, sector, vintage",
        &serde_json::json!({
            "active_facilities": active.len(),
            "hhi_scale": HHI_SCALE.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn hhi_by(active: &[&Facility], key: impl Fn(&Facility) -> String) -> HhiReport {
    let mut groups: BTreeMap<String, Money> = BTreeMap::new();
    for f in active {
        *groups.entry(key(f)).or_insert(Decimal::ZERO) += f.outstanding_balance;
    }

    let total: Money = groups.values().copied().sum();
    let shares: Vec<GroupShare> = groups
        .into_iter()
        .map(|(group, exposure)| {
            let share_pct = if total.is_zero() {
                Decimal::ZERO
            } else {
                (exposure / total * dec!(100)).round_dp(4)
            };
            GroupShare {
                group,
                exposure,
                share_pct,
            }
        })
        .collect();

    let index = hhi(&shares.iter().map(|s| s.share_pct).collect::<Vec<_>>()).round_dp(2);
    let effective_exposures = if index.is_zero() {
        Decimal::ZERO
    } else {
        (HHI_SCALE / index).round_dp(2)
    };

    HhiReport {
        hhi: index,
        level: classify_hhi(index),
        effective_exposures,
        shares,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FacilityStatus;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn facility(outstanding: Decimal) -> Facility {
        Facility {
            id: Uuid::new_v4(),
            gp_id: None,
            name: "F".into(),
            principal: outstanding,
            outstanding_balance: outstanding,
            interest_rate: dec!(0.08),
            ltv_ratio: dec!(12),
            latest_nav: None,
            maturity_date: NaiveDate::from_ymd_opt(2028, 1, 1).unwrap(),
            status: FacilityStatus::Active,
            sector: None,
            vintage_year: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    // -----------------------------------------------------------------------
    // 1. HHI scale properties
    // -----------------------------------------------------------------------
    #[test]
    fn test_hhi_single_exposure_is_scale_max() {
        assert_eq!(hhi(&[dec!(100)]), dec!(10000));
    }

    #[test]
    fn test_hhi_equal_shares_is_scale_over_n() {
        // 4 equal shares of 25% -> 4 * 625 = 2500 = 10000/4
        assert_eq!(hhi(&[dec!(25), dec!(25), dec!(25), dec!(25)]), dec!(2500));
        // 5 equal shares of 20% -> 2000 = 10000/5
        assert_eq!(
            hhi(&[dec!(20), dec!(20), dec!(20), dec!(20), dec!(20)]),
            dec!(2000)
        );
    }

    #[test]
    fn test_hhi_classification_boundaries() {
        assert_eq!(classify_hhi(dec!(1499.99)), ConcentrationLevel::Low);
        assert_eq!(classify_hhi(dec!(1500)), ConcentrationLevel::Moderate);
        assert_eq!(classify_hhi(dec!(2499.99)), ConcentrationLevel::Moderate);
        assert_eq!(classify_hhi(dec!(2500)), ConcentrationLevel::High);
    }

    // -----------------------------------------------------------------------
    // 2. Top-5 concentration scenarios
    // -----------------------------------------------------------------------
    #[test]
    fn test_top5_all_of_five_facility_portfolio() {
        let facilities: Vec<Facility> = [
            dec!(35_000_000),
            dec!(25_000_000),
            dec!(18_000_000),
            dec!(12_000_000),
            dec!(10_000_000),
        ]
        .into_iter()
        .map(facility)
        .collect();

        let top5 = top_n_concentration(&facilities, 5);
        assert_eq!(top5.exposure, dec!(100_000_000));
        assert_eq!(top5.ratio_pct, dec!(100));
    }

    #[test]
    fn test_top5_with_sixth_facility() {
        let facilities: Vec<Facility> = [
            dec!(35_000_000),
            dec!(25_000_000),
            dec!(18_000_000),
            dec!(12_000_000),
            dec!(10_000_000),
            dec!(5_000_000),
        ]
        .into_iter()
        .map(facility)
        .collect();

        let top5 = top_n_concentration(&facilities, 5);
        assert_eq!(top5.exposure, dec!(100_000_000));
        // 100M / 105M = 95.24%
        assert_eq!(top5.ratio_pct, dec!(95.24));
    }

    #[test]
    fn test_top5_ignores_inactive() {
        let mut closed = facility(dec!(900_000_000));
        closed.status = FacilityStatus::Closed;
        let facilities = vec![facility(dec!(10_000_000)), closed];
        let top5 = top_n_concentration(&facilities, 5);
        assert_eq!(top5.exposure, dec!(10_000_000));
        assert_eq!(top5.ratio_pct, dec!(100));
    }

    #[test]
    fn test_top5_empty_portfolio() {
        let top5 = top_n_concentration(&[], 5);
        assert_eq!(top5.exposure, Decimal::ZERO);
        assert_eq!(top5.ratio_pct, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 3. Grouped HHI
    // -----------------------------------------------------------------------
    #[test]
    fn test_hhi_by_gp_two_equal_gps() {
        let gp1 = Uuid::new_v4();
        let gp2 = Uuid::new_v4();
        let mut f1 = facility(dec!(50_000_000));
        f1.gp_id = Some(gp1);
        let mut f2 = facility(dec!(50_000_000));
        f2.gp_id = Some(gp2);

        let out = concentration_analysis(&[f1, f2]).unwrap();
        let by_gp = &out.result.by_gp;
        // Two equal groups -> 2 * 50² = 5000
        assert_eq!(by_gp.hhi, dec!(5000));
        assert_eq!(by_gp.level, ConcentrationLevel::High);
        assert_eq!(by_gp.effective_exposures, dec!(2));
    }

    #[test]
    fn test_hhi_unassigned_gp_grouped_together() {
        let f1 = facility(dec!(40_000_000));
        let f2 = facility(dec!(60_000_000));
        let out = concentration_analysis(&[f1, f2]).unwrap();
        // Both unassigned -> one group with 100% share
        assert_eq!(out.result.by_gp.hhi, dec!(10000));
        assert_eq!(out.result.by_gp.shares.len(), 1);
        assert_eq!(out.result.by_gp.shares[0].group, "unassigned");
    }

    #[test]
    fn test_sector_grouping() {
        let mut f1 = facility(dec!(30_000_000));
        f1.sector = Some("buyout".into());
        let mut f2 = facility(dec!(30_000_000));
        f2.sector = Some("buyout".into());
        let mut f3 = facility(dec!(40_000_000));
        f3.sector = Some("growth".into());

        let out = concentration_analysis(&[f1, f2, f3]).unwrap();
        let by_sector = &out.result.by_sector;
        // buyout 60%, growth 40% -> 3600 + 1600 = 5200
        assert_eq!(by_sector.hhi, dec!(5200));
        assert_eq!(by_sector.shares.len(), 2);
    }

    #[test]
    fn test_empty_portfolio_warns() {
        let out = concentration_analysis(&[]).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("No active")));
        assert_eq!(out.result.by_gp.hhi, Decimal::ZERO);
    }
}
