//! Covenant threshold evaluation.
//!
//! Pure and deterministic: the same (operator, threshold, current value,
//! warning band) always produces the same status. The warning band marks
//! values that still satisfy the covenant but sit within a configurable
//! percentage of crossing the threshold, direction-aware for upper-bound
//! and lower-bound covenants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{ComparisonOperator, CovenantStatus};
use crate::types::Rate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of evaluating one covenant against a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: CovenantStatus,
    pub breached: bool,
}

/// Signed distance from the threshold, in the covenant's favour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headroom {
    /// Positive while the covenant is satisfied, negative once breached.
    pub headroom: Decimal,
    /// Headroom as a fraction of the threshold (zero threshold -> zero).
    pub headroom_pct: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate `current_value <operator> threshold` with a warning band.
///
/// Unsatisfied -> `Breach` with `breached = true`. Satisfied but within
/// `warning_band` of crossing (upper bound: `cv >= threshold * (1 - band)`;
/// lower bound: `cv <= threshold * (1 + band)`) -> `Warning`. Otherwise
/// `Compliant`. A negative band is treated as zero.
pub fn evaluate(
    operator: ComparisonOperator,
    threshold: Decimal,
    current_value: Decimal,
    warning_band: Rate,
) -> Evaluation {
    if !operator.satisfied(current_value, threshold) {
        return Evaluation {
            status: CovenantStatus::Breach,
            breached: true,
        };
    }

    let band = warning_band.max(Decimal::ZERO);
    let in_warning_band = if operator.is_upper_bound() {
        current_value >= threshold * (Decimal::ONE - band)
    } else {
        current_value <= threshold * (Decimal::ONE + band)
    };

    Evaluation {
        status: if in_warning_band {
            CovenantStatus::Warning
        } else {
            CovenantStatus::Compliant
        },
        breached: false,
    }
}

/// Headroom to the threshold: `threshold - cv` for upper-bound covenants,
/// `cv - threshold` for lower-bound ones.
pub fn headroom(
    operator: ComparisonOperator,
    threshold: Decimal,
    current_value: Decimal,
) -> Headroom {
    let hr = if operator.is_upper_bound() {
        threshold - current_value
    } else {
        current_value - threshold
    };
    let headroom_pct = if threshold.is_zero() {
        Decimal::ZERO
    } else {
        hr / threshold
    };
    Headroom {
        headroom: hr,
        headroom_pct,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BAND: Decimal = dec!(0.10);

    // -----------------------------------------------------------------------
    // 1. Upper-bound covenant (max LTV): compliant / warning / breach
    // -----------------------------------------------------------------------
    #[test]
    fn test_upper_bound_compliant() {
        // 12.0 < 15 and below the 13.5 warning line
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(12), BAND);
        assert_eq!(e.status, CovenantStatus::Compliant);
        assert!(!e.breached);
    }

    #[test]
    fn test_upper_bound_warning_at_92_pct_of_threshold() {
        // 13.8 = 92% of 15 -> inside the 10% band
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(13.8), BAND);
        assert_eq!(e.status, CovenantStatus::Warning);
        assert!(!e.breached);
    }

    #[test]
    fn test_upper_bound_breach() {
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(16.2), BAND);
        assert_eq!(e.status, CovenantStatus::Breach);
        assert!(e.breached);
    }

    #[test]
    fn test_upper_bound_warning_band_boundary() {
        // Exactly threshold * (1 - band) = 13.5 counts as warning
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(13.5), BAND);
        assert_eq!(e.status, CovenantStatus::Warning);
        // Just below the line is compliant
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(13.49), BAND);
        assert_eq!(e.status, CovenantStatus::Compliant);
    }

    #[test]
    fn test_less_than_equal_at_threshold_is_warning_not_breach() {
        let e = evaluate(ComparisonOperator::LessThanEqual, dec!(15), dec!(15), BAND);
        assert_eq!(e.status, CovenantStatus::Warning);
        assert!(!e.breached);
    }

    // -----------------------------------------------------------------------
    // 2. Lower-bound covenant (minimum NAV)
    // -----------------------------------------------------------------------
    #[test]
    fn test_lower_bound_compliant() {
        // NAV 120M against a 100M floor, above the 110M warning line
        let e = evaluate(
            ComparisonOperator::GreaterThanEqual,
            dec!(100_000_000),
            dec!(120_000_000),
            BAND,
        );
        assert_eq!(e.status, CovenantStatus::Compliant);
    }

    #[test]
    fn test_lower_bound_warning() {
        // 105M is within 10% above the 100M floor
        let e = evaluate(
            ComparisonOperator::GreaterThanEqual,
            dec!(100_000_000),
            dec!(105_000_000),
            BAND,
        );
        assert_eq!(e.status, CovenantStatus::Warning);
        assert!(!e.breached);
    }

    #[test]
    fn test_lower_bound_breach() {
        let e = evaluate(
            ComparisonOperator::GreaterThanEqual,
            dec!(100_000_000),
            dec!(95_000_000),
            BAND,
        );
        assert_eq!(e.status, CovenantStatus::Breach);
        assert!(e.breached);
    }

    // -----------------------------------------------------------------------
    // 3. Determinism and monotonic ordering
    // -----------------------------------------------------------------------
    #[test]
    fn test_deterministic() {
        for _ in 0..10 {
            let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(13.8), BAND);
            assert_eq!(e.status, CovenantStatus::Warning);
        }
    }

    #[test]
    fn test_monotonic_compliant_to_breach_passes_through_warning() {
        // Walk current value upward toward and past an upper-bound threshold;
        // status must move compliant -> warning -> breach with no skips.
        let threshold = dec!(15);
        let mut seen = Vec::new();
        let mut cv = dec!(10);
        while cv <= dec!(17) {
            let status = evaluate(ComparisonOperator::LessThan, threshold, cv, BAND).status;
            if seen.last() != Some(&status) {
                seen.push(status);
            }
            cv += dec!(0.05);
        }
        assert_eq!(
            seen,
            vec![
                CovenantStatus::Compliant,
                CovenantStatus::Warning,
                CovenantStatus::Breach
            ]
        );
    }

    // -----------------------------------------------------------------------
    // 4. Band edge cases
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_band_never_warns() {
        let e = evaluate(
            ComparisonOperator::LessThan,
            dec!(15),
            dec!(14.99),
            Decimal::ZERO,
        );
        assert_eq!(e.status, CovenantStatus::Compliant);
    }

    #[test]
    fn test_negative_band_treated_as_zero() {
        let e = evaluate(ComparisonOperator::LessThan, dec!(15), dec!(14.9), dec!(-0.5));
        assert_eq!(e.status, CovenantStatus::Compliant);
    }

    // -----------------------------------------------------------------------
    // 5. Headroom
    // -----------------------------------------------------------------------
    #[test]
    fn test_headroom_upper_bound() {
        let h = headroom(ComparisonOperator::LessThan, dec!(15), dec!(13.8));
        assert_eq!(h.headroom, dec!(1.2));
        assert_eq!(h.headroom_pct, dec!(0.08));
    }

    #[test]
    fn test_headroom_negative_when_breached() {
        let h = headroom(ComparisonOperator::LessThan, dec!(15), dec!(16.2));
        assert_eq!(h.headroom, dec!(-1.2));
    }

    #[test]
    fn test_headroom_zero_threshold() {
        let h = headroom(ComparisonOperator::GreaterThan, Decimal::ZERO, dec!(5));
        assert_eq!(h.headroom, dec!(5));
        assert_eq!(h.headroom_pct, Decimal::ZERO);
    }
}
