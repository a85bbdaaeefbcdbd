use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::RiskWeights;
use crate::model::{CashFlowStatus, CovenantStatus, FacilityStatus};
use crate::types::{with_metadata, ComputationOutput, Money, Rate, RiskLevel};
use crate::NavMonitorResult;

use super::concentration::top_n_concentration;
use super::PortfolioSnapshot;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Facility counts and exposure totals. Sums and averages cover active
/// facilities only; counts cover everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOverview {
    pub total_facilities: usize,
    pub active_facilities: usize,
    pub total_principal: Money,
    pub total_outstanding: Money,
    /// Outstanding-unweighted mean LTV (percent) across active facilities.
    pub average_ltv: Rate,
    pub average_interest_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub pending: usize,
    pub active: usize,
    pub closed: usize,
    pub matured: usize,
    pub defaulted: usize,
}

/// Covenant compliance counts and percentages portfolio-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantHealth {
    pub total: usize,
    pub compliant: usize,
    pub warning: usize,
    pub breach: usize,
    pub compliant_pct: Rate,
    pub warning_pct: Rate,
    pub breach_pct: Rate,
}

/// Cash-flow payment performance. Percentages are over all cash flows;
/// amounts are the unpaid remainder for overdue/partial items and the
/// paid/scheduled totals otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPerformance {
    pub total: usize,
    pub paid: usize,
    pub overdue: usize,
    pub scheduled: usize,
    pub partial: usize,
    pub waived: usize,
    pub paid_pct: Rate,
    pub overdue_pct: Rate,
    pub scheduled_pct: Rate,
    pub paid_amount: Money,
    pub overdue_amount: Money,
    pub scheduled_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Weighted 0–100 score.
    pub risk_score: Decimal,
    pub risk_level: RiskLevel,
    pub breach_ratio: Rate,
    pub overdue_count_ratio: Rate,
    pub overdue_amount_ratio: Rate,
    /// Active facilities maturing within the configured window.
    pub upcoming_maturities: usize,
    /// Top-5 outstanding as a percentage of total outstanding.
    pub concentration_ratio_pct: Rate,
    pub top5_exposure: Money,
}

/// The full portfolio risk snapshot served to dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub overview: PortfolioOverview,
    pub status_distribution: StatusDistribution,
    pub covenant_health: CovenantHealth,
    pub payment_performance: PaymentPerformance,
    pub risk_metrics: RiskMetrics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Aggregate a portfolio snapshot into the full risk summary.
pub fn portfolio_summary(
    snapshot: &PortfolioSnapshot,
    weights: &RiskWeights,
    upcoming_maturity_days: i64,
    as_of: NaiveDate,
) -> NavMonitorResult<ComputationOutput<RiskSnapshot>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let overview = build_overview(snapshot);
    let status_distribution = build_status_distribution(snapshot);
    let covenant_health = build_covenant_health(snapshot);
    let payment_performance = build_payment_performance(snapshot);

    if snapshot.covenants.is_empty() {
        warnings.push("No covenants in snapshot; breach ratio treated as zero.".into());
    }

    // Three capped contributions to the risk score
    let breach_ratio = ratio(covenant_health.breach, covenant_health.total);
    let overdue_count_ratio = ratio(payment_performance.overdue, payment_performance.total);
    let overdue_amount_ratio = if overview.total_outstanding.is_zero() {
        Decimal::ZERO
    } else {
        payment_performance.overdue_amount / overview.total_outstanding
    };

    let (score, level) = risk_score(breach_ratio, overdue_count_ratio, overdue_amount_ratio, weights);

    let maturity_cutoff = as_of + Duration::days(upcoming_maturity_days);
    let upcoming_maturities = snapshot
        .facilities
        .iter()
        .filter(|f| f.is_active() && f.maturity_date >= as_of && f.maturity_date <= maturity_cutoff)
        .count();

    let top5 = top_n_concentration(&snapshot.facilities, 5);

    let risk_metrics = RiskMetrics {
        risk_score: score,
        risk_level: level,
        breach_ratio,
        overdue_count_ratio,
        overdue_amount_ratio,
        upcoming_maturities,
        concentration_ratio_pct: top5.ratio_pct,
        top5_exposure: top5.exposure,
    };

    let output = RiskSnapshot {
        overview,
        status_distribution,
        covenant_health,
        payment_performance,
        risk_metrics,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio Risk Summary — covenant health, payment performance, weighted risk score",
        &serde_json::json!({
            "as_of": as_of.to_string(),
            "facility_count": snapshot.facilities.len(),
            "covenant_count": snapshot.covenants.len(),
            "cash_flow_count": snapshot.cash_flows.len(),
            "weights": [weights.breach.to_string(), weights.overdue_count.to_string(), weights.overdue_amount.to_string()],
            "upcoming_maturity_days": upcoming_maturity_days,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Weighted risk score over three ratios, each clamped to [0, 1] before
/// weighting so the score is bounded to [0, 100] for any input.
pub fn risk_score(
    breach_ratio: Rate,
    overdue_count_ratio: Rate,
    overdue_amount_ratio: Rate,
    weights: &RiskWeights,
) -> (Decimal, RiskLevel) {
    let score = clamp01(breach_ratio) * weights.breach
        + clamp01(overdue_count_ratio) * weights.overdue_count
        + clamp01(overdue_amount_ratio) * weights.overdue_amount;
    let score = score.round_dp(2);
    (score, classify_risk(score))
}

/// Four-tier classification with fixed boundaries for dashboard
/// compatibility: <20 low, <40 medium, <70 high, else critical.
pub fn classify_risk(score: Decimal) -> RiskLevel {
    if score < dec!(20) {
        RiskLevel::Low
    } else if score < dec!(40) {
        RiskLevel::Medium
    } else if score < dec!(70) {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn clamp01(v: Decimal) -> Decimal {
    v.max(Decimal::ZERO).min(Decimal::ONE)
}

fn ratio(numerator: usize, denominator: usize) -> Rate {
    if denominator == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(numerator as u64) / Decimal::from(denominator as u64)
    }
}

fn pct(numerator: usize, denominator: usize) -> Rate {
    (ratio(numerator, denominator) * dec!(100)).round_dp(2)
}

fn build_overview(snapshot: &PortfolioSnapshot) -> PortfolioOverview {
    let active: Vec<_> = snapshot.facilities.iter().filter(|f| f.is_active()).collect();
    let n = Decimal::from(active.len() as u64);

    let total_principal: Money = active.iter().map(|f| f.principal).sum();
    let total_outstanding: Money = active.iter().map(|f| f.outstanding_balance).sum();
    let (average_ltv, average_interest_rate) = if active.is_empty() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let ltv_sum: Decimal = active.iter().map(|f| f.ltv_ratio).sum();
        let rate_sum: Decimal = active.iter().map(|f| f.interest_rate).sum();
        ((ltv_sum / n).round_dp(4), (rate_sum / n).round_dp(6))
    };

    PortfolioOverview {
        total_facilities: snapshot.facilities.len(),
        active_facilities: active.len(),
        total_principal,
        total_outstanding,
        average_ltv,
        average_interest_rate,
    }
}

fn build_status_distribution(snapshot: &PortfolioSnapshot) -> StatusDistribution {
    let count = |s: FacilityStatus| snapshot.facilities.iter().filter(|f| f.status == s).count();
    StatusDistribution {
        pending: count(FacilityStatus::Pending),
        active: count(FacilityStatus::Active),
        closed: count(FacilityStatus::Closed),
        matured: count(FacilityStatus::Matured),
        defaulted: count(FacilityStatus::Defaulted),
    }
}

fn build_covenant_health(snapshot: &PortfolioSnapshot) -> CovenantHealth {
    let total = snapshot.covenants.len();
    let count = |s: CovenantStatus| snapshot.covenants.iter().filter(|c| c.status == s).count();
    let compliant = count(CovenantStatus::Compliant);
    let warning = count(CovenantStatus::Warning);
    let breach = count(CovenantStatus::Breach);

    CovenantHealth {
        total,
        compliant,
        warning,
        breach,
        compliant_pct: pct(compliant, total),
        warning_pct: pct(warning, total),
        breach_pct: pct(breach, total),
    }
}

fn build_payment_performance(snapshot: &PortfolioSnapshot) -> PaymentPerformance {
    let total = snapshot.cash_flows.len();
    let count = |s: CashFlowStatus| snapshot.cash_flows.iter().filter(|c| c.status == s).count();

    let amount = |s: CashFlowStatus| -> Money {
        snapshot
            .cash_flows
            .iter()
            .filter(|c| c.status == s)
            .map(|c| match s {
                CashFlowStatus::Paid => c.paid_amount,
                CashFlowStatus::Overdue | CashFlowStatus::Partial => c.outstanding_due(),
                _ => c.total_due,
            })
            .sum()
    };

    let paid = count(CashFlowStatus::Paid);
    let overdue = count(CashFlowStatus::Overdue);
    let scheduled = count(CashFlowStatus::Scheduled);

    PaymentPerformance {
        total,
        paid,
        overdue,
        scheduled,
        partial: count(CashFlowStatus::Partial),
        waived: count(CashFlowStatus::Waived),
        paid_pct: pct(paid, total),
        overdue_pct: pct(overdue, total),
        scheduled_pct: pct(scheduled, total),
        paid_amount: amount(CashFlowStatus::Paid),
        overdue_amount: amount(CashFlowStatus::Overdue),
        scheduled_amount: amount(CashFlowStatus::Scheduled),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
