//! Portfolio-level risk aggregation: summary metrics and risk score,
//! concentration analysis, and NAV-decline stress testing.
//!
//! All functions here are pure computations over a point-in-time snapshot
//! of facilities, covenants, and cash flows; nothing in this module reads
//! or writes persistent state.

pub mod concentration;
pub mod stress;
pub mod summary;

use serde::{Deserialize, Serialize};

use crate::model::{CashFlow, Covenant, Facility};

pub use concentration::{concentration_analysis, hhi, top_n_concentration, ConcentrationOutput};
pub use stress::{stress_test, StressTestOutput};
pub use summary::{portfolio_summary, risk_score, RiskSnapshot};

/// Point-in-time portfolio state consumed by the aggregator. Always
/// recomputed from current persisted records on demand; never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub facilities: Vec<Facility>,
    pub covenants: Vec<Covenant>,
    pub cash_flows: Vec<CashFlow>,
}
