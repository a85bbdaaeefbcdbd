//! Engine configuration.
//!
//! The warning band and the risk-score weighting are empirically chosen
//! constants carried over from production dashboards; they are exposed as
//! configuration with those defaults rather than re-derived.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Weights for the three capped contributions to the 0–100 risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    pub breach: Decimal,
    pub overdue_count: Decimal,
    pub overdue_amount: Decimal,
}

impl Default for RiskWeights {
    fn default() -> Self {
        RiskWeights {
            breach: dec!(50),
            overdue_count: dec!(30),
            overdue_amount: dec!(20),
        }
    }
}

/// Absolute projected-LTV bands (percent) used to classify facilities
/// under severe stress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressBands {
    pub critical_ltv: Decimal,
    pub warning_ltv: Decimal,
}

impl Default for StressBands {
    fn default() -> Self {
        StressBands {
            critical_ltv: dec!(80),
            warning_ltv: dec!(70),
        }
    }
}

/// Wall-clock trigger times for the periodic jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hour (UTC) of the daily full covenant sweep.
    pub daily_sweep_hour: u32,
    /// Weekday hours (UTC) of the urgent sweep.
    pub urgent_sweep_hours: Vec<u32>,
    /// Period of the maintenance sweep, in minutes.
    pub maintenance_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            daily_sweep_hour: 6,
            urgent_sweep_hours: vec![9, 12, 15, 18],
            maintenance_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How close to the threshold (as a fraction of it) still counts as
    /// warning rather than compliant.
    pub warning_band: Rate,
    pub risk_weights: RiskWeights,
    /// NAV-decline shocks applied by the stress test, as fractions.
    pub stress_shocks: Vec<Rate>,
    pub stress_bands: StressBands,
    /// Window for the upcoming-maturity count, in days.
    pub upcoming_maturity_days: i64,
    pub schedule: ScheduleConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            warning_band: dec!(0.10),
            risk_weights: RiskWeights::default(),
            stress_shocks: vec![dec!(0.20), dec!(0.40)],
            stress_bands: StressBands::default(),
            upcoming_maturity_days: 90,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Build a config from `NAVM_*` environment variables, keeping the
    /// default for anything unset or malformed.
    #[cfg(feature = "monitoring")]
    pub fn from_env() -> Self {
        let mut cfg = MonitorConfig::default();

        if let Some(band) = read_env("NAVM_WARNING_BAND", parse_decimal) {
            cfg.warning_band = band;
        }
        if let Some(hour) = read_env("NAVM_DAILY_SWEEP_HOUR", parse_hour) {
            cfg.schedule.daily_sweep_hour = hour;
        }
        if let Some(hours) = read_env("NAVM_URGENT_SWEEP_HOURS", parse_hour_list) {
            cfg.schedule.urgent_sweep_hours = hours;
        }
        if let Some(minutes) = read_env("NAVM_MAINTENANCE_MINUTES", |s| s.parse::<u64>().ok()) {
            cfg.schedule.maintenance_minutes = minutes;
        }
        if let Some(shocks) = read_env("NAVM_STRESS_SHOCKS", parse_decimal_list) {
            cfg.stress_shocks = shocks;
        }

        cfg
    }
}

#[cfg(feature = "monitoring")]
fn read_env<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match parse(raw.trim()) {
        Some(v) => Some(v),
        None => {
            tracing::warn!(var = name, value = %raw, "ignoring malformed environment value");
            None
        }
    }
}

#[cfg(any(feature = "monitoring", test))]
fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>().ok()
}

#[cfg(any(feature = "monitoring", test))]
fn parse_hour(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().filter(|h| *h < 24)
}

#[cfg(any(feature = "monitoring", test))]
fn parse_hour_list(s: &str) -> Option<Vec<u32>> {
    let hours: Option<Vec<u32>> = s.split(',').map(|p| parse_hour(p.trim())).collect();
    hours.filter(|h| !h.is_empty())
}

#[cfg(any(feature = "monitoring", test))]
fn parse_decimal_list(s: &str) -> Option<Vec<Decimal>> {
    let values: Option<Vec<Decimal>> = s.split(',').map(|p| parse_decimal(p.trim())).collect();
    values.filter(|v| !v.is_empty())
}
