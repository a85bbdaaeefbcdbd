use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use nav_monitor_core::config::MonitorConfig;
use nav_monitor_core::risk::{self, PortfolioSnapshot};
use nav_monitor_core::store::PortfolioData;

use crate::input;

/// Arguments for the portfolio risk summary
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to portfolio file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// As-of date for maturity windows (defaults to today, UTC)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Upcoming-maturity window in days
    #[arg(long, default_value = "90")]
    pub maturity_days: i64,
}

/// Arguments for concentration analysis
#[derive(Args)]
pub struct ConcentrationArgs {
    /// Path to portfolio file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the NAV-decline stress test
#[derive(Args)]
pub struct StressArgs {
    /// Path to portfolio file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated NAV-decline shocks as fractions; defaults to 0.20,0.40
    #[arg(long, value_delimiter = ',')]
    pub shocks: Vec<Decimal>,
}

fn load_snapshot(input_path: &Option<String>) -> Result<PortfolioSnapshot, Box<dyn std::error::Error>> {
    let data: PortfolioData = if let Some(ref path) = input_path {
        input::file::read_portfolio(path)?
    } else if let Some(piped) = input::stdin::read_stdin()? {
        serde_json::from_value(piped)?
    } else {
        return Err("--input is required (or pipe a portfolio on stdin)".into());
    };

    Ok(PortfolioSnapshot {
        facilities: data.facilities,
        covenants: data.covenants,
        cash_flows: data.cash_flows,
    })
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = MonitorConfig::from_env();
    let snapshot = load_snapshot(&args.input)?;
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let output = risk::summary::portfolio_summary(
        &snapshot,
        &config.risk_weights,
        args.maturity_days,
        as_of,
    )?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_concentration(args: ConcentrationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.input)?;
    let output = risk::concentration_analysis(&snapshot.facilities)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = MonitorConfig::from_env();
    let snapshot = load_snapshot(&args.input)?;
    let shocks = if args.shocks.is_empty() {
        config.stress_shocks.clone()
    } else {
        args.shocks
    };
    let output = risk::stress_test(
        &snapshot.facilities,
        &snapshot.covenants,
        &shocks,
        &config.stress_bands,
    )?;
    Ok(serde_json::to_value(output)?)
}
