use clap::{Args, ValueEnum};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use nav_monitor_core::config::MonitorConfig;
use nav_monitor_core::engine::{BatchEvaluationDriver, SweepMode};
use nav_monitor_core::evaluator;
use nav_monitor_core::model::ComparisonOperator;
use nav_monitor_core::store::MemoryStore;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OperatorArg {
    /// current < threshold
    Lt,
    /// current <= threshold
    Lte,
    /// current > threshold
    Gt,
    /// current >= threshold
    Gte,
}

impl From<OperatorArg> for ComparisonOperator {
    fn from(op: OperatorArg) -> Self {
        match op {
            OperatorArg::Lt => ComparisonOperator::LessThan,
            OperatorArg::Lte => ComparisonOperator::LessThanEqual,
            OperatorArg::Gt => ComparisonOperator::GreaterThan,
            OperatorArg::Gte => ComparisonOperator::GreaterThanEqual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SweepModeArg {
    Due,
    All,
    Urgent,
}

impl From<SweepModeArg> for SweepMode {
    fn from(mode: SweepModeArg) -> Self {
        match mode {
            SweepModeArg::Due => SweepMode::Due,
            SweepModeArg::All => SweepMode::All,
            SweepModeArg::Urgent => SweepMode::Urgent,
        }
    }
}

/// Arguments for single-threshold evaluation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct EvaluateArgs {
    /// Comparison operator
    #[arg(long)]
    pub operator: OperatorArg,

    /// Covenant threshold
    #[arg(long)]
    pub threshold: Decimal,

    /// Current measured value
    #[arg(long)]
    pub value: Decimal,

    /// Warning band as a fraction of the threshold
    #[arg(long, default_value = "0.10")]
    pub warning_band: Decimal,
}

/// Arguments for a compliance sweep over a portfolio file
#[derive(Args)]
pub struct SweepArgs {
    /// Path to portfolio file (JSON or YAML)
    #[arg(long)]
    pub input: String,

    /// Which covenants to sweep
    #[arg(long, default_value = "due")]
    pub mode: SweepModeArg,

    /// Check a single covenant by id instead of sweeping
    #[arg(long)]
    pub covenant: Option<Uuid>,

    /// Check every covenant on one facility instead of sweeping
    #[arg(long)]
    pub facility: Option<Uuid>,

    /// Post a manually measured value (requires --covenant)
    #[arg(long)]
    pub manual_value: Option<Decimal>,

    /// Evaluation timestamp (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let operator: ComparisonOperator = args.operator.into();
    let evaluation = evaluator::evaluate(operator, args.threshold, args.value, args.warning_band);
    let headroom = evaluator::headroom(operator, args.threshold, args.value);

    Ok(serde_json::json!({
        "status": evaluation.status,
        "breached": evaluation.breached,
        "threshold": args.threshold,
        "current_value": args.value,
        "warning_band": args.warning_band.max(dec!(0)),
        "headroom": headroom.headroom,
        "headroom_pct": headroom.headroom_pct,
    }))
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::file::read_portfolio(&args.input)?;
    let store = Arc::new(MemoryStore::from_data(data));
    let driver = BatchEvaluationDriver::new(store, MonitorConfig::from_env());
    let now = args.at.unwrap_or_else(Utc::now);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        if let Some(value) = args.manual_value {
            let id = args
                .covenant
                .ok_or("--manual-value requires --covenant")?;
            let check = driver.record_manual_value(id, value, now).await?;
            return Ok(serde_json::to_value(check)?);
        }
        if let Some(id) = args.covenant {
            let check = driver.check_covenant(id, now).await?;
            return Ok(serde_json::to_value(check)?);
        }
        if let Some(id) = args.facility {
            let checks = driver.check_facility(id, now).await?;
            return Ok(serde_json::to_value(checks)?);
        }
        let report = driver.run(now, args.mode.into()).await?;
        Ok(serde_json::to_value(report)?)
    })
}
