use clap::Args;
use serde_json::Value;
use std::sync::Arc;

use nav_monitor_core::config::MonitorConfig;
use nav_monitor_core::engine::MonitorScheduler;
use nav_monitor_core::store::MemoryStore;

use crate::input;

/// Arguments for the foreground monitoring run
#[derive(Args)]
pub struct MonitorArgs {
    /// Path to portfolio file (JSON or YAML)
    #[arg(long)]
    pub input: String,
}

/// Load the portfolio, start the scheduler, and run until Ctrl-C.
pub fn run_monitor(args: MonitorArgs) -> Result<Value, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data = input::file::read_portfolio(&args.input)?;
    let store = Arc::new(MemoryStore::from_data(data));
    let config = MonitorConfig::from_env();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut scheduler = MonitorScheduler::new(store, config);
        let jobs: Vec<String> = scheduler
            .jobs()
            .iter()
            .map(|j| format!("{} ({:?})", j.name, j.schedule))
            .collect();
        scheduler.start();

        tokio::signal::ctrl_c().await?;
        scheduler.stop().await;

        Ok(serde_json::json!({
            "stopped": true,
            "jobs": jobs,
        }))
    })
}
