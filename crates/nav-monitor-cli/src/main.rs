mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::access::AuthorizeArgs;
use commands::covenants::{EvaluateArgs, SweepArgs};
use commands::monitor::MonitorArgs;
use commands::risk::{ConcentrationArgs, StressArgs, SummaryArgs};

/// Covenant monitoring and portfolio risk for NAV lending
#[derive(Parser)]
#[command(
    name = "navm",
    version,
    about = "Covenant monitoring and portfolio risk for NAV lending",
    long_about = "A CLI for NAV-lending covenant monitoring with decimal precision. \
                  Evaluates covenant thresholds with warning bands, runs batch \
                  compliance sweeps with breach alerting, and computes portfolio \
                  risk scores, concentration (HHI), and NAV-decline stress tests."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single covenant threshold with the warning band
    Evaluate(EvaluateArgs),
    /// Run a covenant compliance sweep over a portfolio file
    Sweep(SweepArgs),
    /// Portfolio risk summary (risk score, covenant health, payments)
    Summary(SummaryArgs),
    /// Concentration analysis (top-5 ratio, HHI by GP/sector/vintage)
    Concentration(ConcentrationArgs),
    /// NAV-decline stress test
    Stress(StressArgs),
    /// Check facility access for a user and role
    Authorize(AuthorizeArgs),
    /// Run the monitoring scheduler in the foreground
    Monitor(MonitorArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::covenants::run_evaluate(args),
        Commands::Sweep(args) => commands::covenants::run_sweep(args),
        Commands::Summary(args) => commands::risk::run_summary(args),
        Commands::Concentration(args) => commands::risk::run_concentration(args),
        Commands::Stress(args) => commands::risk::run_stress(args),
        Commands::Authorize(args) => commands::access::run_authorize(args),
        Commands::Monitor(args) => commands::monitor::run_monitor(args),
        Commands::Version => {
            println!("navm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
