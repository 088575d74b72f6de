mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::structure::StructureArgs;
use commands::wacc::{CostOfDebtArgs, CostOfEquityArgs, WaccArgs};

/// Weighted average cost of capital calculator
#[derive(Parser)]
#[command(
    name = "wacc",
    version,
    about = "Weighted average cost of capital calculator",
    long_about = "Calculates the weighted average cost of capital with decimal precision. \
                  Supports CAPM, Gordon growth and direct cost of equity, multi-tranche \
                  debt, and the three-step instrument model."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter (e.g. "debug", "wacc_core=trace")
    #[arg(long, default_value = "warn", global = true)]
    log: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate WACC from equity, debt tranches, tax rate and capital weights
    Calculate(WaccArgs),
    /// Cost of equity only (CAPM, Gordon growth or direct)
    CostOfEquity(CostOfEquityArgs),
    /// Blended pre-tax and after-tax cost of debt across tranches
    CostOfDebt(CostOfDebtArgs),
    /// Three-step model: instrument costs, market-value structure, weighted WACC
    Structure(StructureArgs),
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

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::wacc::run_wacc(args),
        Commands::CostOfEquity(args) => commands::wacc::run_cost_of_equity(args),
        Commands::CostOfDebt(args) => commands::wacc::run_cost_of_debt(args),
        Commands::Structure(args) => commands::structure::run_structure(args),
        Commands::Version => {
            println!("wacc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
