mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cooperative::SimulateArgs;
use commands::corporate_tax::CorporateTaxArgs;
use commands::sensitivity::SweepArgs;

/// Compare the tax cost of a standard company with a SCOP
#[derive(Parser)]
#[command(
    name = "scop",
    version,
    about = "Compare the tax cost of a standard company with a SCOP",
    long_about = "Simulates French corporate income tax (IS) and the CET for a standard \
                  company and for a worker cooperative (SCOP), where employee participation \
                  and reserves are deducted from the taxable base. Supports the SME \
                  reduced-rate bracket and one-way sensitivity sweeps of the savings."
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
    /// Run the full standard company vs SCOP comparison
    Simulate(SimulateArgs),
    /// Break corporate income tax down by slice
    CorporateTax(CorporateTaxArgs),
    /// Sweep one input and report the savings at each value
    Sweep(SweepArgs),
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
        Commands::Simulate(args) => commands::cooperative::run_simulate(args),
        Commands::CorporateTax(args) => commands::corporate_tax::run_corporate_tax(args),
        Commands::Sweep(args) => commands::sensitivity::run_sweep(args),
        Commands::Version => {
            println!("scop {}", env!("CARGO_PKG_VERSION"));
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
