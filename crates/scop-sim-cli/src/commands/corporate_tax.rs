use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use scop_sim_core::corporate_tax::progressive::{self, CorporateTaxInput};

use crate::commands::cooperative::bracket_from_flags;
use crate::input;

/// Arguments for the IS breakdown calculator
#[derive(Args)]
pub struct CorporateTaxArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Taxable result; negative values are treated as zero
    #[arg(long, allow_hyphen_values = true)]
    pub taxable_result: Option<Decimal>,

    /// Normal IS rate, in percent
    #[arg(long, default_value = "25")]
    pub normal_rate: Decimal,

    /// Upper bound of the reduced-rate slice (0 disables it)
    #[arg(long)]
    pub reduced_rate_ceiling: Option<Decimal>,

    /// Reduced IS rate, in percent
    #[arg(long)]
    pub reduced_rate: Option<Decimal>,

    /// Apply the SME bracket (42 500 at 15%) unless ceiling or rate are given
    #[arg(long)]
    pub sme_bracket: bool,
}

pub fn run_corporate_tax(args: CorporateTaxArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tax_input: CorporateTaxInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        let (reduced_rate_ceiling, reduced_rate) =
            bracket_from_flags(args.reduced_rate_ceiling, args.reduced_rate, args.sme_bracket);
        CorporateTaxInput {
            taxable_result: args
                .taxable_result
                .ok_or("--taxable-result is required (or provide --input)")?,
            normal_rate: args.normal_rate,
            reduced_rate_ceiling,
            reduced_rate,
        }
    };

    let result = progressive::calculate_corporate_tax(&tax_input)?;
    Ok(serde_json::to_value(result)?)
}
