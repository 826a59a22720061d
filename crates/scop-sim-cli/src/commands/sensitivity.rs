use clap::Args;
use serde_json::Value;

use scop_sim_core::cooperative::scenario::SimulationInput;
use scop_sim_core::scenarios::sensitivity::{self, SweepInput, SweepVariable};

use crate::input;

/// Arguments for a one-way savings sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Path to a full sweep file (base scenario, variable and range)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to the base scenario file; read from stdin when omitted
    #[arg(long)]
    pub base: Option<String>,

    /// Variable to sweep in format name:min:max:step
    /// (e.g. "fiscal_result:50000:250000:25000"). Names: fiscal_result,
    /// cet, normal_rate, participation_pct
    #[arg(long, allow_hyphen_values = true)]
    pub var: Option<String>,
}

fn parse_variable(name: &str) -> Result<SweepVariable, Box<dyn std::error::Error>> {
    match name.to_lowercase().replace('-', "_").as_str() {
        "fiscal_result" => Ok(SweepVariable::FiscalResult),
        "cet" => Ok(SweepVariable::Cet),
        "normal_rate" => Ok(SweepVariable::NormalRate),
        "participation" | "participation_pct" => Ok(SweepVariable::ParticipationPct),
        other => Err(format!(
            "Unknown sweep variable '{}'. Use fiscal_result, cet, normal_rate or participation_pct",
            other
        )
        .into()),
    }
}

fn parse_sweep_arg(
    arg: &str,
    base: SimulationInput,
) -> Result<SweepInput, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = arg.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("Sweep variable must be name:min:max:step, got '{}'", arg).into());
    }
    Ok(SweepInput {
        base,
        variable: parse_variable(parts[0])?,
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sweep_input: SweepInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else {
        let var = args
            .var
            .as_deref()
            .ok_or("--var is required (or provide --input)")?;
        let base: SimulationInput = if let Some(ref path) = args.base {
            input::file::read_input(path)?
        } else if let Some(data) = input::stdin::read_stdin()? {
            data
        } else {
            return Err("--base scenario file is required (or pipe one on stdin)".into());
        };
        parse_sweep_arg(var, base)?
    };

    let result = sensitivity::savings_sweep(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn base() -> SimulationInput {
        SimulationInput {
            fiscal_result: dec!(100000),
            cet: dec!(5000),
            normal_rate: dec!(25),
            reduced_rate_ceiling: Decimal::ZERO,
            reduced_rate: Decimal::ZERO,
            participation_pct: dec!(45),
            reserves_pct: dec!(45),
            dividends_pct: dec!(10),
        }
    }

    #[test]
    fn test_parse_sweep_arg() {
        let sweep = parse_sweep_arg("fiscal_result:50000:250000:25000", base()).unwrap();
        assert_eq!(sweep.variable, SweepVariable::FiscalResult);
        assert_eq!(sweep.min, dec!(50000));
        assert_eq!(sweep.max, dec!(250000));
        assert_eq!(sweep.step, dec!(25000));
    }

    #[test]
    fn test_parse_negative_range() {
        let sweep = parse_sweep_arg("fiscal-result:-50000:50000:10000", base()).unwrap();
        assert_eq!(sweep.min, dec!(-50000));
    }

    #[test]
    fn test_parse_variable_aliases() {
        assert_eq!(
            parse_variable("participation").unwrap(),
            SweepVariable::ParticipationPct
        );
        assert_eq!(parse_variable("CET").unwrap(), SweepVariable::Cet);
        assert!(parse_variable("dividends").is_err());
    }

    #[test]
    fn test_malformed_sweep_arg() {
        assert!(parse_sweep_arg("cet:0:100", base()).is_err());
        assert!(parse_sweep_arg("cet:zero:100:10", base()).is_err());
    }
}
