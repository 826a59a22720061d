use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use scop_sim_core::cooperative::scenario::{self, SimulationInput};
use scop_sim_core::corporate_tax::progressive::{SME_REDUCED_RATE, SME_REDUCED_RATE_CEILING};

use crate::input;

/// Arguments for the standard company vs SCOP comparison
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Pre-tax fiscal result
    #[arg(long, allow_hyphen_values = true)]
    pub fiscal_result: Option<Decimal>,

    /// CET paid by a standard company
    #[arg(long, allow_hyphen_values = true)]
    pub cet: Option<Decimal>,

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

    /// Participation share of the net result, in percent
    #[arg(long, alias = "participation-pct", default_value = "45")]
    pub participation: Decimal,

    /// Reserves share of the net result, in percent
    #[arg(long, alias = "reserves-pct", default_value = "45")]
    pub reserves: Decimal,

    /// Dividends share of the net result, in percent
    #[arg(long, alias = "dividends-pct", default_value = "10")]
    pub dividends: Decimal,

    /// Fail instead of warning when the allocation resolver does not converge
    #[arg(long)]
    pub strict: bool,
}

/// Reduced-rate slice from explicit flags, falling back to the SME preset.
pub(crate) fn bracket_from_flags(
    ceiling: Option<Decimal>,
    rate: Option<Decimal>,
    sme_bracket: bool,
) -> (Decimal, Decimal) {
    let (default_ceiling, default_rate) = if sme_bracket {
        (SME_REDUCED_RATE_CEILING, SME_REDUCED_RATE)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    (
        ceiling.unwrap_or(default_ceiling),
        rate.unwrap_or(default_rate),
    )
}

fn input_from_flags(args: &SimulateArgs) -> Result<SimulationInput, Box<dyn std::error::Error>> {
    let (reduced_rate_ceiling, reduced_rate) =
        bracket_from_flags(args.reduced_rate_ceiling, args.reduced_rate, args.sme_bracket);
    Ok(SimulationInput {
        fiscal_result: args
            .fiscal_result
            .ok_or("--fiscal-result is required (or provide --input)")?,
        cet: args.cet.ok_or("--cet is required (or provide --input)")?,
        normal_rate: args.normal_rate,
        reduced_rate_ceiling,
        reduced_rate,
        participation_pct: args.participation,
        reserves_pct: args.reserves,
        dividends_pct: args.dividends,
    })
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sim_input: SimulationInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        input_from_flags(&args)?
    };

    let result = scenario::simulate(&sim_input)?;
    if args.strict {
        result.result.with_regime.ensure_converged()?;
    }
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SimulateArgs,
    }

    fn parse(argv: &[&str]) -> SimulateArgs {
        Harness::parse_from(std::iter::once("scop").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_flags_with_defaults() {
        let args = parse(&["--fiscal-result", "100000", "--cet", "5000"]);
        let input = input_from_flags(&args).unwrap();
        assert_eq!(input.normal_rate, dec!(25));
        assert_eq!(input.participation_pct, dec!(45));
        assert_eq!(input.dividends_pct, dec!(10));
        assert_eq!(input.reduced_rate_ceiling, Decimal::ZERO);
    }

    #[test]
    fn test_sme_bracket_flag() {
        let args = parse(&["--fiscal-result", "100000", "--cet", "0", "--sme-bracket"]);
        let input = input_from_flags(&args).unwrap();
        assert_eq!(input.reduced_rate_ceiling, dec!(42500));
        assert_eq!(input.reduced_rate, dec!(15));
    }

    #[test]
    fn test_explicit_bracket_overrides_preset() {
        assert_eq!(
            bracket_from_flags(Some(dec!(38120)), None, true),
            (dec!(38120), dec!(15))
        );
        assert_eq!(bracket_from_flags(None, None, false), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn test_negative_fiscal_result_flag() {
        let args = parse(&["--fiscal-result", "-20000", "--cet", "1000"]);
        assert_eq!(input_from_flags(&args).unwrap().fiscal_result, dec!(-20000));
    }

    #[test]
    fn test_missing_required_flag() {
        let args = parse(&["--cet", "5000"]);
        let err = input_from_flags(&args).unwrap_err();
        assert!(err.to_string().contains("--fiscal-result"));
    }
}
