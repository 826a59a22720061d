use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cooperative::allocation::AllocationSplit;
use crate::cooperative::resolver::{self, ResolutionStrategy, ResolverContext};
use crate::corporate_tax::progressive::{CorporateTaxSchedule, TaxBreakdown};
use crate::error::SimulatorError;
use crate::types::*;
use crate::SimulatorResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One simulation: a fiscal year's result, its CET, the IS schedule and the
/// cooperative allocation split. Rates and shares are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Pre-tax accounting result for the period
    pub fiscal_result: Money,
    /// Territorial economic contribution paid by a standard company
    pub cet: Money,
    pub normal_rate: Percent,
    /// Zero disables the reduced-rate bracket
    #[serde(default)]
    pub reduced_rate_ceiling: Money,
    #[serde(default)]
    pub reduced_rate: Percent,
    pub participation_pct: Percent,
    pub reserves_pct: Percent,
    pub dividends_pct: Percent,
}

impl SimulationInput {
    pub fn schedule(&self) -> CorporateTaxSchedule {
        CorporateTaxSchedule {
            normal_rate: self.normal_rate,
            reduced_rate_ceiling: self.reduced_rate_ceiling,
            reduced_rate: self.reduced_rate,
        }
    }

    pub fn split(&self) -> AllocationSplit {
        AllocationSplit {
            participation_pct: self.participation_pct,
            reserves_pct: self.reserves_pct,
            dividends_pct: self.dividends_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Output structs
// ---------------------------------------------------------------------------

/// Tax position of the company under one regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub fiscal_result: Money,
    pub taxable_base_before_deductions: Money,
    pub participation_deduction: Money,
    pub reserves_deduction: Money,
    pub taxable_base: Money,
    pub tax_owed: Money,
    pub tax_breakdown: TaxBreakdown,
    pub cet: Money,
    pub total_tax_cost: Money,
    pub net_result: Money,
    /// Total tax cost over the fiscal result, on a 0-100 scale
    pub effective_tax_rate: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserves_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividends_amount: Option<Money>,
}

/// The cooperative scenario with the resolver's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooperativeScenario {
    #[serde(flatten)]
    pub scenario: ScenarioResult,
    pub converged: bool,
    pub iterations: u32,
    pub strategy: ResolutionStrategy,
    pub final_residual: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub tax_savings: Money,
    pub cet_savings: Money,
    pub total_savings: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub without_regime: ScenarioResult,
    pub with_regime: CooperativeScenario,
    pub savings: SavingsSummary,
}

impl CooperativeScenario {
    /// Turn a non-converged resolution into an error, for callers that
    /// refuse to work from an approximate result.
    pub fn ensure_converged(&self) -> SimulatorResult<()> {
        if self.converged {
            return Ok(());
        }
        Err(SimulatorError::ConvergenceFailure {
            function: "cooperative allocation resolver".into(),
            iterations: self.iterations,
            last_delta: self.final_residual,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compare a standard company with a SCOP for one set of inputs.
///
/// Pure: the same input always yields the same output. Out-of-range rates,
/// shares or amounts are rejected with `InvalidInput`; everything else,
/// including splits that do not total 100%, is computed as given.
pub fn solve(input: &SimulationInput) -> SimulatorResult<SimulationOutput> {
    validate_input(input)?;

    let without_regime = without_regime(input);
    let with_regime = with_regime(input);
    let savings = savings(&without_regime, &with_regime.scenario);

    Ok(SimulationOutput {
        without_regime,
        with_regime,
        savings,
    })
}

/// [`solve`] wrapped in the standard envelope, with policy and
/// convergence warnings.
pub fn simulate(input: &SimulationInput) -> SimulatorResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let output = solve(input)?;

    let mut warnings = input.split().policy_warnings();
    if input.cet < Decimal::ZERO {
        warnings.push(format!("Negative CET ({}) computed as given", input.cet));
    }
    if input.reduced_rate_ceiling < Decimal::ZERO {
        warnings.push(format!(
            "Negative reduced-rate ceiling ({}) disables the reduced-rate bracket",
            input.reduced_rate_ceiling
        ));
    }
    if input.fiscal_result <= Decimal::ZERO {
        warnings.push(format!(
            "Fiscal result {} leaves no taxable profit in the standard scenario",
            input.fiscal_result
        ));
    }
    let with = &output.with_regime;
    if !with.converged {
        warnings.push(format!(
            "Allocation resolver stopped after {} rounds without converging (residual {})",
            with.iterations, with.final_residual
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Standard company vs SCOP: progressive IS with fixed-point participation resolution",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// The standard company: IS on the fiscal result, CET paid on top.
pub fn without_regime(input: &SimulationInput) -> ScenarioResult {
    let schedule = input.schedule();
    let tax_breakdown = schedule.breakdown(input.fiscal_result);
    let tax_owed = tax_breakdown.total_tax;
    let total_tax_cost = tax_owed + input.cet;

    ScenarioResult {
        fiscal_result: input.fiscal_result,
        taxable_base_before_deductions: input.fiscal_result,
        participation_deduction: Decimal::ZERO,
        reserves_deduction: Decimal::ZERO,
        taxable_base: input.fiscal_result,
        tax_owed,
        tax_breakdown,
        cet: input.cet,
        total_tax_cost,
        net_result: input.fiscal_result - tax_owed - input.cet,
        effective_tax_rate: percent_of(total_tax_cost, input.fiscal_result),
        participation_amount: None,
        reserves_amount: None,
        dividends_amount: None,
    }
}

/// The cooperative: CET exempt and added back to the base, participation
/// and capped reserves deducted, circularity resolved by [`resolver`].
pub fn with_regime(input: &SimulationInput) -> CooperativeScenario {
    let base_before_deductions = input.fiscal_result + input.cet;
    let ctx = ResolverContext {
        base_before_deductions,
        schedule: input.schedule(),
        split: input.split(),
    };
    let resolution = resolver::resolve(&ctx);
    let tax_breakdown = ctx.schedule.breakdown(resolution.taxable_base);

    CooperativeScenario {
        scenario: ScenarioResult {
            fiscal_result: input.fiscal_result,
            taxable_base_before_deductions: base_before_deductions,
            participation_deduction: resolution.participation_deduction,
            reserves_deduction: resolution.reserves_deduction,
            taxable_base: resolution.taxable_base,
            tax_owed: resolution.tax_owed,
            tax_breakdown,
            cet: Decimal::ZERO,
            total_tax_cost: resolution.tax_owed,
            net_result: resolution.net_result_after_tax,
            effective_tax_rate: percent_of(resolution.tax_owed, input.fiscal_result),
            participation_amount: Some(resolution.allocations.participation),
            reserves_amount: Some(resolution.allocations.reserves),
            dividends_amount: Some(resolution.allocations.dividends),
        },
        converged: resolution.converged,
        iterations: resolution.iterations,
        strategy: resolution.strategy,
        final_residual: resolution.final_residual,
    }
}

/// Savings of the cooperative over the standard company. The CET is saved
/// in full since the cooperative is exempt.
pub fn savings(without: &ScenarioResult, with: &ScenarioResult) -> SavingsSummary {
    let tax_savings = without.tax_owed - with.tax_owed;
    let cet_savings = without.cet;
    SavingsSummary {
        tax_savings,
        cet_savings,
        total_savings: tax_savings + cet_savings,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &SimulationInput) -> SimulatorResult<()> {
    validate_amount("fiscal_result", input.fiscal_result)?;
    validate_amount("cet", input.cet)?;
    input.schedule().validate()?;
    input.split().validate()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_input() -> SimulationInput {
        SimulationInput {
            fiscal_result: dec!(100000),
            cet: dec!(5000),
            normal_rate: dec!(25),
            reduced_rate_ceiling: dec!(0),
            reduced_rate: dec!(0),
            participation_pct: dec!(45),
            reserves_pct: dec!(45),
            dividends_pct: dec!(10),
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected} ± {tol}, got {actual}"
        );
    }

    // --------------------------------------------------
    // Standard company
    // --------------------------------------------------

    #[test]
    fn test_without_regime_reference_values() {
        let r = without_regime(&sample_input());
        assert_eq!(r.tax_owed, dec!(25000));
        assert_eq!(r.total_tax_cost, dec!(30000));
        assert_eq!(r.net_result, dec!(70000));
        assert_eq!(r.effective_tax_rate, dec!(30));
        assert_eq!(r.participation_amount, None);
    }

    #[test]
    fn test_without_regime_with_bracket() {
        let mut input = sample_input();
        input.reduced_rate_ceiling = dec!(42500);
        input.reduced_rate = dec!(15);
        let r = without_regime(&input);
        assert_eq!(r.tax_owed, dec!(20750));
        assert_eq!(r.tax_breakdown.reduced_rate_tax, dec!(6375));
        assert_eq!(r.net_result, dec!(74250));
    }

    // --------------------------------------------------
    // Cooperative
    // --------------------------------------------------

    #[test]
    fn test_with_regime_sample() {
        let w = with_regime(&sample_input());
        let s = &w.scenario;
        assert!(w.converged);
        assert_eq!(w.strategy, ResolutionStrategy::ClosedForm);
        assert_eq!(s.taxable_base_before_deductions, dec!(105000));
        assert_eq!(s.cet, Decimal::ZERO);
        assert_eq!(s.total_tax_cost, s.tax_owed);
        assert_close(s.tax_owed, dec!(14570.22), dec!(0.01));
        assert_close(s.net_result, dec!(90429.78), dec!(0.01));
        assert_close(s.participation_amount.unwrap(), dec!(23359.55), dec!(0.01));
        assert_close(s.reserves_amount.unwrap(), dec!(40693.40), dec!(0.01));
        assert_close(s.dividends_amount.unwrap(), dec!(9042.98), dec!(0.01));
    }

    #[test]
    fn test_with_regime_uses_iteration_above_ceiling() {
        let mut input = sample_input();
        input.reduced_rate_ceiling = dec!(42500);
        input.reduced_rate = dec!(15);
        let w = with_regime(&input);
        assert_eq!(w.strategy, ResolutionStrategy::DampedIteration);
        assert!(w.converged);
        assert!(w.iterations > 0);
        assert!(w.ensure_converged().is_ok());
        assert_eq!(w.scenario.tax_breakdown.total_tax, w.scenario.tax_owed);
    }

    #[test]
    fn test_ensure_converged_error() {
        let mut w = with_regime(&sample_input());
        w.converged = false;
        w.iterations = 100;
        w.final_residual = dec!(0.5);
        let err = w.ensure_converged().unwrap_err();
        assert!(matches!(err, SimulatorError::ConvergenceFailure { iterations: 100, .. }));
    }

    // --------------------------------------------------
    // Savings and solve
    // --------------------------------------------------

    #[test]
    fn test_solve_savings() {
        let out = solve(&sample_input()).unwrap();
        assert_eq!(out.savings.cet_savings, dec!(5000));
        assert_eq!(
            out.savings.total_savings,
            out.savings.tax_savings + out.savings.cet_savings
        );
        assert_close(out.savings.tax_savings, dec!(10429.78), dec!(0.01));
        assert_close(out.savings.total_savings, dec!(15429.78), dec!(0.01));
    }

    #[test]
    fn test_solve_is_idempotent() {
        let input = sample_input();
        assert_eq!(solve(&input).unwrap(), solve(&input).unwrap());
    }

    #[test]
    fn test_zero_fiscal_result() {
        let mut input = sample_input();
        input.fiscal_result = Decimal::ZERO;
        let out = solve(&input).unwrap();
        assert_eq!(out.without_regime.tax_owed, Decimal::ZERO);
        assert_eq!(out.without_regime.net_result, dec!(-5000));
        let with = &out.with_regime.scenario;
        assert_eq!(with.net_result, dec!(5000) - with.tax_owed);
        assert_eq!(with.effective_tax_rate, Decimal::ZERO);
    }

    #[test]
    fn test_zero_fiscal_result_and_cet() {
        let mut input = sample_input();
        input.fiscal_result = Decimal::ZERO;
        input.cet = Decimal::ZERO;
        let out = solve(&input).unwrap();
        assert_eq!(out.without_regime.tax_owed, Decimal::ZERO);
        assert_eq!(out.with_regime.scenario.tax_owed, Decimal::ZERO);
        assert_eq!(out.with_regime.scenario.net_result, Decimal::ZERO);
        assert_eq!(out.savings.total_savings, Decimal::ZERO);
    }

    #[test]
    fn test_unbalanced_split_is_computed() {
        let mut input = sample_input();
        input.dividends_pct = dec!(30);
        let out = simulate(&input).unwrap();
        let with = &out.result.with_regime.scenario;
        let distributed = with.participation_amount.unwrap()
            + with.reserves_amount.unwrap()
            + with.dividends_amount.unwrap();
        assert!(distributed > with.net_result);
        assert!(out.warnings.iter().any(|w| w.contains("120")));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let mut input = sample_input();
        input.normal_rate = dec!(250);
        match solve(&input).unwrap_err() {
            SimulatorError::InvalidInput { field, .. } => assert_eq!(field, "normal_rate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_oversized_amount_rejected() {
        let mut input = sample_input();
        input.fiscal_result = MAX_AMOUNT * dec!(10);
        assert!(solve(&input).is_err());
    }

    #[test]
    fn test_simulate_envelope() {
        let out = simulate(&sample_input()).unwrap();
        assert!(out.warnings.is_empty());
        assert!(out.methodology.contains("SCOP"));
        assert_eq!(out.assumptions["participation_pct"], "45");
    }

    #[test]
    fn test_simulate_warns_on_negative_cet() {
        let mut input = sample_input();
        input.cet = dec!(-100);
        let out = simulate(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Negative CET")));
    }

    #[test]
    fn test_input_defaults_disable_bracket() {
        let input: SimulationInput = serde_json::from_str(
            r#"{
                "fiscal_result": 100000,
                "cet": 5000,
                "normal_rate": 25,
                "participation_pct": 45,
                "reserves_pct": 45,
                "dividends_pct": 10
            }"#,
        )
        .unwrap();
        assert_eq!(input, sample_input());
    }

    #[test]
    fn test_output_json_shape() {
        let out = solve(&sample_input()).unwrap();
        let value = serde_json::to_value(&out).unwrap();
        assert!(value["without_regime"].get("participation_amount").is_none());
        assert!(value["with_regime"].get("participation_amount").is_some());
        assert_eq!(value["with_regime"]["converged"], true);
        assert_eq!(value["with_regime"]["strategy"], "ClosedForm");
    }
}
