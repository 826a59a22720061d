use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cooperative::scenario::{self, SimulationInput};
use crate::error::SimulatorError;
use crate::types::*;
use crate::SimulatorResult;

/// Upper bound on the number of grid values in a single sweep.
pub const MAX_SWEEP_POINTS: usize = 1000;

/// Input field varied by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepVariable {
    FiscalResult,
    Cet,
    NormalRate,
    /// Dividends absorb the change so the split keeps totalling 100
    ParticipationPct,
}

/// Input for a one-way savings sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    /// Scenario every grid value is applied to
    pub base: SimulationInput,
    pub variable: SweepVariable,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: Decimal,
    pub tax_without: Money,
    pub tax_with: Money,
    pub total_savings: Money,
    pub converged: bool,
}

/// Output of a one-way savings sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    pub variable: SweepVariable,
    pub points: Vec<SweepPoint>,
    /// Total savings of the unmodified base scenario
    pub base_case_savings: Money,
    /// Grid value giving the largest total savings (first one on ties)
    pub best_value: Decimal,
    pub best_savings: Money,
}

impl SweepVariable {
    fn field_name(&self) -> &'static str {
        match self {
            SweepVariable::FiscalResult => "fiscal_result",
            SweepVariable::Cet => "cet",
            SweepVariable::NormalRate => "normal_rate",
            SweepVariable::ParticipationPct => "participation_pct",
        }
    }

    /// Copy of `base` with this variable set to `value`.
    pub fn apply(&self, base: &SimulationInput, value: Decimal) -> SimulationInput {
        let mut input = base.clone();
        match self {
            SweepVariable::FiscalResult => input.fiscal_result = value,
            SweepVariable::Cet => input.cet = value,
            SweepVariable::NormalRate => input.normal_rate = value,
            SweepVariable::ParticipationPct => {
                input.participation_pct = value;
                input.dividends_pct = (dec!(100) - value - input.reserves_pct).max(Decimal::ZERO);
            }
        }
        input
    }
}

/// Generate the grid from min to max with step; max is always included.
fn generate_sweep_values(input: &SweepInput) -> SimulatorResult<Vec<Decimal>> {
    let field = format!("variable:{}", input.variable.field_name());
    if input.step <= Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field,
            reason: "Step must be positive".into(),
        });
    }
    if input.min > input.max {
        return Err(SimulatorError::InvalidInput {
            field,
            reason: "Min must be <= max".into(),
        });
    }
    validate_amount("min", input.min)?;
    validate_amount("max", input.max)?;
    validate_amount("step", input.step)?;

    let mut values = Vec::new();
    let mut current = input.min;
    while current <= input.max {
        if values.len() == MAX_SWEEP_POINTS {
            return Err(SimulatorError::InvalidInput {
                field,
                reason: format!("Sweep exceeds {MAX_SWEEP_POINTS} points"),
            });
        }
        values.push(current);
        match current.checked_add(input.step) {
            Some(next) => current = next,
            None => break,
        }
    }
    if let Some(&last) = values.last() {
        if last < input.max {
            if values.len() == MAX_SWEEP_POINTS {
                return Err(SimulatorError::InvalidInput {
                    field,
                    reason: format!("Sweep exceeds {MAX_SWEEP_POINTS} points"),
                });
            }
            values.push(input.max);
        }
    }

    Ok(values)
}

/// Re-run the SCOP comparison across a range of one input and report the
/// savings at each grid value.
pub fn savings_sweep(input: &SweepInput) -> SimulatorResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let values = generate_sweep_values(input)?;
    let base_case = scenario::solve(&input.base)?;

    let mut points = Vec::with_capacity(values.len());
    for &value in &values {
        let out = scenario::solve(&input.variable.apply(&input.base, value))?;
        points.push(SweepPoint {
            value,
            tax_without: out.without_regime.tax_owed,
            tax_with: out.with_regime.scenario.tax_owed,
            total_savings: out.savings.total_savings,
            converged: out.with_regime.converged,
        });
    }

    let mut best = &points[0];
    for point in &points[1..] {
        if point.total_savings > best.total_savings {
            best = point;
        }
    }
    let (best_value, best_savings) = (best.value, best.total_savings);

    let mut warnings = Vec::new();
    let stalled = points.iter().filter(|p| !p.converged).count();
    if stalled > 0 {
        warnings.push(format!(
            "{stalled} of {} grid points did not converge",
            points.len()
        ));
    }
    if input.variable == SweepVariable::ParticipationPct {
        let lowest = input.variable.apply(&input.base, input.min);
        warnings.extend(lowest.split().policy_warnings());
    }

    let output = SweepOutput {
        variable: input.variable,
        points,
        base_case_savings: base_case.savings.total_savings,
        best_value,
        best_savings,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-way sensitivity sweep of SCOP savings",
        input,
        warnings,
        elapsed,
        output,
    ))
}
