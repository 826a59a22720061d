use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::*;
use crate::SimulatorResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Standard French IS rate.
pub const STANDARD_NORMAL_RATE: Percent = dec!(25);

/// Ceiling of the SME reduced-rate bracket.
pub const SME_REDUCED_RATE_CEILING: Money = dec!(42500);

/// SME reduced rate applied up to the ceiling.
pub const SME_REDUCED_RATE: Percent = dec!(15);

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A two-slice corporate income tax schedule. The reduced-rate bracket is
/// disabled when either the ceiling or the reduced rate is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateTaxSchedule {
    pub normal_rate: Percent,
    #[serde(default)]
    pub reduced_rate_ceiling: Money,
    #[serde(default)]
    pub reduced_rate: Percent,
}

/// How a taxable base splits across the two slices of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub reduced_rate_base: Money,
    pub reduced_rate_tax: Money,
    pub normal_rate_base: Money,
    pub normal_rate_tax: Money,
    pub total_tax: Money,
    /// Total tax over the base, on a 0-100 scale
    pub effective_rate: Percent,
    /// Rate applying to the next euro of base
    pub marginal_rate: Percent,
}

impl CorporateTaxSchedule {
    /// Normal rate only, no reduced-rate bracket.
    pub fn standard() -> Self {
        Self {
            normal_rate: STANDARD_NORMAL_RATE,
            reduced_rate_ceiling: Decimal::ZERO,
            reduced_rate: Decimal::ZERO,
        }
    }

    /// Normal rate with the SME reduced-rate bracket.
    pub fn sme() -> Self {
        Self {
            normal_rate: STANDARD_NORMAL_RATE,
            reduced_rate_ceiling: SME_REDUCED_RATE_CEILING,
            reduced_rate: SME_REDUCED_RATE,
        }
    }

    pub fn bracket_enabled(&self) -> bool {
        self.reduced_rate_ceiling > Decimal::ZERO && self.reduced_rate > Decimal::ZERO
    }

    /// Tax owed on `base`. Never negative.
    pub fn tax(&self, base: Money) -> Money {
        self.breakdown(base).total_tax
    }

    pub fn breakdown(&self, base: Money) -> TaxBreakdown {
        if base <= Decimal::ZERO {
            return TaxBreakdown {
                reduced_rate_base: Decimal::ZERO,
                reduced_rate_tax: Decimal::ZERO,
                normal_rate_base: Decimal::ZERO,
                normal_rate_tax: Decimal::ZERO,
                total_tax: Decimal::ZERO,
                effective_rate: Decimal::ZERO,
                marginal_rate: self.marginal_rate(base),
            };
        }

        let (reduced_rate_base, normal_rate_base) = if self.bracket_enabled() {
            (
                base.min(self.reduced_rate_ceiling),
                (base - self.reduced_rate_ceiling).max(Decimal::ZERO),
            )
        } else {
            (Decimal::ZERO, base)
        };

        let reduced_rate_tax = reduced_rate_base * fraction(self.reduced_rate);
        let normal_rate_tax = normal_rate_base * fraction(self.normal_rate);
        let total_tax = (reduced_rate_tax + normal_rate_tax).max(Decimal::ZERO);

        TaxBreakdown {
            reduced_rate_base,
            reduced_rate_tax,
            normal_rate_base,
            normal_rate_tax,
            total_tax,
            effective_rate: percent_of(total_tax, base),
            marginal_rate: self.marginal_rate(base),
        }
    }

    /// Rate applying to the next euro above `base`; zero below zero.
    pub fn marginal_rate(&self, base: Money) -> Percent {
        if base < Decimal::ZERO {
            Decimal::ZERO
        } else if self.bracket_enabled() && base < self.reduced_rate_ceiling {
            self.reduced_rate
        } else {
            self.normal_rate
        }
    }

    /// The single rate applying to every base in `[0, upper]`, if any.
    pub fn flat_rate_over(&self, upper: Money) -> Option<Percent> {
        if !self.bracket_enabled() {
            Some(self.normal_rate)
        } else if upper <= self.reduced_rate_ceiling {
            Some(self.reduced_rate)
        } else if self.reduced_rate == self.normal_rate {
            Some(self.normal_rate)
        } else {
            None
        }
    }

    pub(crate) fn validate(&self) -> SimulatorResult<()> {
        validate_percent("normal_rate", self.normal_rate)?;
        validate_percent("reduced_rate", self.reduced_rate)?;
        validate_amount("reduced_rate_ceiling", self.reduced_rate_ceiling)?;
        Ok(())
    }
}

/// Corporate income tax on `base` under a progressive two-slice schedule.
///
/// The slice up to `ceiling` is taxed at `reduced_rate` and the excess at
/// `normal_rate`; with no usable bracket (`ceiling <= 0` or
/// `reduced_rate <= 0`) the whole base is taxed at `normal_rate`.
/// Rates are on a 0-100 scale. Returns zero for non-positive bases.
pub fn compute_corporate_tax(
    base: Money,
    ceiling: Money,
    reduced_rate: Percent,
    normal_rate: Percent,
) -> Money {
    CorporateTaxSchedule {
        normal_rate,
        reduced_rate_ceiling: ceiling,
        reduced_rate,
    }
    .tax(base)
}

// ---------------------------------------------------------------------------
// Standalone calculator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateTaxInput {
    pub taxable_result: Money,
    #[serde(default = "default_normal_rate")]
    pub normal_rate: Percent,
    #[serde(default)]
    pub reduced_rate_ceiling: Money,
    #[serde(default)]
    pub reduced_rate: Percent,
}

fn default_normal_rate() -> Percent {
    STANDARD_NORMAL_RATE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateTaxOutput {
    pub taxable_result: Money,
    pub schedule: CorporateTaxSchedule,
    pub breakdown: TaxBreakdown,
    /// One line per taxed slice, then the total
    pub detail: Vec<String>,
}

/// Compute IS on a taxable result with a slice-by-slice breakdown.
///
/// Out-of-range entries are clamped rather than rejected: a negative result
/// or ceiling becomes zero and the reduced rate is held within 0-100.
pub fn calculate_corporate_tax(
    input: &CorporateTaxInput,
) -> SimulatorResult<ComputationOutput<CorporateTaxOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_percent("normal_rate", input.normal_rate)?;
    validate_amount("taxable_result", input.taxable_result)?;
    validate_amount("reduced_rate_ceiling", input.reduced_rate_ceiling)?;

    let taxable_result = input.taxable_result.max(Decimal::ZERO);
    if taxable_result != input.taxable_result {
        warnings.push(format!(
            "Negative taxable result ({}) treated as zero",
            input.taxable_result
        ));
    }

    let ceiling = input.reduced_rate_ceiling.max(Decimal::ZERO);
    if ceiling != input.reduced_rate_ceiling {
        warnings.push(format!(
            "Negative reduced-rate ceiling ({}) treated as zero",
            input.reduced_rate_ceiling
        ));
    }

    let reduced_rate = input.reduced_rate.max(Decimal::ZERO).min(dec!(100));
    if reduced_rate != input.reduced_rate {
        warnings.push(format!(
            "Reduced rate {}% clamped to {}%",
            input.reduced_rate, reduced_rate
        ));
    }

    let schedule = CorporateTaxSchedule {
        normal_rate: input.normal_rate,
        reduced_rate_ceiling: ceiling,
        reduced_rate,
    };
    let breakdown = schedule.breakdown(taxable_result);
    let detail = describe(&schedule, &breakdown);

    let output = CorporateTaxOutput {
        taxable_result,
        schedule,
        breakdown,
        detail,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Progressive Corporate Income Tax (two-slice schedule)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn describe(schedule: &CorporateTaxSchedule, breakdown: &TaxBreakdown) -> Vec<String> {
    let mut lines = Vec::new();
    if breakdown.total_tax.is_zero() && breakdown.normal_rate_base.is_zero() {
        lines.push("No taxable profit".to_string());
    }
    if !schedule.bracket_enabled() && !breakdown.normal_rate_base.is_zero() {
        lines.push("No reduced-rate bracket applies".to_string());
    }
    if !breakdown.reduced_rate_base.is_zero() {
        lines.push(format!(
            "Reduced-rate slice: {} × {}% = {}",
            breakdown.reduced_rate_base.round_dp(2).normalize(),
            schedule.reduced_rate.normalize(),
            breakdown.reduced_rate_tax.round_dp(2).normalize()
        ));
    }
    if !breakdown.normal_rate_base.is_zero() {
        lines.push(format!(
            "Normal-rate slice: {} × {}% = {}",
            breakdown.normal_rate_base.round_dp(2).normalize(),
            schedule.normal_rate.normalize(),
            breakdown.normal_rate_tax.round_dp(2).normalize()
        ));
    }
    lines.push(format!("Total IS = {}", breakdown.total_tax.round_dp(2).normalize()));
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
