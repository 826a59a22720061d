//! Fixed-point resolution of the cooperative allocation / tax circularity.
//!
//! Participation is a share of the post-tax result, yet it is deducted from
//! the base that tax is computed on. With `G` the base before deductions
//! and `N` the post-tax result, the system reads
//!
//! ```text
//! participation_deduction = participation_amount
//! reserves_deduction      = min(max(N, 0) × r, participation_deduction)
//! taxable_base            = G − participation_deduction − reserves_deduction
//! tax_owed                = tax(taxable_base)
//! N                       = G − tax_owed
//! ```
//!
//! When a single rate `t` applies over `[0, G]` the participation amount is
//! taken in closed form,
//!
//! ```text
//! participation_amount = (G − min(G × r, G × p)) × p / (1 + p × t)
//! ```
//!
//! and substituted once into the rest of the system. Otherwise a damped
//! fixed-point iteration on `participation_amount = max(N, 0) × p` runs for
//! at most [`MAX_ROUNDS`] rounds and finishes with a back-substitution from
//! the final `N`. On both paths the returned participation amount equals
//! its deduction.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::cooperative::allocation::{AllocationAmounts, AllocationSplit};
use crate::corporate_tax::progressive::CorporateTaxSchedule;
use crate::types::*;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest participation residual accepted as converged, in currency units.
pub const TOLERANCE: Money = dec!(0.01);

/// Share of each residual applied per round.
pub const DAMPING: Decimal = dec!(0.6);

pub const MAX_ROUNDS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    ClosedForm,
    DampedIteration,
}

/// Everything that stays fixed while the circularity is resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext {
    /// Fiscal result plus the recovered CET
    pub base_before_deductions: Money,
    pub schedule: CorporateTaxSchedule,
    pub split: AllocationSplit,
}

/// Values carried from one iteration round to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverState {
    pub taxable_base: Money,
    pub participation_deduction: Money,
    pub reserves_deduction: Money,
    pub tax_owed: Money,
    pub net_result_after_tax: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub state: ResolverState,
    /// Candidate participation minus the participation deduction carried in
    pub residual: Money,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub taxable_base: Money,
    pub participation_deduction: Money,
    pub reserves_deduction: Money,
    pub tax_owed: Money,
    pub net_result_after_tax: Money,
    pub allocations: AllocationAmounts,
    pub strategy: ResolutionStrategy,
    pub converged: bool,
    pub iterations: u32,
    pub final_residual: Money,
}

impl ResolverState {
    /// Starting point: nothing deducted yet.
    pub fn initial(ctx: &ResolverContext) -> Self {
        Self {
            taxable_base: ctx.base_before_deductions,
            participation_deduction: Decimal::ZERO,
            reserves_deduction: Decimal::ZERO,
            tax_owed: Decimal::ZERO,
            net_result_after_tax: ctx.base_before_deductions,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve the allocation circularity, preferring the closed form.
pub fn resolve(ctx: &ResolverContext) -> Resolution {
    match closed_form_participation(ctx) {
        Some((participation, rate)) => substitute_participation(ctx, participation, rate),
        None => iterate(ctx),
    }
}

/// Participation amount in closed form, with the flat rate it was taken
/// at, or `None` when the schedule's rate changes somewhere in `[0, G]`.
///
/// `(G − min(G × r, G × p)) × p / (1 + p × t)`, zero for a loss.
pub fn closed_form_participation(ctx: &ResolverContext) -> Option<(Money, Percent)> {
    let g = ctx.base_before_deductions;
    let rate = ctx.schedule.flat_rate_over(g.max(Decimal::ZERO))?;

    if g <= Decimal::ZERO {
        return Some((Decimal::ZERO, rate));
    }

    let p = fraction(ctx.split.participation_pct);
    let r = fraction(ctx.split.reserves_pct);
    let reserves_capped = (g * r).min(g * p);
    let participation = (g - reserves_capped) * p / (Decimal::ONE + p * fraction(rate));
    Some((participation.max(Decimal::ZERO), rate))
}

/// Damped fixed-point iteration. Always returns; `converged` is false when
/// [`MAX_ROUNDS`] rounds were not enough to reach [`TOLERANCE`].
pub fn iterate(ctx: &ResolverContext) -> Resolution {
    iterate_with(ctx, MAX_ROUNDS)
}

/// [`iterate`] with an explicit round budget.
pub fn iterate_with(ctx: &ResolverContext, max_rounds: u32) -> Resolution {
    let mut state = ResolverState::initial(ctx);
    let mut residual = Decimal::ZERO;
    let mut converged = false;
    let mut iterations = 0;

    for round in 1..=max_rounds {
        let outcome = step(state, ctx);
        state = outcome.state;
        residual = outcome.residual;
        iterations = round;
        if outcome.converged {
            converged = true;
            break;
        }
    }

    finalize(
        ctx,
        state.net_result_after_tax,
        ResolutionStrategy::DampedIteration,
        converged,
        iterations,
        residual.abs(),
    )
}

/// One round of the damped iteration.
///
/// Tax and the post-tax result are recomputed from the incoming taxable
/// base, then the participation deduction moves [`DAMPING`] of the way
/// towards its candidate and the taxable base follows.
pub fn step(state: ResolverState, ctx: &ResolverContext) -> StepOutcome {
    let g = ctx.base_before_deductions;
    let tax_owed = ctx.schedule.tax(state.taxable_base);
    let net_result_after_tax = g - tax_owed;

    let amounts = ctx.split.distribute(net_result_after_tax);
    let candidate = amounts.participation;
    let reserves_deduction = amounts.reserves.min(candidate);
    let residual = candidate - state.participation_deduction;

    if residual.abs() <= TOLERANCE {
        return StepOutcome {
            state: ResolverState {
                taxable_base: state.taxable_base,
                participation_deduction: candidate,
                reserves_deduction,
                tax_owed,
                net_result_after_tax,
            },
            residual,
            converged: true,
        };
    }

    let participation_deduction = state.participation_deduction + DAMPING * residual;
    StepOutcome {
        state: ResolverState {
            taxable_base: g - participation_deduction - reserves_deduction,
            participation_deduction,
            reserves_deduction,
            tax_owed,
            net_result_after_tax,
        },
        residual,
        converged: false,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Substitute a closed-form participation amount once into the rest of
/// the system, taxed at the flat `rate`.
///
/// The reserves deduction sits at its cap unless the reserves share of the
/// resulting post-tax result falls short of it, in which case it is
/// `max(N, 0) × r` and `N` solves `N = G − t × (G − P − r × N)`.
fn substitute_participation(
    ctx: &ResolverContext,
    participation: Money,
    rate: Percent,
) -> Resolution {
    let g = ctx.base_before_deductions;
    let r = fraction(ctx.split.reserves_pct);

    let capped_net = g - ctx.schedule.tax(g - participation - participation);
    let reserves_deduction = if capped_net.max(Decimal::ZERO) * r >= participation {
        participation
    } else {
        let t = fraction(rate);
        let denominator = Decimal::ONE - t * r;
        let mut net = if denominator > Decimal::ZERO {
            (g * (Decimal::ONE - t) + t * participation) / denominator
        } else {
            g
        };
        // Untaxed when the deductions cover the whole base
        if g - participation - net * r <= Decimal::ZERO {
            net = g;
        }
        (net.max(Decimal::ZERO) * r).min(participation)
    };

    let taxable_base = g - participation - reserves_deduction;
    let tax_owed = ctx.schedule.tax(taxable_base);
    let net_result_after_tax = g - tax_owed;
    let shares = ctx.split.distribute(net_result_after_tax);

    Resolution {
        taxable_base,
        participation_deduction: participation,
        reserves_deduction,
        tax_owed,
        net_result_after_tax,
        allocations: AllocationAmounts {
            participation,
            reserves: shares.reserves,
            dividends: shares.dividends,
        },
        strategy: ResolutionStrategy::ClosedForm,
        converged: true,
        iterations: 0,
        final_residual: Decimal::ZERO,
    }
}

/// Back-substitute a post-tax result: allocations from `net`, deductions
/// from the allocations, then the taxable base and tax from the deductions.
fn finalize(
    ctx: &ResolverContext,
    net: Money,
    strategy: ResolutionStrategy,
    converged: bool,
    iterations: u32,
    final_residual: Money,
) -> Resolution {
    let g = ctx.base_before_deductions;
    let allocations = ctx.split.distribute(net);
    let participation_deduction = allocations.participation;
    let reserves_deduction = allocations.reserves.min(participation_deduction);
    let taxable_base = g - participation_deduction - reserves_deduction;
    let tax_owed = ctx.schedule.tax(taxable_base);

    Resolution {
        taxable_base,
        participation_deduction,
        reserves_deduction,
        tax_owed,
        net_result_after_tax: g - tax_owed,
        allocations,
        strategy,
        converged,
        iterations,
        final_residual,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
