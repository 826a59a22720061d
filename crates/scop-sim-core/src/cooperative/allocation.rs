use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::SimulatorResult;

/// Minimum share of the net result paid out as employee participation.
pub const MIN_PARTICIPATION_PCT: Percent = dec!(25);

/// Minimum share kept as non-distributable reserves.
pub const MIN_RESERVES_PCT: Percent = dec!(16);

pub const MIN_DIVIDENDS_PCT: Percent = dec!(0);

const BALANCE_TOLERANCE: Percent = dec!(0.0001);

/// How the post-tax result of a cooperative is split. The three shares are
/// expected to total 100; the solver computes with whatever it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSplit {
    pub participation_pct: Percent,
    pub reserves_pct: Percent,
    pub dividends_pct: Percent,
}

/// Amounts actually distributed from a net result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationAmounts {
    pub participation: Money,
    pub reserves: Money,
    pub dividends: Money,
}

impl AllocationSplit {
    pub fn total(&self) -> Percent {
        self.participation_pct + self.reserves_pct + self.dividends_pct
    }

    pub fn is_balanced(&self) -> bool {
        (self.total() - dec!(100)).abs() <= BALANCE_TOLERANCE
    }

    /// Split a net result. Nothing is distributed from a loss.
    pub fn distribute(&self, net_result: Money) -> AllocationAmounts {
        let distributable = net_result.max(Decimal::ZERO);
        AllocationAmounts {
            participation: distributable * fraction(self.participation_pct),
            reserves: distributable * fraction(self.reserves_pct),
            dividends: distributable * fraction(self.dividends_pct),
        }
    }

    /// Human-readable notes for every floor or balance rule the split breaks.
    pub fn policy_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.participation_pct < MIN_PARTICIPATION_PCT {
            warnings.push(format!(
                "Participation share {}% is below the {}% minimum",
                self.participation_pct, MIN_PARTICIPATION_PCT
            ));
        }
        if self.reserves_pct < MIN_RESERVES_PCT {
            warnings.push(format!(
                "Reserves share {}% is below the {}% minimum",
                self.reserves_pct, MIN_RESERVES_PCT
            ));
        }
        if self.dividends_pct < MIN_DIVIDENDS_PCT {
            warnings.push(format!(
                "Dividends share {}% is negative",
                self.dividends_pct
            ));
        }
        if !self.is_balanced() {
            warnings.push(format!(
                "Allocation shares total {}%, not 100%; dividends will not reconcile with the net result",
                self.total()
            ));
        }
        warnings
    }

    pub(crate) fn validate(&self) -> SimulatorResult<()> {
        validate_percent("participation_pct", self.participation_pct)?;
        validate_percent("reserves_pct", self.reserves_pct)?;
        validate_percent("dividends_pct", self.dividends_pct)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(p: Decimal, r: Decimal, d: Decimal) -> AllocationSplit {
        AllocationSplit {
            participation_pct: p,
            reserves_pct: r,
            dividends_pct: d,
        }
    }

    #[test]
    fn test_balanced_split_has_no_warnings() {
        let s = split(dec!(45), dec!(45), dec!(10));
        assert!(s.is_balanced());
        assert!(s.policy_warnings().is_empty());
    }

    #[test]
    fn test_floors_reported() {
        let s = split(dec!(20), dec!(10), dec!(70));
        let warnings = s.policy_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Participation"));
        assert!(warnings[1].contains("Reserves"));
    }

    #[test]
    fn test_unbalanced_split_reported() {
        let s = split(dec!(50), dec!(50), dec!(10));
        assert!(!s.is_balanced());
        let warnings = s.policy_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("110"));
    }

    #[test]
    fn test_distribute() {
        let amounts = split(dec!(45), dec!(45), dec!(10)).distribute(dec!(1000));
        assert_eq!(
            amounts,
            AllocationAmounts {
                participation: dec!(450),
                reserves: dec!(450),
                dividends: dec!(100),
            }
        );
    }

    #[test]
    fn test_distribute_loss_is_zero() {
        let amounts = split(dec!(45), dec!(45), dec!(10)).distribute(dec!(-1000));
        assert_eq!(amounts.participation, Decimal::ZERO);
        assert_eq!(amounts.reserves, Decimal::ZERO);
        assert_eq!(amounts.dividends, Decimal::ZERO);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(split(dec!(45), dec!(45), dec!(10)).validate().is_ok());
        assert!(split(dec!(145), dec!(45), dec!(10)).validate().is_err());
        assert!(split(dec!(45), dec!(-5), dec!(10)).validate().is_err());
    }
}
