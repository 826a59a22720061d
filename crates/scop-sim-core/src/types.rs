use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulatorError;
use crate::SimulatorResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages on a 0-100 scale (25 = 25%). Tax rates and allocation
/// shares are entered this way, so they are kept this way end to end.
pub type Percent = Decimal;

/// Largest absolute amount accepted by the solvers.
pub const MAX_AMOUNT: Money = dec!(1_000_000_000_000_000);

const HUNDRED: Decimal = dec!(100);

/// Convert a 0-100 percentage to a fraction.
pub(crate) fn fraction(pct: Percent) -> Decimal {
    pct / HUNDRED
}

/// Express `numerator / denominator` on a 0-100 scale, zero when the
/// denominator is not positive.
pub(crate) fn percent_of(numerator: Money, denominator: Money) -> Percent {
    if denominator <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator * HUNDRED
    }
}

pub(crate) fn validate_percent(field: &str, value: Percent) -> SimulatorResult<()> {
    if value < Decimal::ZERO || value > HUNDRED {
        return Err(SimulatorError::InvalidInput {
            field: field.into(),
            reason: format!("Percentage must be between 0 and 100, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_amount(field: &str, value: Money) -> SimulatorResult<()> {
    if value.abs() > MAX_AMOUNT {
        return Err(SimulatorError::InvalidInput {
            field: field.into(),
            reason: format!("Amount magnitude must not exceed {MAX_AMOUNT}, got {value}"),
        });
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(dec!(25)), dec!(0.25));
        assert_eq!(fraction(dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_percent_of_zero_denominator() {
        assert_eq!(percent_of(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(dec!(10), dec!(-5)), Decimal::ZERO);
        assert_eq!(percent_of(dec!(25), dec!(100)), dec!(25));
    }

    #[test]
    fn test_validate_percent_bounds() {
        assert!(validate_percent("rate", dec!(0)).is_ok());
        assert!(validate_percent("rate", dec!(100)).is_ok());
        assert!(validate_percent("rate", dec!(-0.1)).is_err());
        assert!(validate_percent("rate", dec!(100.1)).is_err());
    }

    #[test]
    fn test_validate_amount_magnitude() {
        assert!(validate_amount("cet", -MAX_AMOUNT).is_ok());
        let err = validate_amount("cet", MAX_AMOUNT + Decimal::ONE).unwrap_err();
        assert!(err.to_string().contains("cet"));
    }

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata("Test", &serde_json::json!({"a": 1}), vec![], 7, dec!(1.5));
        assert_eq!(out.result, dec!(1.5));
        assert_eq!(out.methodology, "Test");
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }
}
