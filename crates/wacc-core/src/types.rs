use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WaccError;
use crate::WaccResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

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

/// `1 - tax_rate`, the share of a pre-tax cost that survives the tax shield.
pub(crate) fn tax_shield_factor(tax_rate: Rate) -> WaccResult<Rate> {
    checked(Decimal::ONE.checked_sub(tax_rate), "tax_rate")
}

/// Turn the `None` of a `checked_*` operation into a typed overflow error.
pub(crate) fn checked(value: Option<Decimal>, field: &str) -> WaccResult<Decimal> {
    value.ok_or_else(|| WaccError::overflow(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metadata_envelope() {
        let out = with_metadata("test method", &dec!(0.05), vec![], 12, dec!(1));
        assert_eq!(out.methodology, "test method");
        assert_eq!(out.metadata.computation_time_us, 12);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.assumptions, serde_json::json!("0.05"));
    }

    #[test]
    fn test_tax_shield_factor() {
        assert_eq!(tax_shield_factor(dec!(0.21)).unwrap(), dec!(0.79));
        assert_eq!(tax_shield_factor(Decimal::ZERO).unwrap(), Decimal::ONE);
        assert!(tax_shield_factor(Decimal::MIN).is_err());
    }
}
