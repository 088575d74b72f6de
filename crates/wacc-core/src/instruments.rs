//! Component costs of individual financing instruments and the
//! units x price capital structure that weights them into a WACC.
//!
//! The three-step model:
//! 1. component costs (Ke, Kp, Kd per instrument, after tax where deductible)
//! 2. capital structure from market values (units x price)
//! 3. weighted costs summed into the overall WACC

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::equity::{compute_cost_of_equity, market_risk_premium, EquityInput};
use crate::error::WaccError;
use crate::types::{checked, tax_shield_factor, with_metadata, ComputationOutput, Money, Rate};
use crate::WaccResult;

/// Bonds are quoted per 100 nominal.
const NOMINAL: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Step 1: component costs
// ---------------------------------------------------------------------------

/// Kp = D / P. Preference dividends are not tax deductible.
pub fn cost_of_preference_shares(dividend: Money, price: Money) -> WaccResult<Rate> {
    require_positive_price(price, "preference share price")?;
    checked(dividend.checked_div(price), "preference_shares")
}

/// Kd = (i * 100 / P0) * (1 - t) for a perpetual bond priced per 100 nominal.
pub fn cost_of_irredeemable_bond(
    coupon_rate: Rate,
    price_per_100: Money,
    tax_rate: Rate,
) -> WaccResult<Rate> {
    require_positive_price(price_per_100, "irredeemable bond price")?;
    let shield = tax_shield_factor(tax_rate)?;
    checked(
        coupon_rate
            .checked_mul(NOMINAL)
            .and_then(|interest| interest.checked_div(price_per_100))
            .and_then(|gross_yield| gross_yield.checked_mul(shield)),
        "irredeemable_bonds",
    )
}

/// Approximate yield to redemption, after tax:
///
/// Kd = ((I + (R - P) / n) / ((R + P) / 2)) * (1 - t), with I = i * 100
pub fn cost_of_redeemable_bond(
    coupon_rate: Rate,
    redemption_value: Money,
    price_per_100: Money,
    years_to_redemption: u32,
    tax_rate: Rate,
) -> WaccResult<Rate> {
    if years_to_redemption == 0 {
        return Err(WaccError::invalid(
            "years_to_redemption",
            "Years to redemption must be at least 1",
        ));
    }
    let field = "redeemable_bonds";
    let average_value = checked(
        redemption_value
            .checked_add(price_per_100)
            .and_then(|sum| sum.checked_div(dec!(2))),
        field,
    )?;
    if average_value <= Decimal::ZERO {
        return Err(WaccError::DivisionByZero {
            context: "redeemable bond average of redemption value and price".into(),
        });
    }
    let interest = checked(coupon_rate.checked_mul(NOMINAL), field)?;
    let annual_gain = checked(
        redemption_value
            .checked_sub(price_per_100)
            .and_then(|gain| gain.checked_div(Decimal::from(years_to_redemption))),
        field,
    )?;
    let shield = tax_shield_factor(tax_rate)?;
    checked(
        interest
            .checked_add(annual_gain)
            .and_then(|income| income.checked_div(average_value))
            .and_then(|gross_yield| gross_yield.checked_mul(shield)),
        field,
    )
}

/// Kd = i * (1 - t)
pub fn cost_of_bank_loan(rate: Rate, tax_rate: Rate) -> WaccResult<Rate> {
    checked(rate.checked_mul(tax_shield_factor(tax_rate)?), "bank_loan")
}

fn require_positive_price(price: Money, what: &str) -> WaccResult<()> {
    if price <= Decimal::ZERO {
        return Err(WaccError::DivisionByZero {
            context: format!("{what} (must be positive, got {price})"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Steps 2 and 3: capital structure and weighted costs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Equity,
    Preference,
    Debt,
}

/// A financing source with its market size and (after-tax) cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalSource {
    pub name: String,
    pub kind: SourceKind,
    pub units: Decimal,
    pub price: Money,
    pub cost: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSource {
    pub name: String,
    pub kind: SourceKind,
    pub cost: Rate,
    pub market_value: Money,
    pub weight: Rate,
    pub weighted_cost: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub sources: Vec<WeightedSource>,
    pub total_value: Money,
    pub equity_weight: Rate,
    pub preference_weight: Rate,
    pub debt_weight: Rate,
    pub wacc: Rate,
}

/// Weight each source by its share of total market value and sum the
/// weighted costs.
pub fn capital_structure(sources: &[CapitalSource]) -> WaccResult<CapitalStructure> {
    for source in sources {
        if source.units < Decimal::ZERO || source.price < Decimal::ZERO {
            return Err(WaccError::invalid(
                &source.name,
                "Units and price cannot be negative",
            ));
        }
    }

    let market_values = sources
        .iter()
        .map(|s| checked(s.units.checked_mul(s.price), &s.name))
        .collect::<WaccResult<Vec<Money>>>()?;
    let total_value = checked(
        market_values
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v)),
        "sources",
    )?;
    if total_value.is_zero() {
        return Err(WaccError::invalid(
            "sources",
            "Total market value of capital is zero",
        ));
    }

    let weighted = sources
        .iter()
        .zip(market_values)
        .map(|(s, market_value)| {
            let weight = checked(market_value.checked_div(total_value), &s.name)?;
            Ok(WeightedSource {
                name: s.name.clone(),
                kind: s.kind,
                cost: s.cost,
                market_value,
                weight,
                weighted_cost: checked(weight.checked_mul(s.cost), &s.name)?,
            })
        })
        .collect::<WaccResult<Vec<WeightedSource>>>()?;

    // Weights are each in [0, 1] so their sums cannot overflow.
    let weight_of = |kind: SourceKind| -> Rate {
        weighted
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.weight)
            .sum()
    };
    let wacc = checked(
        weighted
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.weighted_cost)),
        "wacc",
    )?;

    Ok(CapitalStructure {
        equity_weight: weight_of(SourceKind::Equity),
        preference_weight: weight_of(SourceKind::Preference),
        debt_weight: weight_of(SourceKind::Debt),
        wacc,
        total_value,
        sources: weighted,
    })
}

// ---------------------------------------------------------------------------
// Full three-step model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParameters {
    pub risk_free_rate: Rate,
    /// Expected market return (Rm); the premium is Rm - Rf
    pub market_return: Rate,
    pub beta: Decimal,
    pub tax_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinaryShares {
    pub units: Decimal,
    pub price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceShares {
    /// Dividend per unit of share nominal
    pub dividend: Money,
    pub price: Money,
    pub units: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrredeemableBonds {
    pub coupon_rate: Rate,
    /// Price per 100 nominal
    pub price: Money,
    /// Number of 100-nominal units
    pub units: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemableBonds {
    pub coupon_rate: Rate,
    /// Price per 100 nominal
    pub price: Money,
    /// Redemption value per 100 nominal
    pub redemption_value: Money,
    pub years_to_redemption: u32,
    /// Number of 100-nominal units
    pub units: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankLoan {
    pub rate: Rate,
    pub balance: Money,
}

/// Instrument-level description of a company's financing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreeStepInput {
    pub market: MarketParameters,
    pub ordinary_shares: OrdinaryShares,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_shares: Option<PreferenceShares>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irredeemable_bonds: Option<IrredeemableBonds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemable_bonds: Option<RedeemableBonds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_loan: Option<BankLoan>,
}

/// Run component costs, capital structure and weighting in one pass.
pub fn three_step_wacc(input: &ThreeStepInput) -> WaccResult<ComputationOutput<CapitalStructure>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let market = &input.market;

    crate::debt::validate_tax_rate(market.tax_rate)?;

    let ke = compute_cost_of_equity(&EquityInput::Capm {
        risk_free_rate: market.risk_free_rate,
        beta: market.beta,
        market_risk_premium: market_risk_premium(market.market_return, market.risk_free_rate)?,
    })?;
    let mut sources = vec![CapitalSource {
        name: "Ordinary shares".into(),
        kind: SourceKind::Equity,
        units: input.ordinary_shares.units,
        price: input.ordinary_shares.price,
        cost: ke,
    }];

    if let Some(pref) = &input.preference_shares {
        sources.push(CapitalSource {
            name: "Preference shares".into(),
            kind: SourceKind::Preference,
            units: pref.units,
            price: pref.price,
            cost: cost_of_preference_shares(pref.dividend, pref.price)?,
        });
    }
    if let Some(irr) = &input.irredeemable_bonds {
        sources.push(CapitalSource {
            name: "Irredeemable bonds".into(),
            kind: SourceKind::Debt,
            units: irr.units,
            price: irr.price,
            cost: cost_of_irredeemable_bond(irr.coupon_rate, irr.price, market.tax_rate)?,
        });
    }
    if let Some(red) = &input.redeemable_bonds {
        sources.push(CapitalSource {
            name: "Redeemable bonds".into(),
            kind: SourceKind::Debt,
            units: red.units,
            price: red.price,
            cost: cost_of_redeemable_bond(
                red.coupon_rate,
                red.redemption_value,
                red.price,
                red.years_to_redemption,
                market.tax_rate,
            )?,
        });
    }
    if let Some(loan) = &input.bank_loan {
        // A loan is carried at its balance, so price is one per unit.
        sources.push(CapitalSource {
            name: "Bank loan".into(),
            kind: SourceKind::Debt,
            units: loan.balance,
            price: Decimal::ONE,
            cost: cost_of_bank_loan(loan.rate, market.tax_rate)?,
        });
    }

    let structure = capital_structure(&sources)?;
    debug!(sources = structure.sources.len(), wacc = %structure.wacc, "three-step wacc");

    for source in &structure.sources {
        if source.kind == SourceKind::Debt && source.cost > ke {
            warnings.push(format!(
                "{} cost ({}) exceeds cost of equity ({ke})",
                source.name, source.cost
            ));
        }
        if source.market_value.is_zero() {
            warnings.push(format!("{} has zero market value", source.name));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Three-step WACC (component costs, market-value weights)",
        input,
        warnings,
        elapsed,
        structure,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preference_cost() {
        assert_eq!(
            cost_of_preference_shares(dec!(0.10), dec!(0.80)).unwrap(),
            dec!(0.125)
        );
        assert!(cost_of_preference_shares(dec!(0.10), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_irredeemable_cost() {
        // (0.11 * 100 / 70) * 0.7 = 0.11
        let kd = cost_of_irredeemable_bond(dec!(0.11), dec!(70), dec!(0.30)).unwrap();
        assert!((kd - dec!(0.11)).abs() < dec!(0.0000001), "got {kd}");
    }

    #[test]
    fn test_redeemable_cost() {
        // I = 9, (100 - 96) / 4 = 1, avg = 98 -> 10 / 98 * 0.7
        let kd = cost_of_redeemable_bond(dec!(0.09), dec!(100), dec!(96), 4, dec!(0.30)).unwrap();
        assert!((kd - dec!(0.0714286)).abs() < dec!(0.000001), "got {kd}");
    }

    #[test]
    fn test_redeemable_zero_years_rejected() {
        let err = cost_of_redeemable_bond(dec!(0.09), dec!(100), dec!(96), 0, dec!(0.30));
        assert!(matches!(err, Err(WaccError::InvalidInput { .. })));
    }

    #[test]
    fn test_bank_loan_cost() {
        assert_eq!(cost_of_bank_loan(dec!(0.07), dec!(0.30)).unwrap(), dec!(0.049));
    }

    #[test]
    fn test_capital_structure_weights() {
        let sources = vec![
            CapitalSource {
                name: "Equity".into(),
                kind: SourceKind::Equity,
                units: dec!(600),
                price: dec!(1),
                cost: dec!(0.10),
            },
            CapitalSource {
                name: "Loan".into(),
                kind: SourceKind::Debt,
                units: dec!(400),
                price: dec!(1),
                cost: dec!(0.05),
            },
        ];
        let structure = capital_structure(&sources).unwrap();
        assert_eq!(structure.total_value, dec!(1000));
        assert_eq!(structure.equity_weight, dec!(0.6));
        assert_eq!(structure.debt_weight, dec!(0.4));
        assert_eq!(structure.preference_weight, Decimal::ZERO);
        assert_eq!(structure.wacc, dec!(0.08));
    }

    #[test]
    fn test_capital_structure_zero_total() {
        let sources = vec![CapitalSource {
            name: "Equity".into(),
            kind: SourceKind::Equity,
            units: Decimal::ZERO,
            price: dec!(2),
            cost: dec!(0.10),
        }];
        assert!(capital_structure(&sources).is_err());
        assert!(capital_structure(&[]).is_err());
    }

    #[test]
    fn test_capital_structure_overflow_is_typed_error() {
        let huge = |name: &str| CapitalSource {
            name: name.into(),
            kind: SourceKind::Equity,
            units: Decimal::MAX,
            price: dec!(1),
            cost: dec!(0.10),
        };
        match capital_structure(&[huge("Ordinary shares"), huge("Preference shares")]) {
            Err(WaccError::InvalidInput { field, reason }) => {
                assert_eq!(field, "sources");
                assert!(reason.contains("overflow"));
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_market_value_overflow_names_source() {
        let sources = vec![CapitalSource {
            name: "Bank loan".into(),
            kind: SourceKind::Debt,
            units: Decimal::MAX,
            price: dec!(2),
            cost: dec!(0.05),
        }];
        match capital_structure(&sources) {
            Err(WaccError::InvalidInput { field, .. }) => assert_eq!(field, "Bank loan"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_instrument_costs_overflow_is_typed_error() {
        let tiny = dec!(0.0000000001);
        assert!(cost_of_preference_shares(Decimal::MAX, tiny)
            .unwrap_err()
            .is_invalid_input());
        assert!(cost_of_irredeemable_bond(Decimal::MAX, dec!(70), dec!(0.30))
            .unwrap_err()
            .is_invalid_input());
        assert!(
            cost_of_redeemable_bond(dec!(0.09), Decimal::MAX, Decimal::MAX, 4, dec!(0.30))
                .unwrap_err()
                .is_invalid_input()
        );
        assert!(cost_of_bank_loan(Decimal::MAX, dec!(-1)).is_err());
    }
}
