use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::debt::{compute_cost_of_debt, validate_tax_rate, DebtTranche, TrancheBreakdown};
use crate::equity::{compute_cost_of_equity, EquityInput};
use crate::error::WaccError;
use crate::types::{checked, with_metadata, ComputationOutput, Money, Rate};
use crate::WaccResult;

/// Allowed deviation of `equity_weight + debt_weight` from one.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.000001);

/// Market-value weights of equity and debt in the capital structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalWeights {
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

impl CapitalWeights {
    pub fn new(equity_weight: Rate, debt_weight: Rate) -> Self {
        Self {
            equity_weight,
            debt_weight,
        }
    }

    /// Derive weights from market values: E / (E + D) and D / (E + D).
    pub fn from_market_values(equity_value: Money, debt_value: Money) -> WaccResult<Self> {
        if equity_value < Decimal::ZERO || debt_value < Decimal::ZERO {
            return Err(WaccError::invalid(
                "equity_value / debt_value",
                "Market values cannot be negative",
            ));
        }
        let total = checked(
            equity_value.checked_add(debt_value),
            "equity_value + debt_value",
        )?;
        if total.is_zero() {
            return Err(WaccError::invalid(
                "equity_value + debt_value",
                "Equity + debt cannot be zero",
            ));
        }
        let equity_weight = checked(equity_value.checked_div(total), "equity_value")?;
        Ok(Self {
            equity_weight,
            debt_weight: Decimal::ONE - equity_weight,
        })
    }

    fn validate(&self) -> WaccResult<()> {
        let in_unit_range = |w: Decimal| w >= Decimal::ZERO && w <= Decimal::ONE;
        if !in_unit_range(self.equity_weight) || !in_unit_range(self.debt_weight) {
            return Err(WaccError::invalid(
                "equity_weight / debt_weight",
                format!(
                    "Capital structure weights must each lie in [0, 1], got {} and {}",
                    self.equity_weight, self.debt_weight
                ),
            ));
        }
        let weight_sum = self.equity_weight + self.debt_weight;
        if (weight_sum - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
            return Err(WaccError::invalid(
                "equity_weight + debt_weight",
                format!("Capital structure weights must sum to 1.0, got {weight_sum}"),
            ));
        }
        Ok(())
    }
}

/// Blend component costs into WACC: We * Ke + Wd * Kd_at
pub fn compute_wacc(
    cost_of_equity: Rate,
    cost_of_debt_after_tax: Rate,
    weights: &CapitalWeights,
) -> WaccResult<Rate> {
    weights.validate()?;
    let equity_leg = checked(
        weights.equity_weight.checked_mul(cost_of_equity),
        "cost_of_equity",
    )?;
    let debt_leg = checked(
        weights.debt_weight.checked_mul(cost_of_debt_after_tax),
        "cost_of_debt_after_tax",
    )?;
    checked(equity_leg.checked_add(debt_leg), "wacc")
}

/// Everything needed for a full WACC calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Cost of equity method and its parameters
    pub equity: EquityInput,
    /// Debt structure; a single-rate loan is one tranche
    pub debt_tranches: Vec<DebtTranche>,
    /// Marginal corporate tax rate, in [0, 1)
    pub tax_rate: Rate,
    /// Capital structure weights
    pub weights: CapitalWeights,
}

/// Output of the WACC calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccOutput {
    /// Weighted average cost of capital
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    /// Blended pre-tax cost of debt across tranches
    pub cost_of_debt_pretax: Rate,
    pub cost_of_debt_after_tax: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
    /// Per-tranche workings, in input order
    pub per_tranche: Vec<TrancheBreakdown>,
}

/// Calculate the Weighted Average Cost of Capital.
///
/// Cost of equity: CAPM, Gordon growth or a direct rate
/// Cost of debt: tranche-weighted pre-tax rate, Kd_at = Kd * (1 - t)
/// WACC = Ke * We + Kd_at * Wd
pub fn calculate_wacc(input: &WaccInput) -> WaccResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Validation ---
    validate_tax_rate(input.tax_rate)?;
    input.weights.validate()?;

    // --- Cost of equity ---
    let cost_of_equity = compute_cost_of_equity(&input.equity)?;
    debug!(method = input.equity.method_name(), %cost_of_equity, "cost of equity");

    // --- Cost of debt ---
    let cost_of_debt = compute_cost_of_debt(&input.debt_tranches, input.tax_rate)?;
    debug!(
        tranches = cost_of_debt.per_tranche.len(),
        pretax = %cost_of_debt.pretax,
        after_tax = %cost_of_debt.after_tax,
        "cost of debt"
    );

    // --- WACC ---
    let wacc = compute_wacc(cost_of_equity, cost_of_debt.after_tax, &input.weights)?;
    debug!(%wacc, "wacc");

    // --- Reasonableness warnings ---
    equity_warnings(&input.equity, cost_of_equity, &mut warnings);
    if cost_of_debt.pretax > cost_of_equity {
        warnings.push(format!(
            "Pre-tax cost of debt ({}) exceeds cost of equity ({cost_of_equity}); debt is normally the cheaper claim",
            cost_of_debt.pretax
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 20%; appropriate for high-risk / emerging-market situations only"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        cost_of_debt_pretax: cost_of_debt.pretax,
        cost_of_debt_after_tax: cost_of_debt.after_tax,
        equity_weight: input.weights.equity_weight,
        debt_weight: input.weights.debt_weight,
        per_tranche: cost_of_debt.per_tranche,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let methodology = format!("WACC via {}", input.equity.method_name());

    Ok(with_metadata(
        &methodology,
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn equity_warnings(equity: &EquityInput, cost_of_equity: Rate, warnings: &mut Vec<String>) {
    match equity {
        EquityInput::Capm {
            beta,
            market_risk_premium,
            ..
        } => {
            if *beta > dec!(3.0) {
                warnings.push(format!(
                    "High beta ({beta}): verify market data; betas above 3.0 are unusual"
                ));
            }
            if *market_risk_premium > dec!(0.10) {
                warnings.push(format!(
                    "Market risk premium ({market_risk_premium}) exceeds 10%; verify estimate"
                ));
            }
        }
        EquityInput::GordonGrowth { growth_rate, .. } => {
            if *growth_rate >= cost_of_equity {
                warnings.push(format!(
                    "Growth rate ({growth_rate}) is not below the implied cost of equity ({cost_of_equity}); the Gordon model does not converge"
                ));
            }
        }
        EquityInput::Direct { .. } => {}
    }
    if cost_of_equity < Decimal::ZERO {
        warnings.push(format!("Negative cost of equity ({cost_of_equity})"));
    }
}
