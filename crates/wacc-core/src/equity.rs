use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WaccError;
use crate::types::{checked, Money, Rate};
use crate::WaccResult;

/// How the cost of equity is estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EquityInput {
    /// Capital Asset Pricing Model: Ke = Rf + Beta * MRP
    Capm {
        /// Risk-free rate (e.g. 10-year government bond yield)
        risk_free_rate: Rate,
        /// Equity beta. May be negative.
        beta: Decimal,
        /// Market risk premium (market return minus risk-free rate)
        market_risk_premium: Rate,
    },
    /// Gordon (dividend) growth model: Ke = D1 / P0 + g
    GordonGrowth {
        /// Dividend expected over the next period (D1)
        next_dividend: Money,
        /// Current share price (P0)
        current_price: Money,
        /// Constant dividend growth rate
        growth_rate: Rate,
    },
    /// Cost of equity supplied directly by the user.
    Direct { cost_of_equity: Rate },
}

impl EquityInput {
    /// Human-readable name of the estimation method.
    pub fn method_name(&self) -> &'static str {
        match self {
            EquityInput::Capm { .. } => "CAPM",
            EquityInput::GordonGrowth { .. } => "Gordon growth",
            EquityInput::Direct { .. } => "direct input",
        }
    }
}

/// Compute the cost of equity for the given method.
///
/// Gordon growth fails with `DivisionByZero` when the current price is not
/// strictly positive. Results outside the decimal range are `InvalidInput`. Convergence (g < Ke) is not
/// enforced here; see [`crate::wacc::calculate_wacc`] for the warning.
pub fn compute_cost_of_equity(input: &EquityInput) -> WaccResult<Rate> {
    match input {
        EquityInput::Capm {
            risk_free_rate,
            beta,
            market_risk_premium,
        } => checked(
            beta.checked_mul(*market_risk_premium)
                .and_then(|premium| risk_free_rate.checked_add(premium)),
            "capm",
        ),
        EquityInput::GordonGrowth {
            next_dividend,
            current_price,
            growth_rate,
        } => {
            if *current_price <= Decimal::ZERO {
                return Err(WaccError::DivisionByZero {
                    context: format!(
                        "Gordon growth dividend yield (current_price must be positive, got {current_price})"
                    ),
                });
            }
            checked(
                next_dividend
                    .checked_div(*current_price)
                    .and_then(|dividend_yield| dividend_yield.checked_add(*growth_rate)),
                "gordon_growth",
            )
        }
        EquityInput::Direct { cost_of_equity } => Ok(*cost_of_equity),
    }
}

/// Market risk premium from an expected market return: Rm - Rf.
pub fn market_risk_premium(market_return: Rate, risk_free_rate: Rate) -> WaccResult<Rate> {
    checked(
        market_return.checked_sub(risk_free_rate),
        "market_return - risk_free_rate",
    )
}
