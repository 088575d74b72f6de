use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WaccError;
use crate::types::{checked, tax_shield_factor, Rate};
use crate::WaccResult;

/// A slice of debt with its own relative weight and pre-tax rate.
///
/// Weights are relative within the debt structure and are normalised by
/// [`compute_cost_of_debt`]; they do not need to sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTranche {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub weight: Decimal,
    pub rate: Rate,
}

impl DebtTranche {
    pub fn new(weight: Decimal, rate: Rate) -> Self {
        Self {
            label: None,
            weight,
            rate,
        }
    }

    pub fn labelled(label: impl Into<String>, weight: Decimal, rate: Rate) -> Self {
        Self {
            label: Some(label.into()),
            weight,
            rate,
        }
    }
}

/// Single-rate debt expressed as a one-tranche structure.
pub fn single_tranche(rate: Rate) -> Vec<DebtTranche> {
    vec![DebtTranche::new(Decimal::ONE, rate)]
}

/// One line of the per-tranche workings, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheBreakdown {
    /// 1-based position in the input list
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Weight as supplied
    pub input_weight: Decimal,
    /// Weight after normalisation across all tranches
    pub weight: Decimal,
    pub rate: Rate,
    pub after_tax_rate: Rate,
    /// weight * after_tax_rate
    pub weighted_after_tax_rate: Rate,
}

/// Blended cost of debt with its workings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOfDebt {
    pub pretax: Rate,
    pub after_tax: Rate,
    pub per_tranche: Vec<TrancheBreakdown>,
}

/// Blend debt tranches into a pre-tax and after-tax cost of debt.
///
/// pretax   = sum(w_i / sum(w) * r_i)
/// after_tax = pretax * (1 - t)
pub fn compute_cost_of_debt(tranches: &[DebtTranche], tax_rate: Rate) -> WaccResult<CostOfDebt> {
    validate_tax_rate(tax_rate)?;
    if tranches.is_empty() {
        return Err(WaccError::invalid(
            "debt_tranches",
            "At least one debt tranche is required",
        ));
    }

    for (i, tranche) in tranches.iter().enumerate() {
        if tranche.weight < Decimal::ZERO {
            return Err(WaccError::invalid(
                &format!("debt_tranches[{i}].weight"),
                format!("Tranche weight cannot be negative, got {}", tranche.weight),
            ));
        }
        if tranche.rate < Decimal::ZERO {
            return Err(WaccError::invalid(
                &format!("debt_tranches[{i}].rate"),
                format!("Tranche rate cannot be negative, got {}", tranche.rate),
            ));
        }
    }

    let weight_sum = checked(
        tranches
            .iter()
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.weight)),
        "debt_tranches.weight",
    )?;
    if weight_sum.is_zero() {
        return Err(WaccError::invalid(
            "debt_tranches",
            "Tranche weights sum to zero",
        ));
    }

    let shield = tax_shield_factor(tax_rate)?;
    let per_tranche = tranches
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let field = format!("debt_tranches[{i}]");
            let weight = checked(t.weight.checked_div(weight_sum), &field)?;
            let after_tax_rate = checked(t.rate.checked_mul(shield), &field)?;
            Ok(TrancheBreakdown {
                index: i + 1,
                label: t.label.clone(),
                input_weight: t.weight,
                weight,
                rate: t.rate,
                after_tax_rate,
                weighted_after_tax_rate: checked(weight.checked_mul(after_tax_rate), &field)?,
            })
        })
        .collect::<WaccResult<Vec<TrancheBreakdown>>>()?;

    let pretax = checked(
        per_tranche.iter().try_fold(Decimal::ZERO, |acc, t| {
            t.weight
                .checked_mul(t.rate)
                .and_then(|contribution| acc.checked_add(contribution))
        }),
        "debt_tranches.rate",
    )?;

    Ok(CostOfDebt {
        pretax,
        // Uniform tax rate factors out of the sum.
        after_tax: checked(pretax.checked_mul(shield), "debt_tranches.rate")?,
        per_tranche,
    })
}

pub(crate) fn validate_tax_rate(tax_rate: Rate) -> WaccResult<()> {
    if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
        return Err(WaccError::invalid(
            "tax_rate",
            format!("Tax rate must be in [0, 1), got {tax_rate}"),
        ));
    }
    Ok(())
}
