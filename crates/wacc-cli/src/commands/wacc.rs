use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

use wacc_core::debt::{self, DebtTranche};
use wacc_core::equity::{self, EquityInput};
use wacc_core::wacc::{self, CapitalWeights, WaccInput};
use wacc_core::with_metadata;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EquityMethod {
    Capm,
    Gordon,
    Direct,
}

/// Cost of equity flags shared by `calculate` and `cost-of-equity`
#[derive(Args)]
pub struct EquityFlags {
    /// Cost of equity method
    #[arg(long, value_enum, default_value = "capm")]
    pub method: EquityMethod,

    /// Risk-free rate (e.g. 0.03 for 3%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Equity beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Market risk premium (e.g. 0.05 for 5%)
    #[arg(long, alias = "mrp")]
    pub market_risk_premium: Option<Decimal>,

    /// Expected market return; premium is derived as Rm - Rf
    #[arg(long, conflicts_with = "market_risk_premium")]
    pub market_return: Option<Decimal>,

    /// Next period dividend (Gordon growth)
    #[arg(long)]
    pub next_dividend: Option<Decimal>,

    /// Current share price (Gordon growth)
    #[arg(long)]
    pub current_price: Option<Decimal>,

    /// Constant dividend growth rate (Gordon growth)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Cost of equity supplied directly
    #[arg(long)]
    pub cost_of_equity: Option<Decimal>,
}

/// Debt flags shared by `calculate` and `cost-of-debt`
#[derive(Args)]
pub struct DebtFlags {
    /// Debt tranche as weight:rate[:label], repeatable (e.g. 0.6:0.05:Bank)
    #[arg(long = "tranche", value_parser = parse_tranche)]
    pub tranches: Vec<DebtTranche>,

    /// Single pre-tax cost of debt, used when no tranches are given
    #[arg(long, conflicts_with = "tranches")]
    pub cost_of_debt: Option<Decimal>,

    /// Marginal corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,
}

/// Arguments for the full WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    #[command(flatten)]
    pub equity: EquityFlags,

    #[command(flatten)]
    pub debt: DebtFlags,

    /// Equity weight in capital structure (market value basis)
    #[arg(long)]
    pub equity_weight: Option<Decimal>,

    /// Debt weight in capital structure (market value basis)
    #[arg(long)]
    pub debt_weight: Option<Decimal>,

    /// Market value of equity; weights are derived from values when given
    #[arg(long, conflicts_with_all = ["equity_weight", "debt_weight"])]
    pub equity_value: Option<Decimal>,

    /// Market value of debt
    #[arg(long, conflicts_with_all = ["equity_weight", "debt_weight"])]
    pub debt_value: Option<Decimal>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a standalone cost of equity
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CostOfEquityArgs {
    #[command(flatten)]
    pub equity: EquityFlags,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a standalone cost of debt
#[derive(Args)]
pub struct CostOfDebtArgs {
    #[command(flatten)]
    pub debt: DebtFlags,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// File / stdin shape for `cost-of-debt`
#[derive(Debug, Serialize, Deserialize)]
struct CostOfDebtInput {
    debt_tranches: Vec<DebtTranche>,
    tax_rate: Decimal,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        WaccInput {
            equity: build_equity(&args.equity)?,
            debt_tranches: build_tranches(&args.debt)?,
            tax_rate: args
                .debt
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            weights: build_weights(&args)?,
        }
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cost_of_equity(args: CostOfEquityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let equity_input: EquityInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        build_equity(&args.equity)?
    };

    let start = Instant::now();
    let cost_of_equity = equity::compute_cost_of_equity(&equity_input)?;
    let elapsed = start.elapsed().as_micros() as u64;

    let methodology = format!("Cost of equity via {}", equity_input.method_name());
    let output = with_metadata(
        &methodology,
        &equity_input,
        Vec::new(),
        elapsed,
        json!({ "cost_of_equity": cost_of_equity }),
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_cost_of_debt(args: CostOfDebtArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let debt_input: CostOfDebtInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        CostOfDebtInput {
            debt_tranches: build_tranches(&args.debt)?,
            tax_rate: args
                .debt
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
        }
    };

    let start = Instant::now();
    let cost_of_debt = debt::compute_cost_of_debt(&debt_input.debt_tranches, debt_input.tax_rate)?;
    let elapsed = start.elapsed().as_micros() as u64;

    let output = with_metadata(
        "Tranche-weighted cost of debt",
        &debt_input,
        Vec::new(),
        elapsed,
        cost_of_debt,
    );
    Ok(serde_json::to_value(output)?)
}

// ---------------------------------------------------------------------------
// Flag assembly
// ---------------------------------------------------------------------------

fn build_equity(flags: &EquityFlags) -> Result<EquityInput, Box<dyn std::error::Error>> {
    let equity = match flags.method {
        EquityMethod::Capm => {
            let risk_free_rate = flags
                .risk_free_rate
                .ok_or("--risk-free-rate is required for CAPM (or provide --input)")?;
            let market_risk_premium = match (flags.market_risk_premium, flags.market_return) {
                (Some(mrp), _) => mrp,
                (None, Some(rm)) => equity::market_risk_premium(rm, risk_free_rate)?,
                (None, None) => {
                    return Err(
                        "--market-risk-premium or --market-return is required for CAPM".into(),
                    )
                }
            };
            EquityInput::Capm {
                risk_free_rate,
                beta: flags
                    .beta
                    .ok_or("--beta is required for CAPM (or provide --input)")?,
                market_risk_premium,
            }
        }
        EquityMethod::Gordon => EquityInput::GordonGrowth {
            next_dividend: flags
                .next_dividend
                .ok_or("--next-dividend is required for Gordon growth")?,
            current_price: flags
                .current_price
                .ok_or("--current-price is required for Gordon growth")?,
            growth_rate: flags
                .growth_rate
                .ok_or("--growth-rate is required for Gordon growth")?,
        },
        EquityMethod::Direct => EquityInput::Direct {
            cost_of_equity: flags
                .cost_of_equity
                .ok_or("--cost-of-equity is required for the direct method")?,
        },
    };
    Ok(equity)
}

fn build_tranches(flags: &DebtFlags) -> Result<Vec<DebtTranche>, Box<dyn std::error::Error>> {
    if !flags.tranches.is_empty() {
        return Ok(flags.tranches.clone());
    }
    let rate = flags
        .cost_of_debt
        .ok_or("--tranche or --cost-of-debt is required (or provide --input)")?;
    Ok(debt::single_tranche(rate))
}

fn build_weights(args: &WaccArgs) -> Result<CapitalWeights, Box<dyn std::error::Error>> {
    if let (Some(equity_value), Some(debt_value)) = (args.equity_value, args.debt_value) {
        return Ok(CapitalWeights::from_market_values(equity_value, debt_value)?);
    }
    // One weight implies the other.
    let weights = match (args.equity_weight, args.debt_weight) {
        (Some(we), Some(wd)) => CapitalWeights::new(we, wd),
        (Some(we), None) => CapitalWeights::new(we, Decimal::ONE - we),
        (None, Some(wd)) => CapitalWeights::new(Decimal::ONE - wd, wd),
        (None, None) => {
            return Err("--equity-weight / --debt-weight or --equity-value and --debt-value are required".into())
        }
    };
    Ok(weights)
}

/// Parse `weight:rate[:label]`.
fn parse_tranche(s: &str) -> Result<DebtTranche, String> {
    let mut parts = s.splitn(3, ':');
    let weight = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("expected weight:rate[:label], got '{s}'"))?;
    let rate = parts
        .next()
        .ok_or_else(|| format!("expected weight:rate[:label], got '{s}'"))?;

    let weight: Decimal = weight
        .trim()
        .parse()
        .map_err(|e| format!("invalid tranche weight '{weight}': {e}"))?;
    let rate: Decimal = rate
        .trim()
        .parse()
        .map_err(|e| format!("invalid tranche rate '{rate}': {e}"))?;

    Ok(match parts.next().map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => DebtTranche::labelled(label, weight, rate),
        None => DebtTranche::new(weight, rate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn capm_flags() -> EquityFlags {
        EquityFlags {
            method: EquityMethod::Capm,
            risk_free_rate: Some(dec!(0.05)),
            beta: Some(dec!(1.5)),
            market_risk_premium: None,
            market_return: Some(dec!(0.11)),
            next_dividend: None,
            current_price: None,
            growth_rate: None,
            cost_of_equity: None,
        }
    }

    #[test]
    fn test_parse_tranche_with_label() {
        let t = parse_tranche("0.6:0.05:Senior notes").unwrap();
        assert_eq!(t, DebtTranche::labelled("Senior notes", dec!(0.6), dec!(0.05)));
    }

    #[test]
    fn test_parse_tranche_without_label() {
        let t = parse_tranche("2:0.07").unwrap();
        assert_eq!(t, DebtTranche::new(dec!(2), dec!(0.07)));
    }

    #[test]
    fn test_parse_tranche_errors() {
        assert!(parse_tranche("0.6").is_err());
        assert!(parse_tranche(":0.05").is_err());
        assert!(parse_tranche("abc:0.05").is_err());
    }

    #[test]
    fn test_build_equity_from_market_return() {
        let equity = build_equity(&capm_flags()).unwrap();
        assert_eq!(
            equity,
            EquityInput::Capm {
                risk_free_rate: dec!(0.05),
                beta: dec!(1.5),
                market_risk_premium: dec!(0.06),
            }
        );
    }

    #[test]
    fn test_build_equity_gordon_requires_price() {
        let mut flags = capm_flags();
        flags.method = EquityMethod::Gordon;
        flags.next_dividend = Some(dec!(1));
        flags.growth_rate = Some(dec!(0.02));
        let err = build_equity(&flags).unwrap_err();
        assert!(err.to_string().contains("--current-price"));
    }

    #[test]
    fn test_build_equity_capm_requires_beta() {
        let mut flags = capm_flags();
        flags.beta = None;
        let err = build_equity(&flags).unwrap_err();
        assert!(err.to_string().contains("--beta is required"));
    }

    #[test]
    fn test_build_tranches_single_rate() {
        let flags = DebtFlags {
            tranches: Vec::new(),
            cost_of_debt: Some(dec!(0.06)),
            tax_rate: Some(dec!(0.21)),
        };
        assert_eq!(build_tranches(&flags).unwrap(), debt::single_tranche(dec!(0.06)));
    }

    #[test]
    fn test_flags_assemble_reference_input() {
        let args = WaccArgs {
            equity: EquityFlags {
                method: EquityMethod::Capm,
                risk_free_rate: Some(dec!(0.03)),
                beta: Some(dec!(1.2)),
                market_risk_premium: Some(dec!(0.05)),
                market_return: None,
                next_dividend: None,
                current_price: None,
                growth_rate: None,
                cost_of_equity: None,
            },
            debt: DebtFlags {
                tranches: Vec::new(),
                cost_of_debt: Some(dec!(0.06)),
                tax_rate: Some(dec!(0.21)),
            },
            equity_weight: Some(dec!(0.7)),
            debt_weight: None,
            equity_value: None,
            debt_value: None,
            input: None,
        };
        let weights = build_weights(&args).unwrap();
        assert_eq!(weights, CapitalWeights::new(dec!(0.7), dec!(0.3)));

        let input = WaccInput {
            equity: build_equity(&args.equity).unwrap(),
            debt_tranches: build_tranches(&args.debt).unwrap(),
            tax_rate: dec!(0.21),
            weights,
        };
        let out = wacc::calculate_wacc(&input).unwrap();
        assert_eq!(out.result.wacc, dec!(0.07722));
    }

    #[test]
    fn test_run_wacc_from_input_file() {
        let args = WaccArgs {
            equity: EquityFlags {
                method: EquityMethod::Capm,
                risk_free_rate: None,
                beta: None,
                market_risk_premium: None,
                market_return: None,
                next_dividend: None,
                current_price: None,
                growth_rate: None,
                cost_of_equity: None,
            },
            debt: DebtFlags {
                tranches: Vec::new(),
                cost_of_debt: None,
                tax_rate: None,
            },
            equity_weight: None,
            debt_weight: None,
            equity_value: None,
            debt_value: None,
            input: Some("../../demos/wacc_tranches.json".into()),
        };
        let value = run_wacc(args).unwrap();
        let wacc: Decimal = value["result"]["wacc"].as_str().unwrap().parse().unwrap();
        assert_eq!(wacc, dec!(0.07605));
        assert_eq!(value["result"]["per_tranche"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["methodology"], json!("WACC via CAPM"));
    }

    #[test]
    fn test_run_wacc_missing_input_file() {
        let args = WaccArgs {
            equity: capm_flags(),
            debt: DebtFlags {
                tranches: Vec::new(),
                cost_of_debt: None,
                tax_rate: None,
            },
            equity_weight: None,
            debt_weight: None,
            equity_value: None,
            debt_value: None,
            input: Some("../../demos/missing.json".into()),
        };
        let err = run_wacc(args).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
