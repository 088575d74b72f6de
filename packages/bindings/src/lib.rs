use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use wacc_core::debt::DebtTranche;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct CostOfDebtInput {
    debt_tranches: Vec<DebtTranche>,
    tax_rate: Decimal,
}

#[napi]
pub fn calculate_wacc(input_json: String) -> NapiResult<String> {
    let input: wacc_core::wacc::WaccInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = wacc_core::wacc::calculate_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn cost_of_equity(input_json: String) -> NapiResult<String> {
    let input: wacc_core::equity::EquityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let ke = wacc_core::equity::compute_cost_of_equity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&serde_json::json!({
        "method": input.method_name(),
        "cost_of_equity": ke,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn cost_of_debt(input_json: String) -> NapiResult<String> {
    let input: CostOfDebtInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = wacc_core::debt::compute_cost_of_debt(&input.debt_tranches, input.tax_rate)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn capital_structure(input_json: String) -> NapiResult<String> {
    let input: wacc_core::instruments::ThreeStepInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = wacc_core::instruments::three_step_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
