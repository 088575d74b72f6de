use serde_json::{Map, Value};
use std::io;

use super::{column_union, format_scalar, result_of};

/// Column layout of the WACC breakdown export.
const BREAKDOWN_HEADER: [&str; 5] = ["tranche", "label", "weight", "rate", "after_tax_rate"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        tracing::error!(error = %e, "failed to write CSV output");
    }
}

fn write_csv<W: io::Write>(value: &Value, writer: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    match result_of(value) {
        Value::Object(result) if result.contains_key("per_tranche") => {
            write_breakdown(&mut wtr, result)?;
        }
        Value::Object(result) => write_object(&mut wtr, result)?,
        Value::Array(arr) => write_rows(&mut wtr, arr)?,
        other => wtr.write_record([format_scalar(other)])?,
    }

    wtr.flush()?;
    Ok(())
}

/// One row per tranche keyed by its 1-based index, then summary rows
/// carrying the summary figure in the `rate` column.
///
/// Cost of debt results (no equity leg) carry only the two debt summaries.
fn write_breakdown<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    result: &Map<String, Value>,
) -> csv::Result<()> {
    let field = |key: &str| result.get(key).map(format_scalar).unwrap_or_default();

    wtr.write_record(BREAKDOWN_HEADER)?;
    if let Some(Value::Array(tranches)) = result.get("per_tranche") {
        for tranche in tranches {
            let cell = |key: &str| tranche.get(key).map(format_scalar).unwrap_or_default();
            wtr.write_record([
                cell("index"),
                cell("label"),
                cell("weight"),
                cell("rate"),
                cell("after_tax_rate"),
            ])?;
        }
    }

    let summaries: Vec<(&str, String, String)> = if result.contains_key("wacc") {
        vec![
            ("cost_of_equity", field("equity_weight"), field("cost_of_equity")),
            ("cost_of_debt_pretax", field("debt_weight"), field("cost_of_debt_pretax")),
            ("cost_of_debt_after_tax", field("debt_weight"), field("cost_of_debt_after_tax")),
            ("wacc", "1".to_string(), field("wacc")),
        ]
    } else {
        vec![
            ("cost_of_debt_pretax", "1".to_string(), field("pretax")),
            ("cost_of_debt_after_tax", "1".to_string(), field("after_tax")),
        ]
    };
    for (name, weight, rate) in &summaries {
        wtr.write_record([*name, "", weight.as_str(), rate.as_str(), ""])?;
    }
    Ok(())
}

/// Arrays of objects as tables, then scalar fields as field,value rows.
fn write_object<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    result: &Map<String, Value>,
) -> csv::Result<()> {
    for val in result.values() {
        if let Value::Array(rows) = val {
            if rows.first().is_some_and(Value::is_object) {
                write_rows(wtr, rows)?;
            }
        }
    }

    wtr.write_record(["field", "value"])?;
    for (key, val) in result {
        if !val.is_array() {
            wtr.write_record([key.as_str(), &format_scalar(val)])?;
        }
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(_)) = arr.first() else {
        for item in arr {
            wtr.write_record([format_scalar(item)])?;
        }
        return Ok(());
    };

    let headers = column_union(arr);
    wtr.write_record(&headers)?;
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_scalar).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}
