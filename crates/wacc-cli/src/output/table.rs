use serde_json::{Map, Value};
use std::fmt::Write;
use tabled::{builder::Builder, Table};

use super::{column_union, format_scalar};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    print!("{}", render_table(value));
}

fn render_table(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                render_result(&mut out, result);
                render_envelope(&mut out, map);
            }
            _ => render_result(&mut out, map),
        },
        Value::Array(arr) => render_rows(&mut out, arr),
        _ => {
            let _ = writeln!(out, "{}", format_scalar(value));
        }
    }
    out
}

/// Scalars go in a Field / Value table; each array of objects (tranches,
/// capital sources) gets its own table underneath.
fn render_result(out: &mut String, result: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result {
        if !is_row_array(val) {
            builder.push_record([key.as_str(), &format_cell(val)]);
        }
    }
    let _ = writeln!(out, "{}", Table::from(builder));

    for (key, val) in result {
        if let Value::Array(rows) = val {
            if is_row_array(val) && !rows.is_empty() {
                let _ = writeln!(out, "\n{key}:");
                render_rows(out, rows);
            }
        }
    }
}

fn render_rows(out: &mut String, rows: &[Value]) {
    let Some(Value::Object(_)) = rows.first() else {
        for item in rows {
            let _ = writeln!(out, "{}", format_cell(item));
        }
        return;
    };

    let headers = column_union(rows);
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    let _ = writeln!(out, "{}", Table::from(builder));
}

fn render_envelope(out: &mut String, envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                let _ = writeln!(out, "  - {w}");
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        let _ = writeln!(out, "\nMethodology: {meth}");
    }
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().all(Value::is_object))
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_cell).collect::<Vec<_>>().join(", "),
        other => format_scalar(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_breakdown_rendered_as_second_table() {
        let value = json!({
            "result": {
                "wacc": "0.07605",
                "per_tranche": [
                    {"index": 1, "label": "Bank", "weight": "0.6", "rate": "0.05"},
                    {"index": 2, "label": "Bonds", "weight": "0.4", "rate": "0.07"}
                ]
            },
            "methodology": "WACC via CAPM",
            "warnings": ["High beta (3.5)"]
        });
        let out = render_table(&value);
        assert!(out.contains("0.07605"));
        assert!(out.contains("per_tranche:"));
        assert!(out.contains("Bonds"));
        assert!(out.contains("  - High beta (3.5)"));
        assert!(out.contains("Methodology: WACC via CAPM"));
    }

    #[test]
    fn test_rows_keep_labels_absent_from_first_row() {
        let value = json!({
            "result": {
                "wacc": "0.07605",
                "per_tranche": [
                    {"index": 1, "weight": "0.6", "rate": "0.05"},
                    {"index": 2, "label": "Senior notes", "weight": "0.4", "rate": "0.07"}
                ]
            }
        });
        let out = render_table(&value);
        assert!(out.contains("label"), "{out}");
        assert!(out.contains("Senior notes"), "{out}");
    }
}
