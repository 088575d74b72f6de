use serde_json::Value;

use super::{format_scalar, result_of};

/// Key answer fields, in order of preference.
const PRIORITY_KEYS: [&str; 3] = ["wacc", "cost_of_equity", "after_tax"];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = result_of(value);

    if let Value::Object(map) = result {
        if let Some(val) = PRIORITY_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|val| !val.is_null())
        {
            return format_scalar(val);
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }

    format_scalar(result)
}
