use serde_json::Value;

use super::{format_scalar, result_of};

/// Print just the key answer value from the output.
///
/// Looks for the headline field of each command in priority order, then
/// falls back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = result_of(value);

    let priority_keys = [
        "total_withholding",
        "withholding_amount",
        "shares",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Catalog listing: one concept id per line
    if let Value::Array(items) = result_obj {
        for item in items {
            match item.get("concept_id") {
                Some(id) => println!("{}", format_scalar(id)),
                None => println!("{}", format_minimal(item)),
            }
        }
        return;
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(","),
        Value::Null => "null".to_string(),
        other => format_scalar(other),
    }
}
