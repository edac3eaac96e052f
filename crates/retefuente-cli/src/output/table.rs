use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, result_of};

/// Format output as tables: scalar fields first, then one table per list of
/// records (liquidation lines, batch results, catalog entries).
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(map) => print_record(map),
        Value::Array(arr) => print_records(arr),
        other => println!("{}", format_scalar(other)),
    }

    if let Some(envelope) = value.as_object() {
        print_notes(envelope);
    }
}

fn print_record(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&str, &Vec<Value>)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(items) if items.iter().any(Value::is_object) => {
                nested.push((key.as_str(), items));
            }
            Value::Object(inner) => {
                for (sub_key, sub_val) in inner {
                    builder.push_record([format!("{}.{}", key, sub_key), cell(sub_val)]);
                }
            }
            _ => builder.push_record([key.clone(), cell(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, items) in nested {
        println!("\n{}:", key);
        print_records(items);
    }
}

fn print_records(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Union of keys in first-seen order; optional fields may be missing on some rows.
    let mut headers: Vec<&str> = Vec::new();
    for item in arr {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !headers.contains(&key.as_str()) {
                    headers.push(key.as_str());
                }
            }
        }
    }

    if headers.is_empty() {
        for item in arr {
            println!("{}", cell(item));
        }
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(map) if map.len() == 1 => {
            // Externally tagged enums, e.g. a batch outcome
            match map.iter().next() {
                Some((tag, inner)) => format!("{}: {}", tag, summarize(inner)),
                None => String::new(),
            }
        }
        other => format_scalar(other),
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Object(map) => ["total_withholding", "message"]
            .iter()
            .find_map(|k| map.get(*k).map(format_scalar))
            .unwrap_or_else(|| format_scalar(value)),
        other => format_scalar(other),
    }
}
