use serde_json::{Map, Value};
use std::io;

use super::{format_scalar, result_of};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Liquidations export one row per line, batches one row per invoice, and
/// catalogs one row per concept; anything else falls back to field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            if let Some(Value::Array(lines)) = map.get("lines") {
                write_rows(&mut wtr, lines);
            } else if let Some(Value::Array(results)) = map.get("results") {
                write_batch(&mut wtr, results);
            } else {
                write_fields(&mut wtr, map);
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.clone(), format_scalar(val)]);
    }
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
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
            let _ = wtr.write_record([format_scalar(item)]);
        }
        return;
    }

    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn write_batch(wtr: &mut StdoutWriter<'_>, results: &[Value]) {
    let _ = wtr.write_record([
        "index",
        "invoice_id",
        "status",
        "total_base",
        "total_withholding",
        "error",
    ]);
    for item in results {
        let field = |k: &str| item.get(k).map(format_scalar).unwrap_or_default();
        let outcome = item.get("outcome");
        let row = if let Some(liq) = outcome.and_then(|o| o.get("liquidated")) {
            [
                field("index"),
                field("invoice_id"),
                "liquidated".to_string(),
                liq.get("total_base").map(format_scalar).unwrap_or_default(),
                liq.get("total_withholding").map(format_scalar).unwrap_or_default(),
                String::new(),
            ]
        } else {
            let failure = outcome.and_then(|o| o.get("failed"));
            [
                field("index"),
                field("invoice_id"),
                "failed".to_string(),
                String::new(),
                String::new(),
                failure
                    .and_then(|f| f.get("message"))
                    .map(format_scalar)
                    .unwrap_or_default(),
            ]
        };
        let _ = wtr.write_record(&row);
    }
}
