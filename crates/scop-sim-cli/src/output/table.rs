use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_envelope_notes(map);
            } else {
                println!("{}", field_value_table(value));
            }
        }
        Value::Array(arr) => println!("{}", array_table(arr)),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    let Value::Object(res_map) = result else {
        println!("{}", format_scalar(result));
        return;
    };

    if let (Some(without), Some(with)) = (res_map.get("without_regime"), res_map.get("with_regime")) {
        println!("{}", comparison_table(without, with));
        if let Some(savings) = res_map.get("savings") {
            println!("\n{}", field_value_table(savings));
        }
        return;
    }

    if let Some(Value::Array(points)) = res_map.get("points") {
        println!("{}", array_table(points));
        let summary: Map<String, Value> = res_map
            .iter()
            .filter(|(k, _)| k.as_str() != "points")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        println!("\n{}", field_value_table(&Value::Object(summary)));
        return;
    }

    println!("{}", field_value_table(result));
}

/// Side-by-side view of the two regimes, one row per field.
fn comparison_table(without: &Value, with: &Value) -> Table {
    let mut without_rows = Vec::new();
    let mut with_rows = Vec::new();
    flatten("", without, &mut without_rows);
    flatten("", with, &mut with_rows);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Standard company", "SCOP"]);
    for (key, with_val) in &with_rows {
        let without_val = without_rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| format_scalar(v))
            .unwrap_or_default();
        builder.push_record([key.clone(), without_val, format_scalar(with_val)]);
    }
    builder.build()
}

fn field_value_table(value: &Value) -> Table {
    let mut rows = Vec::new();
    flatten("", value, &mut rows);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in &rows {
        builder.push_record([key.clone(), format_scalar(val)]);
    }
    builder.build()
}

fn array_table(arr: &[Value]) -> Table {
    let mut builder = Builder::default();
    match arr.first() {
        Some(Value::Object(first)) => {
            let headers: Vec<String> = first.keys().cloned().collect();
            builder.push_record(headers.clone());
            for item in arr {
                if let Value::Object(map) = item {
                    let row: Vec<String> = headers
                        .iter()
                        .map(|h| map.get(h).map(format_scalar).unwrap_or_default())
                        .collect();
                    builder.push_record(row);
                }
            }
        }
        _ => {
            for item in arr {
                builder.push_record([format_scalar(item)]);
            }
        }
    }
    builder.build()
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
