use serde_json::Value;

use super::{format_scalar, result_of};

/// Headline figure of each command's result, in priority order.
const PRIORITY_POINTERS: [&str; 4] = [
    "/savings/total_savings",
    "/breakdown/total_tax",
    "/best_savings",
    "/total_tax",
];

/// Print just the key answer value from the output.
///
/// Looks for the headline figure of each command first, then falls back to
/// the first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = result_of(value);

    for pointer in PRIORITY_POINTERS {
        if let Some(val) = result.pointer(pointer) {
            if !val.is_null() {
                return format_scalar(val);
            }
        }
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }

    format_scalar(result)
}
