use serde_json::Value;
use std::io;

use super::{flatten, format_scalar, result_of};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    if let Err(e) = write_csv(&mut wtr, value) {
        eprintln!("CSV output failed: {}", e);
    }
}

/// Sweeps become one row per grid point; anything else is flattened into
/// `field,value` rows.
fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    let result = result_of(value);

    match result {
        Value::Object(map) => match map.get("points") {
            Some(Value::Array(points)) => write_rows(wtr, points)?,
            _ => {
                let mut rows = Vec::new();
                flatten("", result, &mut rows);
                wtr.write_record(["field", "value"])?;
                for (key, val) in &rows {
                    wtr.write_record([key.as_str(), &format_scalar(val)])?;
                }
            }
        },
        Value::Array(arr) => write_rows(wtr, arr)?,
        other => wtr.write_record([format_scalar(other)])?,
    }

    wtr.flush()?;
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([format_scalar(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_sweep_points_as_rows() {
        let v = json!({"result": {
            "points": [
                {"value": "0", "total_savings": "10429.78"},
                {"value": "5000", "total_savings": "15429.78"}
            ],
            "best_value": "5000"
        }});
        assert_eq!(
            render(&v),
            "total_savings,value\n10429.78,0\n15429.78,5000\n"
        );
    }

    #[test]
    fn test_nested_result_flattened() {
        let v = json!({"result": {"savings": {"cet_savings": "5000"}}});
        assert_eq!(render(&v), "field,value\nsavings.cet_savings,5000\n");
    }
}
