use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialise a piped scenario from stdin. JSON documents are read as
/// JSON, anything else as YAML. Returns None when stdin is a TTY or empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(buffer: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| format!("Invalid JSON on stdin: {e}"))?
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| format!("Invalid YAML on stdin: {e}"))?
    };
    Ok(Some(value))
}
