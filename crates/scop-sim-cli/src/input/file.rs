use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Scenario file encodings, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                FileFormat::Yaml
            }
            _ => FileFormat::Json,
        }
    }
}

/// Read a JSON or YAML scenario file and deserialise into a typed struct.
pub fn read_input<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse(&contents, FileFormat::from_path(&canonical))
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

fn parse<T: DeserializeOwned>(
    contents: &str,
    format: FileFormat,
) -> Result<T, Box<dyn std::error::Error>> {
    Ok(match format {
        FileFormat::Json => serde_json::from_str(contents)?,
        FileFormat::Yaml => serde_yaml::from_str(contents)?,
    })
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scop_sim_core::cooperative::scenario::SimulationInput;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.YML")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("scenario")), FileFormat::Json);
    }

    #[test]
    fn test_parse_yaml_scenario() {
        let yaml = "\
fiscal_result: 100000
cet: 5000
normal_rate: 25
reduced_rate_ceiling: 42500
reduced_rate: 15
participation_pct: 45
reserves_pct: 45
dividends_pct: 10
";
        let input: SimulationInput = parse(yaml, FileFormat::Yaml).unwrap();
        assert_eq!(input.fiscal_result, dec!(100000));
        assert_eq!(input.reduced_rate, dec!(15));
    }

    #[test]
    fn test_missing_file() {
        let err = read_input::<SimulationInput>("/nonexistent/scenario.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
