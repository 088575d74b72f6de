use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Input document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                InputFormat::Yaml
            }
            _ => InputFormat::Json,
        }
    }
}

/// Read a JSON or YAML file and deserialise into a typed struct.
pub fn read_input<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let format = InputFormat::from_path(&canonical);
    tracing::debug!(path = %canonical.display(), ?format, "reading input file");

    let value: T = match format {
        InputFormat::Json => serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
        InputFormat::Yaml => serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
    };
    Ok(value)
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

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.yaml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.YML")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("noext")), InputFormat::Json);
    }

    #[test]
    fn test_yaml_demo_runs_three_step_model() {
        use rust_decimal_macros::dec;
        use wacc_core::instruments::{three_step_wacc, ThreeStepInput};

        let input: ThreeStepInput = read_input("../../demos/three_step.yaml").unwrap();
        let out = three_step_wacc(&input).unwrap();
        assert_eq!(out.result.sources.len(), 5);
        assert!((out.result.wacc - dec!(0.1186473)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_json_demo_runs_wacc() {
        use rust_decimal_macros::dec;
        use wacc_core::wacc::{calculate_wacc, WaccInput};

        let input: WaccInput = read_input("../../demos/wacc_tranches.json").unwrap();
        let out = calculate_wacc(&input).unwrap();
        assert_eq!(out.result.wacc, dec!(0.07605));
    }

    #[test]
    fn test_missing_file() {
        let err = read_input::<serde_json::Value>("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
