//! Loading pipeline specifications from YAML

use super::schema::PipelineSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Parse and validate a pipeline spec from YAML text
pub fn parse_config(yaml: &str) -> Result<PipelineSpec> {
    let spec: PipelineSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Load a pipeline spec from a YAML file
///
/// # Example
///
/// ```no_run
/// use cuantizar::config::{build_pipeline, load_config};
///
/// let spec = load_config("pipeline.yaml")?;
/// let pipeline = build_pipeline(&spec)?;
/// # Ok::<(), cuantizar::Error>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<PipelineSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    tracing::debug!(
        path = %config_path.as_ref().display(),
        layers = spec.layers.len(),
        "config loaded"
    );
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let yaml = r#"
n_bits: 6
layers:
  - op: Relu
  - op: Sigmoid
    n_bits: 4
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let spec = load_config(temp_file.path()).unwrap();
        assert_eq!(spec.input_n_bits, 8);
        assert_eq!(spec.n_bits, 6);
        assert_eq!(spec.layers[1].effective_n_bits(spec.n_bits), 4);
    }

    #[test]
    fn test_load_invalid_config() {
        let yaml = "layers: []\n";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let yaml = "this is not valid yaml: [}";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/pipeline.yaml");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
