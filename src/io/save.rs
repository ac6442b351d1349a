//! State saving functionality

use super::format::{ModelFormat, SaveConfig};
use crate::pipeline::QuantizedPipeline;
use crate::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Serialize any state value to a file
pub fn save_state<T: Serialize>(state: &T, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();

    let data = match config.format {
        ModelFormat::Json => {
            if config.pretty {
                serde_json::to_string_pretty(state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            } else {
                serde_json::to_string(state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            }
        }
        ModelFormat::Yaml => serde_yaml::to_string(state)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
    };

    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;

    tracing::debug!(path = %path.display(), format = ?config.format, "state saved");
    Ok(())
}

/// Save a pipeline, calibrated or not
///
/// # Example
///
/// ```no_run
/// use cuantizar::io::{save_pipeline, ModelFormat, SaveConfig};
/// use cuantizar::{QuantizedOp, QuantizedPipeline};
///
/// let relu = QuantizedOp::builder("Relu", 8).build()?;
/// let pipeline = QuantizedPipeline::new(8, vec![relu])?;
/// save_pipeline(&pipeline, "pipeline.yaml", &SaveConfig::new(ModelFormat::Yaml))?;
/// # Ok::<(), cuantizar::Error>(())
/// ```
pub fn save_pipeline(
    pipeline: &QuantizedPipeline,
    path: impl AsRef<Path>,
    config: &SaveConfig,
) -> Result<()> {
    save_state(&pipeline.to_state(), path, config)
}
