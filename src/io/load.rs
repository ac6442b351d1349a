//! State loading functionality

use super::format::ModelFormat;
use crate::pipeline::{PipelineState, QuantizedPipeline};
use crate::quant::TensorData;
use crate::{Error, Result};
use ndarray::ArrayD;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Deserialize a state value, detecting the format from the file extension
pub fn load_state<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("File has no extension".to_string()))?;

    let format = ModelFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))?;

    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    match format {
        ModelFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
        ModelFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
    }
}

/// Load a pipeline, re-running operator construction checks
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<QuantizedPipeline> {
    let state: PipelineState = load_state(path)?;
    QuantizedPipeline::from_state(state)
}

/// Load a `{shape, data}` float tensor
pub fn load_tensor(path: impl AsRef<Path>) -> Result<ArrayD<f64>> {
    let tensor: TensorData = load_state(path)?;
    tensor.to_array()
}
