//! Sequential chain of quantized operators
//!
//! A minimal graph assembler: each layer consumes the previous layer's output.
//! Calibration walks the layers in order, feeding every layer the float output
//! of its predecessor, which is the topological order a real graph would use.

use crate::error::{Error, Result};
use crate::ops::{OpState, QuantizedOp};
use crate::quant::{calibrate_min_max, check_n_bits, QuantParams, QuantizedArray};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Ordered list of single-input quantized operators
#[derive(Clone, Debug)]
pub struct QuantizedPipeline {
    input_n_bits: u32,
    input_params: Option<QuantParams>,
    layers: Vec<QuantizedOp>,
}

impl QuantizedPipeline {
    pub fn new(input_n_bits: u32, layers: Vec<QuantizedOp>) -> Result<Self> {
        check_n_bits(input_n_bits)?;
        if layers.is_empty() {
            return Err(Error::ConfigError(
                "pipeline must contain at least one layer".to_string(),
            ));
        }
        Ok(Self {
            input_n_bits,
            input_params: None,
            layers,
        })
    }

    /// Fix input quantization and calibrate every layer in order
    ///
    /// Returns the float output of the last layer.
    pub fn calibrate(&mut self, sample: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        if self.input_params.is_some() {
            return Err(Error::StateError(
                "pipeline is already calibrated".to_string(),
            ));
        }

        let input_params = calibrate_min_max(sample, self.input_n_bits)?;

        // Layers are swapped in only once every one of them has calibrated.
        let mut layers = self.layers.clone();
        let mut current = sample.clone();
        for (index, layer) in layers.iter_mut().enumerate() {
            tracing::debug!(layer = index, op = layer.tag(), "calibrating layer");
            current = layer.calibrate(std::slice::from_ref(&current))?;
        }

        self.layers = layers;
        self.input_params = Some(input_params);
        tracing::info!(
            layers = self.layers.len(),
            input_scale = input_params.scale,
            "pipeline calibrated"
        );
        Ok(current)
    }

    /// Quantize a float input with the calibrated input parameters
    pub fn quantize_input(&self, input: ArrayD<f64>) -> Result<QuantizedArray> {
        QuantizedArray::quantize_with_params(input, self.input_params()?)
    }

    /// Run every layer on a quantized input
    pub fn apply(&self, input: &QuantizedArray) -> Result<QuantizedArray> {
        self.input_params()?;
        let mut layers = self.layers.iter();
        let first = match layers.next() {
            Some(layer) => layer.apply(&[input])?,
            None => return Err(Error::ConfigError("pipeline has no layers".to_string())),
        };
        layers.try_fold(first, |current, layer| layer.apply(&[&current]))
    }

    /// Quantize, apply and dequantize
    pub fn forward(&self, input: ArrayD<f64>) -> Result<ArrayD<f64>> {
        let q = self.quantize_input(input)?;
        Ok(self.apply(&q)?.dequant())
    }

    pub fn is_calibrated(&self) -> bool {
        self.input_params.is_some() && self.layers.iter().all(QuantizedOp::is_calibrated)
    }

    pub fn input_params(&self) -> Result<QuantParams> {
        self.input_params.ok_or_else(|| {
            Error::StateError(
                "pipeline is not calibrated; call calibrate with sample data first".to_string(),
            )
        })
    }

    pub fn input_n_bits(&self) -> u32 {
        self.input_n_bits
    }

    pub fn layers(&self) -> &[QuantizedOp] {
        &self.layers
    }

    pub fn to_state(&self) -> PipelineState {
        PipelineState {
            input_n_bits: self.input_n_bits,
            input_scale: self.input_params.map(|p| p.scale),
            input_zero_point: self.input_params.map(|p| p.zero_point),
            layers: self.layers.iter().map(QuantizedOp::to_state).collect(),
        }
    }

    pub fn from_state(state: PipelineState) -> Result<Self> {
        let layers = state
            .layers
            .into_iter()
            .map(QuantizedOp::from_state)
            .collect::<Result<Vec<_>>>()?;
        let mut pipeline = Self::new(state.input_n_bits, layers)?;

        pipeline.input_params = match (state.input_scale, state.input_zero_point) {
            (Some(scale), Some(zero_point)) => {
                Some(QuantParams::new(state.input_n_bits, scale, zero_point)?)
            }
            (None, None) => None,
            _ => {
                return Err(Error::StateError(
                    "input_scale and input_zero_point must be saved together".to_string(),
                ))
            }
        };
        Ok(pipeline)
    }
}

/// Serializable pipeline state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub input_n_bits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_zero_point: Option<i64>,
    pub layers: Vec<OpState>,
}
