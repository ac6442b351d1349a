//! YAML schema definitions for declarative pipeline configuration

use crate::ops::AttrValue;
use crate::quant::TensorData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete pipeline specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Bit-width used to quantize pipeline inputs
    #[serde(default = "default_n_bits")]
    pub input_n_bits: u32,

    /// Default bit-width for layers without an override
    #[serde(default = "default_n_bits")]
    pub n_bits: u32,

    /// Operators, applied in order
    pub layers: Vec<LayerSpec>,
}

/// One operator in the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Registered operator tag (e.g. "Gemm", "Relu")
    pub op: String,

    /// Per-layer bit-width override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_bits: Option<u32>,

    /// Attributes merged over the operator defaults
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,

    /// Constant inputs keyed by input name or slot index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, ConstantSpec>,
}

impl LayerSpec {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            n_bits: None,
            attrs: BTreeMap::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Bit-width of this layer given the pipeline default
    pub fn effective_n_bits(&self, default: u32) -> u32 {
        self.n_bits.unwrap_or(default)
    }
}

/// Constant tensor bound to an operator input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantSpec {
    #[serde(flatten)]
    pub tensor: TensorData,

    /// Quantize at the layer bit-width; `false` keeps the values as floats
    #[serde(default = "default_true")]
    pub quantize: bool,
}

fn default_n_bits() -> u32 {
    8
}

fn default_true() -> bool {
    true
}
