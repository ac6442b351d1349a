//! Build quantized operators from configuration

use super::schema::{ConstantSpec, LayerSpec, PipelineSpec};
use crate::error::Result;
use crate::ops::{ConstantInput, InputRef, QuantizedOp};
use crate::pipeline::QuantizedPipeline;
use crate::quant::QuantizedArray;

/// Constant keys that parse as integers address slots by index
fn input_ref(key: &str) -> InputRef {
    match key.parse::<usize>() {
        Ok(index) => InputRef::Index(index),
        Err(_) => InputRef::Name(key.to_string()),
    }
}

fn build_constant(spec: &ConstantSpec, n_bits: u32) -> Result<ConstantInput> {
    let values = spec.tensor.to_array()?;
    if spec.quantize {
        Ok(ConstantInput::Quantized(QuantizedArray::quantize(values, n_bits)?))
    } else {
        Ok(ConstantInput::Float(values))
    }
}

/// Build one operator; quantized constants use the layer bit-width
pub fn build_op(layer: &LayerSpec, default_n_bits: u32) -> Result<QuantizedOp> {
    let n_bits = layer.effective_n_bits(default_n_bits);

    let constants = layer
        .constants
        .iter()
        .map(|(key, spec)| Ok((input_ref(key), build_constant(spec, n_bits)?)))
        .collect::<Result<Vec<_>>>()?;

    let attrs = layer
        .attrs
        .iter()
        .map(|(name, value)| (name.clone(), *value));

    QuantizedOp::new(&layer.op, n_bits, constants, attrs)
}

/// Instantiate every layer of a pipeline spec
pub fn build_pipeline(spec: &PipelineSpec) -> Result<QuantizedPipeline> {
    let layers = spec
        .layers
        .iter()
        .map(|layer| build_op(layer, spec.n_bits))
        .collect::<Result<Vec<_>>>()?;
    QuantizedPipeline::new(spec.input_n_bits, layers)
}
