//! Configuration validation

use super::schema::PipelineSpec;
use crate::ops::is_registered;
use crate::quant::MAX_N_BITS;

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Pipeline has no layers")]
    NoLayers,

    #[error("Layer {layer}: unknown operator '{op}'")]
    UnknownOperator { layer: usize, op: String },

    #[error("Invalid {context} bit-width: {bits} (must be in [1, {max}])", max = MAX_N_BITS)]
    InvalidBits { context: String, bits: u32 },

    #[error("Layer {layer}: constant '{name}' has {got} values for shape {shape:?}")]
    ConstantShape {
        layer: usize,
        name: String,
        shape: Vec<usize>,
        got: usize,
    },
}

fn check_bits(context: impl Into<String>, bits: u32) -> Result<(), ValidationError> {
    if bits == 0 || bits > MAX_N_BITS {
        return Err(ValidationError::InvalidBits {
            context: context.into(),
            bits,
        });
    }
    Ok(())
}

/// Validate a pipeline specification
///
/// Checks:
/// - At least one layer
/// - Every operator tag is registered
/// - Every bit-width is in range
/// - Constant data matches its shape
///
/// Attribute names and constant keys are checked when the operators are built.
pub fn validate_config(spec: &PipelineSpec) -> Result<(), ValidationError> {
    if spec.layers.is_empty() {
        return Err(ValidationError::NoLayers);
    }

    check_bits("input", spec.input_n_bits)?;
    check_bits("default", spec.n_bits)?;

    for (index, layer) in spec.layers.iter().enumerate() {
        if !is_registered(&layer.op) {
            return Err(ValidationError::UnknownOperator {
                layer: index,
                op: layer.op.clone(),
            });
        }

        if let Some(bits) = layer.n_bits {
            check_bits(format!("layer {index}"), bits)?;
        }

        for (name, constant) in &layer.constants {
            let tensor = &constant.tensor;
            if tensor.num_elements() != tensor.data.len() {
                return Err(ValidationError::ConstantShape {
                    layer: index,
                    name: name.clone(),
                    shape: tensor.shape.clone(),
                    got: tensor.data.len(),
                });
            }
        }
    }

    Ok(())
}
