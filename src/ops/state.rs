//! Serializable operator state

use super::attrs::Attrs;
use super::quantized_op::{CalibrationState, ConstantInput, InputRef, QuantizedOp};
use crate::error::{Error, Result};
use crate::quant::{QuantParams, QuantizedArray, TensorData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted constant input
///
/// A quantized constant keeps the floats it was quantized from, so the float
/// path of a restored operator sees the same values as the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstantState {
    Quantized {
        array: QuantizedArray,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<TensorData>,
    },
    Float(TensorData),
}

/// Everything needed to rebuild a [`QuantizedOp`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpState {
    /// Registry tag, e.g. "Gemm"
    pub type_tag: String,

    pub n_bits: u32,

    /// Constants keyed by input slot index
    #[serde(default)]
    pub constant_inputs: BTreeMap<usize, ConstantState>,

    /// Merged attributes (defaults included)
    #[serde(default)]
    pub attrs: Attrs,

    /// Present once the operator is calibrated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_scale: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_zero_point: Option<i64>,
}

impl QuantizedOp {
    /// Convert to the persisted form
    pub fn to_state(&self) -> OpState {
        let constant_inputs = self
            .constant_inputs()
            .iter()
            .map(|(&index, constant)| {
                let state = match constant {
                    ConstantInput::Quantized(q) => ConstantState::Quantized {
                        array: q.clone(),
                        values: q.original_values().map(TensorData::from_array),
                    },
                    ConstantInput::Float(values) => {
                        ConstantState::Float(TensorData::from_array(values))
                    }
                };
                (index, state)
            })
            .collect();

        let (output_scale, output_zero_point) = match self.state() {
            CalibrationState::Calibrated(params) => (Some(params.scale), Some(params.zero_point)),
            CalibrationState::Uncalibrated => (None, None),
        };

        OpState {
            type_tag: self.tag().to_string(),
            n_bits: self.n_bits(),
            constant_inputs,
            attrs: self.attrs().clone(),
            output_scale,
            output_zero_point,
        }
    }

    /// Rebuild from the persisted form
    ///
    /// Runs the same validation as [`QuantizedOp::new`]; calibration
    /// parameters must be both present or both absent.
    pub fn from_state(state: OpState) -> Result<Self> {
        let constants = state
            .constant_inputs
            .into_iter()
            .map(|(index, constant)| {
                let constant = match constant {
                    ConstantState::Quantized { array, values: None } => {
                        ConstantInput::Quantized(array)
                    }
                    ConstantState::Quantized {
                        array,
                        values: Some(values),
                    } => ConstantInput::Quantized(array.with_original_values(values.to_array()?)?),
                    ConstantState::Float(tensor) => ConstantInput::Float(tensor.to_array()?),
                };
                Ok((InputRef::Index(index), constant))
            })
            .collect::<Result<Vec<_>>>()?;

        let attrs = state
            .attrs
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect::<Vec<_>>();

        let mut op = QuantizedOp::new(&state.type_tag, state.n_bits, constants, attrs)?;

        match (state.output_scale, state.output_zero_point) {
            (Some(scale), Some(zero_point)) => {
                op.restore_calibration(QuantParams::new(state.n_bits, scale, zero_point)?)?;
            }
            (None, None) => {}
            _ => {
                return Err(Error::StateError(format!(
                    "{}: output_scale and output_zero_point must be saved together",
                    state.type_tag
                )))
            }
        }

        Ok(op)
    }
}
