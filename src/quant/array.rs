//! Affine-quantized tensor
//!
//! A [`QuantizedArray`] is the unit of exchange between operators: an integer
//! array in `[0, 2^n_bits - 1]` plus the `(scale, zero_point)` mapping back to
//! real values, `value ≈ scale * (qvalue - zero_point)`.

use super::calibration::{calibrate_min_max, qmax, QuantParams};
use crate::error::{Error, Result};
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Immutable affine-quantized tensor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "QuantizedArrayState", try_from = "QuantizedArrayState")]
pub struct QuantizedArray {
    params: QuantParams,
    qvalues: ArrayD<i64>,
    /// Originating float values, when the array was built from floats
    values: Option<ArrayD<f64>>,
}

impl QuantizedArray {
    /// Quantize float values, computing scale and zero point from their min/max
    ///
    /// # Example
    ///
    /// ```
    /// use cuantizar::QuantizedArray;
    /// use ndarray::array;
    ///
    /// let q = QuantizedArray::quantize(array![0.0, 0.5, 1.0], 8)?;
    /// assert_eq!(q.qvalues().as_slice().unwrap(), &[0, 128, 255]);
    /// # Ok::<(), cuantizar::Error>(())
    /// ```
    pub fn quantize<D: Dimension>(values: Array<f64, D>, n_bits: u32) -> Result<Self> {
        let values = values.into_dyn();
        let params = calibrate_min_max(&values, n_bits)?;
        Ok(Self {
            qvalues: params.quantize(&values),
            params,
            values: Some(values),
        })
    }

    /// Quantize float values with already known parameters
    pub fn quantize_with_params<D: Dimension>(
        values: Array<f64, D>,
        params: QuantParams,
    ) -> Result<Self> {
        let values = values.into_dyn();
        if let Some(bad) = values.iter().find(|v| v.is_nan()) {
            return Err(Error::RangeError(format!("cannot quantize {bad}")));
        }
        Ok(Self {
            qvalues: params.quantize(&values),
            params,
            values: Some(values),
        })
    }

    /// Wrap integer values with an explicit scale and zero point
    ///
    /// Every qvalue must already lie in `[0, 2^n_bits - 1]`; out-of-range
    /// integers are rejected rather than wrapped.
    pub fn from_quantized<D: Dimension>(
        qvalues: Array<i64, D>,
        scale: f64,
        zero_point: i64,
        n_bits: u32,
    ) -> Result<Self> {
        let params = QuantParams::new(n_bits, scale, zero_point)?;
        Self::from_quantized_with_params(qvalues, params)
    }

    pub(crate) fn from_quantized_with_params<D: Dimension>(
        qvalues: Array<i64, D>,
        params: QuantParams,
    ) -> Result<Self> {
        let qvalues = qvalues.into_dyn();
        let qmax = qmax(params.n_bits);
        if let Some(bad) = qvalues.iter().find(|q| !(0..=qmax).contains(*q)) {
            return Err(Error::RangeError(format!(
                "qvalue {bad} outside [0, {qmax}] for {} bits",
                params.n_bits
            )));
        }
        Ok(Self {
            params,
            qvalues,
            values: None,
        })
    }

    /// Real values reconstructed from the integers: `scale * (q - zero_point)`
    pub fn dequant(&self) -> ArrayD<f64> {
        self.params.dequantize(&self.qvalues)
    }

    /// Originating floats if known, otherwise the dequantized values
    pub fn values(&self) -> Cow<'_, ArrayD<f64>> {
        match &self.values {
            Some(values) => Cow::Borrowed(values),
            None => Cow::Owned(self.dequant()),
        }
    }

    /// Originating floats, when the array was built from them
    pub(crate) fn original_values(&self) -> Option<&ArrayD<f64>> {
        self.values.as_ref()
    }

    /// Reattach the floats this array was quantized from
    pub(crate) fn with_original_values(mut self, values: ArrayD<f64>) -> Result<Self> {
        if values.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: values.shape().to_vec(),
            });
        }
        self.values = Some(values);
        Ok(self)
    }

    /// Quantize new floats using this array's scale, zero point and bit-width
    pub fn requantize<D: Dimension>(&self, values: Array<f64, D>) -> Result<Self> {
        Self::quantize_with_params(values, self.params)
    }

    pub fn qvalues(&self) -> &ArrayD<i64> {
        &self.qvalues
    }

    pub fn params(&self) -> QuantParams {
        self.params
    }

    pub fn n_bits(&self) -> u32 {
        self.params.n_bits
    }

    pub fn scale(&self) -> f64 {
        self.params.scale
    }

    pub fn zero_point(&self) -> i64 {
        self.params.zero_point
    }

    pub fn shape(&self) -> &[usize] {
        self.qvalues.shape()
    }

    pub fn len(&self) -> usize {
        self.qvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qvalues.is_empty()
    }

    /// Convert to the persisted form
    pub fn to_state(&self) -> QuantizedArrayState {
        QuantizedArrayState {
            n_bits: self.params.n_bits,
            scale: self.params.scale,
            zero_point: self.params.zero_point,
            shape: self.qvalues.shape().to_vec(),
            qvalues: self.qvalues.iter().copied().collect(),
        }
    }

    /// Restore from the persisted form, re-validating every invariant
    pub fn from_state(state: QuantizedArrayState) -> Result<Self> {
        let expected: usize = state.shape.iter().product();
        if expected != state.qvalues.len() {
            return Err(Error::ShapeMismatch {
                expected: state.shape,
                got: vec![state.qvalues.len()],
            });
        }
        let qvalues = ArrayD::from_shape_vec(IxDyn(&state.shape), state.qvalues)
            .map_err(|e| Error::Serialization(format!("invalid qvalues layout: {e}")))?;
        Self::from_quantized(qvalues, state.scale, state.zero_point, state.n_bits)
    }
}

/// Serializable form: `{n_bits, scale, zero_point, shape, qvalues}` (row-major)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizedArrayState {
    pub n_bits: u32,
    pub scale: f64,
    pub zero_point: i64,
    pub shape: Vec<usize>,
    pub qvalues: Vec<i64>,
}

impl From<QuantizedArray> for QuantizedArrayState {
    fn from(array: QuantizedArray) -> Self {
        array.to_state()
    }
}

impl TryFrom<QuantizedArrayState> for QuantizedArray {
    type Error = Error;

    fn try_from(state: QuantizedArrayState) -> Result<Self> {
        Self::from_state(state)
    }
}
