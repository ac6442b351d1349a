//! Integer-domain Gemm / Linear
//!
//! With `x ≈ x_s (x_q - x_z)` and `w ≈ w_s (w_q - w_z)`, the product splits
//! into a pure integer part and a single float rescale:
//!
//! ```text
//! x @ w = x_s w_s [ x_q @ w_q - w_z Σ_k x_q - x_z Σ_k w_q + p x_z w_z ]
//! y_q   = clip(round(out_z + (x_s w_s / out_s) * combined + bias_term))
//! ```
//!
//! Everything inside the brackets stays integer. The final multiply-add is the
//! only float operation per output element, positioned so that a circuit
//! compiler can fuse it with the lookup table of the next activation.

use super::attrs::Attrs;
use super::quantized_op::{ConstantInput, QuantizedOp, Slot};
use super::reference::as_matrix;
use crate::error::{Error, Result};
use crate::quant::{qmax, round_half_even, QuantParams, QuantizedArray};
use ndarray::{Array2, ArrayD, ArrayView2, Axis};
use std::collections::BTreeMap;

const WEIGHTS_SLOT: usize = 1;

/// Reject configurations the integer algorithm cannot express
pub(crate) fn validate_config(
    tag: &str,
    attrs: &Attrs,
    constants: &BTreeMap<usize, ConstantInput>,
) -> Result<()> {
    let alpha = attrs.get_f64("alpha")?;
    let beta = attrs.get_f64("beta")?;
    if alpha != 1.0 || !(beta == 0.0 || beta == 1.0) {
        return Err(Error::ConfigError(format!(
            "{tag} only supports alpha == 1 and beta in [0, 1], got alpha == {alpha} and beta == {beta}"
        )));
    }
    attrs.get_i64("transA")?;
    attrs.get_i64("transB")?;

    match constants.get(&WEIGHTS_SLOT) {
        Some(ConstantInput::Quantized(_)) => Ok(()),
        Some(ConstantInput::Float(_)) => Err(Error::ConfigError(format!(
            "{tag} requires quantized weights for the 'b' constant input"
        ))),
        None => Err(Error::ConfigError(format!(
            "{tag} requires the weights to be provided as the 'b' constant input"
        ))),
    }
}

/// Integer region of a quantized Gemm and the float multiplier applied to it
#[derive(Clone, Debug, PartialEq)]
pub struct GemmTerms {
    /// `Σ (x_q - x_z)(w_q - w_z)`, computed without leaving integers
    pub combined: Array2<i64>,
    /// `x_s * w_s / out_s`
    pub multiplier: f64,
    /// Bias already expressed in output quantization steps
    pub bias: Option<ArrayD<f64>>,
}

impl GemmTerms {
    /// The fusable float step: `round(out_z + m * combined + bias)` clipped to range
    pub fn rescale(&self, output: QuantParams) -> Result<Array2<i64>> {
        let zero_point = output.zero_point as f64;
        let mut y = self.combined.mapv(|v| zero_point + self.multiplier * v as f64);

        if let Some(bias) = &self.bias {
            let bias = bias.broadcast(y.raw_dim()).ok_or_else(|| Error::ShapeMismatch {
                expected: y.shape().to_vec(),
                got: bias.shape().to_vec(),
            })?;
            y += &bias;
        }

        let qmax = output.qmax() as f64;
        Ok(y.mapv(|v| round_half_even(v).clamp(0.0, qmax) as i64))
    }
}

/// Integer-only core: `x_q @ w_q - w_z rowsum(x_q) - x_z colsum(w_q) + p x_z w_z`
pub fn integer_matmul(
    x_q: ArrayView2<'_, i64>,
    x_z: i64,
    w_q: ArrayView2<'_, i64>,
    w_z: i64,
) -> Array2<i64> {
    let p = w_q.nrows();

    let matmul = x_q.dot(&w_q);

    let ones = Array2::<i64>::ones((p, 1));
    let row_correction = x_q.dot(&ones) * w_z;
    let combined = &matmul - &row_correction;

    let col_correction = w_q.sum_axis(Axis(0)).insert_axis(Axis(0)) * x_z;
    let cross_term = p as i64 * x_z * w_z;

    combined + cross_term - &col_correction
}

fn quantized_slot<'a>(
    slot: Option<&Slot<'a, &'a QuantizedArray>>,
    tag: &str,
    name: &str,
) -> Result<Option<&'a QuantizedArray>> {
    match slot {
        None => Ok(None),
        Some(&Slot::Runtime(q)) => Ok(Some(q)),
        Some(&Slot::Constant(constant)) => match constant {
            ConstantInput::Quantized(q) => Ok(Some(q)),
            ConstantInput::Float(_) => Err(Error::ConfigError(format!(
                "{tag}: input '{name}' must be quantized"
            ))),
        },
    }
}

fn required_slot<'a>(
    slot: Option<&Slot<'a, &'a QuantizedArray>>,
    tag: &str,
    name: &str,
) -> Result<&'a QuantizedArray> {
    quantized_slot(slot, tag, name)?
        .ok_or_else(|| Error::ConfigError(format!("{tag}: missing input '{name}'")))
}

fn check_accumulator(p: usize, x: &QuantizedArray, w: &QuantizedArray) -> Result<()> {
    let bound = 2 * p as i128 * qmax(x.n_bits()) as i128 * qmax(w.n_bits()) as i128;
    if bound > i64::MAX as i128 {
        return Err(Error::RangeError(format!(
            "integer accumulator would overflow: {p} features at {} x {} bits",
            x.n_bits(),
            w.n_bits()
        )));
    }
    Ok(())
}

impl QuantizedOp {
    /// Split a Gemm forward pass into its integer region and float multiplier
    pub fn gemm_terms(&self, inputs: &[&QuantizedArray]) -> Result<GemmTerms> {
        let tag = self.tag();
        let output = self.output_params()?;
        let attrs = self.attrs();
        let beta = attrs.get_f64("beta")?;
        let trans_a = attrs.get_i64("transA")? != 0;
        let trans_b = attrs.get_i64("transB")? != 0;

        let slots = self.prepare_inputs(inputs.to_vec())?;
        let x = required_slot(slots.first().and_then(Option::as_ref), tag, "a")?;
        let w = required_slot(slots.get(1).and_then(Option::as_ref), tag, "b")?;

        let mut x_q = as_matrix(x.qvalues())?;
        let mut w_q = as_matrix(w.qvalues())?;
        if trans_a {
            x_q = x_q.reversed_axes();
        }
        if trans_b {
            w_q = w_q.reversed_axes();
        }

        let p = w_q.nrows();
        if x_q.ncols() != p {
            return Err(Error::ShapeMismatch {
                expected: vec![x_q.nrows(), p],
                got: vec![x_q.nrows(), x_q.ncols()],
            });
        }
        check_accumulator(p, x, w)?;

        let combined = integer_matmul(x_q, x.zero_point(), w_q, w.zero_point());
        let multiplier = x.scale() * w.scale() / output.scale;

        let bias = match slots.get(2).and_then(Option::as_ref) {
            _ if beta == 0.0 => None,
            None => None,
            Some(&Slot::Constant(ConstantInput::Float(b))) => Some(b.mapv(|v| v / output.scale)),
            slot => quantized_slot(slot, tag, "c")?.map(|b| {
                let ratio = b.scale() / output.scale;
                let zero_point = b.zero_point();
                b.qvalues().mapv(|q| ratio * (q - zero_point) as f64)
            }),
        };

        Ok(GemmTerms {
            combined,
            multiplier,
            bias,
        })
    }
}

/// Quantized forward pass of Gemm-class operators
pub(crate) fn q_impl(
    op: &QuantizedOp,
    inputs: &[&QuantizedArray],
    output: QuantParams,
) -> Result<QuantizedArray> {
    let terms = op.gemm_terms(inputs)?;
    let q_out = terms.rescale(output)?;
    QuantizedArray::from_quantized_with_params(q_out, output)
}
