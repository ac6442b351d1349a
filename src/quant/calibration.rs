//! Min-max calibration of affine quantization parameters
//!
//! Computes `(scale, zero_point)` for the unsigned range `[0, 2^n_bits - 1]`
//! from the observed minimum and maximum of representative data:
//!
//! ```text
//! scale      = (max - min) / (2^n_bits - 1)
//! zero_point = clip(round(-min / scale), 0, 2^n_bits - 1)
//! q          = clip(round(v / scale + zero_point), 0, 2^n_bits - 1)
//! ```
//!
//! The observed range is always widened to contain `0.0`, so the zero point
//! never needs clipping and real zero is exactly representable. Rounding is
//! round-half-to-even everywhere, matching the `rint` convention expected by
//! downstream table-lookup compilers.

use crate::error::{Error, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Largest supported bit-width. Keeps Gemm accumulators inside `i64`.
pub const MAX_N_BITS: u32 = 24;

/// Scale substituted when the calibration range collapses to zero width.
pub const STABILITY_EPSILON: f64 = 1e-6;

/// Round half to even (banker's rounding)
#[inline]
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}

/// Largest representable quantized value for `n_bits`
#[inline]
pub fn qmax(n_bits: u32) -> i64 {
    (1i64 << n_bits) - 1
}

/// Reject bit-widths outside `[1, MAX_N_BITS]`
pub fn check_n_bits(n_bits: u32) -> Result<()> {
    if n_bits < 1 || n_bits > MAX_N_BITS {
        return Err(Error::RangeError(format!(
            "n_bits must be in [1, {MAX_N_BITS}], got {n_bits}"
        )));
    }
    Ok(())
}

/// Affine quantization parameters for one tensor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    /// Bit-width of the quantized range
    pub n_bits: u32,
    /// Real value of one quantization step
    pub scale: f64,
    /// Quantized value representing real zero
    pub zero_point: i64,
}

impl QuantParams {
    /// Create validated parameters
    pub fn new(n_bits: u32, scale: f64, zero_point: i64) -> Result<Self> {
        check_n_bits(n_bits)?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::RangeError(format!(
                "scale must be finite and positive, got {scale}"
            )));
        }
        let qmax = qmax(n_bits);
        if !(0..=qmax).contains(&zero_point) {
            return Err(Error::RangeError(format!(
                "zero_point {zero_point} outside [0, {qmax}] for {n_bits} bits"
            )));
        }
        Ok(Self {
            n_bits,
            scale,
            zero_point,
        })
    }

    /// Compute parameters covering `[min, max]` (widened to include zero)
    pub fn from_range(min: f64, max: f64, n_bits: u32) -> Result<Self> {
        check_n_bits(n_bits)?;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(Error::RangeError(format!(
                "invalid calibration range [{min}, {max}]"
            )));
        }

        let min = min.min(0.0);
        let max = max.max(0.0);
        let qmax = qmax(n_bits);

        let range = max - min;
        let scale = if range < STABILITY_EPSILON {
            tracing::warn!(min, max, "degenerate calibration range, substituting epsilon scale");
            STABILITY_EPSILON
        } else {
            range / qmax as f64
        };

        let zero_point = (round_half_even(-min / scale) as i64).clamp(0, qmax);

        Self::new(n_bits, scale, zero_point)
    }

    /// Largest quantized value
    pub fn qmax(&self) -> i64 {
        qmax(self.n_bits)
    }

    /// Quantize one real value, clipping to the representable range
    #[inline]
    pub fn quantize_value(&self, value: f64) -> i64 {
        let q = round_half_even(value / self.scale + self.zero_point as f64);
        q.clamp(0.0, self.qmax() as f64) as i64
    }

    /// Dequantize one integer value
    #[inline]
    pub fn dequantize_value(&self, q: i64) -> f64 {
        self.scale * (q - self.zero_point) as f64
    }

    /// Quantize every element
    pub fn quantize(&self, values: &ArrayD<f64>) -> ArrayD<i64> {
        values.mapv(|v| self.quantize_value(v))
    }

    /// Dequantize every element
    pub fn dequantize(&self, qvalues: &ArrayD<i64>) -> ArrayD<f64> {
        qvalues.mapv(|q| self.dequantize_value(q))
    }
}

/// Min-max calibration over a tensor of samples
pub fn calibrate_min_max(values: &ArrayD<f64>, n_bits: u32) -> Result<QuantParams> {
    if values.is_empty() {
        return Err(Error::RangeError(
            "cannot calibrate quantization on an empty array".to_string(),
        ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::RangeError(format!(
            "calibration samples must be finite, found {bad}"
        )));
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    QuantParams::from_range(min, max, n_bits)
}
