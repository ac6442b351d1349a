//! Quantization Error Analysis
//!
//! Measures how far a [`QuantizedArray`] drifts from the float tensor it
//! represents:
//! - MSE / MAE / maximum absolute error
//! - Signal-to-Quantization-Noise Ratio
//! - Comparison against the theoretical half-step bound

use super::array::QuantizedArray;
use super::calibration::QuantParams;
use crate::error::{Error, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Error statistics for quantization analysis
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuantErrorStats {
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Maximum absolute error
    pub max_error: f64,
    /// Signal-to-Quantization-Noise Ratio (SQNR) in dB
    pub sqnr_db: f64,
    /// Number of samples
    pub num_samples: usize,
}

impl QuantErrorStats {
    /// Root Mean Squared Error
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Compare float values against their quantized representation
pub fn analyze_error(original: &ArrayD<f64>, quantized: &QuantizedArray) -> Result<QuantErrorStats> {
    if original.shape() != quantized.shape() {
        return Err(Error::ShapeMismatch {
            expected: original.shape().to_vec(),
            got: quantized.shape().to_vec(),
        });
    }
    if original.is_empty() {
        return Ok(QuantErrorStats::default());
    }

    let dequantized = quantized.dequant();
    let n = original.len() as f64;

    let (sum_sq, sum_abs, max_error, signal) = original.iter().zip(dequantized.iter()).fold(
        (0.0, 0.0, 0.0f64, 0.0),
        |(sq, abs, max, sig), (&o, &d)| {
            let e = (o - d).abs();
            (sq + e * e, abs + e, max.max(e), sig + o * o)
        },
    );

    let mse = sum_sq / n;
    let signal_power = signal / n;
    let sqnr_db = if mse > 1e-20 {
        10.0 * (signal_power / mse).log10()
    } else {
        f64::INFINITY
    };

    Ok(QuantErrorStats {
        mse,
        mae: sum_abs / n,
        max_error,
        sqnr_db,
        num_samples: original.len(),
    })
}

/// Largest rounding error inside the calibration range: half a step
pub fn theoretical_max_error(params: &QuantParams) -> f64 {
    params.scale / 2.0
}

/// Theoretical SQNR for uniform b-bit quantization: 6.02 * b + 1.76 dB
pub fn theoretical_sqnr(n_bits: u32) -> f64 {
    6.02 * n_bits as f64 + 1.76
}

/// Check the measured maximum error against the half-step bound
pub fn error_within_bounds(stats: &QuantErrorStats, params: &QuantParams, tolerance: f64) -> bool {
    stats.max_error <= theoretical_max_error(params) * (1.0 + tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(100))]

        #[test]
        fn prop_calibrated_error_within_bounds(
            data in prop::collection::vec(-10.0f64..10.0, 2..64),
            n_bits in 2u32..13,
        ) {
            let values = arr1(&data).into_dyn();
            let q = QuantizedArray::quantize(values.clone(), n_bits).unwrap();
            let stats = analyze_error(&values, &q).unwrap();
            prop_assert!(error_within_bounds(&stats, &q.params(), 1e-6));
        }

        #[test]
        fn prop_more_bits_less_error(
            data in prop::collection::vec(-10.0f64..10.0, 16..64),
        ) {
            let values = arr1(&data).into_dyn();
            let q4 = QuantizedArray::quantize(values.clone(), 4).unwrap();
            let q12 = QuantizedArray::quantize(values.clone(), 12).unwrap();
            let e4 = analyze_error(&values, &q4).unwrap();
            let e12 = analyze_error(&values, &q12).unwrap();
            prop_assert!(e12.max_error <= e4.max_error + 1e-12);
        }
    }

    #[test]
    fn test_exact_values_have_zero_error() {
        let values = arr1(&[0.0, 1.0, 2.0, 3.0]).into_dyn();
        let q = QuantizedArray::quantize(values.clone(), 2).unwrap();
        let stats = analyze_error(&values, &q).unwrap();

        assert_abs_diff_eq!(stats.mse, 0.0, epsilon = 1e-20);
        assert_eq!(stats.num_samples, 4);
        assert!(stats.sqnr_db.is_infinite());
    }

    #[test]
    fn test_shape_mismatch() {
        let values = arr1(&[0.0, 1.0]).into_dyn();
        let q = QuantizedArray::quantize(arr1(&[0.0, 1.0, 2.0]), 8).unwrap();
        assert!(matches!(
            analyze_error(&values, &q),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_theoretical_values() {
        let params = QuantParams::new(8, 0.5, 0).unwrap();
        assert_abs_diff_eq!(theoretical_max_error(&params), 0.25);
        assert_abs_diff_eq!(theoretical_sqnr(8), 49.92, epsilon = 1e-9);
    }

    #[test]
    fn test_rmse() {
        let stats = QuantErrorStats {
            mse: 4.0,
            ..Default::default()
        };
        assert_abs_diff_eq!(stats.rmse(), 2.0);
    }
}
