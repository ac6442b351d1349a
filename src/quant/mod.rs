//! Affine quantization primitives
//!
//! - [`QuantizedArray`]: integer tensor + scale/zero-point, the unit of exchange
//!   between quantized operators
//! - [`QuantParams`]: min/max calibration and half-to-even rounding
//! - Error analysis against the originating float values
//! - [`TensorData`]: serializable `{shape, data}` float tensors

mod array;
mod calibration;
mod error_analysis;
mod tensor;

pub use array::{QuantizedArray, QuantizedArrayState};
pub use calibration::{
    calibrate_min_max, check_n_bits, qmax, round_half_even, QuantParams, MAX_N_BITS,
    STABILITY_EPSILON,
};
pub use error_analysis::{
    analyze_error, error_within_bounds, theoretical_max_error, theoretical_sqnr, QuantErrorStats,
};
pub use tensor::TensorData;
