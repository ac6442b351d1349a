//! # Cuantizar: Quantized Operators with Integer-Domain Gemm
//!
//! Cuantizar provides affine-quantized tensors, a static registry of operator
//! schemas, and a calibrate-then-apply protocol that turns float reference
//! implementations into quantized operators. Gemm-class operators run an
//! integer matmul with a single float rescale per output element.
//!
//! ## Architecture
//!
//! - **quant**: `QuantizedArray`, min/max calibration, error analysis
//! - **ops**: Operator registry, `QuantizedOp`, integer Gemm/Linear
//! - **pipeline**: Sequential calibrate/apply chains
//! - **config**: Declarative YAML pipeline configuration
//! - **io**: State saving and loading (JSON, YAML formats)
//!
//! ## Example
//!
//! ```
//! use cuantizar::{QuantizedArray, QuantizedOp};
//! use ndarray::array;
//!
//! let weights = QuantizedArray::quantize(array![[1.0, 0.0], [0.0, 1.0]], 8)?;
//! let mut linear = QuantizedOp::linear(8, weights, None)?;
//!
//! let x = array![[1.0, 2.0], [3.0, 4.0]];
//! linear.calibrate(&[x.clone().into_dyn()])?;
//!
//! let qx = QuantizedArray::quantize(x, 8)?;
//! let y = linear.apply(&[&qx])?;
//! assert_eq!(y.shape(), &[2, 2]);
//! # Ok::<(), cuantizar::Error>(())
//! ```

pub mod config;
pub mod io;
pub mod ops;
pub mod pipeline;
pub mod quant;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ops::{AttrValue, ConstantInput, InputRef, QuantizedOp};
pub use pipeline::QuantizedPipeline;
pub use quant::{QuantParams, QuantizedArray};
