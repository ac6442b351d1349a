//! Declarative YAML pipeline configuration
//!
//! # Example
//!
//! ```yaml
//! input_n_bits: 8
//! n_bits: 8
//! layers:
//!   - op: Gemm
//!     attrs: { transB: 1 }
//!     constants:
//!       b: { shape: [2, 2], data: [1, 0, 0, 1] }
//!       c: { shape: [2], data: [0.5, -0.5], quantize: false }
//!   - op: Relu
//! ```

mod builder;
mod cli;
mod load;
mod schema;
mod validate;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod property_tests;

pub use builder::{build_op, build_pipeline};
pub use cli::{parse_args, CalibrateArgs, Cli, Command, RunArgs, ValidateArgs};
pub use load::{load_config, parse_config};
pub use schema::{ConstantSpec, LayerSpec, PipelineSpec};
pub use validate::{validate_config, ValidationError};
