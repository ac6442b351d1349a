//! Quantized operators
//!
//! Every operator type is described once in a static registry (input slots,
//! typed attribute defaults, float reference implementation). A
//! [`QuantizedOp`] instantiates one registry entry, binds constant inputs,
//! calibrates its output quantization on sample data and then runs on
//! [`QuantizedArray`](crate::QuantizedArray) inputs.

mod attrs;
mod gemm;
mod quantized_op;
pub mod reference;
mod registry;
mod schema;
mod state;


pub use attrs::{AttrValue, Attrs};
pub use gemm::{integer_matmul, GemmTerms};
pub use quantized_op::{CalibrationState, ConstantInput, InputRef, OpBuilder, QuantizedOp};
pub use reference::ReferenceImpl;
pub use registry::{is_registered, lookup, registered_ops, Execution, OpDescriptor};
pub use schema::{AttrSpec, InputSpec, OpSchema};
pub use state::{ConstantState, OpState};
