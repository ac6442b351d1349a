//! State I/O - saving and loading calibrated operators and pipelines
//!
//! JSON and YAML are supported; the format is chosen from the file extension
//! on load and from [`SaveConfig`] on save.

mod format;
mod load;
mod save;


pub use format::{ModelFormat, SaveConfig};
pub use load::{load_pipeline, load_state, load_tensor};
pub use save::{save_pipeline, save_state};
