//! Error types for Cuantizar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Invalid rank: expected a 1-D or 2-D array, got shape {0:?}")]
    InvalidRank(Vec<usize>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Arity error: expected between {min} and {max} inputs and constants, got {got}"
    )]
    ArityError { min: usize, max: usize, got: usize },

    #[error("State error: {0}")]
    StateError(String),

    #[error("Range error: {0}")]
    RangeError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
