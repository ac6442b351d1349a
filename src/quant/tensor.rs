//! Plain float tensor in serializable `{shape, data}` form

use crate::error::{Error, Result};
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

/// Row-major float tensor as it appears in config and state files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl TensorData {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self { shape, data }
    }

    pub fn from_array<D: Dimension>(array: &Array<f64, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Rebuild the array; the element count must match the shape
    pub fn to_array(&self) -> Result<ArrayD<f64>> {
        if self.num_elements() != self.data.len() {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: vec![self.data.len()],
            });
        }
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone())
            .map_err(|e| Error::Serialization(format!("invalid tensor layout: {e}")))
    }
}
