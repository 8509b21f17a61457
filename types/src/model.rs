//! Model weight tensors exchanged between hospitals and the coordinator.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// One layer of a model: a flat value buffer plus its logical shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerTensor {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl LayerTensor {
    /// Build a tensor, checking that the shape covers exactly `values.len()` elements.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, TypesError> {
        if Self::element_count(&shape) != Some(values.len()) {
            return Err(TypesError::ShapeMismatch {
                shape,
                values: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Number of elements a tensor of `shape` holds, or `None` if that
    /// overflows `usize`.
    pub fn element_count(shape: &[usize]) -> Option<usize> {
        shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    /// A one-dimensional tensor.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered per-layer weights of a model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelWeights(pub Vec<LayerTensor>);

impl ModelWeights {
    pub fn new(layers: Vec<LayerTensor>) -> Self {
        Self(layers)
    }

    pub fn layers(&self) -> &[LayerTensor] {
        &self.0
    }

    pub fn layer_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both models have the same number of layers with identical shapes.
    pub fn same_layout(&self, other: &ModelWeights) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.shape == b.shape)
    }

    /// Total number of scalar parameters across all layers.
    pub fn parameter_count(&self) -> usize {
        self.0.iter().map(LayerTensor::len).sum()
    }
}
