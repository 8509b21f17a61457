//! Sample-weighted averaging of buffered round updates.

use corechain_types::{HospitalId, LayerTensor, ModelWeights, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("no updates buffered for the round")]
    EmptyRound,

    #[error("buffered updates carry zero samples in total")]
    ZeroSamples,

    #[error("hospital {hospital_id} sent {found} layers, expected {expected}")]
    LayerCountMismatch {
        hospital_id: HospitalId,
        expected: usize,
        found: usize,
    },

    #[error("hospital {hospital_id} sent layer {layer} with a different shape")]
    LayerShapeMismatch { hospital_id: HospitalId, layer: usize },
}

/// A decoded, validated submission waiting for its round to close.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferedUpdate {
    pub hospital_id: HospitalId,
    pub weights: ModelWeights,
    pub samples_trained: u64,
    pub local_accuracy: f64,
    pub local_loss: f64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub weights: ModelWeights,
    pub global_accuracy: f64,
    pub global_loss: f64,
    pub total_samples: u64,
}

/// Combine `updates` into one model, each weighted by its share of the
/// round's samples. Accuracy and loss are averaged with the same weights.
///
/// Accumulation happens in `f64`; the result is narrowed to `f32` per value.
pub fn weighted_average(updates: &[BufferedUpdate]) -> Result<Aggregate, AggregationError> {
    let first = updates.first().ok_or(AggregationError::EmptyRound)?;
    check_layouts(&first.weights, updates)?;

    let total_samples: u64 = updates.iter().map(|u| u.samples_trained).sum();
    if total_samples == 0 {
        return Err(AggregationError::ZeroSamples);
    }
    let total = total_samples as f64;

    let mut sums: Vec<Vec<f64>> = first
        .weights
        .layers()
        .iter()
        .map(|layer| vec![0.0; layer.len()])
        .collect();
    let mut accuracy = 0.0;
    let mut loss = 0.0;

    for update in updates {
        let share = update.samples_trained as f64 / total;
        for (sum, layer) in sums.iter_mut().zip(update.weights.layers()) {
            for (acc, &v) in sum.iter_mut().zip(&layer.values) {
                *acc += f64::from(v) * share;
            }
        }
        accuracy += update.local_accuracy * update.samples_trained as f64;
        loss += update.local_loss * update.samples_trained as f64;
    }

    let layers = first
        .weights
        .layers()
        .iter()
        .zip(sums)
        .map(|(template, sum)| LayerTensor {
            shape: template.shape.clone(),
            values: sum.into_iter().map(|v| v as f32).collect(),
        })
        .collect();

    Ok(Aggregate {
        weights: ModelWeights::new(layers),
        global_accuracy: accuracy / total,
        global_loss: loss / total,
        total_samples,
    })
}

fn check_layouts(reference: &ModelWeights, updates: &[BufferedUpdate]) -> Result<(), AggregationError> {
    for update in updates {
        if update.weights.layer_count() != reference.layer_count() {
            return Err(AggregationError::LayerCountMismatch {
                hospital_id: update.hospital_id.clone(),
                expected: reference.layer_count(),
                found: update.weights.layer_count(),
            });
        }
        for (layer, (a, b)) in reference.layers().iter().zip(update.weights.layers()).enumerate() {
            if a.shape != b.shape {
                return Err(AggregationError::LayerShapeMismatch {
                    hospital_id: update.hospital_id.clone(),
                    layer,
                });
            }
        }
    }
    Ok(())
}
