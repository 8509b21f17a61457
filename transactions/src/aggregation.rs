//! Model aggregation: a round reached quorum and a new global model was produced.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelAggregationTx {
    pub round: u64,
    /// Sample-weighted mean of the participants' local accuracy.
    pub global_accuracy: f64,
    /// Sample-weighted mean of the participants' local loss.
    pub global_loss: f64,
    pub participants: u32,
    pub total_samples: u64,
}
