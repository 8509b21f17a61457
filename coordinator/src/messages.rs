//! Request and response messages exchanged with hospitals.
//!
//! Field names follow the wire contract hospitals already speak, so failure
//! responses carry empty strings and zero counts rather than omitted fields.

use corechain_types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub hospital_id: String,
    pub hospital_name: String,
    pub dataset_size: u64,
    pub dataset_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    /// Hex-encoded weight-protection public key.
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateSubmission {
    pub hospital_id: String,
    pub round: u64,
    /// Protected payload produced by `corechain_crypto::encrypt`.
    pub encrypted_weights: Vec<u8>,
    pub samples_trained: i64,
    pub local_accuracy: f64,
    pub local_loss: f64,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub current_round: u64,
    /// Updates buffered for the submitted round after this one was accepted.
    pub total_participants: u64,
    /// Hex hash of the recorded MODEL_UPDATE transaction, empty on failure.
    pub transaction_hash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalModelRequest {
    pub hospital_id: String,
    #[serde(default)]
    pub round: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalModelResponse {
    /// 0 when no round has been aggregated yet.
    pub round_number: u64,
    /// bincode-encoded `ModelWeights`, empty when no model exists.
    pub model_weights: Vec<u8>,
    pub global_accuracy: f64,
    pub global_loss: f64,
    pub total_samples: u64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatusRequest {
    pub hospital_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub current_round: u64,
    pub total_rounds: u64,
    pub connected_hospitals: u64,
    pub global_accuracy: f64,
    pub global_loss: f64,
    pub is_training: bool,
    /// "unknown" before two rounds have closed, "complete" once training is done.
    pub next_round_eta: String,
}
