use corechain_types::HospitalId;
use thiserror::Error;

/// Why a model update was refused. Terminal for that submission.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Hospital {0} not registered")]
    NotRegistered(HospitalId),

    #[error("Invalid accuracy: {0} (must be 0-1)")]
    InvalidAccuracy(f64),

    #[error("Invalid samples count: {0}")]
    InvalidSamples(i64),

    #[error("Invalid loss: {0} (must be finite)")]
    InvalidLoss(f64),

    #[error("Hospital {hospital_id} already submitted update for round {round}")]
    Duplicate { hospital_id: HospitalId, round: u64 },

    #[error("Layer mismatch: {0}")]
    LayerMismatch(String),
}
