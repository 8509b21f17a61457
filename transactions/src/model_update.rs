//! Model update: one hospital's accepted contribution to a training round.

use corechain_types::HospitalId;
use serde::{Deserialize, Serialize};

/// Metrics of a locally trained update. The weights themselves are not recorded.
///
/// At most one of these exists per `(hospital_id, round)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelUpdateTx {
    pub hospital_id: HospitalId,
    pub round: u64,
    pub accuracy: f64,
    pub loss: f64,
    pub samples_trained: u64,
}
