//! Reward distribution: tokens credited to a hospital for one round.

use corechain_types::HospitalId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardDistributionTx {
    pub hospital_id: HospitalId,
    pub round: u64,
    /// Rounded to two decimal places.
    pub reward_tokens: f64,
    pub accuracy: f64,
    pub samples_contributed: u64,
}
