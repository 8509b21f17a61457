//! Token rewards and the leaderboard.

use std::collections::HashMap;
use std::sync::Arc;

use corechain_ledger::Ledger;
use corechain_transactions::TxPayload;
use corechain_types::{HospitalId, ProtocolParams};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SmartContract;

/// One hospital's contribution to a round.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardClaim {
    pub hospital_id: HospitalId,
    pub round: u64,
    pub accuracy: f64,
    pub samples_contributed: u64,
    pub total_samples: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub hospital_id: HospitalId,
    pub total_rewards: f64,
    pub rounds_participated: u64,
    pub total_accuracy: f64,
    pub total_samples: u64,
    pub avg_accuracy: f64,
    pub avg_reward_per_round: f64,
}

/// Reward for one contribution, rounded to two decimal places.
///
/// The additive bonuses are applied first and the quality multiplier last;
/// swapping the order changes the result.
pub fn calculate_reward(
    params: &ProtocolParams,
    accuracy: f64,
    samples_contributed: u64,
    total_samples: u64,
) -> f64 {
    let mut reward = params.base_reward;
    reward += accuracy * params.accuracy_bonus;
    if total_samples > 0 {
        reward += samples_contributed as f64 / total_samples as f64 * params.sample_bonus;
    }
    if accuracy > params.quality_threshold {
        reward *= params.quality_multiplier;
    }
    (reward * 100.0).round() / 100.0
}

pub struct RewardDistributor {
    ledger: Arc<Ledger>,
    params: ProtocolParams,
}

impl RewardDistributor {
    pub fn new(ledger: Arc<Ledger>, params: ProtocolParams) -> Self {
        Self { ledger, params }
    }

    /// Per-hospital totals over every sealed reward, highest total first.
    /// Hospitals with equal totals keep the order of their first reward.
    pub fn get_leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut order: Vec<HospitalId> = Vec::new();
        let mut by_hospital: HashMap<HospitalId, LeaderboardEntry> = HashMap::new();

        self.ledger.read(|chain| {
            for (_, tx) in chain.iter_transactions() {
                let TxPayload::RewardDistribution(r) = &tx.payload else {
                    continue;
                };
                let entry = by_hospital.entry(r.hospital_id.clone()).or_insert_with(|| {
                    order.push(r.hospital_id.clone());
                    LeaderboardEntry {
                        hospital_id: r.hospital_id.clone(),
                        total_rewards: 0.0,
                        rounds_participated: 0,
                        total_accuracy: 0.0,
                        total_samples: 0,
                        avg_accuracy: 0.0,
                        avg_reward_per_round: 0.0,
                    }
                });
                entry.total_rewards += r.reward_tokens;
                entry.rounds_participated += 1;
                entry.total_accuracy += r.accuracy;
                entry.total_samples += r.samples_contributed;
            }
        });

        let mut board: Vec<LeaderboardEntry> = order
            .into_iter()
            .filter_map(|id| by_hospital.remove(&id))
            .map(|mut e| {
                let rounds = e.rounds_participated as f64;
                e.avg_accuracy = e.total_accuracy / rounds;
                e.avg_reward_per_round = e.total_rewards / rounds;
                e
            })
            .collect();
        board.sort_by(|a, b| b.total_rewards.total_cmp(&a.total_rewards));
        board
    }

    pub fn get_hospital_rewards(&self, hospital_id: &HospitalId) -> f64 {
        self.ledger.get_hospital_rewards(hospital_id)
    }
}

impl SmartContract for RewardDistributor {
    type Input = RewardClaim;
    type Output = f64;

    fn name(&self) -> &'static str {
        "RewardDistributor"
    }

    fn execute(&self, claim: RewardClaim) -> f64 {
        let reward = calculate_reward(
            &self.params,
            claim.accuracy,
            claim.samples_contributed,
            claim.total_samples,
        );
        info!(
            hospital_id = %claim.hospital_id,
            round = claim.round,
            accuracy = claim.accuracy,
            samples = claim.samples_contributed,
            reward,
            "reward calculated"
        );
        reward
    }
}
