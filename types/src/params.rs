//! Protocol parameters shared by the ledger, the contracts and the codec.

use serde::{Deserialize, Serialize};

/// Tunable parameters of a CoreChain deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Ledger ───────────────────────────────────────────────────────────
    /// Required number of leading zero hex digits in a sealed block hash.
    pub difficulty: u32,

    /// Pending pool size at which admission triggers sealing.
    pub batch_size: usize,

    /// Upper bound on a single proof-of-work search, in milliseconds.
    /// `None` searches until a nonce is found.
    pub mining_timeout_ms: Option<u64>,

    // ── Rewards ──────────────────────────────────────────────────────────
    /// Participation reward per round, in tokens.
    pub base_reward: f64,

    /// Tokens per unit of local accuracy.
    pub accuracy_bonus: f64,

    /// Tokens per unit of sample share (samples contributed / total samples).
    pub sample_bonus: f64,

    /// Accuracy strictly above which the quality multiplier applies.
    pub quality_threshold: f64,

    /// Multiplier applied to the whole reward after the additive bonuses.
    pub quality_multiplier: f64,

    // ── Weight protection ────────────────────────────────────────────────
    /// Number of leading values per layer that are homomorphically encrypted.
    pub encrypted_sample_size: usize,
}

impl ProtocolParams {
    /// The reference deployment values.
    pub fn corechain_defaults() -> Self {
        Self {
            difficulty: 4,
            batch_size: 5,
            mining_timeout_ms: None,
            base_reward: 10.0,
            accuracy_bonus: 5.0,
            sample_bonus: 5.0,
            quality_threshold: 0.9,
            quality_multiplier: 1.2,
            encrypted_sample_size: 100,
        }
    }

    /// Low difficulty for unit and integration tests.
    pub fn dev_defaults() -> Self {
        Self {
            difficulty: 1,
            ..Self::corechain_defaults()
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::corechain_defaults()
    }
}
