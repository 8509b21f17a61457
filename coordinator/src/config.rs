//! Coordinator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use corechain_types::ProtocolParams;
use corechain_utils::LogFormat;
use corechain_work::MAX_DIFFICULTY;

use crate::CoordinatorError;

/// Configuration for a coordinator instance.
///
/// Can be loaded from a TOML file via [`CoordinatorConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Submissions per round that trigger aggregation.
    #[serde(default = "default_min_clients")]
    pub min_clients: usize,

    /// Rounds after which training is considered complete.
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u64,

    /// Leading zero hex digits required of every sealed block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,

    /// Pending transactions that trigger automatic sealing.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on one proof-of-work search. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mining_timeout_ms: Option<u64>,

    /// Upper bound on decoding one submitted payload in the async service.
    #[serde(default = "default_decode_timeout_ms")]
    pub decode_timeout_ms: u64,

    /// Leading values per layer that hospitals encrypt.
    #[serde(default = "default_encrypted_sample_size")]
    pub encrypted_sample_size: usize,

    /// Participation reward per round, in tokens.
    #[serde(default = "default_base_reward")]
    pub base_reward: f64,

    /// Where the chain is persisted.
    #[serde(default = "default_chain_file")]
    pub chain_file: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_min_clients() -> usize {
    2
}

fn default_total_rounds() -> u64 {
    10
}

fn default_difficulty() -> u32 {
    ProtocolParams::corechain_defaults().difficulty
}

fn default_batch_size() -> usize {
    ProtocolParams::corechain_defaults().batch_size
}

fn default_decode_timeout_ms() -> u64 {
    5_000
}

fn default_encrypted_sample_size() -> usize {
    ProtocolParams::corechain_defaults().encrypted_sample_size
}

fn default_base_reward() -> f64 {
    ProtocolParams::corechain_defaults().base_reward
}

fn default_chain_file() -> PathBuf {
    PathBuf::from("./corechain_data/blockchain.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoordinatorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CoordinatorError> {
        let config: Self = toml::from_str(s).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("CoordinatorConfig is always serializable to TOML")
    }

    /// Reject values the coordinator cannot run with.
    pub fn check(&self) -> Result<(), CoordinatorError> {
        if self.min_clients == 0 {
            return Err(CoordinatorError::Config("min_clients must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(CoordinatorError::Config("batch_size must be at least 1".into()));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(CoordinatorError::Config(format!(
                "difficulty {} exceeds the maximum of {MAX_DIFFICULTY}",
                self.difficulty
            )));
        }
        Ok(())
    }

    /// Ledger and contract parameters derived from this configuration.
    pub fn protocol_params(&self) -> ProtocolParams {
        ProtocolParams {
            difficulty: self.difficulty,
            batch_size: self.batch_size,
            mining_timeout_ms: self.mining_timeout_ms,
            base_reward: self.base_reward,
            encrypted_sample_size: self.encrypted_sample_size,
            ..ProtocolParams::corechain_defaults()
        }
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_clients: default_min_clients(),
            total_rounds: default_total_rounds(),
            difficulty: default_difficulty(),
            batch_size: default_batch_size(),
            mining_timeout_ms: None,
            decode_timeout_ms: default_decode_timeout_ms(),
            encrypted_sample_size: default_encrypted_sample_size(),
            base_reward: default_base_reward(),
            chain_file: default_chain_file(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
