use corechain_contracts::ValidationError;
use corechain_crypto::CodecError;
use corechain_ledger::LedgerError;
use thiserror::Error;

use crate::aggregation::AggregationError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Decryption failed: {0}")]
    Decryption(#[from] CodecError),

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("round {round} has already been aggregated")]
    RoundClosed { round: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("{0}")]
    Internal(String),
}
