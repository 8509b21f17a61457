use corechain_transactions::TransactionError;
use corechain_work::WorkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("mining failed: {0}")]
    Work(#[from] WorkError),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("chain has no blocks")]
    EmptyChain,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The first validation failure found while walking the chain.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("chain has no blocks")]
    Empty,

    #[error("genesis block is malformed: {reason}")]
    BadGenesis { reason: String },

    #[error("block {index}: index field reads {found}")]
    IndexMismatch { index: u64, found: u64 },

    #[error("block {index}: stored hash does not match its contents")]
    HashMismatch { index: u64 },

    #[error("block {index}: previous_hash does not match the preceding block")]
    BrokenLink { index: u64 },

    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: u64, difficulty: u32 },
}

impl IntegrityError {
    /// Position of the offending block, if the failure concerns one.
    pub fn block_index(&self) -> Option<u64> {
        match self {
            Self::Empty => None,
            Self::BadGenesis { .. } => Some(0),
            Self::IndexMismatch { index, .. }
            | Self::HashMismatch { index }
            | Self::BrokenLink { index }
            | Self::InsufficientWork { index, .. } => Some(*index),
        }
    }
}
