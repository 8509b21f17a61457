use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("difficulty {requested} exceeds the maximum of {maximum} hex digits")]
    InvalidDifficulty { requested: u32, maximum: u32 },

    #[error("work generation cancelled")]
    Cancelled,

    #[error("work generation exceeded its deadline")]
    TimedOut,

    #[error("nonce space exhausted without a valid hash")]
    Exhausted,
}
