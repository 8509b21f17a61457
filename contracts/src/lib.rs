//! Smart contracts: pure validation and computation over ledger state.
//!
//! - [`ModelUpdateValidator`]: decides whether a submitted update may be recorded
//! - [`RewardDistributor`]: converts a contribution into tokens, builds the leaderboard
//! - [`AuditLogger`]: writes audit events and answers audit-trail queries
//!
//! Contracts own no storage. Each holds a handle to the shared [`Ledger`].
//!
//! [`Ledger`]: corechain_ledger::Ledger

pub mod audit;
pub mod error;
pub mod reward;
pub mod validator;

pub use audit::{AuditLogger, AuditQuery, TrainingSummary};
pub use error::ValidationError;
pub use reward::{calculate_reward, LeaderboardEntry, RewardClaim, RewardDistributor};
pub use validator::{ModelUpdateValidator, UpdateClaim};

/// A named unit of ledger logic.
pub trait SmartContract {
    type Input;
    type Output;

    fn name(&self) -> &'static str;

    fn execute(&self, input: Self::Input) -> Self::Output;
}
