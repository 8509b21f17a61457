//! Proof-of-work for sealing ledger blocks.
//!
//! A block is sealed once the SHA-256 of its canonical serialization starts
//! with `difficulty` zero hex digits. The search is CPU-bound, parallel across
//! all cores, and can be bounded by a cancellation token or a deadline.

pub mod cancel;
pub mod difficulty;
pub mod error;
pub mod generator;
pub mod template;

pub use cancel::CancelToken;
pub use difficulty::{meets_difficulty, MAX_DIFFICULTY};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use template::PowTemplate;

/// The result of a successful proof-of-work search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkSolution {
    pub nonce: u64,
    pub hash: [u8; 32],
}
