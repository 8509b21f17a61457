//! Blocks: sealed batches of transactions plus proof-of-work metadata.

use std::time::Instant;

use corechain_crypto::hash_block;
use corechain_transactions::Transaction;
use corechain_types::{canonical_json, BlockHash, Timestamp};
use corechain_work::{meets_difficulty, CancelToken, PowTemplate, WorkError, WorkGenerator};
use serde::{Deserialize, Serialize};

/// A block in the hash-linked chain.
///
/// `hash` is the SHA-256 of the canonical JSON of every other field. The
/// persisted `hash` is kept verbatim on load and only compared against a
/// recomputation during validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub previous_hash: BlockHash,
    pub nonce: u64,
    pub hash: BlockHash,
}

/// The fields after `nonce` in canonical key order.
#[derive(Serialize)]
struct TailFields<'a> {
    previous_hash: &'a BlockHash,
    timestamp: Timestamp,
    transactions: &'a [Transaction],
}

impl Block {
    /// An unsealed block with nonce 0. Its `hash` is already consistent with
    /// its contents but does not meet any difficulty until mined.
    pub fn new(
        index: u64,
        timestamp: Timestamp,
        transactions: Vec<Transaction>,
        previous_hash: BlockHash,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: BlockHash::ZERO,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The canonical serialization split around the nonce.
    ///
    /// Keys sort as `index, nonce, previous_hash, timestamp, transactions`, so
    /// the prefix is `{"index":N,"nonce":` and the suffix is the remaining
    /// object with its opening brace replaced by a comma.
    pub fn pow_template(&self) -> PowTemplate {
        let prefix = format!("{{\"index\":{},\"nonce\":", self.index).into_bytes();
        let tail = canonical_json(&TailFields {
            previous_hash: &self.previous_hash,
            timestamp: self.timestamp,
            transactions: &self.transactions,
        })
        .expect("block serialization is infallible");
        let mut suffix = Vec::with_capacity(tail.len());
        suffix.push(b',');
        suffix.extend_from_slice(&tail[1..]);
        PowTemplate::new(prefix, suffix)
    }

    /// Key-sorted compact JSON of every field except `hash`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.pow_template().render(self.nonce)
    }

    /// Recompute the hash from the block's contents.
    pub fn calculate_hash(&self) -> BlockHash {
        hash_block(&self.canonical_bytes())
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(self.hash.as_bytes(), difficulty)
    }

    /// Search for the smallest nonce meeting `difficulty` and seal the block.
    pub fn mine(
        mut self,
        difficulty: u32,
        cancel: &CancelToken,
        deadline: Option<Instant>,
    ) -> Result<Self, WorkError> {
        let template = self.pow_template();
        let solution = WorkGenerator.generate(&template, difficulty, cancel, deadline)?;
        self.nonce = solution.nonce;
        self.hash = BlockHash::new(solution.hash);
        Ok(self)
    }
}
