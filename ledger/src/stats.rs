//! Chain summary for reporting surfaces.

use std::collections::BTreeMap;

use corechain_transactions::TransactionKind;
use corechain_types::BlockHash;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    pub total_blocks: usize,
    /// Sealed transactions only.
    pub total_transactions: usize,
    pub pending_transactions: usize,
    pub difficulty: u32,
    pub is_valid: bool,
    /// Diagnostic for the first failing block when `is_valid` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_error: Option<String>,
    pub transaction_types: BTreeMap<TransactionKind, usize>,
    pub latest_block_hash: BlockHash,
}

impl Chain {
    pub fn stats(&self) -> ChainStats {
        let mut transaction_types = BTreeMap::new();
        let mut total_transactions = 0;
        for (_, tx) in self.iter_transactions() {
            *transaction_types.entry(tx.kind()).or_insert(0) += 1;
            total_transactions += 1;
        }
        let validation = self.validate();
        ChainStats {
            total_blocks: self.len(),
            total_transactions,
            pending_transactions: self.pending().len(),
            difficulty: self.difficulty(),
            is_valid: validation.is_ok(),
            integrity_error: validation.err().map(|e| e.to_string()),
            transaction_types,
            latest_block_hash: self.latest_block().hash,
        }
    }
}
