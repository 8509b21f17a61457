//! Genesis block creation.
//!
//! The genesis block has index 0, `previous_hash: BlockHash::ZERO` and a single
//! `GENESIS` transaction. It is mined at the ledger's difficulty like any other
//! block, so its hash differs per creation time.

use std::time::Instant;

use corechain_transactions::genesis::GenesisTx;
use corechain_transactions::Transaction;
use corechain_types::{BlockHash, Timestamp};
use corechain_work::{CancelToken, WorkError};

use crate::block::Block;

/// Build and mine the genesis block.
pub fn create_genesis_block(
    timestamp: Timestamp,
    difficulty: u32,
    cancel: &CancelToken,
    deadline: Option<Instant>,
) -> Result<Block, WorkError> {
    let tx = Transaction::with_timestamp(GenesisTx::default(), timestamp);
    Block::new(0, timestamp, vec![tx], BlockHash::ZERO).mine(difficulty, cancel, deadline)
}

/// Whether `block` has the structural shape of a genesis block.
pub fn is_genesis(block: &Block) -> bool {
    block.index == 0 && block.previous_hash.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corechain_transactions::TransactionKind;

    #[test]
    fn genesis_shape() {
        let g = create_genesis_block(Timestamp::from_millis(5), 1, &CancelToken::new(), None)
            .unwrap();
        assert!(is_genesis(&g));
        assert_eq!(g.transactions.len(), 1);
        assert_eq!(g.transactions[0].kind(), TransactionKind::Genesis);
        assert!(g.meets_difficulty(1));
        assert_eq!(g.hash, g.calculate_hash());
    }

    #[test]
    fn deterministic_for_same_timestamp() {
        let a = create_genesis_block(Timestamp::from_millis(9), 2, &CancelToken::new(), None)
            .unwrap();
        let b = create_genesis_block(Timestamp::from_millis(9), 2, &CancelToken::new(), None)
            .unwrap();
        assert_eq!(a.hash, b.hash);
    }
}
