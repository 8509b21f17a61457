//! The chain as plain owned data: sealed blocks plus the pending pool.
//!
//! `Chain` does no locking and no mining; the shared [`Ledger`](crate::Ledger)
//! handle serializes writers and runs the nonce search.

use corechain_transactions::{Transaction, TransactionKind, TxPayload};
use corechain_types::{BlockHash, HospitalId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::IntegrityError;
use crate::genesis::is_genesis;

/// A sealed transaction together with the block that contains it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocatedTransaction {
    pub block_index: u64,
    pub block_hash: BlockHash,
    pub block_timestamp: Timestamp,
    #[serde(flatten)]
    pub transaction: Transaction,
}

#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: u32,
    batch_size: usize,
}

impl Chain {
    /// Wrap existing blocks. Callers must ensure `blocks` is non-empty.
    pub(crate) fn from_blocks(blocks: Vec<Block>, difficulty: u32, batch_size: usize) -> Self {
        debug_assert!(!blocks.is_empty());
        Self {
            blocks,
            pending: Vec::new(),
            difficulty,
            batch_size,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // a chain always holds at least its genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get_block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub(crate) fn push_pending(&mut self, tx: Transaction) -> usize {
        self.pending.push(tx);
        self.pending.len()
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// An unsealed successor block holding a snapshot of the pending pool.
    pub(crate) fn next_block(&self, timestamp: Timestamp) -> Block {
        let latest = self.latest_block();
        Block::new(
            self.blocks.len() as u64,
            timestamp,
            self.pending.clone(),
            latest.hash,
        )
    }

    /// Append a sealed block and drop the first `mined` pending transactions.
    pub(crate) fn append_sealed(&mut self, block: Block, mined: usize) {
        self.pending.drain(..mined.min(self.pending.len()));
        self.blocks.push(block);
    }

    /// Every sealed transaction in chain order.
    pub fn iter_transactions(&self) -> impl Iterator<Item = (&Block, &Transaction)> {
        self.blocks
            .iter()
            .flat_map(|b| b.transactions.iter().map(move |tx| (b, tx)))
    }

    /// Sealed transactions matching `filter`, with their block coordinates.
    pub fn locate<F>(&self, mut filter: F) -> Vec<LocatedTransaction>
    where
        F: FnMut(&Transaction) -> bool,
    {
        self.iter_transactions()
            .filter(|(_, tx)| filter(tx))
            .map(|(b, tx)| LocatedTransaction {
                block_index: b.index,
                block_hash: b.hash,
                block_timestamp: b.timestamp,
                transaction: tx.clone(),
            })
            .collect()
    }

    pub fn transactions_by_type(&self, kind: TransactionKind) -> Vec<LocatedTransaction> {
        self.locate(|tx| tx.kind() == kind)
    }

    pub fn transactions_by_hospital(&self, hospital: &HospitalId) -> Vec<LocatedTransaction> {
        self.locate(|tx| tx.hospital_id() == Some(hospital))
    }

    /// Total `reward_tokens` credited to `hospital` in sealed blocks.
    pub fn hospital_rewards(&self, hospital: &HospitalId) -> f64 {
        self.iter_transactions()
            .filter_map(|(_, tx)| match &tx.payload {
                TxPayload::RewardDistribution(r) if &r.hospital_id == hospital => {
                    Some(r.reward_tokens)
                }
                _ => None,
            })
            .sum()
    }

    /// Whether `hospital` has a sealed registration.
    pub fn is_registered(&self, hospital: &HospitalId) -> bool {
        self.iter_transactions().any(|(_, tx)| {
            matches!(&tx.payload, TxPayload::HospitalRegistration(r) if &r.hospital_id == hospital)
        })
    }

    /// Re-derive every block hash and check linkage and proof-of-work.
    ///
    /// Deterministic and side-effect free; reports the first failure.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let Some(genesis) = self.blocks.first() else {
            return Err(IntegrityError::Empty);
        };
        if !is_genesis(genesis) {
            return Err(IntegrityError::BadGenesis {
                reason: format!(
                    "index {} with previous hash {}",
                    genesis.index, genesis.previous_hash
                ),
            });
        }
        if genesis.hash != genesis.calculate_hash() {
            return Err(IntegrityError::HashMismatch { index: 0 });
        }

        for (i, pair) in self.blocks.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let index = i as u64 + 1;
            if block.index != index {
                return Err(IntegrityError::IndexMismatch {
                    index,
                    found: block.index,
                });
            }
            if block.hash != block.calculate_hash() {
                return Err(IntegrityError::HashMismatch { index });
            }
            if block.previous_hash != prev.hash {
                return Err(IntegrityError::BrokenLink { index });
            }
            if !block.meets_difficulty(self.difficulty) {
                return Err(IntegrityError::InsufficientWork {
                    index,
                    difficulty: self.difficulty,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::create_genesis_block;
    use corechain_transactions::registration::HospitalRegistrationTx;
    use corechain_transactions::reward::RewardDistributionTx;
    use corechain_work::CancelToken;

    fn hospital(id: &str) -> HospitalId {
        HospitalId::new(id).unwrap()
    }

    fn chain_with(txs: Vec<Transaction>) -> Chain {
        let genesis =
            create_genesis_block(Timestamp::from_millis(1), 1, &CancelToken::new(), None).unwrap();
        let mut chain = Chain::from_blocks(vec![genesis], 1, 5);
        for tx in txs {
            chain.push_pending(tx);
        }
        let count = chain.pending().len();
        let block = chain
            .next_block(Timestamp::from_millis(2))
            .mine(1, &CancelToken::new(), None)
            .unwrap();
        chain.append_sealed(block, count);
        chain
    }

    fn reward(id: &str, tokens: f64) -> Transaction {
        Transaction::with_timestamp(
            RewardDistributionTx {
                hospital_id: hospital(id),
                round: 1,
                reward_tokens: tokens,
                accuracy: 0.5,
                samples_contributed: 10,
            },
            Timestamp::from_millis(2),
        )
    }

    #[test]
    fn append_links_blocks_and_drains_pool() {
        let chain = chain_with(vec![reward("h1", 1.0)]);
        assert_eq!(chain.len(), 2);
        assert!(chain.pending().is_empty());
        assert_eq!(chain.blocks()[1].previous_hash, chain.blocks()[0].hash);
        assert_eq!(chain.validate(), Ok(()));
    }

    #[test]
    fn rewards_are_summed_per_hospital() {
        let chain = chain_with(vec![reward("h1", 12.5), reward("h2", 3.0), reward("h1", 1.25)]);
        assert_eq!(chain.hospital_rewards(&hospital("h1")), 13.75);
        assert_eq!(chain.hospital_rewards(&hospital("nobody")), 0.0);
    }

    #[test]
    fn located_transactions_carry_block_coordinates() {
        let chain = chain_with(vec![reward("h1", 1.0)]);
        let found = chain.transactions_by_hospital(&hospital("h1"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].block_index, 1);
        assert_eq!(found[0].block_hash, chain.blocks()[1].hash);
        assert_eq!(chain.transactions_by_type(TransactionKind::Genesis).len(), 1);
    }

    #[test]
    fn registration_requires_sealed_record() {
        let reg = Transaction::new(HospitalRegistrationTx {
            hospital_id: hospital("h1"),
            hospital_name: "General".into(),
            dataset_size: 100,
            dataset_type: "xray".into(),
        });
        let mut chain = chain_with(vec![]);
        chain.push_pending(reg.clone());
        assert!(!chain.is_registered(&hospital("h1")));

        let chain = chain_with(vec![reg]);
        assert!(chain.is_registered(&hospital("h1")));
    }

    #[test]
    fn tampering_is_detected() {
        let mut chain = chain_with(vec![reward("h1", 1.0)]);
        chain.blocks[1].transactions.clear();
        assert_eq!(chain.validate(), Err(IntegrityError::HashMismatch { index: 1 }));
    }

    #[test]
    fn broken_link_is_detected() {
        let mut chain = chain_with(vec![reward("h1", 1.0)]);
        let block = &mut chain.blocks[1];
        block.previous_hash = BlockHash::new([7; 32]);
        *block = block.clone().mine(1, &CancelToken::new(), None).unwrap();
        assert_eq!(chain.validate(), Err(IntegrityError::BrokenLink { index: 1 }));
    }

    #[test]
    fn insufficient_work_is_detected() {
        let mut chain = chain_with(vec![reward("h1", 1.0)]);
        chain.difficulty = 64;
        assert!(matches!(
            chain.validate(),
            Err(IntegrityError::InsufficientWork { index: 1, .. })
        ));
    }

    #[test]
    fn genesis_shape_is_checked() {
        let mut chain = chain_with(vec![]);
        chain.blocks[0].previous_hash = BlockHash::new([1; 32]);
        assert!(matches!(chain.validate(), Err(IntegrityError::BadGenesis { .. })));
    }
}
