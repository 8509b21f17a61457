//! The shared ledger handle.
//!
//! Locking discipline:
//! - `writer` serializes every mutation (admission, sealing, reset, load), so
//!   admitting a transaction and the sealing it triggers are atomic with
//!   respect to other writers.
//! - `chain` is read-locked by queries and write-locked only for the short
//!   moment a mutation is committed. The nonce search runs with `writer` held
//!   and `chain` unlocked, so readers never wait on mining.

use std::sync::Arc;
use std::time::{Duration, Instant};

use corechain_transactions::validation::validate_transaction;
use corechain_transactions::{Transaction, TransactionKind};
use corechain_types::{Clock, HospitalId, ProtocolParams, SystemClock, TxHash};
use corechain_work::{difficulty::check_difficulty, CancelToken, WorkError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::chain::{Chain, LocatedTransaction};
use crate::error::{IntegrityError, LedgerError};
use crate::genesis::create_genesis_block;
use crate::stats::ChainStats;

pub struct Ledger {
    chain: RwLock<Chain>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
    difficulty: u32,
    batch_size: usize,
    mining_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Ledger {
    /// Create a ledger and mine its genesis block.
    pub fn new(params: &ProtocolParams, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        check_difficulty(params.difficulty)?;
        let mining_timeout = params.mining_timeout_ms.map(Duration::from_millis);
        let cancel = CancelToken::new();
        let genesis = create_genesis_block(
            clock.now(),
            params.difficulty,
            &cancel,
            mining_timeout.map(|t| Instant::now() + t),
        )?;
        info!(
            hash = %genesis.hash,
            difficulty = params.difficulty,
            "genesis block mined"
        );
        Ok(Self {
            chain: RwLock::new(Chain::from_blocks(
                vec![genesis],
                params.difficulty,
                params.batch_size.max(1),
            )),
            writer: Mutex::new(()),
            clock,
            difficulty: params.difficulty,
            batch_size: params.batch_size.max(1),
            mining_timeout,
            cancel,
        })
    }

    pub fn with_system_clock(params: &ProtocolParams) -> Result<Self, LedgerError> {
        Self::new(params, Arc::new(SystemClock))
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Admit a transaction to the pending pool, stamping its timestamp if absent.
    ///
    /// Seals the pool once it reaches the batch size. If that sealing is
    /// cancelled or times out the transaction stays pending and its hash is
    /// still returned.
    pub fn add_transaction(&self, mut tx: Transaction) -> Result<TxHash, LedgerError> {
        validate_transaction(&tx)?;
        let _writer = self.writer.lock();

        tx.stamp_if_missing(self.clock.now());
        let hash = tx.hash();
        let kind = tx.kind();
        let pending = self.chain.write().push_pending(tx);
        debug!(tx_hash = %hash.short(), %kind, pending, "transaction admitted");

        if pending >= self.batch_size {
            if let Err(e) = self.mine_locked() {
                warn!(error = %e, pending, "automatic sealing failed, transactions remain pending");
            }
        }
        Ok(hash)
    }

    /// Seal every pending transaction into a new block.
    ///
    /// Returns `None` when the pool is empty.
    pub fn mine_pending_transactions(&self) -> Result<Option<Block>, LedgerError> {
        let _writer = self.writer.lock();
        self.mine_locked()
    }

    /// Abort the nonce search in progress, or the next one to start if the
    /// ledger is idle. The pool is left untouched.
    pub fn cancel_mining(&self) {
        self.cancel.cancel();
    }

    /// Withdraw a cancellation no search has observed yet.
    pub fn resume_mining(&self) {
        self.cancel.reset();
    }

    /// Run `search` against the cancel token. The first search to observe a
    /// cancellation consumes it.
    fn seal<T>(&self, search: impl FnOnce(&CancelToken) -> Result<T, WorkError>) -> Result<T, WorkError> {
        let result = search(&self.cancel);
        if matches!(result, Err(WorkError::Cancelled)) {
            self.cancel.reset();
            info!("block sealing cancelled");
        }
        result
    }

    /// Caller must hold `writer`.
    fn mine_locked(&self) -> Result<Option<Block>, LedgerError> {
        let (candidate, count) = {
            let chain = self.chain.read();
            if chain.pending().is_empty() {
                return Ok(None);
            }
            (chain.next_block(self.clock.now()), chain.pending().len())
        };

        let started = Instant::now();
        let deadline = self.mining_timeout.map(|t| started + t);
        let block = self.seal(|cancel| candidate.mine(self.difficulty, cancel, deadline))?;

        self.chain.write().append_sealed(block.clone(), count);
        info!(
            block_index = block.index,
            nonce = block.nonce,
            transactions = count,
            hash = %block.hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "block mined"
        );
        Ok(Some(block))
    }

    /// Discard all blocks and pending transactions and mine a fresh genesis.
    pub fn reset(&self) -> Result<(), LedgerError> {
        let _writer = self.writer.lock();
        let deadline = self.mining_timeout.map(|t| Instant::now() + t);
        let genesis = self.seal(|cancel| {
            create_genesis_block(self.clock.now(), self.difficulty, cancel, deadline)
        })?;
        *self.chain.write() = Chain::from_blocks(vec![genesis], self.difficulty, self.batch_size);
        info!("ledger reset to a new genesis block");
        Ok(())
    }

    /// Replace the chain with `blocks` and clear the pending pool.
    ///
    /// Hashes are taken as given. A chain that fails validation is still
    /// installed and a warning is logged; callers decide what to do with it.
    pub fn replace_blocks(&self, blocks: Vec<Block>) -> Result<(), LedgerError> {
        if blocks.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        let _writer = self.writer.lock();
        let chain = Chain::from_blocks(blocks, self.difficulty, self.batch_size);
        if let Err(e) = chain.validate() {
            warn!(
                error = %e,
                block_index = e.block_index(),
                "loaded chain failed validation"
            );
        }
        *self.chain.write() = chain;
        Ok(())
    }

    /// Run `f` against a consistent view of the chain.
    pub fn read<R>(&self, f: impl FnOnce(&Chain) -> R) -> R {
        f(&self.chain.read())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    pub fn get_block(&self, index: u64) -> Option<Block> {
        self.chain.read().get_block(index).cloned()
    }

    pub fn latest_block(&self) -> Block {
        self.chain.read().latest_block().clone()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.chain.read().pending().to_vec()
    }

    pub fn get_transactions_by_type(&self, kind: TransactionKind) -> Vec<LocatedTransaction> {
        self.chain.read().transactions_by_type(kind)
    }

    pub fn get_transactions_by_hospital(&self, hospital: &HospitalId) -> Vec<LocatedTransaction> {
        self.chain.read().transactions_by_hospital(hospital)
    }

    pub fn get_hospital_rewards(&self, hospital: &HospitalId) -> f64 {
        self.chain.read().hospital_rewards(hospital)
    }

    pub fn validate(&self) -> Result<(), IntegrityError> {
        self.chain.read().validate()
    }

    pub fn is_chain_valid(&self) -> bool {
        let result = self.validate();
        if let Err(e) = &result {
            warn!(error = %e, block_index = e.block_index(), "chain validation failed");
        }
        result.is_ok()
    }

    pub fn get_stats(&self) -> ChainStats {
        self.chain.read().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corechain_nullables::NullClock;
    use corechain_transactions::model_update::ModelUpdateTx;
    use corechain_types::Timestamp;

    fn params() -> ProtocolParams {
        ProtocolParams {
            difficulty: 2,
            ..ProtocolParams::corechain_defaults()
        }
    }

    fn ledger() -> Ledger {
        Ledger::new(&params(), Arc::new(NullClock::auto_advancing(1_000, 1))).unwrap()
    }

    fn update(id: &str, round: u64) -> Transaction {
        Transaction::new(ModelUpdateTx {
            hospital_id: HospitalId::new(id).unwrap(),
            round,
            accuracy: 0.8,
            loss: 0.2,
            samples_trained: 100,
        })
    }

    #[test]
    fn starts_with_mined_genesis() {
        let ledger = ledger();
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.latest_block();
        assert!(genesis.meets_difficulty(2));
        assert!(genesis.previous_hash.is_zero());
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn add_stamps_and_hashes_before_sealing() {
        let ledger = ledger();
        let hash = ledger.add_transaction(update("h1", 1)).unwrap();
        let pending = ledger.pending_transactions();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].timestamp.is_some());
        assert_eq!(pending[0].hash(), hash);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn existing_timestamp_is_kept() {
        let ledger = ledger();
        let tx = Transaction::with_timestamp(
            ModelUpdateTx {
                hospital_id: HospitalId::new("h1").unwrap(),
                round: 1,
                accuracy: 0.8,
                loss: 0.2,
                samples_trained: 100,
            },
            Timestamp::from_millis(42),
        );
        ledger.add_transaction(tx).unwrap();
        assert_eq!(
            ledger.pending_transactions()[0].timestamp,
            Some(Timestamp::from_millis(42))
        );
    }

    #[test]
    fn batch_threshold_triggers_sealing() {
        let ledger = ledger();
        for round in 1..=4 {
            ledger.add_transaction(update("h1", round)).unwrap();
        }
        assert_eq!(ledger.len(), 1);
        ledger.add_transaction(update("h1", 5)).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.latest_block().transactions.len(), 5);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn explicit_mining() {
        let ledger = ledger();
        assert!(ledger.mine_pending_transactions().unwrap().is_none());
        ledger.add_transaction(update("h1", 1)).unwrap();
        let block = ledger.mine_pending_transactions().unwrap().unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, ledger.get_block(0).unwrap().hash);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn invalid_transaction_is_not_admitted() {
        let ledger = ledger();
        let bad = Transaction::new(ModelUpdateTx {
            hospital_id: HospitalId::new("h1").unwrap(),
            round: 1,
            accuracy: 2.0,
            loss: 0.2,
            samples_trained: 100,
        });
        assert!(matches!(
            ledger.add_transaction(bad),
            Err(LedgerError::InvalidTransaction(_))
        ));
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn timed_out_auto_seal_keeps_transactions_pending() {
        let params = ProtocolParams {
            difficulty: 1,
            batch_size: 1,
            ..ProtocolParams::corechain_defaults()
        };
        let ledger = Ledger::new(&params, Arc::new(NullClock::new(0))).unwrap();
        // Raise the bar beyond reach and bound the search.
        let ledger = Ledger {
            difficulty: 64,
            mining_timeout: Some(Duration::from_millis(10)),
            ..ledger
        };
        let hash = ledger.add_transaction(update("h1", 1)).unwrap();
        assert_eq!(ledger.pending_transactions()[0].hash(), hash);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn cancellation_while_idle_aborts_the_next_seal_only() {
        let ledger = ledger();
        ledger.add_transaction(update("h1", 1)).unwrap();
        ledger.cancel_mining();
        assert!(matches!(
            ledger.mine_pending_transactions(),
            Err(LedgerError::Work(WorkError::Cancelled))
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);

        let block = ledger.mine_pending_transactions().unwrap().unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn withdrawn_cancellation_lets_sealing_proceed() {
        let ledger = ledger();
        ledger.add_transaction(update("h1", 1)).unwrap();
        ledger.cancel_mining();
        ledger.resume_mining();
        assert!(ledger.mine_pending_transactions().unwrap().is_some());
    }

    #[test]
    fn cancellation_with_an_empty_pool_waits_for_a_search() {
        let ledger = ledger();
        ledger.cancel_mining();
        assert!(ledger.mine_pending_transactions().unwrap().is_none());
        ledger.add_transaction(update("h1", 1)).unwrap();
        assert!(matches!(
            ledger.mine_pending_transactions(),
            Err(LedgerError::Work(WorkError::Cancelled))
        ));
    }

    #[test]
    fn reset_starts_a_new_chain() {
        let ledger = ledger();
        ledger.add_transaction(update("h1", 1)).unwrap();
        ledger.mine_pending_transactions().unwrap();
        ledger.add_transaction(update("h1", 2)).unwrap();
        ledger.reset().unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn stats_histogram() {
        let ledger = ledger();
        ledger.add_transaction(update("h1", 1)).unwrap();
        ledger.add_transaction(update("h2", 1)).unwrap();
        ledger.mine_pending_transactions().unwrap();
        ledger.add_transaction(update("h3", 1)).unwrap();

        let stats = ledger.get_stats();
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.transaction_types[&TransactionKind::ModelUpdate], 2);
        assert_eq!(stats.transaction_types[&TransactionKind::Genesis], 1);
        assert!(stats.is_valid);
        assert_eq!(stats.latest_block_hash, ledger.latest_block().hash);
    }

    #[test]
    fn replace_rejects_empty() {
        assert!(matches!(
            ledger().replace_blocks(vec![]),
            Err(LedgerError::EmptyChain)
        ));
    }
}
