use std::sync::Arc;
use std::thread;

use corechain_ledger::{IntegrityError, Ledger, LedgerError};
use corechain_nullables::NullClock;
use corechain_transactions::registration::HospitalRegistrationTx;
use corechain_transactions::reward::RewardDistributionTx;
use corechain_transactions::{Transaction, TransactionKind};
use corechain_types::{HospitalId, ProtocolParams};

fn params() -> ProtocolParams {
    ProtocolParams {
        difficulty: 2,
        ..ProtocolParams::corechain_defaults()
    }
}

fn ledger() -> Ledger {
    Ledger::new(&params(), Arc::new(NullClock::auto_advancing(1_700_000_000_000, 3))).unwrap()
}

fn registration(id: &str) -> Transaction {
    Transaction::new(HospitalRegistrationTx {
        hospital_id: HospitalId::new(id).unwrap(),
        hospital_name: format!("{id} General"),
        dataset_size: 1500,
        dataset_type: "chest_xray".into(),
    })
}

fn reward(id: &str, round: u64, tokens: f64) -> Transaction {
    Transaction::new(RewardDistributionTx {
        hospital_id: HospitalId::new(id).unwrap(),
        round,
        reward_tokens: tokens,
        accuracy: 0.87,
        samples_contributed: 1500,
    })
}

#[test]
fn save_and_load_reproduce_identical_hashes() {
    let original = ledger();
    for id in ["h1", "h2", "h3"] {
        original.add_transaction(registration(id)).unwrap();
    }
    original.mine_pending_transactions().unwrap();
    original.add_transaction(reward("h1", 1, 18.12)).unwrap();
    original.mine_pending_transactions().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("blockchain.json");
    original.save_to_file(&path).unwrap();

    let restored = ledger();
    restored.add_transaction(registration("stale")).unwrap();
    assert!(restored.load_from_file(&path).unwrap());

    let a = original.get_chain();
    let b = restored.get_chain();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.hash, y.hash);
        assert_eq!(x, y);
    }
    assert!(restored.is_chain_valid());
    assert!(restored.pending_transactions().is_empty());
    assert_eq!(
        restored.get_hospital_rewards(&HospitalId::new("h1").unwrap()),
        18.12
    );
}

#[test]
fn persisted_layout_exposes_block_fields() {
    let ledger = ledger();
    let value: serde_json::Value = serde_json::from_slice(&ledger.to_json_bytes()).unwrap();
    let genesis = &value[0];
    for field in ["index", "timestamp", "transactions", "previous_hash", "nonce", "hash"] {
        assert!(genesis.get(field).is_some(), "missing {field}");
    }
    assert_eq!(genesis["transactions"][0]["type"], "GENESIS");
    assert_eq!(genesis["previous_hash"], "0".repeat(64));
}

#[test]
fn missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!ledger().load_from_file(&dir.path().join("absent.json")).unwrap());
}

#[test]
fn tampered_file_loads_but_fails_validation() {
    let source = ledger();
    source.add_transaction(reward("h1", 1, 10.0)).unwrap();
    source.mine_pending_transactions().unwrap();

    let json = String::from_utf8(source.to_json_bytes()).unwrap();
    let tampered = json.replace("\"reward_tokens\": 10.0", "\"reward_tokens\": 99.0");
    assert_ne!(json, tampered);

    let target = ledger();
    target.from_json_bytes(tampered.as_bytes()).unwrap();
    assert_eq!(target.validate(), Err(IntegrityError::HashMismatch { index: 1 }));
    let stats = target.get_stats();
    assert!(!stats.is_valid);
    assert!(stats.integrity_error.is_some());
}

#[test]
fn empty_file_contents_rejected() {
    assert!(matches!(
        ledger().from_json_bytes(b"[]"),
        Err(LedgerError::EmptyChain)
    ));
}

#[test]
fn concurrent_admission_loses_nothing() {
    let ledger = Arc::new(ledger());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..6 {
                    ledger
                        .add_transaction(registration(&format!("h{t}_{i}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let sealed = ledger
        .get_transactions_by_type(TransactionKind::HospitalRegistration)
        .len();
    let pending = ledger.pending_transactions().len();
    assert_eq!(sealed + pending, 24);
    // 24 admissions with a batch size of 5 seal exactly four full blocks.
    assert_eq!(sealed, 20);
    assert_eq!(pending, 4);
    assert!(ledger.is_chain_valid());
    for block in ledger.get_chain().iter().skip(1) {
        assert_eq!(block.transactions.len(), 5);
    }
}

#[test]
fn located_queries() {
    let ledger = ledger();
    ledger.add_transaction(registration("h1")).unwrap();
    ledger.add_transaction(reward("h1", 1, 12.0)).unwrap();
    ledger.add_transaction(reward("h2", 1, 11.0)).unwrap();
    ledger.mine_pending_transactions().unwrap();

    let h1 = ledger.get_transactions_by_hospital(&HospitalId::new("h1").unwrap());
    assert_eq!(h1.len(), 2);
    assert!(h1.iter().all(|l| l.block_index == 1));
    let rewards = ledger.get_transactions_by_type(TransactionKind::RewardDistribution);
    assert_eq!(rewards.len(), 2);
}
