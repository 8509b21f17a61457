//! All CoreChain transaction types.
//!
//! Transaction types:
//! - **Genesis**: the single record in block 0
//! - **HospitalRegistration**: a hospital joins the federation
//! - **ModelUpdate**: a hospital's accepted update for a round
//! - **ModelAggregation**: a round reached quorum and was aggregated
//! - **RewardDistribution**: tokens credited to a hospital for a round
//!
//! On the wire a transaction is one flat JSON object whose `"type"` field names
//! the variant, with an optional `timestamp` stamped at admission.

pub mod aggregation;
pub mod error;
pub mod genesis;
pub mod kind;
pub mod model_update;
pub mod registration;
pub mod reward;
pub mod validation;

pub use error::TransactionError;
pub use kind::TransactionKind;

use corechain_types::{canonical_json, HospitalId, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

/// Type-specific content of a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxPayload {
    Genesis(genesis::GenesisTx),
    HospitalRegistration(registration::HospitalRegistrationTx),
    ModelUpdate(model_update::ModelUpdateTx),
    ModelAggregation(aggregation::ModelAggregationTx),
    RewardDistribution(reward::RewardDistributionTx),
}

/// The common envelope around every payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub payload: TxPayload,
}

impl Transaction {
    /// An unstamped transaction; the ledger stamps it on admission.
    pub fn new(payload: impl Into<TxPayload>) -> Self {
        Self {
            timestamp: None,
            payload: payload.into(),
        }
    }

    pub fn with_timestamp(payload: impl Into<TxPayload>, timestamp: Timestamp) -> Self {
        Self {
            timestamp: Some(timestamp),
            payload: payload.into(),
        }
    }

    /// Set the timestamp unless one is already present.
    pub fn stamp_if_missing(&mut self, now: Timestamp) {
        self.timestamp.get_or_insert(now);
    }

    pub fn kind(&self) -> TransactionKind {
        match &self.payload {
            TxPayload::Genesis(_) => TransactionKind::Genesis,
            TxPayload::HospitalRegistration(_) => TransactionKind::HospitalRegistration,
            TxPayload::ModelUpdate(_) => TransactionKind::ModelUpdate,
            TxPayload::ModelAggregation(_) => TransactionKind::ModelAggregation,
            TxPayload::RewardDistribution(_) => TransactionKind::RewardDistribution,
        }
    }

    /// The hospital this transaction concerns, if any.
    pub fn hospital_id(&self) -> Option<&HospitalId> {
        match &self.payload {
            TxPayload::HospitalRegistration(tx) => Some(&tx.hospital_id),
            TxPayload::ModelUpdate(tx) => Some(&tx.hospital_id),
            TxPayload::RewardDistribution(tx) => Some(&tx.hospital_id),
            TxPayload::Genesis(_) | TxPayload::ModelAggregation(_) => None,
        }
    }

    /// The training round this transaction belongs to, if any.
    pub fn round(&self) -> Option<u64> {
        match &self.payload {
            TxPayload::ModelUpdate(tx) => Some(tx.round),
            TxPayload::ModelAggregation(tx) => Some(tx.round),
            TxPayload::RewardDistribution(tx) => Some(tx.round),
            TxPayload::Genesis(_) | TxPayload::HospitalRegistration(_) => None,
        }
    }

    /// Key-sorted compact JSON, the form the hash is computed over.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json(self).expect("transaction serialization is infallible")
    }

    /// SHA-256 of the canonical form. Identifies the transaction, not its block.
    pub fn hash(&self) -> TxHash {
        corechain_crypto::hash_transaction(&self.canonical_bytes())
    }
}

impl From<genesis::GenesisTx> for TxPayload {
    fn from(tx: genesis::GenesisTx) -> Self {
        Self::Genesis(tx)
    }
}

impl From<registration::HospitalRegistrationTx> for TxPayload {
    fn from(tx: registration::HospitalRegistrationTx) -> Self {
        Self::HospitalRegistration(tx)
    }
}

impl From<model_update::ModelUpdateTx> for TxPayload {
    fn from(tx: model_update::ModelUpdateTx) -> Self {
        Self::ModelUpdate(tx)
    }
}

impl From<aggregation::ModelAggregationTx> for TxPayload {
    fn from(tx: aggregation::ModelAggregationTx) -> Self {
        Self::ModelAggregation(tx)
    }
}

impl From<reward::RewardDistributionTx> for TxPayload {
    fn from(tx: reward::RewardDistributionTx) -> Self {
        Self::RewardDistribution(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_update::ModelUpdateTx;

    fn update() -> ModelUpdateTx {
        ModelUpdateTx {
            hospital_id: HospitalId::new("hospital_1").unwrap(),
            round: 1,
            accuracy: 0.85,
            loss: 0.4,
            samples_trained: 1500,
        }
    }

    #[test]
    fn serializes_flat_with_type_tag() {
        let tx = Transaction::with_timestamp(update(), Timestamp::from_millis(1_000));
        let canonical = String::from_utf8(tx.canonical_bytes()).unwrap();
        assert_eq!(
            canonical,
            r#"{"accuracy":0.85,"hospital_id":"hospital_1","loss":0.4,"round":1,"samples_trained":1500,"timestamp":1000,"type":"MODEL_UPDATE"}"#
        );
    }

    #[test]
    fn unstamped_transaction_omits_timestamp() {
        let json = serde_json::to_value(Transaction::new(genesis::GenesisTx::default())).unwrap();
        assert!(json.get("timestamp").is_none());
        assert_eq!(json["type"], "GENESIS");
    }

    #[test]
    fn parses_external_record() {
        let raw = r#"{"type":"HOSPITAL_REGISTRATION","hospital_id":"h9","hospital_name":"St. Elsewhere","dataset_size":1500,"dataset_type":"chest_xray"}"#;
        let tx: Transaction = serde_json::from_str(raw).unwrap();
        assert_eq!(tx.kind(), TransactionKind::HospitalRegistration);
        assert_eq!(tx.hospital_id().map(HospitalId::as_str), Some("h9"));
        assert_eq!(tx.timestamp, None);
    }

    #[test]
    fn json_round_trip_preserves_hash() {
        let tx = Transaction::with_timestamp(update(), Timestamp::from_millis(7));
        let back: Transaction = serde_json::from_slice(&serde_json::to_vec(&tx).unwrap()).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.hash(), tx.hash());
    }

    #[test]
    fn hash_depends_on_timestamp() {
        let a = Transaction::with_timestamp(update(), Timestamp::from_millis(1));
        let b = Transaction::with_timestamp(update(), Timestamp::from_millis(2));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn stamping_keeps_existing_timestamp() {
        let mut tx = Transaction::with_timestamp(update(), Timestamp::from_millis(5));
        tx.stamp_if_missing(Timestamp::from_millis(9));
        assert_eq!(tx.timestamp, Some(Timestamp::from_millis(5)));

        let mut fresh = Transaction::new(update());
        fresh.stamp_if_missing(Timestamp::from_millis(9));
        assert_eq!(fresh.timestamp, Some(Timestamp::from_millis(9)));
    }

    #[test]
    fn accessors() {
        let tx = Transaction::new(update());
        assert_eq!(tx.kind(), TransactionKind::ModelUpdate);
        assert_eq!(tx.round(), Some(1));
        let genesis = Transaction::new(genesis::GenesisTx::default());
        assert_eq!(genesis.hospital_id(), None);
        assert_eq!(genesis.round(), None);
    }
}
