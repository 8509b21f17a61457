//! Audit events and audit-trail queries.

use std::collections::HashSet;
use std::sync::Arc;

use corechain_ledger::{Ledger, LedgerError, LocatedTransaction};
use corechain_transactions::{Transaction, TransactionKind, TxPayload};
use corechain_types::{HospitalId, TxHash};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SmartContract;

pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Filters for [`AuditLogger::get_audit_trail`]. `None` matches everything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub hospital_id: Option<HospitalId>,
    pub kind: Option<TransactionKind>,
    pub limit: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            hospital_id: None,
            kind: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub total_rounds: u64,
    pub total_updates: u64,
    pub participating_hospitals: u64,
    pub avg_accuracy: f64,
    pub best_accuracy: f64,
    pub latest_global_accuracy: f64,
    pub latest_round: u64,
}

pub struct AuditLogger {
    ledger: Arc<Ledger>,
}

impl AuditLogger {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Sealed transactions matching `query`, newest first, at most `query.limit`.
    pub fn get_audit_trail(&self, query: &AuditQuery) -> Vec<LocatedTransaction> {
        let mut trail = self.ledger.read(|chain| {
            chain.locate(|tx| {
                query
                    .hospital_id
                    .as_ref()
                    .map_or(true, |id| tx.hospital_id() == Some(id))
                    && query.kind.map_or(true, |k| tx.kind() == k)
            })
        });
        // stable: equal timestamps keep chain order
        trail.sort_by(|a, b| b.transaction.timestamp.cmp(&a.transaction.timestamp));
        trail.truncate(query.limit);
        trail
    }

    pub fn get_training_summary(&self) -> TrainingSummary {
        self.ledger.read(|chain| {
            let mut hospitals = HashSet::new();
            let mut total_updates = 0u64;
            let mut accuracy_sum = 0.0;
            let mut best_accuracy = f64::MIN;
            let mut total_rounds = 0u64;
            let mut latest = None;

            for (_, tx) in chain.iter_transactions() {
                match &tx.payload {
                    TxPayload::ModelUpdate(u) => {
                        hospitals.insert(&u.hospital_id);
                        total_updates += 1;
                        accuracy_sum += u.accuracy;
                        best_accuracy = best_accuracy.max(u.accuracy);
                    }
                    TxPayload::ModelAggregation(a) => {
                        total_rounds += 1;
                        latest = Some(a);
                    }
                    _ => {}
                }
            }

            if total_updates == 0 {
                return TrainingSummary::default();
            }
            TrainingSummary {
                total_rounds,
                total_updates,
                participating_hospitals: hospitals.len() as u64,
                avg_accuracy: accuracy_sum / total_updates as f64,
                best_accuracy,
                latest_global_accuracy: latest.map_or(0.0, |a| a.global_accuracy),
                latest_round: latest.map_or(0, |a| a.round),
            }
        })
    }
}

impl SmartContract for AuditLogger {
    type Input = TxPayload;
    type Output = Result<TxHash, LedgerError>;

    fn name(&self) -> &'static str {
        "AuditLogger"
    }

    /// Stamp the event with the ledger clock and admit it.
    fn execute(&self, payload: TxPayload) -> Self::Output {
        let tx = Transaction::with_timestamp(payload, self.ledger.clock().now());
        let kind = tx.kind();
        let hash = self.ledger.add_transaction(tx)?;
        info!(%kind, tx_hash = %hash.short(), "audit event logged");
        Ok(hash)
    }
}
