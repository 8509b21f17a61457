//! Stateless structural checks applied at admission.
//!
//! Whether a hospital is registered or has already submitted for a round
//! depends on ledger state and is checked by the update validator contract.

use crate::error::TransactionError;
use crate::{Transaction, TxPayload};

/// Reject transactions whose numeric fields cannot be meaningful.
pub fn validate_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    match &tx.payload {
        TxPayload::Genesis(_) | TxPayload::HospitalRegistration(_) => Ok(()),
        TxPayload::ModelUpdate(u) => {
            unit_range("accuracy", u.accuracy)?;
            finite("loss", u.loss)
        }
        TxPayload::ModelAggregation(a) => {
            if a.participants == 0 {
                return Err(TransactionError::NoParticipants { round: a.round });
            }
            unit_range("global_accuracy", a.global_accuracy)?;
            finite("global_loss", a.global_loss)
        }
        TxPayload::RewardDistribution(r) => {
            unit_range("accuracy", r.accuracy)?;
            finite("reward_tokens", r.reward_tokens)?;
            if r.reward_tokens < 0.0 {
                return Err(TransactionError::Negative {
                    field: "reward_tokens",
                    value: r.reward_tokens,
                });
            }
            Ok(())
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), TransactionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TransactionError::NonFinite { field, value })
    }
}

fn unit_range(field: &'static str, value: f64) -> Result<(), TransactionError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TransactionError::OutOfUnitRange { field, value })
    }
}
