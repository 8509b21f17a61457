//! Model update validation.

use std::sync::Arc;

use corechain_ledger::Ledger;
use corechain_transactions::model_update::ModelUpdateTx;
use corechain_transactions::TxPayload;
use corechain_types::HospitalId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{SmartContract, ValidationError};

/// A submitted update as received, before any field is known to be present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateClaim {
    pub hospital_id: Option<String>,
    pub round: Option<u64>,
    pub accuracy: Option<f64>,
    pub samples_trained: Option<i64>,
    pub loss: Option<f64>,
}

impl UpdateClaim {
    pub fn new(hospital_id: &HospitalId, round: u64, accuracy: f64, samples: u64, loss: f64) -> Self {
        Self {
            hospital_id: Some(hospital_id.to_string()),
            round: Some(round),
            accuracy: Some(accuracy),
            samples_trained: Some(i64::try_from(samples).unwrap_or(i64::MAX)),
            loss: Some(loss),
        }
    }
}

/// Checks, in order: required fields, sealed registration, accuracy range,
/// sample count, loss, and at most one update per `(hospital, round)` across
/// the sealed chain and the pending pool.
pub struct ModelUpdateValidator {
    ledger: Arc<Ledger>,
}

impl ModelUpdateValidator {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Validate `claim` and return the transaction payload to record.
    pub fn validate(&self, claim: &UpdateClaim) -> Result<ModelUpdateTx, ValidationError> {
        let raw_id = claim
            .hospital_id
            .as_deref()
            .ok_or(ValidationError::MissingField("hospital_id"))?;
        let round = claim.round.ok_or(ValidationError::MissingField("round"))?;
        let accuracy = claim.accuracy.ok_or(ValidationError::MissingField("accuracy"))?;
        let samples = claim
            .samples_trained
            .ok_or(ValidationError::MissingField("samples_trained"))?;
        let hospital_id =
            HospitalId::new(raw_id).map_err(|_| ValidationError::MissingField("hospital_id"))?;
        debug!(%hospital_id, round, "validating update");

        if !self.ledger.read(|chain| chain.is_registered(&hospital_id)) {
            return Err(ValidationError::NotRegistered(hospital_id));
        }
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(ValidationError::InvalidAccuracy(accuracy));
        }
        if samples <= 0 {
            return Err(ValidationError::InvalidSamples(samples));
        }
        let loss = claim.loss.unwrap_or(0.0);
        if !loss.is_finite() {
            return Err(ValidationError::InvalidLoss(loss));
        }
        if self.already_submitted(&hospital_id, round) {
            return Err(ValidationError::Duplicate { hospital_id, round });
        }

        info!(%hospital_id, round, "update validated");
        Ok(ModelUpdateTx {
            hospital_id,
            round,
            accuracy,
            loss,
            samples_trained: samples as u64,
        })
    }

    fn already_submitted(&self, hospital_id: &HospitalId, round: u64) -> bool {
        let is_match = |payload: &TxPayload| {
            matches!(payload, TxPayload::ModelUpdate(u) if &u.hospital_id == hospital_id && u.round == round)
        };
        self.ledger.read(|chain| {
            chain.iter_transactions().any(|(_, tx)| is_match(&tx.payload))
                || chain.pending().iter().any(|tx| is_match(&tx.payload))
        })
    }
}

impl SmartContract for ModelUpdateValidator {
    type Input = UpdateClaim;
    type Output = Result<ModelUpdateTx, ValidationError>;

    fn name(&self) -> &'static str {
        "ModelUpdateValidator"
    }

    fn execute(&self, claim: UpdateClaim) -> Self::Output {
        self.validate(&claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corechain_nullables::NullClock;
    use corechain_transactions::registration::HospitalRegistrationTx;
    use corechain_transactions::Transaction;
    use corechain_types::ProtocolParams;

    fn id(s: &str) -> HospitalId {
        HospitalId::new(s).unwrap()
    }

    fn setup() -> (Arc<Ledger>, ModelUpdateValidator) {
        let ledger = Arc::new(
            Ledger::new(&ProtocolParams::dev_defaults(), Arc::new(NullClock::auto_advancing(0, 1)))
                .unwrap(),
        );
        ledger
            .add_transaction(Transaction::new(HospitalRegistrationTx {
                hospital_id: id("hospital_1"),
                hospital_name: "General Hospital".into(),
                dataset_size: 1500,
                dataset_type: "chest_xray".into(),
            }))
            .unwrap();
        ledger.mine_pending_transactions().unwrap();
        let validator = ModelUpdateValidator::new(Arc::clone(&ledger));
        (ledger, validator)
    }

    fn claim(hospital: &str, accuracy: f64, samples: i64) -> UpdateClaim {
        UpdateClaim {
            hospital_id: Some(hospital.into()),
            round: Some(1),
            accuracy: Some(accuracy),
            samples_trained: Some(samples),
            loss: Some(0.3),
        }
    }

    #[test]
    fn accepts_valid_update() {
        let (_, validator) = setup();
        let tx = validator.execute(claim("hospital_1", 0.87, 1500)).unwrap();
        assert_eq!(tx.samples_trained, 1500);
        assert_eq!(tx.loss, 0.3);
    }

    #[test]
    fn rejects_out_of_range_accuracy() {
        let (_, validator) = setup();
        let err = validator.validate(&claim("hospital_1", 1.5, 1500)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidAccuracy(1.5));
        assert_eq!(err.to_string(), "Invalid accuracy: 1.5 (must be 0-1)");
    }

    #[test]
    fn rejects_unregistered_hospital() {
        let (_, validator) = setup();
        let err = validator.validate(&claim("hospital_9", 0.8, 10)).unwrap_err();
        assert_eq!(err.to_string(), "Hospital hospital_9 not registered");
    }

    #[test]
    fn registration_must_be_sealed() {
        let (ledger, validator) = setup();
        ledger
            .add_transaction(Transaction::new(HospitalRegistrationTx {
                hospital_id: id("hospital_2"),
                hospital_name: "Pending".into(),
                dataset_size: 1,
                dataset_type: "ct".into(),
            }))
            .unwrap();
        assert!(matches!(
            validator.validate(&claim("hospital_2", 0.8, 10)),
            Err(ValidationError::NotRegistered(_))
        ));
    }

    #[test]
    fn reports_first_missing_field() {
        let (_, validator) = setup();
        let mut c = claim("hospital_1", 0.8, 10);
        c.round = None;
        c.samples_trained = None;
        assert_eq!(
            validator.validate(&c).unwrap_err().to_string(),
            "Missing required field: round"
        );
        assert_eq!(
            validator.validate(&UpdateClaim::default()),
            Err(ValidationError::MissingField("hospital_id"))
        );
    }

    #[test]
    fn rejects_non_positive_samples() {
        let (_, validator) = setup();
        assert_eq!(
            validator.validate(&claim("hospital_1", 0.8, 0)),
            Err(ValidationError::InvalidSamples(0))
        );
        assert_eq!(
            validator.validate(&claim("hospital_1", 0.8, -5)),
            Err(ValidationError::InvalidSamples(-5))
        );
    }

    #[test]
    fn rejects_nan_loss() {
        let (_, validator) = setup();
        let mut c = claim("hospital_1", 0.8, 10);
        c.loss = Some(f64::NAN);
        assert!(matches!(validator.validate(&c), Err(ValidationError::InvalidLoss(_))));
    }

    #[test]
    fn duplicate_detected_in_pending_and_sealed() {
        let (ledger, validator) = setup();
        let tx = validator.validate(&claim("hospital_1", 0.8, 10)).unwrap();
        ledger.add_transaction(Transaction::new(tx)).unwrap();

        let err = validator.validate(&claim("hospital_1", 0.9, 10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Hospital hospital_1 already submitted update for round 1"
        );

        ledger.mine_pending_transactions().unwrap();
        assert!(matches!(
            validator.validate(&claim("hospital_1", 0.9, 10)),
            Err(ValidationError::Duplicate { round: 1, .. })
        ));

        let mut next_round = claim("hospital_1", 0.9, 10);
        next_round.round = Some(2);
        assert!(validator.validate(&next_round).is_ok());
    }

    #[test]
    fn claim_parses_from_partial_json() {
        let c: UpdateClaim =
            serde_json::from_str(r#"{"hospital_id":"hospital_1","round":1,"accuracy":0.8}"#).unwrap();
        assert_eq!(c.samples_trained, None);
        let (_, validator) = setup();
        assert_eq!(
            validator.validate(&c),
            Err(ValidationError::MissingField("samples_trained"))
        );
    }
}
