//! The round coordinator.
//!
//! Hospitals register, receive the weight-protection public key, and submit
//! protected weight updates per round. Once `min_clients` updates are buffered
//! for a round the coordinator averages them, replaces the global model,
//! records the aggregation and one reward per participant, and seals the
//! pending pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use corechain_contracts::{
    AuditLogger, AuditQuery, LeaderboardEntry, ModelUpdateValidator, RewardClaim,
    RewardDistributor, SmartContract, TrainingSummary, UpdateClaim, ValidationError,
};
use corechain_crypto::{WeightKeypair, WeightPublicKey};
use corechain_ledger::{Ledger, LocatedTransaction};
use corechain_transactions::aggregation::ModelAggregationTx;
use corechain_transactions::registration::HospitalRegistrationTx;
use corechain_transactions::reward::RewardDistributionTx;
use corechain_transactions::{TransactionKind, TxPayload};
use corechain_types::{Clock, HospitalId, ModelWeights, ProtocolParams, Timestamp};
use corechain_utils::format_duration;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregation::{weighted_average, BufferedUpdate};
use crate::config::CoordinatorConfig;
use crate::messages::{
    GlobalModelRequest, GlobalModelResponse, RegisterRequest, RegistrationResponse,
    SubmissionResponse, TrainingStatus, TrainingStatusRequest, UpdateSubmission,
};
use crate::metrics::CoordinatorMetrics;
use crate::registry::{HospitalRecord, HospitalRegistry};
use crate::round_buffer::{RoundBuffers, RoundSlot, RoundState};
use crate::CoordinatorError;

/// The most recent aggregation result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalModel {
    pub round_number: u64,
    pub weights: ModelWeights,
    pub global_accuracy: f64,
    pub global_loss: f64,
    pub total_samples: u64,
    pub updated_at: Timestamp,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    params: ProtocolParams,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    keypair: WeightKeypair,
    validator: ModelUpdateValidator,
    rewards: RewardDistributor,
    audit: AuditLogger,
    hospitals: HospitalRegistry,
    rounds: RoundBuffers,
    global: RwLock<Option<GlobalModel>>,
    current_round: AtomicU64,
    aggregated_at: Mutex<Vec<Timestamp>>,
    metrics: Arc<CoordinatorMetrics>,
}

impl Coordinator {
    /// Build a coordinator with a fresh ledger and a fresh keypair.
    pub fn new(config: CoordinatorConfig, clock: Arc<dyn Clock>) -> Result<Self, CoordinatorError> {
        config.check()?;
        let ledger = Arc::new(Ledger::new(&config.protocol_params(), Arc::clone(&clock))?);
        Ok(Self::with_ledger(config, ledger))
    }

    /// Build a coordinator around an existing ledger, e.g. one loaded from disk.
    pub fn with_ledger(config: CoordinatorConfig, ledger: Arc<Ledger>) -> Self {
        let params = config.protocol_params();
        let keypair = WeightKeypair::generate(&mut rand::thread_rng());
        let metrics = Arc::new(CoordinatorMetrics::new());
        metrics.chain_length.set(ledger.len() as i64);
        info!(
            min_clients = config.min_clients,
            total_rounds = config.total_rounds,
            difficulty = ledger.difficulty(),
            "coordinator ready"
        );
        Self {
            validator: ModelUpdateValidator::new(Arc::clone(&ledger)),
            rewards: RewardDistributor::new(Arc::clone(&ledger), params.clone()),
            audit: AuditLogger::new(Arc::clone(&ledger)),
            clock: Arc::clone(ledger.clock()),
            ledger,
            config,
            params,
            keypair,
            hospitals: HospitalRegistry::new(),
            rounds: RoundBuffers::new(),
            global: RwLock::new(None),
            current_round: AtomicU64::new(0),
            aggregated_at: Mutex::new(Vec::new()),
            metrics,
        }
    }

    // ── Registration ─────────────────────────────────────────────────────

    /// Record a hospital and seal its registration so its updates validate.
    pub fn register(&self, req: &RegisterRequest) -> Result<RegistrationResponse, CoordinatorError> {
        let hospital_id = HospitalId::new(req.hospital_id.as_str())
            .map_err(|_| ValidationError::MissingField("hospital_id"))?;

        let known = self.hospitals.upsert(HospitalRecord {
            hospital_id: hospital_id.clone(),
            hospital_name: req.hospital_name.clone(),
            dataset_size: req.dataset_size,
            dataset_type: req.dataset_type.clone(),
            registered_at: self.clock.now(),
        });

        self.audit.execute(
            HospitalRegistrationTx {
                hospital_id: hospital_id.clone(),
                hospital_name: req.hospital_name.clone(),
                dataset_size: req.dataset_size,
                dataset_type: req.dataset_type.clone(),
            }
            .into(),
        )?;
        self.ledger.mine_pending_transactions()?;

        self.metrics.registrations.inc();
        self.metrics.registered_hospitals.set(known as i64);
        self.metrics.chain_length.set(self.ledger.len() as i64);
        info!(%hospital_id, name = %req.hospital_name, dataset_size = req.dataset_size, "hospital registered");

        Ok(RegistrationResponse {
            success: true,
            message: format!("Hospital {hospital_id} registered successfully"),
            public_key: self.keypair.public.to_hex(),
        })
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Decode, validate, record and buffer one update. Reaching quorum
    /// aggregates the round before this returns.
    pub fn submit_update(&self, sub: &UpdateSubmission) -> Result<SubmissionResponse, CoordinatorError> {
        let weights = self.decode_update(sub)?;
        self.admit_update(sub, weights)
    }

    /// Open the protected payload of `sub`. Touches neither the ledger nor
    /// the round buffers.
    pub fn decode_update(&self, sub: &UpdateSubmission) -> Result<ModelWeights, CoordinatorError> {
        corechain_crypto::decrypt(&sub.encrypted_weights, &self.keypair.private).map_err(|e| {
            self.metrics.decryption_failures.inc();
            warn!(hospital_id = %sub.hospital_id, round = sub.round, error = %e, "decryption failed");
            e.into()
        })
    }

    /// Validate, record and buffer an update whose payload is already decoded.
    pub fn admit_update(
        &self,
        sub: &UpdateSubmission,
        weights: ModelWeights,
    ) -> Result<SubmissionResponse, CoordinatorError> {
        let handle = self.rounds.slot(sub.round);
        let mut slot = handle.lock();
        let outcome = self.admit(sub, weights, &mut slot);
        if outcome.is_err() {
            self.metrics.updates_rejected.inc();
        }
        let (tx_hash, participants) = outcome?;

        if participants >= self.config.min_clients && slot.state == RoundState::Open {
            info!(round = sub.round, participants, "quorum reached");
            self.close_round(sub.round, &mut slot);
        }

        Ok(SubmissionResponse {
            success: true,
            message: "Update received successfully".into(),
            current_round: self.current_round(),
            total_participants: participants as u64,
            transaction_hash: tx_hash,
        })
    }

    /// Caller holds the round's lock.
    fn admit(
        &self,
        sub: &UpdateSubmission,
        weights: ModelWeights,
        slot: &mut RoundSlot,
    ) -> Result<(String, usize), CoordinatorError> {
        if slot.state == RoundState::Aggregated {
            return Err(CoordinatorError::RoundClosed { round: sub.round });
        }

        let tx = self.validator.validate(&UpdateClaim {
            hospital_id: Some(sub.hospital_id.clone()),
            round: Some(sub.round),
            accuracy: Some(sub.local_accuracy),
            samples_trained: Some(sub.samples_trained),
            loss: Some(sub.local_loss),
        })?;

        if let Some(first) = slot.updates.first() {
            if !first.weights.same_layout(&weights) {
                return Err(ValidationError::LayerMismatch(format!(
                    "expected {} layers shaped like {}'s update, got {}",
                    first.weights.layer_count(),
                    first.hospital_id,
                    weights.layer_count()
                ))
                .into());
            }
        }

        let update = BufferedUpdate {
            hospital_id: tx.hospital_id.clone(),
            weights,
            samples_trained: tx.samples_trained,
            local_accuracy: tx.accuracy,
            local_loss: tx.loss,
            timestamp: sub.timestamp.unwrap_or_else(|| self.clock.now()),
        };
        let tx_hash = self.audit.execute(tx.into())?;
        slot.updates.push(update);
        self.metrics.updates_accepted.inc();
        debug!(
            hospital_id = %sub.hospital_id,
            round = sub.round,
            buffered = slot.updates.len(),
            "update buffered"
        );
        Ok((tx_hash.to_string(), slot.updates.len()))
    }

    // ── Aggregation ──────────────────────────────────────────────────────

    /// Aggregate `round` now, regardless of quorum. Fails if nothing is
    /// buffered or the round is already closed.
    pub fn aggregate(&self, round: u64) -> Result<GlobalModel, CoordinatorError> {
        let handle = self.rounds.slot(round);
        let mut slot = handle.lock();
        if slot.state == RoundState::Aggregated {
            return Err(CoordinatorError::RoundClosed { round });
        }
        slot.state = RoundState::QuorumReached;
        match self.aggregate_locked(round, &mut slot) {
            Ok(model) => {
                slot.state = RoundState::Aggregated;
                Ok(model)
            }
            Err(e) => {
                slot.state = RoundState::Open;
                Err(e)
            }
        }
    }

    /// A failed aggregation leaves the round open with its buffer intact.
    fn close_round(&self, round: u64, slot: &mut RoundSlot) {
        slot.state = RoundState::QuorumReached;
        match self.aggregate_locked(round, slot) {
            Ok(_) => slot.state = RoundState::Aggregated,
            Err(e) => {
                warn!(round, error = %e, "aggregation failed, round stays open");
                slot.state = RoundState::Open;
            }
        }
    }

    fn aggregate_locked(&self, round: u64, slot: &mut RoundSlot) -> Result<GlobalModel, CoordinatorError> {
        let started = Instant::now();
        let aggregate = weighted_average(&slot.updates)?;
        let participants = slot.updates.len();

        self.audit.execute(
            ModelAggregationTx {
                round,
                global_accuracy: aggregate.global_accuracy,
                global_loss: aggregate.global_loss,
                participants: participants as u32,
                total_samples: aggregate.total_samples,
            }
            .into(),
        )?;

        for update in &slot.updates {
            let reward = self.rewards.execute(RewardClaim {
                hospital_id: update.hospital_id.clone(),
                round,
                accuracy: update.local_accuracy,
                samples_contributed: update.samples_trained,
                total_samples: aggregate.total_samples,
            });
            self.audit.execute(
                RewardDistributionTx {
                    hospital_id: update.hospital_id.clone(),
                    round,
                    reward_tokens: reward,
                    accuracy: update.local_accuracy,
                    samples_contributed: update.samples_trained,
                }
                .into(),
            )?;
            self.metrics.rewards_issued.inc();
        }

        if let Err(e) = self.ledger.mine_pending_transactions() {
            warn!(round, error = %e, "sealing after aggregation failed, events remain pending");
        }

        let now = self.clock.now();
        let model = GlobalModel {
            round_number: round,
            weights: aggregate.weights,
            global_accuracy: aggregate.global_accuracy,
            global_loss: aggregate.global_loss,
            total_samples: aggregate.total_samples,
            updated_at: now,
        };
        *self.global.write() = Some(model.clone());
        let current = self.current_round.fetch_max(round, Ordering::AcqRel).max(round);
        self.aggregated_at.lock().push(now);
        slot.updates.clear();

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.rounds_aggregated.inc();
        self.metrics.current_round.set(current as i64);
        self.metrics.chain_length.set(self.ledger.len() as i64);
        self.metrics.aggregation_time_ms.observe(elapsed_ms);
        info!(
            round,
            participants,
            total_samples = model.total_samples,
            global_accuracy = model.global_accuracy,
            elapsed_ms = elapsed_ms as u64,
            "round aggregated"
        );
        Ok(model)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// The latest global model. `request.round` is not consulted: only the
    /// most recent model is kept.
    pub fn get_global_model(&self, request: &GlobalModelRequest) -> GlobalModelResponse {
        debug!(hospital_id = %request.hospital_id, "global model requested");
        match self.global.read().as_ref() {
            Some(model) => GlobalModelResponse {
                round_number: model.round_number,
                model_weights: bincode::serialize(&model.weights)
                    .expect("ModelWeights serialization is infallible"),
                global_accuracy: model.global_accuracy,
                global_loss: model.global_loss,
                total_samples: model.total_samples,
                timestamp: model.updated_at,
            },
            None => GlobalModelResponse {
                round_number: 0,
                model_weights: Vec::new(),
                global_accuracy: 0.0,
                global_loss: 0.0,
                total_samples: 0,
                timestamp: self.clock.now(),
            },
        }
    }

    pub fn get_training_status(&self, request: &TrainingStatusRequest) -> TrainingStatus {
        debug!(hospital_id = %request.hospital_id, "training status requested");
        let current_round = self.current_round();
        let is_training = current_round < self.config.total_rounds;
        let (global_accuracy, global_loss) = self
            .global
            .read()
            .as_ref()
            .map_or((0.0, 0.0), |m| (m.global_accuracy, m.global_loss));

        TrainingStatus {
            current_round,
            total_rounds: self.config.total_rounds,
            connected_hospitals: self.hospitals.len() as u64,
            global_accuracy,
            global_loss,
            is_training,
            next_round_eta: if is_training {
                self.next_round_eta()
            } else {
                "complete".to_string()
            },
        }
    }

    /// Mean interval between past aggregations.
    fn next_round_eta(&self) -> String {
        let times = self.aggregated_at.lock();
        match (times.first(), times.last()) {
            (Some(first), Some(last)) if times.len() >= 2 => {
                let mean = first.elapsed_since(*last) / (times.len() as u64 - 1);
                format_duration(Duration::from_millis(mean))
            }
            _ => "unknown".to_string(),
        }
    }

    pub fn global_model(&self) -> Option<GlobalModel> {
        self.global.read().clone()
    }

    /// Highest round aggregated so far; 0 before the first.
    pub fn current_round(&self) -> u64 {
        self.current_round.load(Ordering::Acquire)
    }

    pub fn round_state(&self, round: u64) -> Option<RoundState> {
        self.rounds.state(round)
    }

    pub fn buffered_updates(&self, round: u64) -> usize {
        self.rounds.buffered(round)
    }

    pub fn public_key(&self) -> &WeightPublicKey {
        &self.keypair.public
    }

    pub fn hospitals(&self) -> Vec<HospitalRecord> {
        self.hospitals.list()
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.rewards.get_leaderboard()
    }

    pub fn training_summary(&self) -> TrainingSummary {
        self.audit.get_training_summary()
    }

    pub fn audit_trail(&self, query: &AuditQuery) -> Vec<LocatedTransaction> {
        self.audit.get_audit_trail(query)
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Seal anything pending and write the chain to `config.chain_file`.
    pub fn save_chain(&self) -> Result<(), CoordinatorError> {
        self.ledger.mine_pending_transactions()?;
        self.ledger.save_to_file(&self.config.chain_file)?;
        info!(path = %self.config.chain_file.display(), blocks = self.ledger.len(), "chain saved");
        Ok(())
    }

    /// Replace the ledger contents from `config.chain_file` if it exists.
    ///
    /// Rounds already aggregated on the loaded chain are closed and the
    /// current round resumes from the highest of them. Buffered updates and
    /// the global model are not persisted.
    pub fn load_chain(&self) -> Result<bool, CoordinatorError> {
        let loaded = self.ledger.load_from_file(&self.config.chain_file)?;
        if !loaded {
            return Ok(false);
        }
        let closed: Vec<u64> = self
            .ledger
            .get_transactions_by_type(TransactionKind::ModelAggregation)
            .into_iter()
            .filter_map(|located| match located.transaction.payload {
                TxPayload::ModelAggregation(a) => Some(a.round),
                _ => None,
            })
            .collect();
        for &round in &closed {
            self.rounds.slot(round).lock().state = RoundState::Aggregated;
        }
        if let Some(&highest) = closed.iter().max() {
            self.current_round.fetch_max(highest, Ordering::AcqRel);
        }
        self.metrics.chain_length.set(self.ledger.len() as i64);
        self.metrics.current_round.set(self.current_round() as i64);
        info!(
            path = %self.config.chain_file.display(),
            blocks = self.ledger.len(),
            current_round = self.current_round(),
            "chain loaded"
        );
        Ok(true)
    }
}
