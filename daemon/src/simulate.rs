//! In-process federation: simulated hospitals drive a coordinator through
//! its async service until training completes or a shutdown signal arrives.

use std::sync::Arc;

use anyhow::bail;
use corechain_coordinator::messages::{RegisterRequest, TrainingStatusRequest, UpdateSubmission};
use corechain_coordinator::{Coordinator, CoordinatorConfig, CoordinatorService, ShutdownController};
use corechain_crypto::WeightPublicKey;
use corechain_types::{LayerTensor, ModelWeights, SystemClock};
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{info, warn};

const LAYER_SHAPES: [&[usize]; 2] = [&[8, 4], &[4]];

struct SimHospital {
    id: String,
    dataset_size: u64,
    skill: f64,
}

/// Weights scattered around a shared optimum, tighter for better hospitals.
fn local_weights<R: Rng>(rng: &mut R, skill: f64, round: u64) -> ModelWeights {
    let spread = (1.0 - skill) / (round as f64 + 1.0);
    ModelWeights::new(
        LAYER_SHAPES
            .iter()
            .map(|shape| {
                let len: usize = shape.iter().product();
                let values = (0..len)
                    .map(|i| (i as f64 * 0.01 + rng.gen_range(-spread..=spread)) as f32)
                    .collect();
                LayerTensor {
                    shape: shape.to_vec(),
                    values,
                }
            })
            .collect(),
    )
}

fn local_metrics<R: Rng>(rng: &mut R, skill: f64, round: u64, total_rounds: u64) -> (f64, f64) {
    let progress = round as f64 / total_rounds.max(1) as f64;
    let accuracy = (0.6 + 0.35 * skill * progress + rng.gen_range(0.0..0.03)).min(0.99);
    (accuracy, 1.0 - accuracy)
}

async fn train_round(
    service: CoordinatorService,
    key: Arc<WeightPublicKey>,
    hospital: Arc<SimHospital>,
    round: u64,
    total_rounds: u64,
    sample_size: usize,
) -> anyhow::Result<bool> {
    let (weights, accuracy, loss) = {
        let mut rng = rand::thread_rng();
        let weights = local_weights(&mut rng, hospital.skill, round);
        let (accuracy, loss) = local_metrics(&mut rng, hospital.skill, round, total_rounds);
        (weights, accuracy, loss)
    };
    let encrypted_weights = corechain_crypto::encrypt(&weights, &key, sample_size)?;
    let resp = service
        .submit_update(UpdateSubmission {
            hospital_id: hospital.id.clone(),
            round,
            encrypted_weights,
            samples_trained: hospital.dataset_size as i64,
            local_accuracy: accuracy,
            local_loss: loss,
            timestamp: None,
        })
        .await;
    if !resp.success {
        warn!(hospital_id = %hospital.id, round, message = %resp.message, "submission refused");
    }
    Ok(resp.success)
}

pub async fn run(config: CoordinatorConfig, hospitals: usize) -> anyhow::Result<()> {
    if hospitals < config.min_clients {
        bail!(
            "{hospitals} hospitals can never reach a quorum of {}",
            config.min_clients
        );
    }

    let coordinator = Arc::new(Coordinator::new(config.clone(), Arc::new(SystemClock))?);
    coordinator.load_chain()?;
    let service = CoordinatorService::new(Arc::clone(&coordinator));

    let shutdown = Arc::new(ShutdownController::new());
    shutdown.watch_ledger(Arc::clone(coordinator.ledger()));
    let mut stop = shutdown.subscribe();
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let mut rng = rand::thread_rng();
    let mut roster = Vec::with_capacity(hospitals);
    for i in 1..=hospitals {
        let hospital = SimHospital {
            id: format!("hospital_{i}"),
            dataset_size: rng.gen_range(500..3000),
            skill: rng.gen_range(0.5..1.0),
        };
        let resp = service
            .register(RegisterRequest {
                hospital_id: hospital.id.clone(),
                hospital_name: format!("Simulated Hospital {i}"),
                dataset_size: hospital.dataset_size,
                dataset_type: "chest_xray".into(),
            })
            .await;
        if !resp.success {
            bail!("registration of {} failed: {}", hospital.id, resp.message);
        }
        roster.push(Arc::new(hospital));
    }
    let key = Arc::new(coordinator.public_key().clone());

    let start_round = coordinator.current_round() + 1;
    for round in start_round..=config.total_rounds {
        let mut tasks = JoinSet::new();
        for hospital in &roster {
            tasks.spawn(train_round(
                service.clone(),
                Arc::clone(&key),
                Arc::clone(hospital),
                round,
                config.total_rounds,
                config.encrypted_sample_size,
            ));
        }

        let mut accepted = 0usize;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(result) => {
                        if result?? {
                            accepted += 1;
                        }
                    }
                    None => break,
                },
                _ = stop.recv() => {
                    tasks.abort_all();
                    info!(round, "simulation interrupted");
                    // Seal what was recorded before the interruption.
                    coordinator.ledger().resume_mining();
                    return finish(&coordinator, &signals);
                }
            }
        }

        let status = service
            .get_training_status(TrainingStatusRequest::default())
            .await;
        info!(
            round,
            accepted,
            global_accuracy = status.global_accuracy,
            next_round_eta = %status.next_round_eta,
            "round finished"
        );
    }

    finish(&coordinator, &signals)
}

fn finish(coordinator: &Coordinator, signals: &tokio::task::JoinHandle<()>) -> anyhow::Result<()> {
    signals.abort();
    coordinator.save_chain()?;
    println!("{}", serde_json::to_string_pretty(&coordinator.training_summary())?);
    println!("{}", serde_json::to_string_pretty(&coordinator.leaderboard())?);
    Ok(())
}
