//! Async front for the coordinator.
//!
//! Every call runs the synchronous coordinator on the blocking pool (mining
//! and decoding are CPU-bound). Decoding a submission is bounded by the
//! configured timeout; once a payload is decoded its admission always runs
//! to completion, so a reported failure never hides a recorded update.
//! Failures become `success = false` responses instead of errors, matching
//! what hospitals expect on the wire.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::coordinator::Coordinator;
use crate::messages::{
    GlobalModelRequest, GlobalModelResponse, RegisterRequest, RegistrationResponse,
    SubmissionResponse, TrainingStatus, TrainingStatusRequest, UpdateSubmission,
};
use crate::CoordinatorError;

#[derive(Clone)]
pub struct CoordinatorService {
    inner: Arc<Coordinator>,
    decode_timeout: Duration,
}

impl CoordinatorService {
    pub fn new(inner: Arc<Coordinator>) -> Self {
        let decode_timeout = inner.config().decode_timeout();
        Self {
            inner,
            decode_timeout,
        }
    }

    /// Override the bound on decoding one submission.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.inner
    }

    pub async fn register(&self, req: RegisterRequest) -> RegistrationResponse {
        let inner = Arc::clone(&self.inner);
        match blocking("register", move || inner.register(&req)).await {
            Ok(resp) => resp,
            Err(e) => RegistrationResponse {
                success: false,
                message: e.to_string(),
                public_key: String::new(),
            },
        }
    }

    pub async fn submit_update(&self, sub: UpdateSubmission) -> SubmissionResponse {
        match self.decode_then_admit(sub).await {
            Ok(resp) => resp,
            Err(e) => SubmissionResponse {
                success: false,
                message: e.to_string(),
                current_round: self.inner.current_round(),
                total_participants: 0,
                transaction_hash: String::new(),
            },
        }
    }

    pub async fn get_global_model(&self, req: GlobalModelRequest) -> GlobalModelResponse {
        self.inner.get_global_model(&req)
    }

    pub async fn get_training_status(&self, req: TrainingStatusRequest) -> TrainingStatus {
        self.inner.get_training_status(&req)
    }

    async fn decode_then_admit(&self, sub: UpdateSubmission) -> Result<SubmissionResponse, CoordinatorError> {
        let sub = Arc::new(sub);
        let decode = {
            let inner = Arc::clone(&self.inner);
            let sub = Arc::clone(&sub);
            blocking("decode", move || inner.decode_update(&sub))
        };
        // A decode that outlives the bound finishes on the blocking pool and
        // its result is dropped; nothing has been written at that point.
        let weights = match tokio::time::timeout(self.decode_timeout, decode).await {
            Ok(result) => result?,
            Err(_) => {
                let millis = self.decode_timeout.as_millis() as u64;
                warn!(hospital_id = %sub.hospital_id, round = sub.round, millis, "decode timed out");
                self.inner.metrics().updates_rejected.inc();
                return Err(CoordinatorError::Timeout {
                    operation: "decode",
                    millis,
                });
            }
        };

        let inner = Arc::clone(&self.inner);
        blocking("submit_update", move || inner.admit_update(&sub, weights)).await
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T, CoordinatorError>
where
    F: FnOnce() -> Result<T, CoordinatorError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|join| CoordinatorError::Internal(format!("{operation} task failed: {join}")))?
}
