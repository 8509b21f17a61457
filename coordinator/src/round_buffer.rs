//! Per-round submission buffers.
//!
//! Each round has its own slot behind its own mutex, so submissions to
//! different rounds never contend. Validation, ledger admission, buffering
//! and the quorum check for one round all happen under that round's lock,
//! which is what guarantees a round is aggregated at most once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::aggregation::BufferedUpdate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Accepting submissions.
    Open,
    /// Quorum met, aggregation in progress.
    QuorumReached,
    /// Aggregated; further submissions are refused.
    Aggregated,
}

#[derive(Debug)]
pub struct RoundSlot {
    pub state: RoundState,
    pub updates: Vec<BufferedUpdate>,
}

impl RoundSlot {
    fn new() -> Self {
        Self {
            state: RoundState::Open,
            updates: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct RoundBuffers {
    rounds: Mutex<HashMap<u64, Arc<Mutex<RoundSlot>>>>,
}

impl RoundBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `round`, created open and empty on first use.
    pub fn slot(&self, round: u64) -> Arc<Mutex<RoundSlot>> {
        let mut rounds = self.rounds.lock();
        Arc::clone(
            rounds
                .entry(round)
                .or_insert_with(|| Arc::new(Mutex::new(RoundSlot::new()))),
        )
    }

    pub fn state(&self, round: u64) -> Option<RoundState> {
        let slot = self.rounds.lock().get(&round).cloned()?;
        let state = slot.lock().state;
        Some(state)
    }

    /// Updates currently waiting in `round`.
    pub fn buffered(&self, round: u64) -> usize {
        let Some(slot) = self.rounds.lock().get(&round).cloned() else {
            return 0;
        };
        let count = slot.lock().updates.len();
        count
    }
}
