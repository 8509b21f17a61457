//! Proof-of-work generation (multi-threaded CPU).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::difficulty::check_difficulty;
use crate::{meets_difficulty, CancelToken, PowTemplate, WorkError, WorkSolution};

/// Searches for the smallest nonce whose template hash meets the difficulty.
pub struct WorkGenerator;

/// Attempts per thread between cancellation/deadline checks.
const BATCH_SIZE: u64 = 4096;

const NOT_FOUND: u64 = u64::MAX;

impl WorkGenerator {
    /// Find the smallest valid nonce for `template`.
    ///
    /// Splits the nonce space across all available CPU cores via rayon, each
    /// thread scanning its stride in increasing order. A thread stops once its
    /// next nonce exceeds the best found so far, so the result equals that of a
    /// sequential scan from zero.
    pub fn generate(
        &self,
        template: &PowTemplate,
        difficulty: u32,
        cancel: &CancelToken,
        deadline: Option<Instant>,
    ) -> Result<WorkSolution, WorkError> {
        check_difficulty(difficulty)?;

        let best = AtomicU64::new(NOT_FOUND);
        let num_threads = rayon::current_num_threads().max(1) as u64;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let hasher = template.hasher();
            let mut nonce = thread_id;

            loop {
                if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                    return;
                }

                for _ in 0..BATCH_SIZE {
                    if nonce >= best.load(Ordering::Relaxed) {
                        return;
                    }
                    if meets_difficulty(&hasher.hash(nonce), difficulty) {
                        best.fetch_min(nonce, Ordering::Relaxed);
                        return;
                    }
                    nonce = match nonce.checked_add(num_threads) {
                        Some(next) => next,
                        None => return,
                    };
                }
            }
        });

        let nonce = best.load(Ordering::Relaxed);
        if nonce != NOT_FOUND {
            trace!(nonce, difficulty, threads = num_threads, "work found");
            return Ok(WorkSolution {
                nonce,
                hash: template.hash(nonce),
            });
        }
        let err = if cancel.is_cancelled() {
            WorkError::Cancelled
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            WorkError::TimedOut
        } else {
            WorkError::Exhausted
        };
        debug!(difficulty, error = %err, "work search stopped without a solution");
        Err(err)
    }
}
