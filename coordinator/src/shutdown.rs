//! Graceful shutdown for a running coordinator.
//!
//! SIGINT/SIGTERM (or a programmatic call) is broadcast to every subscriber,
//! and any registered ledger has its nonce search cancelled so a long seal
//! does not hold the process open.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use corechain_ledger::Ledger;
use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
    ledgers: Mutex<Vec<Arc<Ledger>>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
            ledgers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Cancel `ledger`'s mining when shutdown fires.
    pub fn watch_ledger(&self, ledger: Arc<Ledger>) {
        self.ledgers.lock().push(ledger);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Trigger shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return;
        }
        for ledger in self.ledgers.lock().iter() {
            ledger.cancel_mining();
        }
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { info!("received SIGINT, shutting down"); }
            _ = terminate => { info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
