//! Round coordination for CoreChain federated training.
//!
//! The [`Coordinator`] owns the ledger, the weight-protection keypair, the
//! per-round update buffers and the current global model. [`CoordinatorService`]
//! wraps it for async callers.

pub mod aggregation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod registry;
pub mod round_buffer;
pub mod service;
pub mod shutdown;

pub use aggregation::{weighted_average, Aggregate, AggregationError, BufferedUpdate};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, GlobalModel};
pub use error::CoordinatorError;
pub use metrics::CoordinatorMetrics;
pub use registry::HospitalRecord;
pub use round_buffer::RoundState;
pub use service::CoordinatorService;
pub use shutdown::ShutdownController;
