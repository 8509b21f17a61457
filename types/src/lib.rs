//! Fundamental types for CoreChain.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! block and transaction hashes, timestamps and the clock abstraction, hospital
//! identifiers, model weight tensors, protocol parameters and canonical JSON.

pub mod block;
pub mod canonical;
pub mod error;
pub mod hash;
pub mod hospital;
pub mod model;
pub mod params;
pub mod time;

pub use block::BlockHash;
pub use canonical::canonical_json;
pub use error::TypesError;
pub use hash::TxHash;
pub use hospital::HospitalId;
pub use model::{LayerTensor, ModelWeights};
pub use params::ProtocolParams;
pub use time::{Clock, SystemClock, Timestamp};
