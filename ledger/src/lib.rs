//! Hash-linked, proof-of-work-sealed audit ledger.
//!
//! A single-writer chain: blocks are appended by one process and can be
//! re-validated by anyone holding the saved file. There is no replication and
//! no consensus between nodes.

pub mod block;
pub mod chain;
pub mod error;
pub mod genesis;
pub mod ledger;
pub mod persistence;
pub mod stats;

pub use block::Block;
pub use chain::{Chain, LocatedTransaction};
pub use error::{IntegrityError, LedgerError};
pub use genesis::create_genesis_block;
pub use ledger::Ledger;
pub use stats::ChainStats;
