//! Genesis transaction: the single record sealed into block 0.

use serde::{Deserialize, Serialize};

/// Message carried by the genesis block.
pub const GENESIS_MESSAGE: &str = "CoreChain Genesis Block";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisTx {
    pub message: String,
}

impl Default for GenesisTx {
    fn default() -> Self {
        Self {
            message: GENESIS_MESSAGE.to_string(),
        }
    }
}
