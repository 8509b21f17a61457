//! Chain persistence: save and reload the full block list as JSON.
//!
//! The file is a pretty-printed JSON array of block records, each exposing
//! `index, timestamp, transactions, previous_hash, nonce, hash`. Hashes are
//! persisted and restored verbatim, never recomputed at load time, so a
//! reloaded chain validates exactly when the saved one did.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::block::Block;
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Serialize blocks to the on-disk representation.
pub fn blocks_to_json(blocks: &[Block]) -> Vec<u8> {
    serde_json::to_vec_pretty(blocks).expect("chain serialization is infallible")
}

/// Parse the on-disk representation. An empty list is rejected.
pub fn blocks_from_json(bytes: &[u8]) -> Result<Vec<Block>, LedgerError> {
    let blocks: Vec<Block> =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    if blocks.is_empty() {
        return Err(LedgerError::EmptyChain);
    }
    Ok(blocks)
}

impl Ledger {
    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.read(|chain| blocks_to_json(chain.blocks()))
    }

    /// Replace the chain with one parsed from `bytes`. Pending transactions are dropped.
    pub fn from_json_bytes(&self, bytes: &[u8]) -> Result<(), LedgerError> {
        self.replace_blocks(blocks_from_json(bytes)?)
    }

    /// Write the sealed chain to `path`, creating parent directories.
    ///
    /// Writes to a sibling temporary file first and renames it into place.
    pub fn save_to_file(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.to_json_bytes();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), bytes = bytes.len(), blocks = self.len(), "chain saved");
        Ok(())
    }

    /// Load a chain saved by [`save_to_file`](Self::save_to_file).
    ///
    /// Returns `Ok(false)` if the file does not exist.
    pub fn load_from_file(&self, path: &Path) -> Result<bool, LedgerError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no saved chain found");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        self.from_json_bytes(&bytes)?;
        info!(path = %path.display(), blocks = self.len(), "chain loaded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_rejected() {
        assert!(matches!(blocks_from_json(b"[]"), Err(LedgerError::EmptyChain)));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            blocks_from_json(b"{\"not\":\"blocks\"}"),
            Err(LedgerError::Serialization(_))
        ));
    }
}
