//! Canonical JSON: the byte form that block and transaction hashes are computed over.
//!
//! Values pass through [`serde_json::Value`], whose object map is ordered by key,
//! so every object at every depth is emitted with sorted keys and no whitespace.

use serde::Serialize;

use crate::TypesError;

/// Serialize `value` to compact, key-sorted JSON bytes.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, TypesError> {
    let tree = serde_json::to_value(value).map_err(|e| TypesError::Serialization(e.to_string()))?;
    serde_json::to_vec(&tree).map_err(|e| TypesError::Serialization(e.to_string()))
}
