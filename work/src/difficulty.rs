//! Leading-zero difficulty check.

use crate::WorkError;

/// A SHA-256 digest has 64 hex digits.
pub const MAX_DIFFICULTY: u32 = 64;

/// Reject difficulties that no digest can satisfy.
pub fn check_difficulty(difficulty: u32) -> Result<(), WorkError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(WorkError::InvalidDifficulty {
            requested: difficulty,
            maximum: MAX_DIFFICULTY,
        });
    }
    Ok(())
}

/// Whether `hash` starts with at least `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &[u8; 32], difficulty: u32) -> bool {
    if difficulty > MAX_DIFFICULTY {
        return false;
    }
    let full_bytes = (difficulty / 2) as usize;
    if hash[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    if difficulty % 2 == 1 {
        return hash[full_bytes] >> 4 == 0;
    }
    true
}
