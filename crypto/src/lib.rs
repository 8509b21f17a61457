//! Cryptographic primitives for CoreChain.
//!
//! - **SHA-256** for block and transaction hashes
//! - **Paillier** (demonstration-sized) for additively homomorphic encryption
//! - The **weight-protection codec** that wraps model updates for transport
//!
//! The Paillier keys here are deliberately tiny and the codec carries the
//! plaintext weights next to the encrypted sample. This is a transport
//! placeholder, not a confidentiality boundary.

pub mod codec;
pub mod error;
pub mod hash;
pub mod paillier;

pub use codec::{decrypt, decrypt_sample, encrypt, encrypt_with_rng, homomorphic_add, FIXED_POINT_SCALE};
pub use error::CodecError;
pub use hash::{hash_block, hash_transaction, sha256};
pub use paillier::{Ciphertext, WeightKeypair, WeightPrivateKey, WeightPublicKey};
