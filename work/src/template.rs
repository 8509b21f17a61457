//! Pre-serialized block bytes with a hole for the nonce.
//!
//! Re-serializing a whole block per attempt dominates mining time. The
//! template stores the canonical bytes before and after the nonce so each
//! attempt only hashes `prefix || decimal(nonce) || suffix`, and the SHA-256
//! state after the prefix is computed once and cloned.

use corechain_crypto::hash::Sha256State;

/// Canonical serialization split around the nonce field.
#[derive(Clone, Debug)]
pub struct PowTemplate {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl PowTemplate {
    pub fn new(prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        Self { prefix, suffix }
    }

    /// The full serialization for a given nonce.
    pub fn render(&self, nonce: u64) -> Vec<u8> {
        let digits = nonce.to_string();
        let mut out = Vec::with_capacity(self.prefix.len() + digits.len() + self.suffix.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(digits.as_bytes());
        out.extend_from_slice(&self.suffix);
        out
    }

    /// SHA-256 of [`render`](Self::render) for a given nonce.
    pub fn hash(&self, nonce: u64) -> [u8; 32] {
        self.hasher().hash(nonce)
    }

    /// A reusable hasher with the prefix already absorbed.
    pub fn hasher(&self) -> TemplateHasher<'_> {
        let mut state = Sha256State::new();
        state.update(&self.prefix);
        TemplateHasher {
            primed: state,
            suffix: &self.suffix,
        }
    }
}

/// Hashes nonces against one template without re-absorbing the prefix.
pub struct TemplateHasher<'a> {
    primed: Sha256State,
    suffix: &'a [u8],
}

impl TemplateHasher<'_> {
    pub fn hash(&self, nonce: u64) -> [u8; 32] {
        let mut state = self.primed.clone();
        let mut buf = [0u8; 20];
        state.update(format_decimal(nonce, &mut buf));
        state.update(self.suffix);
        state.finalize()
    }
}

/// Write `n` in decimal into `buf`, returning the used tail.
fn format_decimal(mut n: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[i..]
}
