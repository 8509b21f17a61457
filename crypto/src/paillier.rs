//! Demonstration-sized Paillier keys.
//!
//! Primes are drawn from `[2^15, 2^16)` so that `n^2` fits in a `u64` and every
//! modular product fits in a `u128`. With `g = n + 1`:
//!
//! - `Enc(m, r) = (1 + m·n) · r^n mod n^2`
//! - `Dec(c)    = L(c^λ mod n^2) · μ mod n`, where `L(x) = (x - 1) / n`
//! - `Enc(a) · Enc(b) = Enc(a + b mod n)`
//!
//! Keys of this size offer no security whatsoever.

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::CodecError;

const PRIME_LOW: u64 = 1 << 15;
const PRIME_HIGH: u64 = 1 << 16;

/// A Paillier ciphertext, an element of `Z*_{n^2}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(pub u64);

/// Public half of the coordinator's keypair. Distributed to hospitals at registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightPublicKey {
    n: u64,
}

/// Private half of the coordinator's keypair. Never leaves the coordinator.
///
/// Intentionally neither `Debug`, `Clone` nor `Serialize`; zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WeightPrivateKey {
    n: u64,
    lambda: u64,
    mu: u64,
}

/// A matched public/private key pair.
pub struct WeightKeypair {
    pub public: WeightPublicKey,
    pub private: WeightPrivateKey,
}

impl WeightKeypair {
    /// Generate a fresh keypair.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let p = random_prime(rng);
            let q = random_prime(rng);
            if p == q {
                continue;
            }
            let n = p * q;
            let lambda = lcm(p - 1, q - 1);
            if gcd(n, (p - 1) * (q - 1)) != 1 {
                continue;
            }
            let Some(mu) = mod_inverse(lambda % n, n) else {
                continue;
            };
            tracing::debug!(modulus = n, "generated weight-protection keypair");
            return Self {
                public: WeightPublicKey { n },
                private: WeightPrivateKey { n, lambda, mu },
            };
        }
    }
}

impl WeightPublicKey {
    /// The modulus `n`; doubles as the key fingerprint inside payloads.
    pub fn modulus(&self) -> u64 {
        self.n
    }

    fn n_squared(&self) -> u64 {
        self.n * self.n
    }

    /// Encrypt `m` (must be `< n`) with fresh randomness.
    pub fn encrypt<R: Rng + ?Sized>(&self, m: u64, rng: &mut R) -> Ciphertext {
        let n = self.n;
        let n2 = self.n_squared();
        let r = loop {
            let r = rng.gen_range(1..n);
            if gcd(r, n) == 1 {
                break r;
            }
        };
        let gm = (1 + (m % n) * n) % n2;
        Ciphertext(mul_mod(gm, pow_mod(r, n, n2), n2))
    }

    /// Homomorphic addition: the result decrypts to `Dec(a) + Dec(b) mod n`.
    pub fn add(&self, a: Ciphertext, b: Ciphertext) -> Ciphertext {
        Ciphertext(mul_mod(a.0, b.0, self.n_squared()))
    }

    /// Hex form handed to hospitals.
    pub fn to_hex(&self) -> String {
        hex::encode(self.n.to_be_bytes())
    }

    /// Parse a key produced by [`to_hex`](Self::to_hex).
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidKey("expected 8 bytes".into()))?;
        let n = u64::from_be_bytes(raw);
        if n < PRIME_LOW * PRIME_LOW || n >= PRIME_HIGH * PRIME_HIGH {
            return Err(CodecError::InvalidKey(format!("modulus {n} out of range")));
        }
        Ok(Self { n })
    }
}

impl WeightPrivateKey {
    pub fn modulus(&self) -> u64 {
        self.n
    }

    /// Decrypt a ciphertext to its residue in `[0, n)`.
    pub fn decrypt(&self, c: Ciphertext) -> u64 {
        let n = self.n;
        let n2 = n * n;
        let x = pow_mod(c.0 % n2, self.lambda, n2);
        let l = (x.wrapping_sub(1) % n2) / n;
        mul_mod(l, self.mu, n)
    }
}

fn random_prime<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    loop {
        let candidate = rng.gen_range(PRIME_LOW..PRIME_HIGH) | 1;
        if is_prime(candidate) {
            return candidate;
        }
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut acc = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    acc
}

fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}
