//! Weight-protection codec.
//!
//! A protected payload carries, per layer, the shape, the plaintext values and
//! Paillier encryptions of the first `sample_size` values in fixed point. The
//! coordinator checks the encrypted sample against the plaintext on decrypt,
//! so a payload encrypted under a different key or altered in transit is
//! rejected.

use corechain_types::{LayerTensor, ModelWeights};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::paillier::{Ciphertext, WeightPrivateKey, WeightPublicKey};
use crate::CodecError;

/// Fixed-point scale applied before encryption. Four decimal digits survive.
pub const FIXED_POINT_SCALE: f64 = 10_000.0;

const PAYLOAD_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedPayload {
    version: u8,
    modulus: u64,
    /// Number of client updates summed into this payload.
    contributors: u32,
    layers: Vec<ProtectedLayer>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedLayer {
    shape: Vec<usize>,
    encrypted_sample: Vec<Ciphertext>,
    values: Vec<f32>,
}

/// Protect `weights` for transport with fresh thread-local randomness.
pub fn encrypt(
    weights: &ModelWeights,
    key: &WeightPublicKey,
    sample_size: usize,
) -> Result<Vec<u8>, CodecError> {
    encrypt_with_rng(weights, key, sample_size, &mut rand::thread_rng())
}

/// Protect `weights` using the supplied randomness source.
pub fn encrypt_with_rng<R: Rng + ?Sized>(
    weights: &ModelWeights,
    key: &WeightPublicKey,
    sample_size: usize,
    rng: &mut R,
) -> Result<Vec<u8>, CodecError> {
    let mut layers = Vec::with_capacity(weights.layer_count());
    for tensor in weights.layers() {
        let take = sample_size.min(tensor.values.len());
        let mut encrypted_sample = Vec::with_capacity(take);
        for &value in &tensor.values[..take] {
            let residue = encode(value, key.modulus())?;
            encrypted_sample.push(key.encrypt(residue, rng));
        }
        layers.push(ProtectedLayer {
            shape: tensor.shape.clone(),
            encrypted_sample,
            values: tensor.values.clone(),
        });
    }
    let payload = ProtectedPayload {
        version: PAYLOAD_VERSION,
        modulus: key.modulus(),
        contributors: 1,
        layers,
    };
    let bytes = bincode::serialize(&payload).expect("payload serialization is infallible");
    tracing::trace!(
        layers = payload.layers.len(),
        bytes = bytes.len(),
        "encrypted model weights"
    );
    Ok(bytes)
}

/// Open a protected payload and return the weights it carries.
///
/// Fails if the payload cannot be parsed, was produced under a different key,
/// declares inconsistent shapes, or its encrypted sample disagrees with its values.
pub fn decrypt(bytes: &[u8], key: &WeightPrivateKey) -> Result<ModelWeights, CodecError> {
    let payload = parse(bytes, key.modulus())?;
    let n = key.modulus();
    let tolerance = i64::from(payload.contributors.max(1));

    let mut layers = Vec::with_capacity(payload.layers.len());
    for (layer_index, layer) in payload.layers.into_iter().enumerate() {
        for (index, (&c, &value)) in layer
            .encrypted_sample
            .iter()
            .zip(&layer.values)
            .enumerate()
        {
            let expected = to_fixed(value, n)?;
            let found = decode(key.decrypt(c), n);
            if (expected - found).abs() > tolerance {
                return Err(CodecError::SampleMismatch {
                    layer: layer_index,
                    index,
                });
            }
        }
        layers.push(LayerTensor {
            shape: layer.shape,
            values: layer.values,
        });
    }
    Ok(ModelWeights::new(layers))
}

/// Decrypt only the encrypted sample of each layer, as real numbers.
pub fn decrypt_sample(bytes: &[u8], key: &WeightPrivateKey) -> Result<Vec<Vec<f64>>, CodecError> {
    let payload = parse(bytes, key.modulus())?;
    let n = key.modulus();
    Ok(payload
        .layers
        .iter()
        .map(|layer| {
            layer
                .encrypted_sample
                .iter()
                .map(|&c| decode(key.decrypt(c), n) as f64 / FIXED_POINT_SCALE)
                .collect()
        })
        .collect())
}

/// Combine two payloads without decrypting: encrypted samples are multiplied
/// (adding the underlying plaintexts) and plaintext values are summed.
pub fn homomorphic_add(a: &[u8], b: &[u8], key: &WeightPublicKey) -> Result<Vec<u8>, CodecError> {
    let a = parse(a, key.modulus())?;
    let b = parse(b, key.modulus())?;
    if a.layers.len() != b.layers.len() {
        return Err(CodecError::LayoutMismatch(format!(
            "{} layers vs {}",
            a.layers.len(),
            b.layers.len()
        )));
    }

    let mut layers = Vec::with_capacity(a.layers.len());
    for (i, (la, lb)) in a.layers.into_iter().zip(b.layers).enumerate() {
        if la.shape != lb.shape || la.encrypted_sample.len() != lb.encrypted_sample.len() {
            return Err(CodecError::LayoutMismatch(format!("layer {i}")));
        }
        let encrypted_sample = la
            .encrypted_sample
            .iter()
            .zip(&lb.encrypted_sample)
            .map(|(&x, &y)| key.add(x, y))
            .collect();
        let values = la.values.iter().zip(&lb.values).map(|(x, y)| x + y).collect();
        layers.push(ProtectedLayer {
            shape: la.shape,
            encrypted_sample,
            values,
        });
    }

    let combined = ProtectedPayload {
        version: PAYLOAD_VERSION,
        modulus: key.modulus(),
        contributors: a.contributors.saturating_add(b.contributors),
        layers,
    };
    Ok(bincode::serialize(&combined).expect("payload serialization is infallible"))
}

fn parse(bytes: &[u8], modulus: u64) -> Result<ProtectedPayload, CodecError> {
    let payload: ProtectedPayload =
        bincode::deserialize(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    if payload.version != PAYLOAD_VERSION {
        return Err(CodecError::Malformed(format!(
            "unsupported payload version {}",
            payload.version
        )));
    }
    if payload.modulus != modulus {
        return Err(CodecError::KeyMismatch {
            expected: modulus,
            found: payload.modulus,
        });
    }
    for (layer, l) in payload.layers.iter().enumerate() {
        if LayerTensor::element_count(&l.shape) != Some(l.values.len()) {
            return Err(CodecError::ShapeMismatch {
                layer,
                shape: l.shape.clone(),
                values: l.values.len(),
            });
        }
        if l.encrypted_sample.len() > l.values.len() {
            return Err(CodecError::Malformed(format!(
                "layer {layer}: sample longer than values"
            )));
        }
    }
    Ok(payload)
}

/// Signed fixed-point representation of `value`, bounded to half the modulus.
fn to_fixed(value: f32, n: u64) -> Result<i64, CodecError> {
    let scaled = (f64::from(value) * FIXED_POINT_SCALE).round();
    let half = (n / 2) as f64;
    if !scaled.is_finite() || scaled.abs() >= half {
        return Err(CodecError::ValueOutOfRange(value));
    }
    Ok(scaled as i64)
}

/// Map a value into `[0, n)`; negatives occupy the upper half.
fn encode(value: f32, n: u64) -> Result<u64, CodecError> {
    let fixed = to_fixed(value, n)?;
    Ok(fixed.rem_euclid(n as i64) as u64)
}

fn decode(residue: u64, n: u64) -> i64 {
    if residue > n / 2 {
        residue as i64 - n as i64
    } else {
        residue as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightKeypair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keypair(seed: u64) -> WeightKeypair {
        WeightKeypair::generate(&mut StdRng::seed_from_u64(seed))
    }

    fn model() -> ModelWeights {
        ModelWeights::new(vec![
            LayerTensor::new(vec![2, 2], vec![0.1234, -0.5, 1.0, 0.0]).unwrap(),
            LayerTensor::vector(vec![-2.25, 3.5, 0.000_01]),
        ])
    }

    #[test]
    fn decrypt_returns_exact_values() {
        let kp = keypair(1);
        let mut rng = StdRng::seed_from_u64(9);
        let bytes = encrypt_with_rng(&model(), &kp.public, 100, &mut rng).unwrap();
        assert_eq!(decrypt(&bytes, &kp.private).unwrap(), model());
    }

    #[test]
    fn sample_size_limits_encrypted_prefix() {
        let kp = keypair(1);
        let mut rng = StdRng::seed_from_u64(9);
        let bytes = encrypt_with_rng(&model(), &kp.public, 2, &mut rng).unwrap();
        let sample = decrypt_sample(&bytes, &kp.private).unwrap();
        assert_eq!(sample[0], vec![0.1234, -0.5]);
        assert_eq!(sample[1], vec![-2.25, 3.5]);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let a = keypair(1);
        let mut b = keypair(2);
        let mut seed = 3;
        while b.public == a.public {
            b = keypair(seed);
            seed += 1;
        }
        let bytes = encrypt(&model(), &a.public, 100).unwrap();
        assert!(matches!(
            decrypt(&bytes, &b.private),
            Err(CodecError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let kp = keypair(1);
        assert!(matches!(
            decrypt(b"not a payload", &kp.private),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(decrypt(&[], &kp.private), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn tampered_values_fail_the_sample_check() {
        let kp = keypair(1);
        let bytes = encrypt(&model(), &kp.public, 100).unwrap();
        let mut payload: ProtectedPayload = bincode::deserialize(&bytes).unwrap();
        payload.layers[1].values[0] = 7.0;
        let tampered = bincode::serialize(&payload).unwrap();
        assert_eq!(
            decrypt(&tampered, &kp.private),
            Err(CodecError::SampleMismatch { layer: 1, index: 0 })
        );
    }

    #[test]
    fn inconsistent_shape_is_rejected() {
        let kp = keypair(1);
        let bytes = encrypt(&model(), &kp.public, 100).unwrap();
        let mut payload: ProtectedPayload = bincode::deserialize(&bytes).unwrap();
        payload.layers[0].shape = vec![3, 3];
        let broken = bincode::serialize(&payload).unwrap();
        assert!(matches!(
            decrypt(&broken, &kp.private),
            Err(CodecError::ShapeMismatch { layer: 0, .. })
        ));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let kp = keypair(1);
        let payload = ProtectedPayload {
            version: PAYLOAD_VERSION,
            modulus: kp.public.modulus(),
            contributors: 1,
            layers: vec![ProtectedLayer {
                shape: vec![usize::MAX, 2],
                encrypted_sample: vec![],
                values: vec![],
            }],
        };
        let bytes = bincode::serialize(&payload).unwrap();
        assert!(matches!(
            decrypt(&bytes, &kp.private),
            Err(CodecError::ShapeMismatch { layer: 0, values: 0, .. })
        ));
        assert!(matches!(
            homomorphic_add(&bytes, &bytes, &kp.public),
            Err(CodecError::ShapeMismatch { layer: 0, .. })
        ));
    }

    #[test]
    fn non_finite_values_cannot_be_encrypted() {
        let kp = keypair(1);
        let weights = ModelWeights::new(vec![LayerTensor::vector(vec![f32::NAN])]);
        assert!(matches!(
            encrypt(&weights, &kp.public, 100),
            Err(CodecError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn homomorphic_sum_matches_plaintext_sum() {
        let kp = keypair(4);
        let a = ModelWeights::new(vec![LayerTensor::vector(vec![0.25, -1.5])]);
        let b = ModelWeights::new(vec![LayerTensor::vector(vec![0.5, 0.75])]);
        let ea = encrypt(&a, &kp.public, 100).unwrap();
        let eb = encrypt(&b, &kp.public, 100).unwrap();

        let sum = homomorphic_add(&ea, &eb, &kp.public).unwrap();
        assert_eq!(decrypt_sample(&sum, &kp.private).unwrap(), vec![vec![0.75, -0.75]]);
        let opened = decrypt(&sum, &kp.private).unwrap();
        assert_eq!(opened.layers()[0].values, vec![0.75, -0.75]);
    }

    #[test]
    fn homomorphic_add_requires_matching_layout() {
        let kp = keypair(4);
        let a = ModelWeights::new(vec![LayerTensor::vector(vec![0.25, -1.5])]);
        let b = ModelWeights::new(vec![LayerTensor::vector(vec![0.5])]);
        let ea = encrypt(&a, &kp.public, 100).unwrap();
        let eb = encrypt(&b, &kp.public, 100).unwrap();
        assert!(matches!(
            homomorphic_add(&ea, &eb, &kp.public),
            Err(CodecError::LayoutMismatch(_))
        ));
    }
}
