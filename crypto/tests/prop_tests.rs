use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use corechain_crypto::{
    decrypt, decrypt_sample, encrypt_with_rng, homomorphic_add, WeightKeypair, FIXED_POINT_SCALE,
};
use corechain_types::{LayerTensor, ModelWeights};

/// Values well inside the range the fixed-point encoding accepts for any key.
fn weight() -> impl Strategy<Value = f32> {
    -100.0f32..100.0
}

fn layer() -> impl Strategy<Value = LayerTensor> {
    prop::collection::vec(1usize..5, 1..4).prop_flat_map(|shape| {
        let len = shape.iter().product::<usize>();
        prop::collection::vec(weight(), len)
            .prop_map(move |values| LayerTensor::new(shape.clone(), values).unwrap())
    })
}

fn model() -> impl Strategy<Value = ModelWeights> {
    prop::collection::vec(layer(), 1..4).prop_map(ModelWeights::new)
}

fn keypair(seed: u64) -> WeightKeypair {
    WeightKeypair::generate(&mut StdRng::seed_from_u64(seed))
}

proptest! {
    /// Decrypting an encrypted model gives back every value bit-exact,
    /// whatever part of each layer the encrypted sample covers.
    #[test]
    fn decrypt_inverts_encrypt(
        weights in model(),
        sample_size in 0usize..80,
        seed in any::<u64>(),
    ) {
        let kp = keypair(seed);
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
        let bytes = encrypt_with_rng(&weights, &kp.public, sample_size, &mut rng).unwrap();
        prop_assert_eq!(decrypt(&bytes, &kp.private).unwrap(), weights.clone());

        let sample = decrypt_sample(&bytes, &kp.private).unwrap();
        for (decoded, layer) in sample.iter().zip(weights.layers()) {
            prop_assert_eq!(decoded.len(), sample_size.min(layer.len()));
            for (d, &v) in decoded.iter().zip(&layer.values) {
                prop_assert!((d - f64::from(v)).abs() <= 0.5 / FIXED_POINT_SCALE + 1e-9);
            }
        }
    }

    /// Combining two payloads sums their values, and the encrypted samples
    /// add up to the same total within fixed-point rounding.
    #[test]
    fn homomorphic_add_sums_values(
        pair in (1usize..32).prop_flat_map(|n| {
            (prop::collection::vec(weight(), n), prop::collection::vec(weight(), n))
        }),
        sample_size in 0usize..40,
        seed in any::<u64>(),
    ) {
        let (a, b) = pair;
        let kp = keypair(seed);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let wa = ModelWeights::new(vec![LayerTensor::vector(a.clone())]);
        let wb = ModelWeights::new(vec![LayerTensor::vector(b.clone())]);
        let ea = encrypt_with_rng(&wa, &kp.public, sample_size, &mut rng).unwrap();
        let eb = encrypt_with_rng(&wb, &kp.public, sample_size, &mut rng).unwrap();

        let sum = homomorphic_add(&ea, &eb, &kp.public).unwrap();
        let expected: Vec<f32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
        let opened = decrypt(&sum, &kp.private).unwrap();
        prop_assert_eq!(&opened.layers()[0].values, &expected);

        let sample = decrypt_sample(&sum, &kp.private).unwrap();
        prop_assert_eq!(sample[0].len(), sample_size.min(a.len()));
        for (d, &v) in sample[0].iter().zip(&expected) {
            prop_assert!((d - f64::from(v)).abs() <= 1.0 / FIXED_POINT_SCALE + 1e-5);
        }
    }
}
