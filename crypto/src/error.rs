use thiserror::Error;

/// Failures of the weight-protection codec. Any of these discards the submission.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload was encrypted for modulus {found}, expected {expected}")]
    KeyMismatch { expected: u64, found: u64 },

    #[error("layer {layer}: shape {shape:?} does not match {values} values")]
    ShapeMismatch {
        layer: usize,
        shape: Vec<usize>,
        values: usize,
    },

    #[error("layer {layer}: encrypted sample disagrees with payload at index {index}")]
    SampleMismatch { layer: usize, index: usize },

    #[error("value {0} cannot be encoded in the plaintext space")]
    ValueOutOfRange(f32),

    #[error("payloads have different layouts: {0}")]
    LayoutMismatch(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
