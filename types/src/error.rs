//! Errors raised while parsing or constructing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("hospital id must not be empty")]
    EmptyHospitalId,

    #[error("tensor shape {shape:?} does not match {values} values")]
    ShapeMismatch { shape: Vec<usize>, values: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}
