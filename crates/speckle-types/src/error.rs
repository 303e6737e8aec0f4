use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid unit: {0:?} is not a recognised length unit")]
    InvalidUnit(String),

    #[error("invalid unit encoding: {0}")]
    InvalidUnitEncoding(i64),
}
