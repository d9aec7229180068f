//! Error types for parsing cryptographic values.

use thiserror::Error;

/// Errors produced when reconstructing cryptographic values from stored or
/// transported representations. Generation itself is infallible.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid account entropy pool: expected {expected} chars of [a-z0-9], got {actual}")]
    InvalidEntropyPool { expected: usize, actual: usize },

    #[error("Invalid master key length: expected {expected} bytes, got {actual}")]
    InvalidMasterKey { expected: usize, actual: usize },

    #[error("Invalid service id: {0}")]
    InvalidServiceId(String),
}
