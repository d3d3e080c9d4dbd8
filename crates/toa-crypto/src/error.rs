//! Error types for TOA cryptographic operations.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS CSPRNG failed to produce randomness
    #[error("random number generation failed")]
    RandomFailed,

    /// Key material had the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key size in bytes
        expected: usize,
        /// Actual size provided
        actual: usize,
    },

    /// Key material was not valid hex
    #[error("invalid hex key material")]
    InvalidHex,

    /// Payload does not fit in the fixed signing block
    #[error("payload too long to sign: {len} bytes exceeds the {max}-byte block")]
    PayloadTooLong {
        /// Payload length in bytes
        len: usize,
        /// Maximum signable payload length
        max: usize,
    },
}
