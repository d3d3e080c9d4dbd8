//! # TOA Crypto
//!
//! Cryptographic primitives for the TOA tracker protocol.
//!
//! This crate provides:
//! - HMAC-SHA256 authentication tags (truncated per protocol field widths)
//! - Channel key derivation, including the historically observed variant set
//! - Counter-bound channel frame signing
//! - Secure random challenge generation
//! - Constant-time tag verification
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Truncation |
//! |----------|-----------|------------|
//! | Mutual auth tags | HMAC-SHA256 | first 16 bytes |
//! | Channel key | HMAC-SHA256 | first 16 bytes |
//! | Channel frame tags | HMAC-SHA256 over a zero-padded 32-byte block | first 4 bytes |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod constant_time;
pub mod derive;
pub mod error;
pub mod keys;
pub mod mac;
pub mod random;

pub use derive::DerivationVariant;
pub use error::CryptoError;
pub use keys::{AuthKey, ChannelKey};

/// Authentication key size (fixed, bound to one tracker)
pub const AUTH_KEY_SIZE: usize = 16;

/// Channel key size
pub const CHANNEL_KEY_SIZE: usize = 16;

/// Challenge size (`rand_a` / `rand_b`)
pub const CHALLENGE_SIZE: usize = 8;

/// Mutual authentication tag size (truncated HMAC-SHA256)
pub const AUTH_TAG_SIZE: usize = 16;

/// Channel frame tag size (truncated HMAC-SHA256)
pub const CHANNEL_TAG_SIZE: usize = 4;

/// Channel signing message block size (shorter messages are zero-padded)
pub const SIGNING_BLOCK_SIZE: usize = 32;

/// An 8-byte authentication challenge.
pub type Challenge = [u8; CHALLENGE_SIZE];
