//! Key material for the TOA protocol.
//!
//! Both key types are zeroized on drop. The auth key is supplied externally
//! (resolved from provider device metadata by an account client outside this
//! crate) and is never persisted here.

use crate::{AUTH_KEY_SIZE, CHANNEL_KEY_SIZE, CryptoError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 16-byte secret bound to one tracker.
///
/// Immutable for the lifetime of the value; cloning is allowed because the
/// ring service retries the full sequence with independent authenticator
/// state per derivation variant.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AuthKey([u8; AUTH_KEY_SIZE]);

impl AuthKey {
    /// Create an auth key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; AUTH_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create an auth key from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly
    /// 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; AUTH_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: AUTH_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Create an auth key from a hex string, as delivered by the cloud API.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHex`] for malformed hex and
    /// [`CryptoError::InvalidKeyLength`] for a decoded length other than 16.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// Raw key bytes, for use as HMAC key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log key material
        f.write_str("AuthKey(..)")
    }
}

/// 16-byte symmetric key derived once per successful mutual authentication.
///
/// Owned by the session until teardown; signs and verifies channel frames.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChannelKey([u8; CHANNEL_KEY_SIZE]);

impl ChannelKey {
    /// Create a channel key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; CHANNEL_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, for use as HMAC key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CHANNEL_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChannelKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_key_from_hex() {
        let key = AuthKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(key.as_bytes()[0], 0x00);
        assert_eq!(key.as_bytes()[15], 0x0f);
    }

    #[test]
    fn test_auth_key_from_hex_bad_length() {
        let err = AuthKey::from_hex("0001").unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 16,
                actual: 2
            }
        );
    }

    #[test]
    fn test_auth_key_from_hex_malformed() {
        assert_eq!(
            AuthKey::from_hex("zz0102030405060708090a0b0c0d0e0f").unwrap_err(),
            CryptoError::InvalidHex
        );
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = AuthKey::new([0xAA; 16]);
        assert_eq!(format!("{key:?}"), "AuthKey(..)");
        let chan = ChannelKey::new([0xBB; 16]);
        assert_eq!(format!("{chan:?}"), "ChannelKey(..)");
    }
}
