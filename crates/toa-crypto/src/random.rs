//! Secure random number generation.
//!
//! All randomness comes from the operating system CSPRNG.

use crate::{CHALLENGE_SIZE, CryptoError};

/// Fill a buffer with random bytes from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CryptoError::RandomFailed`] if the underlying OS CSPRNG fails.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::RandomFailed)
}

/// Generate a fresh 8-byte authentication challenge.
///
/// # Errors
///
/// Returns [`CryptoError::RandomFailed`] if the underlying OS CSPRNG fails.
pub fn random_challenge() -> Result<[u8; CHALLENGE_SIZE], CryptoError> {
    let mut buf = [0u8; CHALLENGE_SIZE];
    fill_random(&mut buf)?;
    Ok(buf)
}
