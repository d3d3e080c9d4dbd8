//! Constant-time cryptographic operations.
//!
//! Tag comparisons are timing-safe with respect to tag content. An attacker
//! observing response timing must not learn how many authenticator bytes
//! matched.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices.
///
/// Returns `true` if slices are equal, `false` otherwise.
/// Execution time depends only on slice length, not content.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Timing-safe 16-byte authentication tag comparison.
#[must_use]
#[inline(never)]
pub fn verify_auth_tag(a: &[u8; 16], b: &[u8; 16]) -> bool {
    ct_eq(a, b)
}

/// Timing-safe 4-byte channel tag comparison.
#[must_use]
#[inline(never)]
pub fn verify_channel_tag(a: &[u8; 4], b: &[u8; 4]) -> bool {
    ct_eq(a, b)
}
