//! Authenticator derivation variants.
//!
//! Tracker firmware in the field disagrees on the exact HMAC message layout
//! used during mutual authentication. Each observed layout is modeled as a
//! pure, stateless candidate; callers try them in [`DerivationVariant::ALL`]
//! order and treat each attempt independently. There is no single "correct"
//! derivation to hard-code.
//!
//! All variants share the wire contract:
//!
//! - peer tag (peer → us): 16-byte truncated HMAC over both challenges
//! - local tag (us → peer): same, with the challenge order reversed
//! - channel key: 16-byte truncated HMAC over both challenges plus a
//!   variant-specific suffix

use crate::keys::{AuthKey, ChannelKey};
use crate::mac::auth_tag;
use crate::{AUTH_TAG_SIZE, CHALLENGE_SIZE, CHANNEL_KEY_SIZE};

/// One observed authenticator derivation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivationVariant {
    /// Current firmware: peer tag over `rand_b ‖ rand_a`, local tag over
    /// `rand_a ‖ rand_b`, channel key over `rand_a ‖ rand_b ‖ 0x00`.
    Canonical,
    /// Older firmware derives the channel key with an ASCII `"channel"`
    /// suffix instead of the single zero byte. Tag layout as canonical.
    LegacyLabel,
    /// Rare firmware with both challenge orders mirrored throughout.
    Swapped,
}

impl DerivationVariant {
    /// All variants in trial priority order (most common first).
    pub const ALL: [Self; 3] = [Self::Canonical, Self::LegacyLabel, Self::Swapped];

    /// Expected tag in the peer's authentication response.
    #[must_use]
    pub fn peer_tag(
        self,
        key: &AuthKey,
        rand_a: &[u8; CHALLENGE_SIZE],
        rand_b: &[u8; CHALLENGE_SIZE],
    ) -> [u8; AUTH_TAG_SIZE] {
        match self {
            Self::Canonical | Self::LegacyLabel => {
                auth_tag(key.as_bytes(), &concat(rand_b, rand_a, &[]))
            }
            Self::Swapped => auth_tag(key.as_bytes(), &concat(rand_a, rand_b, &[])),
        }
    }

    /// Tag we send to complete mutual authentication.
    #[must_use]
    pub fn local_tag(
        self,
        key: &AuthKey,
        rand_a: &[u8; CHALLENGE_SIZE],
        rand_b: &[u8; CHALLENGE_SIZE],
    ) -> [u8; AUTH_TAG_SIZE] {
        match self {
            Self::Canonical | Self::LegacyLabel => {
                auth_tag(key.as_bytes(), &concat(rand_a, rand_b, &[]))
            }
            Self::Swapped => auth_tag(key.as_bytes(), &concat(rand_b, rand_a, &[])),
        }
    }

    /// Derive the channel key for this authentication.
    ///
    /// Deterministic over its inputs; an independent peer given identical
    /// inputs reproduces the identical key.
    #[must_use]
    pub fn channel_key(
        self,
        key: &AuthKey,
        rand_a: &[u8; CHALLENGE_SIZE],
        rand_b: &[u8; CHALLENGE_SIZE],
    ) -> ChannelKey {
        let message = match self {
            Self::Canonical => concat(rand_a, rand_b, &[0x00]),
            Self::LegacyLabel => concat(rand_a, rand_b, b"channel"),
            Self::Swapped => concat(rand_b, rand_a, &[0x00]),
        };
        let digest = auth_tag(key.as_bytes(), &message);
        let mut out = [0u8; CHANNEL_KEY_SIZE];
        out.copy_from_slice(&digest[..CHANNEL_KEY_SIZE]);
        ChannelKey::new(out)
    }
}

impl std::fmt::Display for DerivationVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Canonical => "canonical",
            Self::LegacyLabel => "legacy-label",
            Self::Swapped => "swapped",
        };
        f.write_str(name)
    }
}

fn concat(a: &[u8; CHALLENGE_SIZE], b: &[u8; CHALLENGE_SIZE], suffix: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(2 * CHALLENGE_SIZE + suffix.len());
    message.extend_from_slice(a);
    message.extend_from_slice(b);
    message.extend_from_slice(suffix);
    message
}
