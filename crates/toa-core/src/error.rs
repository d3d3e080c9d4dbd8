//! Error types for the TOA core protocol.
//!
//! Layered like the wire stack: frame, session, and sequence errors each
//! have their own enum, and everything a ring attempt can fail with is
//! aggregated into [`RingError`] carrying the failing step and the
//! derivation variant in use, for diagnostics.
//!
//! The one failure mode with no error type is the protocol's own: a
//! well-formed ring frame signed against a desynchronized counter is
//! silently dropped by the peer, which emits nothing. That cannot be
//! observed, only prevented, which is why sequence preconditions are
//! checked before any transmission.

use crate::command::StepKind;
use crate::transport::TransportError;
use thiserror::Error;
use toa_crypto::{CryptoError, DerivationVariant};

/// Frame-level errors (decode failures, shape mismatches).
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame too short to parse
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Connectionless frames must start with the 0x00 marker byte
    #[error("invalid connectionless marker: 0x{0:02X}")]
    InvalidMarker(u8),

    /// Unknown opcode byte
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Payload length disagrees with the declared command's expected shape
    #[error("payload length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which payload was malformed
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A different opcode than the protocol state allows
    #[error("unexpected opcode: expected {expected:?}, got {actual:?}")]
    UnexpectedOpcode {
        /// Opcode the current step requires
        expected: crate::command::Opcode,
        /// Opcode actually received
        actual: crate::command::Opcode,
    },

    /// A channel frame tagged with a foreign channel id
    #[error("channel id mismatch: session is 0x{expected:02X}, frame is 0x{actual:02X}")]
    ChannelIdMismatch {
        /// Session channel id
        expected: u8,
        /// Frame channel id
        actual: u8,
    },
}

/// Session-level errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Cryptographic failure while signing or verifying
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// An incoming channel frame failed tag verification
    #[error("peer channel tag mismatch at receive counter {counter}")]
    PeerTagMismatch {
        /// Receive counter the tag was checked against
        counter: u64,
    },
}

/// Sequence precondition violations.
///
/// Raised before any transmission: a plan that skips or reorders a step
/// would desynchronize the peer's counter and the final ring frame would be
/// silently dropped, so an incomplete plan is rejected outright.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// A required step is absent at its position
    #[error("required step {expected} missing at position {index}")]
    MissingStep {
        /// Zero-based plan position
        index: usize,
        /// Step the contract requires there
        expected: StepKind,
    },

    /// A step is present but out of order
    #[error("step out of order at position {index}: expected {expected}, plan has {actual}")]
    StepMismatch {
        /// Zero-based plan position
        index: usize,
        /// Step the contract requires there
        expected: StepKind,
        /// Step the plan supplied
        actual: StepKind,
    },

    /// Steps present after the terminal song command
    #[error("plan continues past the terminal song command")]
    TrailingStep,
}

/// Everything a single ring attempt can fail with.
#[derive(Debug, Error)]
pub enum RingErrorKind {
    /// Transport write/connect/timeout failure
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Received bytes did not decode to the expected shape
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// Session signing or inbound verification failure
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// Local randomness or key handling failure
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Sequence precondition violated before transmission
    #[error("sequence violation: {0}")]
    Sequence(#[from] SequenceError),

    /// The peer's authentication tag did not verify under this variant
    #[error("peer authentication tag mismatch")]
    AuthenticationFailed,

    /// Every derivation variant was tried and none authenticated
    #[error("authentication exhausted after {attempts} derivation variants")]
    AuthenticationExhausted {
        /// Number of variants attempted
        attempts: usize,
    },

    /// Ring duration outside the accepted range
    #[error("ring duration {0}s outside 1..=300")]
    InvalidDuration(u16),
}

/// Protocol step labels for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStep {
    /// TDI device-info exchange
    DeviceInfo,
    /// Mutual authentication handshake
    Authenticate,
    /// Channel open request
    ChannelOpen,
    /// Channel establish (counter 1)
    ChannelEstablish,
    /// Diagnostic read (counter 2)
    Diagnostic,
    /// Advertisement interval (counter 3)
    AdvertisementInterval,
    /// Connection parameter update (counter 4)
    ConnectionUpdate,
    /// Feature read (counter 5)
    FeatureRead,
    /// Terminal song command (counter 6)
    Ring,
    /// Transport teardown
    Disconnect,
}

impl std::fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DeviceInfo => "device-info",
            Self::Authenticate => "authenticate",
            Self::ChannelOpen => "channel-open",
            Self::ChannelEstablish => "channel-establish",
            Self::Diagnostic => "diagnostic",
            Self::AdvertisementInterval => "advertisement-interval",
            Self::ConnectionUpdate => "connection-update",
            Self::FeatureRead => "feature-read",
            Self::Ring => "ring",
            Self::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

/// A sequencer attempt failure: which step died, and how.
#[derive(Debug, Error)]
#[error("attempt failed at {step}: {kind}")]
pub struct AttemptError {
    /// The step that failed
    pub step: ProtocolStep,
    /// The underlying failure
    #[source]
    pub kind: RingErrorKind,
}

impl AttemptError {
    pub(crate) fn new(step: ProtocolStep, kind: impl Into<RingErrorKind>) -> Self {
        Self {
            step,
            kind: kind.into(),
        }
    }
}

/// The aggregated error returned by the ring service.
#[derive(Debug, Error)]
#[error("ring failed at step {step}{}: {kind}", variant_suffix(.variant))]
pub struct RingError {
    /// The step the failing attempt died at
    pub step: ProtocolStep,
    /// Derivation variant in use, if the failure is attributable to one
    pub variant: Option<DerivationVariant>,
    /// The underlying failure
    #[source]
    pub kind: RingErrorKind,
}

fn variant_suffix(variant: &Option<DerivationVariant>) -> String {
    match variant {
        Some(v) => format!(" (variant {v})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_error_display_includes_step_and_variant() {
        let err = RingError {
            step: ProtocolStep::Diagnostic,
            variant: Some(DerivationVariant::LegacyLabel),
            kind: RingErrorKind::AuthenticationFailed,
        };
        let msg = err.to_string();
        assert!(msg.contains("diagnostic"));
        assert!(msg.contains("legacy-label"));
    }

    #[test]
    fn test_ring_error_display_without_variant() {
        let err = RingError {
            step: ProtocolStep::Ring,
            variant: None,
            kind: RingErrorKind::InvalidDuration(0),
        };
        let msg = err.to_string();
        assert!(msg.contains("ring"));
        assert!(!msg.contains("variant"));
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RingError>();
        assert_send_sync::<AttemptError>();
        assert_send_sync::<FrameError>();
    }
}
