//! Ring service: the public entry point.
//!
//! Wraps the sequencer in the variant-retry policy: each authenticator
//! derivation variant gets one full, independent attempt, in fixed priority
//! order. Two failure signatures advance to the next variant: an
//! authentication-tag mismatch, and a silent drop of the very first channel
//! frame after a handshake that verified. The latter matters because some
//! variants share tag messages and differ only in channel-key derivation;
//! against such a peer the wrong variant authenticates cleanly and only
//! betrays itself when its mis-keyed establish frame gets no reply.
//! Anything else fails the call outright. Exhausting the list is terminal.

use crate::command::RingVolume;
use crate::error::{AttemptError, ProtocolStep, RingError, RingErrorKind};
use crate::sequencer::{SequencePlan, Sequencer, SequencerConfig};
use crate::transport::{Transport, TransportError};
use toa_crypto::{AuthKey, DerivationVariant};

/// Accepted ring duration range in seconds.
pub const DURATION_RANGE: std::ops::RangeInclusive<u16> = 1..=300;

/// A successful ring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingOutcome {
    /// The derivation variant that authenticated.
    pub variant: DerivationVariant,
}

/// Facade over one connected tracker.
///
/// Holds the transport and auth key; every call runs a complete fresh
/// sequence (authentication, channel, counters) with nothing reused from a
/// prior call. The transport's connection lifecycle stays with the caller.
pub struct RingService<T: Transport> {
    transport: T,
    auth_key: AuthKey,
    config: SequencerConfig,
}

impl<T: Transport> RingService<T> {
    /// Create a ring service over a connected transport.
    pub fn new(transport: T, auth_key: AuthKey) -> Self {
        Self::with_config(transport, auth_key, SequencerConfig::default())
    }

    /// Create a ring service with explicit sequencer tuning.
    pub fn with_config(transport: T, auth_key: AuthKey, config: SequencerConfig) -> Self {
        Self {
            transport,
            auth_key,
            config,
        }
    }

    /// Ring the tracker.
    ///
    /// Fire-and-forget by protocol design: the peer sends no
    /// application-level acknowledgement for the song command. Success means
    /// every prior step was acknowledged and the final frame was transmitted
    /// without transport error.
    ///
    /// # Errors
    ///
    /// Returns [`RingError`] carrying the failing step and variant. Notably
    /// [`RingErrorKind::AuthenticationExhausted`] once every derivation
    /// variant has been refused, and [`RingErrorKind::InvalidDuration`] for
    /// a duration outside 1..=300 seconds.
    pub async fn ring(
        &mut self,
        volume: RingVolume,
        duration_secs: u16,
    ) -> Result<RingOutcome, RingError> {
        if !DURATION_RANGE.contains(&duration_secs) {
            return Err(RingError {
                step: ProtocolStep::Ring,
                variant: None,
                kind: RingErrorKind::InvalidDuration(duration_secs),
            });
        }
        if duration_secs > u16::from(u8::MAX) {
            // The song payload carries a single duration byte
            tracing::warn!(
                duration_secs,
                "ring duration exceeds the wire maximum, capping at 255s"
            );
        }

        tracing::info!(?volume, duration_secs, "ring requested");
        self.execute(SequencePlan::ring(volume, duration_secs)).await
    }

    /// Stop an active ring.
    ///
    /// Runs the same authenticated sequence with the stop command as the
    /// terminal step; the ordering contract applies unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RingError`] as for [`RingService::ring`].
    pub async fn stop_ring(&mut self) -> Result<RingOutcome, RingError> {
        tracing::info!("stop-ring requested");
        self.execute(SequencePlan::stop()).await
    }

    /// Tear down the transport.
    ///
    /// # Errors
    ///
    /// Returns [`RingError`] if the transport refuses to close.
    pub async fn disconnect(mut self) -> Result<(), RingError> {
        self.transport.disconnect().await.map_err(|e| RingError {
            step: ProtocolStep::Disconnect,
            variant: None,
            kind: e.into(),
        })
    }

    async fn execute(&mut self, plan: SequencePlan) -> Result<RingOutcome, RingError> {
        for variant in DerivationVariant::ALL {
            let mut sequencer = Sequencer::new(
                &mut self.transport,
                &self.auth_key,
                variant,
                self.config.clone(),
            );

            match sequencer.run(&plan).await {
                Ok(()) => {
                    tracing::info!(%variant, "sequence complete");
                    return Ok(RingOutcome { variant });
                }
                Err(attempt) if matches!(attempt.kind, RingErrorKind::AuthenticationFailed) => {
                    tracing::warn!(%variant, "variant refused by peer, trying next");
                }
                Err(attempt) if channel_key_mismatch(&attempt) => {
                    tracing::warn!(
                        %variant,
                        "authenticated but first channel frame went unanswered, trying next variant"
                    );
                }
                Err(attempt) => {
                    return Err(RingError {
                        step: attempt.step,
                        variant: Some(variant),
                        kind: attempt.kind,
                    });
                }
            }
        }

        Err(RingError {
            step: ProtocolStep::Authenticate,
            variant: None,
            kind: RingErrorKind::AuthenticationExhausted {
                attempts: DerivationVariant::ALL.len(),
            },
        })
    }
}

/// A mis-derived channel key is invisible during the handshake when two
/// variants share the same tag messages: authentication verifies, the key
/// does not, and the peer silently drops the very first channel frame. An
/// ack timeout at channel-establish is that signature; a timeout at any
/// later step means the key was right and the transport genuinely failed.
fn channel_key_mismatch(attempt: &AttemptError) -> bool {
    attempt.step == ProtocolStep::ChannelEstablish
        && matches!(
            attempt.kind,
            RingErrorKind::Transport(TransportError::AckTimeout(_))
        )
}
