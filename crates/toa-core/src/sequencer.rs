//! The linear command sequencer.
//!
//! Drives one full attempt from a cold transport to the terminal song
//! command: TDI device info, mutual authentication, channel open, then the
//! fixed six-entry channel sequence. Transitions are strictly linear with
//! no re-entry into an earlier state.
//!
//! The ordering contract is silently enforced by the peer: skipping or
//! reordering a channel step desynchronizes its counter, after which the
//! final frame validates against a counter the peer does not expect and is
//! dropped without any error response. The full ordered list is therefore a
//! hard precondition validated before anything touches the transport; it is
//! never an optimization to skip.

use crate::command::{AuthPayload, Command, Opcode, RingVolume, StepKind};
use crate::error::{AttemptError, FrameError, ProtocolStep, RingErrorKind, SequenceError};
use crate::frame::{CONNECTION_ID_SIZE, Frame, FramingMode, encode_channel, encode_connectionless};
use crate::session::Session;
use crate::transport::{Transport, TransportError};
use std::time::Duration;
use toa_crypto::constant_time::verify_auth_tag;
use toa_crypto::random::random_challenge;
use toa_crypto::{AUTH_TAG_SIZE, AuthKey, CHALLENGE_SIZE, ChannelKey, DerivationVariant};

/// Sequencer tuning parameters.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Bounded wait for each expected peer notification.
    ///
    /// Elapsing is a transport failure, not an authentication failure; the
    /// only recovery is a fresh attempt from a new authentication.
    pub ack_timeout: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(3),
        }
    }
}

/// Sequencer state, strictly linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Nothing sent yet
    Disconnected,
    /// Mutual authentication in progress
    Authenticating,
    /// Channel open requested
    ChannelOpening,
    /// Channel sequence in progress; payload is the 1-based step number
    Established(u8),
    /// Terminal song frame being transmitted
    Ringing,
    /// Attempt completed
    Done,
    /// Attempt aborted
    Failed,
}

/// The ordered channel command plan for one attempt.
///
/// Construction is open (tests build deliberately broken plans), but
/// [`SequencePlan::validate`] gates every run: the five pre-ring steps in
/// exact order, then exactly one terminal song command.
#[derive(Debug, Clone)]
pub struct SequencePlan {
    steps: Vec<Command>,
}

impl SequencePlan {
    /// The fixed post-channel-open contract.
    pub const REQUIRED: [StepKind; 6] = [
        StepKind::ChannelEstablish,
        StepKind::Diagnostic,
        StepKind::AdvertisementInterval,
        StepKind::ConnectionUpdate,
        StepKind::FeatureRead,
        StepKind::Song,
    ];

    /// Build a plan from explicit steps.
    #[must_use]
    pub fn new(steps: Vec<Command>) -> Self {
        Self { steps }
    }

    /// The standard plan terminating in a ring.
    #[must_use]
    pub fn ring(volume: RingVolume, duration_secs: u16) -> Self {
        Self::with_terminal(Command::Ring {
            volume,
            duration_secs,
        })
    }

    /// The standard plan terminating in a stop-ring.
    #[must_use]
    pub fn stop() -> Self {
        Self::with_terminal(Command::StopRing)
    }

    fn with_terminal(terminal: Command) -> Self {
        Self::new(vec![
            Command::ChannelEstablish,
            Command::Diagnostic,
            Command::AdvertisementInterval,
            Command::ConnectionUpdate,
            Command::FeatureRead,
            terminal,
        ])
    }

    /// The plan's steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Command] {
        &self.steps
    }

    /// Check the plan against the fixed contract.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError`] for a missing, reordered, or trailing step.
    pub fn validate(&self) -> Result<(), SequenceError> {
        for (index, expected) in Self::REQUIRED.iter().enumerate() {
            let Some(step) = self.steps.get(index) else {
                return Err(SequenceError::MissingStep {
                    index,
                    expected: *expected,
                });
            };
            match step.step_kind() {
                Some(actual) if actual == *expected => {}
                Some(actual) => {
                    return Err(SequenceError::StepMismatch {
                        index,
                        expected: *expected,
                        actual,
                    });
                }
                // Connectionless commands never belong in the channel plan
                None => {
                    return Err(SequenceError::MissingStep {
                        index,
                        expected: *expected,
                    });
                }
            }
        }
        if self.steps.len() > Self::REQUIRED.len() {
            return Err(SequenceError::TrailingStep);
        }
        Ok(())
    }
}

/// One-shot driver for a single ring attempt.
///
/// Borrows a transport for the duration of the attempt. A new attempt (for
/// example with the next derivation variant) means a new sequencer with
/// fresh authenticator and counter state; nothing carries over.
pub struct Sequencer<'a, T: Transport> {
    transport: &'a mut T,
    auth_key: &'a AuthKey,
    variant: DerivationVariant,
    config: SequencerConfig,
    state: SequencerState,
    connection_id: [u8; CONNECTION_ID_SIZE],
}

impl<'a, T: Transport> Sequencer<'a, T> {
    /// Create a sequencer for one attempt under one derivation variant.
    pub fn new(
        transport: &'a mut T,
        auth_key: &'a AuthKey,
        variant: DerivationVariant,
        config: SequencerConfig,
    ) -> Self {
        Self {
            transport,
            auth_key,
            variant,
            config,
            state: SequencerState::Disconnected,
            connection_id: [0u8; CONNECTION_ID_SIZE],
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Run the full attempt: device info, authentication, channel open, then
    /// the validated channel plan.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError`] naming the failing step. Plan validation
    /// failures are reported before any transmission.
    pub async fn run(&mut self, plan: &SequencePlan) -> Result<(), AttemptError> {
        if let Err(e) = plan.validate() {
            self.state = SequencerState::Failed;
            return Err(AttemptError::new(step_for_sequence_error(e), e));
        }

        let result = self.drive(plan).await;
        self.state = match result {
            Ok(()) => SequencerState::Done,
            Err(_) => SequencerState::Failed,
        };
        result
    }

    async fn drive(&mut self, plan: &SequencePlan) -> Result<(), AttemptError> {
        self.device_info()
            .await
            .map_err(|kind| AttemptError::new(ProtocolStep::DeviceInfo, kind))?;

        self.set_state(SequencerState::Authenticating);
        let channel_key = self
            .authenticate()
            .await
            .map_err(|kind| AttemptError::new(ProtocolStep::Authenticate, kind))?;

        self.set_state(SequencerState::ChannelOpening);
        let mut session = self
            .open_channel(channel_key)
            .await
            .map_err(|kind| AttemptError::new(ProtocolStep::ChannelOpen, kind))?;

        for (index, command) in plan.steps().iter().enumerate() {
            let step = step_for_command(command);
            if command.expects_ack() {
                self.set_state(SequencerState::Established(index as u8 + 1));
            } else {
                self.set_state(SequencerState::Ringing);
            }
            self.channel_step(&mut session, command)
                .await
                .map_err(|kind| AttemptError::new(step, kind))?;
        }

        Ok(())
    }

    /// TDI exchange: reads device info and captures the peer's connection id
    /// for all subsequent connectionless frames.
    async fn device_info(&mut self) -> Result<(), RingErrorKind> {
        let (connection_id, payload) = self.exchange_connectionless(Opcode::Tdi, &[]).await?;

        self.connection_id = connection_id;
        tracing::debug!(
            connection_id = %hex::encode(connection_id),
            info = %hex::encode(&payload),
            "tracker device info"
        );
        Ok(())
    }

    /// Mutual authentication. Derives the channel key exactly once, on
    /// success.
    async fn authenticate(&mut self) -> Result<ChannelKey, RingErrorKind> {
        const RESPONSE_LEN: usize = CHALLENGE_SIZE + AUTH_TAG_SIZE;

        let rand_a = random_challenge()?;
        let challenge = Command::Auth(AuthPayload::Challenge(rand_a)).payload();
        let (_, payload) = self.exchange_connectionless(Opcode::Auth, &challenge).await?;

        if payload.len() != RESPONSE_LEN {
            return Err(FrameError::LengthMismatch {
                what: "auth response",
                expected: RESPONSE_LEN,
                actual: payload.len(),
            }
            .into());
        }

        let mut rand_b = [0u8; CHALLENGE_SIZE];
        rand_b.copy_from_slice(&payload[..CHALLENGE_SIZE]);
        let mut peer_tag = [0u8; AUTH_TAG_SIZE];
        peer_tag.copy_from_slice(&payload[CHALLENGE_SIZE..]);

        let expected = self.variant.peer_tag(self.auth_key, &rand_a, &rand_b);
        if !verify_auth_tag(&expected, &peer_tag) {
            // Untrusted peer or wrong key under this variant; the caller
            // decides whether another variant gets a fresh attempt
            tracing::debug!(variant = %self.variant, "peer authentication tag mismatch");
            return Err(RingErrorKind::AuthenticationFailed);
        }

        let local = self.variant.local_tag(self.auth_key, &rand_a, &rand_b);
        let completion = Command::Auth(AuthPayload::Completion(local)).payload();
        self.exchange_connectionless(Opcode::Auth, &completion).await?;

        tracing::debug!(variant = %self.variant, "mutual authentication complete");
        Ok(self.variant.channel_key(self.auth_key, &rand_a, &rand_b))
    }

    /// Channel open: the peer assigns the single-byte channel id.
    async fn open_channel(&mut self, key: ChannelKey) -> Result<Session, RingErrorKind> {
        let (_, payload) = self
            .exchange_connectionless(Opcode::OpenChannel, &[])
            .await?;

        let Some(&channel_id) = payload.first() else {
            return Err(FrameError::LengthMismatch {
                what: "channel open response",
                expected: 1,
                actual: 0,
            }
            .into());
        };

        tracing::debug!(channel_id = %hex::encode([channel_id]), "channel open");
        Ok(Session::open(channel_id, key))
    }

    /// Transmit one channel command and, unless it is the fire-and-forget
    /// terminal, verify the peer's acknowledgement.
    async fn channel_step(
        &mut self,
        session: &mut Session,
        command: &Command,
    ) -> Result<(), RingErrorKind> {
        let payload = command.payload();
        let (counter, tag) = session.sign(&payload)?;
        let bytes = encode_channel(session.channel_id(), &payload, tag);

        tracing::trace!(
            counter,
            frame = %hex::encode(&bytes),
            ?command,
            "channel command"
        );
        self.transport
            .write(&bytes)
            .await
            .map_err(RingErrorKind::from)?;

        if !command.expects_ack() {
            // Fire-and-forget: success is "all prior steps acknowledged and
            // this frame written". The peer never acks the song command.
            tracing::debug!(counter, "terminal song command transmitted");
            return Ok(());
        }

        let bytes = self.await_notification().await?;
        match Frame::decode(&bytes, FramingMode::Channel)? {
            Frame::Channel {
                channel_id,
                payload,
                tag,
            } => {
                if channel_id != session.channel_id() {
                    return Err(FrameError::ChannelIdMismatch {
                        expected: session.channel_id(),
                        actual: channel_id,
                    }
                    .into());
                }
                let recv_counter = session.verify_incoming(&payload, &tag)?;
                tracing::trace!(counter, recv_counter, "channel command acknowledged");
                Ok(())
            }
            Frame::Connectionless { .. } => {
                // Frame::decode with Channel mode cannot produce this
                Err(FrameError::InvalidMarker(bytes[0]).into())
            }
        }
    }

    /// Write a connectionless frame and decode the peer's reply, requiring
    /// the echoed opcode. Returns the reply's connection id and payload.
    async fn exchange_connectionless(
        &mut self,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<([u8; CONNECTION_ID_SIZE], Vec<u8>), RingErrorKind> {
        let bytes = encode_connectionless(opcode, self.connection_id, payload);
        tracing::trace!(?opcode, frame = %hex::encode(&bytes), "connectionless command");
        self.transport
            .write(&bytes)
            .await
            .map_err(RingErrorKind::from)?;

        let bytes = self.await_notification().await?;
        match Frame::decode(&bytes, FramingMode::Connectionless)? {
            Frame::Connectionless {
                opcode: actual,
                connection_id,
                payload,
            } => {
                if actual != opcode {
                    return Err(FrameError::UnexpectedOpcode {
                        expected: opcode,
                        actual,
                    }
                    .into());
                }
                Ok((connection_id, payload))
            }
            Frame::Channel { .. } => {
                // Frame::decode with Connectionless mode cannot produce this
                Err(FrameError::InvalidMarker(bytes[0]).into())
            }
        }
    }

    async fn await_notification(&mut self) -> Result<Vec<u8>, RingErrorKind> {
        match tokio::time::timeout(self.config.ack_timeout, self.transport.next_notification())
            .await
        {
            Ok(Ok(bytes)) => {
                tracing::trace!(notification = %hex::encode(&bytes), "peer notification");
                Ok(bytes)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(TransportError::AckTimeout(self.config.ack_timeout).into()),
        }
    }

    fn set_state(&mut self, next: SequencerState) {
        tracing::trace!(from = ?self.state, to = ?next, "sequencer transition");
        self.state = next;
    }
}

fn step_for_command(command: &Command) -> ProtocolStep {
    match command.step_kind() {
        Some(StepKind::ChannelEstablish) => ProtocolStep::ChannelEstablish,
        Some(StepKind::Diagnostic) => ProtocolStep::Diagnostic,
        Some(StepKind::AdvertisementInterval) => ProtocolStep::AdvertisementInterval,
        Some(StepKind::ConnectionUpdate) => ProtocolStep::ConnectionUpdate,
        Some(StepKind::FeatureRead) => ProtocolStep::FeatureRead,
        Some(StepKind::Song) | None => ProtocolStep::Ring,
    }
}

fn step_for_sequence_error(error: SequenceError) -> ProtocolStep {
    match error {
        SequenceError::MissingStep { expected, .. }
        | SequenceError::StepMismatch { expected, .. } => match expected {
            StepKind::ChannelEstablish => ProtocolStep::ChannelEstablish,
            StepKind::Diagnostic => ProtocolStep::Diagnostic,
            StepKind::AdvertisementInterval => ProtocolStep::AdvertisementInterval,
            StepKind::ConnectionUpdate => ProtocolStep::ConnectionUpdate,
            StepKind::FeatureRead => ProtocolStep::FeatureRead,
            StepKind::Song => ProtocolStep::Ring,
        },
        SequenceError::TrailingStep => ProtocolStep::Ring,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_ring_plan_validates() {
        assert!(SequencePlan::ring(RingVolume::Medium, 30).validate().is_ok());
    }

    #[test]
    fn test_standard_stop_plan_validates() {
        assert!(SequencePlan::stop().validate().is_ok());
    }

    // A plan of only {ChannelEstablish, Ring} must be refused before any
    // transmission.
    #[test]
    fn test_truncated_plan_rejected() {
        let plan = SequencePlan::new(vec![
            Command::ChannelEstablish,
            Command::Ring {
                volume: RingVolume::Medium,
                duration_secs: 30,
            },
        ]);
        assert_eq!(
            plan.validate().unwrap_err(),
            SequenceError::StepMismatch {
                index: 1,
                expected: StepKind::Diagnostic,
                actual: StepKind::Song,
            }
        );
    }

    #[test]
    fn test_empty_plan_rejected() {
        let plan = SequencePlan::new(vec![]);
        assert_eq!(
            plan.validate().unwrap_err(),
            SequenceError::MissingStep {
                index: 0,
                expected: StepKind::ChannelEstablish,
            }
        );
    }

    #[test]
    fn test_reordered_plan_rejected() {
        let plan = SequencePlan::new(vec![
            Command::ChannelEstablish,
            Command::AdvertisementInterval,
            Command::Diagnostic,
            Command::ConnectionUpdate,
            Command::FeatureRead,
            Command::StopRing,
        ]);
        assert!(matches!(
            plan.validate().unwrap_err(),
            SequenceError::StepMismatch { index: 1, .. }
        ));
    }

    #[test]
    fn test_missing_terminal_rejected() {
        let plan = SequencePlan::new(vec![
            Command::ChannelEstablish,
            Command::Diagnostic,
            Command::AdvertisementInterval,
            Command::ConnectionUpdate,
            Command::FeatureRead,
        ]);
        assert_eq!(
            plan.validate().unwrap_err(),
            SequenceError::MissingStep {
                index: 5,
                expected: StepKind::Song,
            }
        );
    }

    #[test]
    fn test_trailing_step_rejected() {
        let mut steps = SequencePlan::ring(RingVolume::Low, 5).steps().to_vec();
        steps.push(Command::StopRing);
        assert_eq!(
            SequencePlan::new(steps).validate().unwrap_err(),
            SequenceError::TrailingStep
        );
    }

    #[test]
    fn test_connectionless_command_in_plan_rejected() {
        let plan = SequencePlan::new(vec![
            Command::Tdi,
            Command::Diagnostic,
            Command::AdvertisementInterval,
            Command::ConnectionUpdate,
            Command::FeatureRead,
            Command::StopRing,
        ]);
        assert!(matches!(
            plan.validate().unwrap_err(),
            SequenceError::MissingStep { index: 0, .. }
        ));
    }
}
