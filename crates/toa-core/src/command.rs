//! Typed TOA commands and their fixed wire payloads.
//!
//! The command set is a closed enum: the protocol has exactly these command
//! families and nothing is dispatched by device or provider type. Payload
//! shapes are fixed per command; the codec rejects anything that disagrees.

use crate::error::FrameError;
use toa_crypto::{AUTH_TAG_SIZE, CHALLENGE_SIZE};

/// Connectionless opcodes (pre-channel commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Mutual authentication handshake
    Auth = 0x01,
    /// Channel open request / assignment
    OpenChannel = 0x02,
    /// Tracker device info
    Tdi = 0x03,
}

impl TryFrom<u8> for Opcode {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Auth),
            0x02 => Ok(Self::OpenChannel),
            0x03 => Ok(Self::Tdi),
            _ => Err(FrameError::InvalidOpcode(value)),
        }
    }
}

// Channel-mode command family ids (first payload byte).
const CMD_SONG: u8 = 0x05;
const CMD_DIAGNOSTIC: u8 = 0x06;
const CMD_READY: u8 = 0x09;
const CMD_CONNECTION_UPDATE: u8 = 0x0B;
const CMD_FEATURE_READ: u8 = 0x0C;
const CMD_ADV_INTERVAL: u8 = 0x0F;

// Song sub-commands.
const SONG_STOP: u8 = 0x00;
const SONG_RING: u8 = 0x02;

// Song volume-type indicator (always 1 on observed firmware).
const SONG_VOLUME_TYPE: u8 = 0x01;

/// Ring volume levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RingVolume {
    /// Quiet
    Low = 1,
    /// Default
    Medium = 2,
    /// Loud
    High = 3,
}

/// The two shapes an Auth frame payload can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPayload {
    /// Opening move: our 8-byte random challenge
    Challenge([u8; CHALLENGE_SIZE]),
    /// Closing move: our 16-byte tag proving key possession
    Completion([u8; AUTH_TAG_SIZE]),
}

/// A typed TOA command.
///
/// `Tdi`, `Auth`, and `ChannelOpen` are connectionless; the rest travel on
/// the authenticated channel and are counter-signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read tracker device info (also yields the connection id)
    Tdi,
    /// Authentication handshake frame
    Auth(AuthPayload),
    /// Request a channel assignment
    ChannelOpen,
    /// Confirm the channel is ready (counter 1)
    ChannelEstablish,
    /// Diagnostic read (counter 2)
    Diagnostic,
    /// Advertisement interval configuration (counter 3)
    AdvertisementInterval,
    /// Connection parameter update (counter 4)
    ConnectionUpdate,
    /// Feature read (counter 5)
    FeatureRead,
    /// Ring the tracker (terminal, counter 6)
    Ring {
        /// Volume level
        volume: RingVolume,
        /// Requested ring duration in seconds (1..=300)
        duration_secs: u16,
    },
    /// Stop an active ring (terminal alternative to `Ring`)
    StopRing,
}

/// Position classes for channel-sequence validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Channel establish
    ChannelEstablish,
    /// Diagnostic
    Diagnostic,
    /// Advertisement interval
    AdvertisementInterval,
    /// Connection update
    ConnectionUpdate,
    /// Feature read
    FeatureRead,
    /// Terminal song command (ring or stop)
    Song,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ChannelEstablish => "channel-establish",
            Self::Diagnostic => "diagnostic",
            Self::AdvertisementInterval => "advertisement-interval",
            Self::ConnectionUpdate => "connection-update",
            Self::FeatureRead => "feature-read",
            Self::Song => "song",
        };
        f.write_str(name)
    }
}

impl Command {
    /// Connectionless opcode, if this is a pre-channel command.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Self::Tdi => Some(Opcode::Tdi),
            Self::Auth(_) => Some(Opcode::Auth),
            Self::ChannelOpen => Some(Opcode::OpenChannel),
            _ => None,
        }
    }

    /// Whether this command travels on the authenticated channel.
    #[must_use]
    pub fn is_channel_mode(&self) -> bool {
        self.opcode().is_none()
    }

    /// Step class for sequence validation, if channel-mode.
    #[must_use]
    pub fn step_kind(&self) -> Option<StepKind> {
        match self {
            Self::ChannelEstablish => Some(StepKind::ChannelEstablish),
            Self::Diagnostic => Some(StepKind::Diagnostic),
            Self::AdvertisementInterval => Some(StepKind::AdvertisementInterval),
            Self::ConnectionUpdate => Some(StepKind::ConnectionUpdate),
            Self::FeatureRead => Some(StepKind::FeatureRead),
            Self::Ring { .. } | Self::StopRing => Some(StepKind::Song),
            _ => None,
        }
    }

    /// Fixed wire payload for this command.
    ///
    /// For connectionless commands this is the bytes after the opcode; for
    /// channel commands it is the signed payload of the channel frame.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Tdi | Self::ChannelOpen => Vec::new(),
            Self::Auth(AuthPayload::Challenge(rand_a)) => rand_a.to_vec(),
            Self::Auth(AuthPayload::Completion(tag)) => tag.to_vec(),
            Self::ChannelEstablish => vec![CMD_READY],
            Self::Diagnostic => vec![CMD_DIAGNOSTIC, 0x01],
            Self::AdvertisementInterval => vec![CMD_ADV_INTERVAL, 0x01],
            Self::ConnectionUpdate => vec![CMD_CONNECTION_UPDATE, 0x01],
            Self::FeatureRead => vec![CMD_FEATURE_READ, 0x01],
            Self::Ring {
                volume,
                duration_secs,
            } => {
                // The wire field is one byte; longer rings are capped at 255 s
                let duration = (*duration_secs).min(u16::from(u8::MAX)) as u8;
                vec![CMD_SONG, SONG_RING, SONG_VOLUME_TYPE, *volume as u8, duration]
            }
            Self::StopRing => vec![CMD_SONG, SONG_STOP],
        }
    }

    /// Whether the peer acknowledges this command.
    ///
    /// The terminal song command is fire-and-forget: the peer sends no
    /// application-level acknowledgement for it.
    #[must_use]
    pub fn expects_ack(&self) -> bool {
        !matches!(self, Self::Ring { .. } | Self::StopRing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for op in [Opcode::Auth, Opcode::OpenChannel, Opcode::Tdi] {
            assert_eq!(Opcode::try_from(op as u8).unwrap(), op);
        }
    }

    #[test]
    fn test_opcode_invalid() {
        assert!(matches!(
            Opcode::try_from(0x7F),
            Err(FrameError::InvalidOpcode(0x7F))
        ));
    }

    #[test]
    fn test_ring_payload_shape() {
        let cmd = Command::Ring {
            volume: RingVolume::High,
            duration_secs: 30,
        };
        assert_eq!(cmd.payload(), vec![0x05, 0x02, 0x01, 0x03, 0x1e]);
    }

    #[test]
    fn test_ring_payload_duration_capped() {
        let cmd = Command::Ring {
            volume: RingVolume::Low,
            duration_secs: 300,
        };
        assert_eq!(cmd.payload()[4], 0xFF);
    }

    #[test]
    fn test_stop_payload_shape() {
        assert_eq!(Command::StopRing.payload(), vec![0x05, 0x00]);
    }

    #[test]
    fn test_channel_mode_classification() {
        assert!(!Command::Tdi.is_channel_mode());
        assert!(!Command::ChannelOpen.is_channel_mode());
        assert!(!Command::Auth(AuthPayload::Challenge([0; 8])).is_channel_mode());
        assert!(Command::ChannelEstablish.is_channel_mode());
        assert!(
            Command::Ring {
                volume: RingVolume::Medium,
                duration_secs: 10
            }
            .is_channel_mode()
        );
    }

    #[test]
    fn test_terminal_commands_fire_and_forget() {
        assert!(Command::FeatureRead.expects_ack());
        assert!(
            !Command::Ring {
                volume: RingVolume::Medium,
                duration_secs: 10
            }
            .expects_ack()
        );
        assert!(!Command::StopRing.expects_ack());
    }
}
