//! Wire framing for the TOA protocol.
//!
//! Two framing modes exist, switched by protocol phase rather than by any
//! in-band discriminator:
//!
//! - Connectionless (pre-channel): `[0x00][connection_id:4][opcode:1][payload]`
//! - Channel (post-authentication): `[channel_id:1][payload][hmac_tag:4]`
//!
//! Channel frames carry no opcode byte of their own; the command family id
//! is the first payload byte and the whole payload is covered by the
//! truncated counter-bound HMAC tag.

use crate::command::Opcode;
use crate::error::FrameError;
use toa_crypto::CHANNEL_TAG_SIZE;

/// Connection id width in connectionless frames.
pub const CONNECTION_ID_SIZE: usize = 4;

/// Connectionless frame marker byte.
pub const CONNECTIONLESS_MARKER: u8 = 0x00;

/// Connectionless header size: marker + connection id + opcode.
pub const CONNECTIONLESS_HEADER_SIZE: usize = 1 + CONNECTION_ID_SIZE + 1;

/// Minimum channel frame size: channel id + empty payload + tag.
pub const CHANNEL_FRAME_MIN_SIZE: usize = 1 + CHANNEL_TAG_SIZE;

/// Which framing to apply when decoding raw notification bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Pre-channel framing with marker, connection id and opcode
    Connectionless,
    /// Post-authentication framing with channel id and HMAC tag
    Channel,
}

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Pre-channel frame
    Connectionless {
        /// Command opcode
        opcode: Opcode,
        /// Peer-scoped connection id
        connection_id: [u8; CONNECTION_ID_SIZE],
        /// Opcode-specific payload
        payload: Vec<u8>,
    },
    /// Counter-protected channel frame
    Channel {
        /// Channel id assigned by the peer on open
        channel_id: u8,
        /// Signed payload
        payload: Vec<u8>,
        /// Truncated HMAC tag over counter, direction, length and payload
        tag: [u8; CHANNEL_TAG_SIZE],
    },
}

impl Frame {
    /// Decode raw bytes under the given framing mode.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the bytes are shorter than the mode's
    /// fixed header or carry an unknown marker/opcode.
    pub fn decode(bytes: &[u8], mode: FramingMode) -> Result<Self, FrameError> {
        match mode {
            FramingMode::Connectionless => decode_connectionless(bytes),
            FramingMode::Channel => decode_channel(bytes),
        }
    }

    /// Encode this frame to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Connectionless {
                opcode,
                connection_id,
                payload,
            } => encode_connectionless(*opcode, *connection_id, payload),
            Self::Channel {
                channel_id,
                payload,
                tag,
            } => encode_channel(*channel_id, payload, *tag),
        }
    }
}

/// Encode a connectionless frame: `0x00 ‖ connection_id(4) ‖ opcode(1) ‖ payload`.
#[must_use]
pub fn encode_connectionless(
    opcode: Opcode,
    connection_id: [u8; CONNECTION_ID_SIZE],
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CONNECTIONLESS_HEADER_SIZE + payload.len());
    buf.push(CONNECTIONLESS_MARKER);
    buf.extend_from_slice(&connection_id);
    buf.push(opcode as u8);
    buf.extend_from_slice(payload);
    buf
}

/// Encode a channel frame: `channel_id(1) ‖ payload ‖ tag(4)`.
#[must_use]
pub fn encode_channel(channel_id: u8, payload: &[u8], tag: [u8; CHANNEL_TAG_SIZE]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len() + CHANNEL_TAG_SIZE);
    buf.push(channel_id);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&tag);
    buf
}

fn decode_connectionless(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < CONNECTIONLESS_HEADER_SIZE {
        return Err(FrameError::TooShort {
            expected: CONNECTIONLESS_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if bytes[0] != CONNECTIONLESS_MARKER {
        return Err(FrameError::InvalidMarker(bytes[0]));
    }

    let mut connection_id = [0u8; CONNECTION_ID_SIZE];
    connection_id.copy_from_slice(&bytes[1..1 + CONNECTION_ID_SIZE]);
    let opcode = Opcode::try_from(bytes[1 + CONNECTION_ID_SIZE])?;

    Ok(Frame::Connectionless {
        opcode,
        connection_id,
        payload: bytes[CONNECTIONLESS_HEADER_SIZE..].to_vec(),
    })
}

fn decode_channel(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < CHANNEL_FRAME_MIN_SIZE {
        return Err(FrameError::TooShort {
            expected: CHANNEL_FRAME_MIN_SIZE,
            actual: bytes.len(),
        });
    }

    let tag_start = bytes.len() - CHANNEL_TAG_SIZE;
    let mut tag = [0u8; CHANNEL_TAG_SIZE];
    tag.copy_from_slice(&bytes[tag_start..]);

    Ok(Frame::Channel {
        channel_id: bytes[0],
        payload: bytes[1..tag_start].to_vec(),
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectionless_round_trip() {
        let frame = Frame::Connectionless {
            opcode: Opcode::Auth,
            connection_id: [0xDE, 0xAD, 0xBE, 0xEF],
            payload: vec![0x11; 8],
        };
        let bytes = frame.encode();

        assert_eq!(bytes[0], 0x00);
        assert_eq!(&bytes[1..5], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes[5], 0x01);

        let decoded = Frame::decode(&bytes, FramingMode::Connectionless).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_connectionless_bad_marker() {
        let mut bytes = encode_connectionless(Opcode::Tdi, [0; 4], &[]);
        bytes[0] = 0x42;
        assert!(matches!(
            Frame::decode(&bytes, FramingMode::Connectionless),
            Err(FrameError::InvalidMarker(0x42))
        ));
    }

    #[test]
    fn test_connectionless_too_short() {
        assert!(matches!(
            Frame::decode(&[0x00, 0x01], FramingMode::Connectionless),
            Err(FrameError::TooShort { expected: 6, .. })
        ));
    }

    #[test]
    fn test_connectionless_unknown_opcode() {
        let bytes = [0x00, 0, 0, 0, 0, 0x6E];
        assert!(matches!(
            Frame::decode(&bytes, FramingMode::Connectionless),
            Err(FrameError::InvalidOpcode(0x6E))
        ));
    }

    // Ring command on channel 0x02, payload 05 02 01 03 1e: the leading
    // bytes are fixed, then the 4-byte tag.
    #[test]
    fn test_channel_frame_layout() {
        let payload = [0x05, 0x02, 0x01, 0x03, 0x1e];
        let tag = [0xAA, 0xBB, 0xCC, 0xDD];
        let bytes = encode_channel(0x02, &payload, tag);

        assert_eq!(&bytes[..6], &[0x02, 0x05, 0x02, 0x01, 0x03, 0x1e]);
        assert_eq!(&bytes[6..], &tag);
    }

    #[test]
    fn test_channel_round_trip() {
        let frame = Frame::Channel {
            channel_id: 0x02,
            payload: vec![0x09],
            tag: [1, 2, 3, 4],
        };
        let decoded = Frame::decode(&frame.encode(), FramingMode::Channel).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_channel_empty_payload() {
        let bytes = encode_channel(0x03, &[], [9, 9, 9, 9]);
        let decoded = Frame::decode(&bytes, FramingMode::Channel).unwrap();
        assert_eq!(
            decoded,
            Frame::Channel {
                channel_id: 0x03,
                payload: vec![],
                tag: [9, 9, 9, 9],
            }
        );
    }

    #[test]
    fn test_channel_too_short() {
        assert!(matches!(
            Frame::decode(&[0x02, 0x05], FramingMode::Channel),
            Err(FrameError::TooShort { expected: 5, .. })
        ));
    }
}
