//! Per-connection channel session: counter ownership and frame signing.
//!
//! The session owns the channel id, the derived channel key, and the two
//! replay-protection counters. The send counter must stay in lock-step with
//! the peer's expectation: it is incremented exactly once before every
//! outgoing channel command, never reused, never decreased, and reset only
//! by opening a new channel. A skipped or repeated value desynchronizes the
//! peer, after which every subsequent frame is silently ignored.

use crate::error::SessionError;
use toa_crypto::constant_time::verify_channel_tag;
use toa_crypto::mac::{DIRECTION_IN, DIRECTION_OUT, channel_tag};
use toa_crypto::{CHANNEL_TAG_SIZE, ChannelKey};

/// An open, authenticated channel session.
pub struct Session {
    channel_id: u8,
    key: ChannelKey,
    send_counter: u64,
    recv_counter: u64,
}

impl Session {
    /// Open a session on a freshly assigned channel.
    ///
    /// Both counters start at zero; the first signed command uses counter 1.
    #[must_use]
    pub fn open(channel_id: u8, key: ChannelKey) -> Self {
        Self {
            channel_id,
            key,
            send_counter: 0,
            recv_counter: 0,
        }
    }

    /// The peer-assigned channel id.
    #[must_use]
    pub fn channel_id(&self) -> u8 {
        self.channel_id
    }

    /// Current send counter (number of commands signed so far).
    #[must_use]
    pub fn send_counter(&self) -> u64 {
        self.send_counter
    }

    /// Sign an outgoing channel payload.
    ///
    /// Increments the send counter, then computes the 4-byte truncated
    /// HMAC-SHA256 tag over the zero-padded signing block. Must be called
    /// exactly once per outgoing channel command, in transmission order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the payload exceeds the signing
    /// block.
    pub fn sign(&mut self, payload: &[u8]) -> Result<(u64, [u8; CHANNEL_TAG_SIZE]), SessionError> {
        let counter = self.send_counter + 1;
        let tag = channel_tag(&self.key, counter, DIRECTION_OUT, payload)?;
        // Commit the counter only once the tag exists
        self.send_counter = counter;
        Ok((counter, tag))
    }

    /// Verify an incoming channel frame against the receive counter.
    ///
    /// The peer signs its frames with direction byte 0x00 and its own
    /// strictly increasing counter, which mirrors ours one-for-one in this
    /// strictly request/response protocol. Returns the counter the frame
    /// verified at.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PeerTagMismatch`] if the tag does not verify,
    /// or [`SessionError::Crypto`] for an oversized payload.
    pub fn verify_incoming(
        &mut self,
        payload: &[u8],
        tag: &[u8; CHANNEL_TAG_SIZE],
    ) -> Result<u64, SessionError> {
        let counter = self.recv_counter + 1;
        let expected = channel_tag(&self.key, counter, DIRECTION_IN, payload)?;
        if !verify_channel_tag(&expected, tag) {
            return Err(SessionError::PeerTagMismatch { counter });
        }
        self.recv_counter = counter;
        Ok(counter)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel_id", &self.channel_id)
            .field("send_counter", &self.send_counter)
            .field("recv_counter", &self.recv_counter)
            .finish_non_exhaustive()
    }
}
