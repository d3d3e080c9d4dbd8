//! Transport adapter abstraction.
//!
//! The core consumes, never implements, the BLE transport: the hosting
//! platform hands over a connected device exposing a write characteristic
//! and a notification stream. One transport instance carries exactly one
//! logical session; multiple trackers are driven through independent
//! transports.

use async_trait::async_trait;
use std::time::Duration;

/// Transport layer errors.
///
/// Everything in here, including acknowledgement timeouts, is recovered the
/// same way: restart the whole sequence from a fresh authentication. A
/// desynchronized counter cannot be resumed mid-sequence.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A GATT write failed
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The peer connection dropped
    #[error("transport disconnected")]
    Disconnected,

    /// No notification arrived within the bounded wait
    #[error("timed out after {0:?} awaiting peer notification")]
    AckTimeout(Duration),

    /// Transport-specific error
    #[error("transport error: {0}")]
    Other(String),
}

/// Async transport capability for one connected tracker.
///
/// Methods take `&mut self`: the protocol is strictly sequential and no two
/// commands may ever be in flight on the same channel.
#[async_trait]
pub trait Transport: Send {
    /// Write a raw frame to the command characteristic.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the write fails or the peer is gone.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next raw notification from the response characteristic.
    ///
    /// The stream is infinite and restartable only by reconnecting; callers
    /// bound each wait with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the connection drops.
    async fn next_notification(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Tear down the connection.
    ///
    /// Aborting locally cannot signal the peer; it times out independently.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if teardown fails.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
