//! # TOA Core
//!
//! Core protocol implementation for TOA (Tracker-Over-Air), the proprietary
//! BLE application protocol spoken by small tracker tags.
//!
//! This crate provides:
//! - Typed commands and the two-mode wire codec
//! - The per-connection session (counter ownership, frame signing)
//! - The linear command sequencer with hard ordering preconditions
//! - The ring service facade with derivation-variant retry
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RingService                           │
//! │   (variant retry policy, outcome classification)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Sequencer                            │
//! │   (TDI → auth → channel open → fixed 6-step sequence)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Session / Codec                          │
//! │   (counter-signed channel frames, two framing modes)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Transport                            │
//! │   (injected BLE write/notify capability, one per tracker)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known limitation
//!
//! The peer never NACKs a channel frame whose counter it does not expect;
//! it drops the frame silently. A desynchronized-but-well-formed ring frame
//! is therefore indistinguishable from success at the transport level. The
//! sequencer's ordering preconditions are the defense; there is no runtime
//! detection to engineer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod command;
pub mod error;
pub mod frame;
pub mod ring;
pub mod sequencer;
pub mod session;
pub mod transport;

pub use command::{AuthPayload, Command, Opcode, RingVolume, StepKind};
pub use error::{
    AttemptError, FrameError, ProtocolStep, RingError, RingErrorKind, SequenceError, SessionError,
};
pub use frame::{Frame, FramingMode, encode_channel, encode_connectionless};
pub use ring::{RingOutcome, RingService};
pub use sequencer::{SequencePlan, Sequencer, SequencerConfig, SequencerState};
pub use session::Session;
pub use transport::{Transport, TransportError};
