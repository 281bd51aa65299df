//! Wire protocol for the Mutiny coordination server.
//!
//! Frames are `type:userId:payload` terminated by `0x04`. Requests that
//! expect a reply get exactly one framed JSON reply; everything else is
//! fire-and-forget.
//!
//! # Modules
//!
//! - [`client`] -- [`WorldClient`], one connection per request.
//! - [`error`] -- Framing and decoding errors.
//! - [`frame`] -- Encoding, buffered decoding, and timed reads.
//! - [`message`] -- Message types and reply payloads.

pub mod client;
pub mod error;
pub mod frame;
pub mod message;

pub use client::{DEFAULT_TIMEOUT, WorldClient};
pub use error::ProtocolError;
pub use frame::{Frame, FrameBuffer, MAX_FRAME_BYTES, TERMINATOR, read_frame, write_frame};
pub use message::{DialogMessage, GoalEnvelope, KnowledgeSnapshot, MessageType, SERVER_SENDER};
