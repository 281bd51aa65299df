//! Error types for framing and message decoding.

use mutiny_types::IdError;

/// Errors raised while reading, writing, or decoding protocol frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Socket read or write failed.
    #[error("i/o error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// No complete frame arrived in time.
    #[error("timed out after {ms} ms waiting for a frame")]
    Timeout {
        /// The read timeout that elapsed.
        ms: u64,
    },

    /// The peer closed the connection before a complete frame arrived.
    #[error("connection closed mid-frame")]
    ConnectionClosed,

    /// The buffered frame exceeded the size limit.
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge {
        /// The configured limit.
        limit: usize,
    },

    /// The frame is not `type:userId:payload`.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The message type tag is not one of the known types.
    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),

    /// The user id field is not a valid actor id.
    #[error("invalid user id: {source}")]
    InvalidUser {
        /// The underlying id error.
        #[from]
        source: IdError,
    },

    /// The payload contains the frame terminator.
    #[error("payload contains the frame terminator byte")]
    TerminatorInPayload,

    /// A JSON payload could not be encoded or decoded.
    #[error("json error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
