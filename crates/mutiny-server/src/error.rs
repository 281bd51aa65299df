//! Error types for the coordination server.

use mutiny_core::RecordError;
use mutiny_protocol::ProtocolError;

/// Errors raised while serving a run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A socket operation failed.
    #[error("i/o error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A connection sent something that could not be framed or decoded.
    #[error("protocol error: {source}")]
    Protocol {
        /// The underlying protocol error.
        #[from]
        source: ProtocolError,
    },

    /// A client command was understood but rejected.
    #[error("rejected command from {user}: {reason}")]
    Rejected {
        /// The requesting actor.
        user: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The result record could not be written.
    #[error("result record error: {source}")]
    Record {
        /// The underlying record error.
        #[from]
        source: RecordError,
    },

    /// The world owner task is gone.
    #[error("world owner stopped")]
    OwnerStopped,
}
