//! Error types for the agent runtime.

/// Errors that stop an agent or operator process.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The server stopped answering.
    #[error("server at {addr} unreachable for {rounds} rounds")]
    ServerGone {
        /// Server address.
        addr: String,
        /// Consecutive rounds without a snapshot.
        rounds: u32,
    },
}
