//! Coordination server for the Mutiny simulation.
//!
//! One server process serves one run. It owns the canonical world, a
//! queued-goals mailbox and a queued-dialogs mailbox per actor, and
//! serialises every mutation through a single owner task.
//!
//! # Modules
//!
//! - [`connection`] -- Decoding and dispatching one connection's frames.
//! - [`error`] -- Server error types.
//! - [`owner`] -- The owner task and its command channel.
//! - [`server`] -- Listener lifecycle and result recording.
//! - [`state`] -- World plus mailboxes, mutated only by the owner.

pub mod connection;
pub mod error;
pub mod owner;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use owner::{Command, WorldHandle, spawn_owner};
pub use server::Server;
pub use state::WorldState;
