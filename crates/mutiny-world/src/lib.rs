//! Grid world, objects, per-actor knowledge, and navigation for the Mutiny
//! simulation.
//!
//! This crate holds the canonical world model that the server owns and the
//! partial views that actors reason over. Both are the same [`World`] type;
//! a knowledge view is simply a world restricted to what one actor sees.
//!
//! # Modules
//!
//! - [`action`] -- Action tokens (`move:up`, `arm`, ...) and their outcomes.
//! - [`actor`] -- Agents and operators, their inventory and vision.
//! - [`error`] -- Error types for illegal world mutations.
//! - [`event_log`] -- Append-only record of what happened.
//! - [`knowledge`] -- Fog-of-war views with pinned facts.
//! - [`object`] -- World objects and their content-derived identity.
//! - [`pathfinding`] -- Best-first navigation over a world view.
//! - [`query`] -- Explicit object predicate builder.
//! - [`scenario`] -- YAML scenario files and the built-in default map.
//! - [`world`] -- The world itself, scoring, perception, and diffing.

pub mod action;
pub mod actor;
pub mod error;
pub mod event_log;
pub mod knowledge;
pub mod object;
pub mod pathfinding;
pub mod query;
pub mod scenario;
mod serde_tiles;
pub mod world;

// Re-export primary types at crate root.
pub use action::{Action, ActionOutcome, ActionParseError};
pub use actor::{Actor, OMNISCIENT};
pub use error::WorldError;
pub use event_log::{EventLog, LogEntry};
pub use knowledge::Knowledge;
pub use object::{ObjectState, WorldObject};
pub use pathfinding::{first_locked_door, navigate, trace};
pub use query::ObjectQuery;
pub use scenario::{ScenarioError, ScenarioSpec, default_scenario};
pub use world::{DEFAULT_BOMB_RANGE, Score, World};
