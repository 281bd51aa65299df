//! Shared type definitions for the Mutiny grid simulation.
//!
//! This crate is the single source of truth for the small value types that
//! flow between the world model, the goal engine, the server, and the
//! actor processes.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier newtypes for actors, objects, and runs
//! - [`enums`] -- Health, armed state, roles, and object kinds
//! - [`geometry`] -- Grid positions, directions, and distance metrics
//! - [`goal`] -- Goal predicates and their textual token form

pub mod enums;
pub mod geometry;
pub mod goal;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{ArmedState, Health, ObjectKind, Role};
pub use geometry::{Direction, Position};
pub use goal::{Goal, GoalParseError, GoalPredicate};
pub use ids::{ActorId, IdError, ObjectId, RunId};
