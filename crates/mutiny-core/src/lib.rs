//! Goal validation, rebellion negotiation, planning state, and run
//! bookkeeping for the Mutiny simulation.
//!
//! This crate holds the reasoning that sits between the world model and
//! the network: whether a goal still makes sense, what to do when it does
//! not, and how a bounded run is started, ended, and recorded.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `mutiny-config.yaml` into
//!   strongly-typed structs.
//! - [`goals`] -- Discrepancy checks, explanations, and the goal graph.
//! - [`plan_state`] -- [`PlanState`], the planner's view of one actor.
//! - [`rebellion`] -- Contesting a goal over a [`DialogChannel`].
//! - [`simulation`] -- Run termination and result records.
//!
//! [`PlanState`]: plan_state::PlanState
//! [`DialogChannel`]: rebellion::DialogChannel

pub mod config;
pub mod goals;
pub mod plan_state;
pub mod rebellion;
pub mod simulation;

pub use config::{ConfigError, SimulationConfig};
pub use goals::{Discrepancy, Explanation, GoalGraph};
pub use plan_state::PlanState;
pub use rebellion::{
    Alternative, DialogChannel, NegotiationPolicy, Rebellion, RebellionError, Resolution,
    negotiate,
};
pub use simulation::{EndReason, RecordError, ResultRecord, SimulationRun};
