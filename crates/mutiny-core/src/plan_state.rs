//! Planner-facing state built from one actor's knowledge.
//!
//! An external planner sees the world only through [`PlanState`]: it can
//! navigate, apply actions to its private copy, forecast a sequence of
//! actions without touching the copy, and ask whether goals are valid or
//! complete. Nothing here talks to the server.

use mutiny_types::{Direction, Goal, Position};
use mutiny_world::{Action, ActionOutcome, Actor, World, WorldError, navigate};
use tracing::warn;

use crate::goals::{self, Discrepancy};

/// One actor's view plus its own state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanState {
    actor: Actor,
    view: World,
}

impl PlanState {
    /// Build a planning state from an actor and its knowledge view.
    ///
    /// The actor is placed into the view when perception did not already
    /// put it there.
    pub fn new(actor: &Actor) -> Self {
        let mut view = actor.knowledge.view.clone();
        if view.actor(&actor.id).is_none()
            && let Err(err) = view.add_actor(actor.public_view())
        {
            warn!(actor = %actor.id, error = %err, "Actor missing from its own view");
        }
        Self {
            actor: actor.public_view(),
            view,
        }
    }

    /// The planning actor as currently forecast.
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The knowledge view as currently forecast.
    pub const fn view(&self) -> &World {
        &self.view
    }

    /// The actor's current tile.
    pub const fn position(&self) -> Position {
        self.actor.position
    }

    /// Path from the actor to `dest` over the view.
    pub fn navigate(&self, dest: Position, treat_doors_open: bool) -> Option<Vec<Direction>> {
        navigate(&self.view, self.actor.position, dest, treat_doors_open)
    }

    /// Apply an action to the private view.
    pub fn apply_action(&mut self, action: Action) -> Result<ActionOutcome, WorldError> {
        let outcome = self.view.apply_action(&self.actor.id, action)?;
        if let Some(updated) = self.view.actor(&self.actor.id) {
            self.actor = updated.public_view();
        }
        Ok(outcome)
    }

    /// The state after applying `actions` in order, leaving `self` intact.
    pub fn forecast(&self, actions: &[Action]) -> Result<Self, WorldError> {
        let mut next = self.clone();
        for action in actions {
            next.apply_action(*action)?;
        }
        Ok(next)
    }

    /// Whether the goal is achieved in the view.
    pub fn goal_complete(&self, goal: &Goal) -> bool {
        goals::is_complete(&self.view, &self.actor, goal)
    }

    /// Check a goal against the view.
    pub fn valid_goal(&self, goal: &Goal) -> Result<(), Discrepancy> {
        goals::check(&self.view, &self.actor, goal)
    }
}
