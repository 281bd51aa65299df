//! Agents and operators inhabiting the grid.

use mutiny_types::{ActorId, ArmedState, Health, ObjectId, Position, Role};
use serde::{Deserialize, Serialize};

use crate::knowledge::Knowledge;
use crate::object::{ObjectState, WorldObject};

/// Vision radius meaning "sees the whole grid".
pub const OMNISCIENT: i32 = -1;

/// An actor and everything it carries.
///
/// `knowledge` is private to the actor. Copies of an actor stored inside
/// another actor's knowledge are made with [`Actor::public_view`], which
/// leaves it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique name.
    pub id: ActorId,
    /// Agent or operator.
    pub role: Role,
    /// Current tile.
    pub position: Position,
    /// Chebyshev radius of the vision window; [`OMNISCIENT`] sees everything.
    pub vision_radius: i32,
    /// Damage level.
    pub health: Health,
    /// Detonation readiness.
    pub armed: ArmedState,
    /// Keys picked up or taken from chests.
    pub keys: Vec<WorldObject>,
    /// Total value of collected coins.
    pub coins: u32,
    /// False once the actor has stood down.
    pub active: bool,
    /// The actor's restricted view of the world.
    #[serde(default)]
    pub knowledge: Knowledge,
}

impl Actor {
    /// A fresh, healthy, unarmed actor.
    pub fn new(id: ActorId, role: Role, position: Position, vision_radius: i32) -> Self {
        Self {
            id,
            role,
            position,
            vision_radius,
            health: Health::Healthy,
            armed: ArmedState::Unarmed,
            keys: Vec::new(),
            coins: 0,
            active: true,
            knowledge: Knowledge::default(),
        }
    }

    /// Whether the actor is an operator.
    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }

    /// Whether the actor sees the whole grid.
    pub const fn is_omniscient(&self) -> bool {
        self.vision_radius < 0
    }

    /// Whether `position` lies inside the actor's vision window.
    pub fn can_see(&self, position: Position) -> bool {
        self.is_omniscient()
            || u32::try_from(self.vision_radius)
                .is_ok_and(|radius| self.position.chebyshev(position) <= radius)
    }

    /// Whether the actor carries a key for `target`.
    pub fn has_key_for(&self, target: &ObjectId) -> bool {
        self.keys.iter().any(|key| {
            matches!(key.state(), ObjectState::Key { unlocks, .. } if unlocks == target)
        })
    }

    /// A copy without private knowledge, safe to place in another view.
    pub fn public_view(&self) -> Self {
        Self {
            knowledge: Knowledge::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn actor(radius: i32) -> Actor {
        Actor::new("agent1".parse().unwrap(), Role::Agent, Position::new(3, 3), radius)
    }

    #[test]
    fn vision_window_is_chebyshev() {
        let a = actor(2);
        assert!(a.can_see(Position::new(5, 5)));
        assert!(a.can_see(Position::new(1, 4)));
        assert!(!a.can_see(Position::new(6, 3)));
        assert!(actor(OMNISCIENT).can_see(Position::new(100, -40)));
    }

    #[test]
    fn key_lookup_matches_target() {
        let door = WorldObject::new(ObjectState::Door { locked: true }, Position::new(2, 2), 0);
        let key = WorldObject::new(
            ObjectState::Key {
                unlocks: door.id().clone(),
                taken: true,
            },
            Position::new(0, 0),
            0,
        );
        let mut a = actor(2);
        assert!(!a.has_key_for(door.id()));
        a.keys.push(key);
        assert!(a.has_key_for(door.id()));
    }
}
