//! Explicit predicate builder for selecting world objects.
//!
//! ```ignore
//! let hostiles = world.query(&ObjectQuery::new().kind(ObjectKind::Npc).civilian(false).alive(true));
//! ```
//!
//! Unset criteria match everything. A state criterion (`locked`, `alive`,
//! `civilian`, `hidden`) only matches objects that carry that state.

use mutiny_types::{ObjectKind, Position};

use crate::object::{ObjectState, WorldObject};

/// A conjunction of optional object criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    kind: Option<ObjectKind>,
    at: Option<Position>,
    within: Option<(Position, u32)>,
    locked: Option<bool>,
    alive: Option<bool>,
    civilian: Option<bool>,
    hidden: Option<bool>,
}

impl ObjectQuery {
    /// A query matching every object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one kind.
    #[must_use]
    pub const fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one tile.
    #[must_use]
    pub const fn at(mut self, position: Position) -> Self {
        self.at = Some(position);
        self
    }

    /// Restrict to a Chebyshev radius around `center`.
    #[must_use]
    pub const fn within(mut self, center: Position, radius: u32) -> Self {
        self.within = Some((center, radius));
        self
    }

    /// Doors and chests with the given lock state.
    #[must_use]
    pub const fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    /// NPCs with the given life state.
    #[must_use]
    pub const fn alive(mut self, alive: bool) -> Self {
        self.alive = Some(alive);
        self
    }

    /// NPCs with the given civilian flag.
    #[must_use]
    pub const fn civilian(mut self, civilian: bool) -> Self {
        self.civilian = Some(civilian);
        self
    }

    /// Traps with the given visibility.
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Whether `obj` satisfies every set criterion.
    pub fn matches(&self, obj: &WorldObject) -> bool {
        if self.kind.is_some_and(|kind| kind != obj.kind()) {
            return false;
        }
        if self.at.is_some_and(|at| at != obj.position()) {
            return false;
        }
        if let Some((center, radius)) = self.within
            && center.chebyshev(obj.position()) > radius
        {
            return false;
        }

        let state = obj.state();
        let lock_state = match state {
            ObjectState::Door { locked } | ObjectState::Chest { locked, .. } => Some(*locked),
            _ => None,
        };
        let npc_state = match state {
            ObjectState::Npc { alive, civilian } => Some((*alive, *civilian)),
            _ => None,
        };
        let hidden_state = match state {
            ObjectState::Trap { hidden } => Some(*hidden),
            _ => None,
        };

        criterion(self.locked, lock_state)
            && criterion(self.alive, npc_state.map(|(alive, _)| alive))
            && criterion(self.civilian, npc_state.map(|(_, civilian)| civilian))
            && criterion(self.hidden, hidden_state)
    }
}

/// An unset criterion matches; a set one needs an equal actual value.
fn criterion(wanted: Option<bool>, actual: Option<bool>) -> bool {
    wanted.is_none_or(|wanted| actual == Some(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(x: i32, y: i32, alive: bool, civilian: bool) -> WorldObject {
        WorldObject::new(ObjectState::Npc { alive, civilian }, Position::new(x, y), 0)
    }

    #[test]
    fn empty_query_matches_everything() {
        let wall = WorldObject::new(ObjectState::Wall, Position::new(0, 0), 0);
        assert!(ObjectQuery::new().matches(&wall));
    }

    #[test]
    fn state_criteria_require_the_state() {
        let wall = WorldObject::new(ObjectState::Wall, Position::new(0, 0), 0);
        assert!(!ObjectQuery::new().locked(false).matches(&wall));
        assert!(!ObjectQuery::new().alive(true).matches(&wall));

        let door = WorldObject::new(ObjectState::Door { locked: true }, Position::new(1, 0), 0);
        assert!(ObjectQuery::new().locked(true).matches(&door));
        assert!(!ObjectQuery::new().locked(false).matches(&door));
    }

    #[test]
    fn npc_filters_combine() {
        let hostile = npc(3, 3, true, false);
        let civilian = npc(4, 3, true, true);
        let query = ObjectQuery::new().kind(ObjectKind::Npc).civilian(false).alive(true);
        assert!(query.matches(&hostile));
        assert!(!query.matches(&civilian));
        assert!(!query.matches(&npc(3, 3, false, false)));
    }

    #[test]
    fn radius_is_chebyshev() {
        let query = ObjectQuery::new().within(Position::new(0, 0), 2);
        assert!(query.matches(&npc(2, 2, true, false)));
        assert!(!query.matches(&npc(3, 0, true, false)));
    }
}
