//! The canonical grid world.
//!
//! A [`World`] owns the tile map, the actors, and the cumulative event log.
//! Every mutation validates the occupancy invariant before touching state:
//!
//! - a tile holds at most one tile-occupying object (wall, door, chest,
//!   fire, trap, NPC) plus any number of loose keys and coins;
//! - no two actors share a tile, and no actor stands on a blocking tile.
//!
//! Illegal mutations return a [`WorldError`] and leave the world unchanged.

use std::collections::{BTreeMap, BTreeSet};

use mutiny_types::{ActorId, ArmedState, Direction, ObjectId, ObjectKind, Position};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Action, ActionOutcome};
use crate::actor::Actor;
use crate::error::WorldError;
use crate::event_log::EventLog;
use crate::knowledge::Knowledge;
use crate::object::{ObjectState, WorldObject};
use crate::query::ObjectQuery;

/// Blast radius used when a scenario does not set one.
pub const DEFAULT_BOMB_RANGE: u32 = 1;

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// Live mission score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Hostile NPCs in the world, alive or dead.
    pub enemies: usize,
    /// Hostile NPCs that are dead.
    pub enemies_killed: usize,
    /// Civilian NPCs in the world, alive or dead.
    pub civilians: usize,
    /// Civilian NPCs still alive.
    pub civilians_alive: usize,
    /// `enemies_killed / enemies`, or 0.0 without enemies.
    pub enemy_kill_rate: f64,
    /// `civilians_alive / civilians`, or 1.0 without civilians.
    pub civilian_survival_rate: f64,
}

impl Score {
    fn new(enemies: usize, enemies_killed: usize, civilians: usize, civilians_alive: usize) -> Self {
        let enemy_kill_rate = if enemies == 0 {
            0.0
        } else {
            enemies_killed as f64 / enemies as f64
        };
        let civilian_survival_rate = if civilians == 0 {
            1.0
        } else {
            civilians_alive as f64 / civilians as f64
        };
        Self {
            enemies,
            enemies_killed,
            civilians,
            civilians_alive,
            enemy_kill_rate,
            civilian_survival_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The authoritative world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    dim: i32,
    bomb_range: u32,
    #[serde(with = "crate::serde_tiles")]
    floor: BTreeMap<Position, Vec<WorldObject>>,
    users: BTreeMap<ActorId, Actor>,
    #[serde(default)]
    event_log: EventLog,
}

impl World {
    /// An empty `dim` x `dim` world.
    pub fn new(dim: i32, bomb_range: u32) -> Result<Self, WorldError> {
        if dim <= 0 {
            return Err(WorldError::InvalidDimension(dim));
        }
        Ok(Self::blank(dim, bomb_range))
    }

    /// An empty world without dimension validation, used for knowledge views.
    pub(crate) fn blank(dim: i32, bomb_range: u32) -> Self {
        Self {
            dim,
            bomb_range,
            floor: BTreeMap::new(),
            users: BTreeMap::new(),
            event_log: EventLog::default(),
        }
    }

    pub(crate) const fn tiles_mut(&mut self) -> &mut BTreeMap<Position, Vec<WorldObject>> {
        &mut self.floor
    }

    pub(crate) const fn users_mut(&mut self) -> &mut BTreeMap<ActorId, Actor> {
        &mut self.users
    }

    // -- Accessors ----------------------------------------------------------

    /// Grid side length.
    pub const fn dim(&self) -> i32 {
        self.dim
    }

    /// Chebyshev blast radius of a detonation.
    pub const fn bomb_range(&self) -> u32 {
        self.bomb_range
    }

    /// Every object, in tile order.
    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.floor.values().flatten()
    }

    /// Objects on one tile.
    pub fn objects_at(&self, position: Position) -> &[WorldObject] {
        self.floor.get(&position).map_or(&[], Vec::as_slice)
    }

    /// The object with the given identity.
    pub fn object(&self, id: &ObjectId) -> Option<&WorldObject> {
        self.objects().find(|obj| obj.id() == id)
    }

    /// The tile-occupying object on a tile, if any.
    pub fn occupant(&self, position: Position) -> Option<&WorldObject> {
        self.objects_at(position)
            .iter()
            .find(|obj| obj.kind().occupies_tile())
    }

    /// Objects matching a query, in tile order.
    pub fn query(&self, query: &ObjectQuery) -> Vec<&WorldObject> {
        self.objects().filter(|obj| query.matches(obj)).collect()
    }

    /// Every actor, ordered by id.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.users.values()
    }

    /// The actor with the given id.
    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.users.get(id)
    }

    /// The actor standing on a tile.
    pub fn actor_at(&self, position: Position) -> Option<&Actor> {
        self.users.values().find(|actor| actor.position == position)
    }

    /// The cumulative event log.
    pub const fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Whether a tile is inside the grid and every object on it can be
    /// entered. Actors are not considered.
    pub fn is_passable(&self, position: Position, treat_doors_open: bool) -> bool {
        position.in_bounds(self.dim)
            && self
                .objects_at(position)
                .iter()
                .all(|obj| obj.is_passable(treat_doors_open))
    }

    fn actor_or_err(&self, id: &ActorId) -> Result<&Actor, WorldError> {
        self.users
            .get(id)
            .ok_or_else(|| WorldError::UnknownActor(id.clone()))
    }

    fn actor_mut_or_err(&mut self, id: &ActorId) -> Result<&mut Actor, WorldError> {
        self.users
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownActor(id.clone()))
    }

    // -- Objects ------------------------------------------------------------

    /// Place a new object and return a copy of it.
    pub fn place_object(
        &mut self,
        state: ObjectState,
        position: Position,
    ) -> Result<WorldObject, WorldError> {
        if !position.in_bounds(self.dim) {
            return Err(WorldError::OutOfBounds(position));
        }
        if let ObjectState::Chest {
            contains: Some(inner),
            ..
        } = &state
            && inner.kind().occupies_tile()
        {
            return Err(WorldError::InvalidChestContents(inner.kind()));
        }

        let ordinal = self
            .objects_at(position)
            .iter()
            .filter(|existing| existing.same_form_as(&state))
            .count();
        let obj = WorldObject::new(state, position, ordinal);

        if obj.kind().occupies_tile() {
            if let Some(existing) = self.occupant(position) {
                return Err(WorldError::TileOccupied {
                    position,
                    existing: existing.kind(),
                });
            }
            if !obj.is_passable(false)
                && let Some(actor) = self.actor_at(position)
            {
                return Err(WorldError::ActorOnTile {
                    position,
                    actor: actor.id.clone(),
                });
            }
        }

        debug!(id = %obj.id(), kind = %obj.kind(), %position, "Object placed");
        self.floor.entry(position).or_default().push(obj.clone());
        Ok(obj)
    }

    /// Remove the first object of `kind` on a tile.
    pub fn remove_object_at(
        &mut self,
        kind: ObjectKind,
        position: Position,
    ) -> Result<WorldObject, WorldError> {
        let missing = WorldError::NothingToRemove { kind, position };
        let objects = self.floor.get_mut(&position).ok_or_else(|| missing.clone())?;
        let index = objects
            .iter()
            .position(|obj| obj.kind() == kind)
            .ok_or(missing)?;
        let removed = objects.remove(index);
        if objects.is_empty() {
            self.floor.remove(&position);
        }
        Ok(removed)
    }

    // -- Actors -------------------------------------------------------------

    /// Add an actor. Its knowledge is reset and filled by a first
    /// perception step.
    pub fn add_actor(&mut self, mut actor: Actor) -> Result<(), WorldError> {
        if self.users.contains_key(&actor.id) {
            return Err(WorldError::DuplicateActor(actor.id));
        }
        if !actor.position.in_bounds(self.dim) {
            return Err(WorldError::OutOfBounds(actor.position));
        }
        if let Some(other) = self.actor_at(actor.position) {
            return Err(WorldError::ActorOnTile {
                position: actor.position,
                actor: other.id.clone(),
            });
        }
        if !self.is_passable(actor.position, false) {
            return Err(WorldError::Impassable(actor.position));
        }

        let id = actor.id.clone();
        actor.knowledge = Knowledge::new(self.dim, self.bomb_range);
        self.users.insert(id.clone(), actor);
        self.perceive(&id)
    }

    /// Move an actor one tile, returning its new position.
    ///
    /// Entering a tile resets the armed state, collects loose keys and
    /// coins, applies fire and trap damage, and reveals traps.
    pub fn move_actor(
        &mut self,
        id: &ActorId,
        direction: Direction,
    ) -> Result<Position, WorldError> {
        let actor = self.actor_or_err(id)?;
        if actor.health.is_broken() {
            return Err(WorldError::ActorBroken(id.clone()));
        }
        let dest = actor.position.step(direction);
        if !dest.in_bounds(self.dim) {
            return Err(WorldError::OutOfBounds(dest));
        }
        if !self.is_passable(dest, false) {
            return Err(WorldError::Impassable(dest));
        }
        if let Some(other) = self.actor_at(dest) {
            return Err(WorldError::ActorOnTile {
                position: dest,
                actor: other.id.clone(),
            });
        }

        let mut loot = Vec::new();
        let mut damage = 0u8;
        if let Some(objects) = self.floor.get_mut(&dest) {
            let (picked, rest): (Vec<_>, Vec<_>) = std::mem::take(objects)
                .into_iter()
                .partition(|obj| !obj.kind().occupies_tile());
            *objects = rest;
            loot = picked;
            for obj in objects.iter_mut() {
                damage = damage.saturating_add(obj.entry_damage());
                if let ObjectState::Trap { hidden } = obj.state_mut() {
                    *hidden = false;
                }
            }
            if objects.is_empty() {
                self.floor.remove(&dest);
            }
        }

        let actor = self.actor_mut_or_err(id)?;
        actor.position = dest;
        actor.armed = ArmedState::Unarmed;
        actor.health = actor.health.damaged_by(damage);
        let health = actor.health;
        for mut item in loot {
            match item.state_mut() {
                ObjectState::Key { taken, .. } => {
                    *taken = true;
                    actor.keys.push(item);
                }
                ObjectState::Coin { value } => {
                    actor.coins = actor.coins.saturating_add(*value);
                }
                _ => {}
            }
        }

        let text = if damage > 0 {
            format!("moved {direction} to {dest}, took {damage} damage ({health:?})")
        } else {
            format!("moved {direction} to {dest}")
        };
        self.event_log.record(Some(id), text);
        Ok(dest)
    }

    /// Unlock the door or chest at `target`.
    ///
    /// Returns `Ok(false)` when the actor is not orthogonally adjacent,
    /// nothing locked is there, or the actor carries no matching key. A
    /// chest's contents pass to the actor.
    pub fn unlock_at(&mut self, id: &ActorId, target: Position) -> Result<bool, WorldError> {
        let actor = self.actor_or_err(id)?;
        if !actor.position.is_adjacent(target) {
            return Ok(false);
        }
        let Some(lock) = self.objects_at(target).iter().find(|obj| obj.is_locked()) else {
            return Ok(false);
        };
        if !actor.has_key_for(lock.id()) {
            return Ok(false);
        }
        let lock_id = lock.id().clone();

        let mut released = None;
        if let Some(lock) = self
            .floor
            .get_mut(&target)
            .and_then(|objects| objects.iter_mut().find(|obj| obj.id() == &lock_id))
        {
            match lock.state_mut() {
                ObjectState::Door { locked } => *locked = false,
                ObjectState::Chest { locked, contains } => {
                    *locked = false;
                    released = contains.take();
                }
                _ => {}
            }
        }

        let actor = self.actor_mut_or_err(id)?;
        if let Some(mut item) = released.map(|boxed| *boxed) {
            match item.state_mut() {
                ObjectState::Key { taken, .. } => {
                    *taken = true;
                    actor.keys.push(item);
                }
                ObjectState::Coin { value } => {
                    actor.coins = actor.coins.saturating_add(*value);
                }
                _ => {}
            }
        }

        self.event_log
            .record(Some(id), format!("unlocked {lock_id} at {target}"));
        Ok(true)
    }

    /// Advance an actor's armed state one step.
    pub fn arm(&mut self, id: &ActorId) -> Result<ArmedState, WorldError> {
        let actor = self.actor_mut_or_err(id)?;
        actor.armed = actor.armed.advanced();
        let state = actor.armed;
        self.event_log
            .record(Some(id), format!("armed state now {state:?}"));
        Ok(state)
    }

    /// Detonate at the actor's position and return the kill count.
    ///
    /// Only an armed actor kills anything; every call leaves the actor
    /// unarmed.
    pub fn detonate_at(&mut self, id: &ActorId) -> Result<usize, WorldError> {
        let actor = self
            .users
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownActor(id.clone()))?;
        let was_armed = actor.armed == ArmedState::Armed;
        actor.armed = ArmedState::Unarmed;
        if !was_armed {
            return Ok(0);
        }

        let center = actor.position;
        let range = self.bomb_range;
        let mut kills = 0usize;
        for obj in self.floor.values_mut().flatten() {
            if center.chebyshev(obj.position()) > range {
                continue;
            }
            if let ObjectState::Npc { alive, .. } = obj.state_mut()
                && *alive
            {
                *alive = false;
                kills = kills.saturating_add(1);
            }
        }

        self.event_log.record(
            Some(id),
            format!("detonated at {center} (range {range}), {kills} killed"),
        );
        Ok(kills)
    }

    /// Mark an actor as stood down; it can no longer act.
    pub fn stand_down(&mut self, id: &ActorId) -> Result<(), WorldError> {
        self.actor_mut_or_err(id)?.active = false;
        self.event_log.record(Some(id), "stood down");
        Ok(())
    }

    /// Pin a copy of an object in an actor's knowledge.
    pub fn share_object(&mut self, recipient: &ActorId, object: &ObjectId) -> Result<(), WorldError> {
        let obj = self
            .object(object)
            .cloned()
            .ok_or_else(|| WorldError::UnknownObject(object.clone()))?;
        self.actor_mut_or_err(recipient)?.knowledge.learn(obj);
        Ok(())
    }

    /// Apply a parsed action token on behalf of an actor.
    ///
    /// Failures are noted in the event log and returned.
    pub fn apply_action(
        &mut self,
        id: &ActorId,
        action: Action,
    ) -> Result<ActionOutcome, WorldError> {
        let result = self.dispatch(id, action);
        if let Err(err) = &result {
            self.event_log
                .record(Some(id), format!("failed {action}: {err}"));
        }
        result
    }

    fn dispatch(&mut self, id: &ActorId, action: Action) -> Result<ActionOutcome, WorldError> {
        let actor = self.actor_or_err(id)?;
        if !actor.active {
            return Err(WorldError::ActorInactive(id.clone()));
        }
        let was_armed = actor.armed == ArmedState::Armed;

        match action {
            Action::Move(direction) => {
                let to = self.move_actor(id, direction)?;
                let health = self.actor_or_err(id)?.health;
                Ok(ActionOutcome::Moved { to, health })
            }
            Action::Arm => Ok(ActionOutcome::Armed {
                state: self.arm(id)?,
            }),
            Action::Detonate => {
                let kills = self.detonate_at(id)?;
                if was_armed {
                    Ok(ActionOutcome::Detonated { kills })
                } else {
                    Err(WorldError::NotArmed(id.clone()))
                }
            }
            Action::Unlock(target) => {
                if self.unlock_at(id, target)? {
                    Ok(ActionOutcome::Unlocked { target })
                } else {
                    Err(WorldError::UnlockRefused {
                        actor: id.clone(),
                        target,
                    })
                }
            }
            Action::Wait => Ok(ActionOutcome::Waited),
        }
    }

    // -- Perception ---------------------------------------------------------

    /// Refresh an actor's knowledge from the current world.
    ///
    /// The actor sees every visible object and actor inside its vision
    /// window. Operators additionally see every hostile NPC.
    pub fn perceive(&mut self, id: &ActorId) -> Result<(), WorldError> {
        let actor = self.actor_or_err(id)?;
        let center = actor.position;
        let radius = actor.vision_radius;

        let mut visible: Vec<WorldObject> = self
            .objects()
            .filter(|obj| obj.is_visible() && actor.can_see(obj.position()))
            .cloned()
            .collect();
        if actor.is_operator() {
            visible.extend(
                self.objects()
                    .filter(|obj| obj.is_hostile() && !actor.can_see(obj.position()))
                    .cloned(),
            );
        }
        let actors: Vec<Actor> = self
            .users
            .values()
            .filter(|other| actor.can_see(other.position))
            .map(Actor::public_view)
            .collect();

        self.actor_mut_or_err(id)?
            .knowledge
            .update(&visible, actors, center, radius);
        Ok(())
    }

    // -- Scoring and comparison ---------------------------------------------

    /// The live score.
    pub fn score(&self) -> Score {
        let npcs = self.query(&ObjectQuery::new().kind(ObjectKind::Npc));
        let enemies = npcs.iter().filter(|npc| npc.is_hostile()).count();
        let enemies_killed = npcs
            .iter()
            .filter(|npc| npc.is_hostile() && !npc.is_living_npc())
            .count();
        let civilians = npcs.iter().filter(|npc| npc.is_civilian()).count();
        let civilians_alive = npcs
            .iter()
            .filter(|npc| npc.is_civilian() && npc.is_living_npc())
            .count();
        Score::new(enemies, enemies_killed, civilians, civilians_alive)
    }

    /// Whether the world has enemies and all of them are dead.
    pub fn all_enemies_eliminated(&self) -> bool {
        let score = self.score();
        score.enemies > 0 && score.enemies_killed == score.enemies
    }

    /// Tiles whose objects or actor occupancy differ from `other`.
    pub fn diff(&self, other: &Self) -> BTreeSet<Position> {
        let tiles: BTreeSet<Position> = self
            .floor
            .keys()
            .chain(other.floor.keys())
            .copied()
            .collect();
        let mut changed: BTreeSet<Position> = tiles
            .into_iter()
            .filter(|pos| self.floor.get(pos) != other.floor.get(pos))
            .collect();

        let ours = self.occupancy();
        let theirs = other.occupancy();
        changed.extend(
            ours.keys()
                .chain(theirs.keys())
                .filter(|pos| ours.get(pos) != theirs.get(pos))
                .copied(),
        );
        changed
    }

    fn occupancy(&self) -> BTreeMap<Position, BTreeSet<&ActorId>> {
        let mut map: BTreeMap<Position, BTreeSet<&ActorId>> = BTreeMap::new();
        for actor in self.users.values() {
            map.entry(actor.position).or_default().insert(&actor.id);
        }
        map
    }

    /// Append a note to the event log.
    pub fn record_event(&mut self, actor: Option<&ActorId>, text: impl Into<String>) {
        self.event_log.record(actor, text);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use mutiny_types::{Health, Role};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn id(name: &str) -> ActorId {
        name.parse().unwrap()
    }

    fn agent(name: &str, x: i32, y: i32) -> Actor {
        Actor::new(id(name), Role::Agent, Position::new(x, y), 2)
    }

    fn npc(civilian: bool) -> ObjectState {
        ObjectState::Npc {
            alive: true,
            civilian,
        }
    }

    fn random_state(rng: &mut StdRng) -> ObjectState {
        match rng.random_range(0..8) {
            0 => ObjectState::Wall,
            1 => ObjectState::Door {
                locked: rng.random_bool(0.5),
            },
            2 => ObjectState::Chest {
                locked: true,
                contains: None,
            },
            3 => ObjectState::Coin {
                value: rng.random_range(1..5),
            },
            4 => ObjectState::Fire,
            5 => ObjectState::Trap { hidden: true },
            6 => npc(rng.random_bool(0.3)),
            _ => ObjectState::Key {
                unlocks: "door-0123456789abcdef".parse().unwrap(),
                taken: false,
            },
        }
    }

    fn assert_occupancy_invariant(world: &World) {
        for pos in world.floor.keys() {
            let fixtures = world
                .objects_at(*pos)
                .iter()
                .filter(|obj| obj.kind().occupies_tile())
                .count();
            assert!(fixtures <= 1, "tile {pos} holds {fixtures} fixtures");
        }
        let mut seen = BTreeSet::new();
        for actor in world.actors() {
            assert!(seen.insert(actor.position), "two actors on {}", actor.position);
            assert!(
                world.is_passable(actor.position, false),
                "actor {} on blocking tile",
                actor.id
            );
        }
    }

    #[test]
    fn placement_invariant_holds_under_random_sequences() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut world = World::new(6, 1).unwrap();
            for step in 0..200 {
                let pos = Position::new(rng.random_range(-1..7), rng.random_range(-1..7));
                match rng.random_range(0..10) {
                    0 => {
                        let _ = world.add_actor(agent(&format!("a{step}"), pos.x, pos.y));
                    }
                    1 => {
                        let kind = ObjectKind::ALL[rng.random_range(0..ObjectKind::ALL.len())];
                        let _ = world.remove_object_at(kind, pos);
                    }
                    2 => {
                        let actors: Vec<ActorId> = world.actors().map(|a| a.id.clone()).collect();
                        if let Some(actor) = actors.first() {
                            let dir = Direction::ALL[rng.random_range(0..4)];
                            let _ = world.move_actor(actor, dir);
                        }
                    }
                    _ => {
                        let _ = world.place_object(random_state(&mut rng), pos);
                    }
                }
                assert_occupancy_invariant(&world);
            }
        }
    }

    #[test]
    fn placement_rejects_conflicts() {
        let mut world = World::new(5, 1).unwrap();
        let pos = Position::new(1, 1);
        world.place_object(ObjectState::Wall, pos).unwrap();
        assert_eq!(
            world.place_object(ObjectState::Fire, pos),
            Err(WorldError::TileOccupied {
                position: pos,
                existing: ObjectKind::Wall
            })
        );
        assert!(world.place_object(ObjectState::Coin { value: 1 }, pos).is_ok());
        assert_eq!(
            world.place_object(ObjectState::Wall, Position::new(5, 0)),
            Err(WorldError::OutOfBounds(Position::new(5, 0)))
        );

        world.add_actor(agent("agent1", 3, 3)).unwrap();
        assert!(matches!(
            world.place_object(npc(false), Position::new(3, 3)),
            Err(WorldError::ActorOnTile { .. })
        ));
        assert!(world.place_object(ObjectState::Fire, Position::new(3, 3)).is_ok());
    }

    #[test]
    fn stacked_coins_get_distinct_identities() {
        let mut world = World::new(3, 1).unwrap();
        let pos = Position::new(0, 0);
        let a = world.place_object(ObjectState::Coin { value: 1 }, pos).unwrap();
        let b = world.place_object(ObjectState::Coin { value: 1 }, pos).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(world.objects_at(pos).len(), 2);
    }

    #[test]
    fn remove_requires_matching_kind() {
        let mut world = World::new(3, 1).unwrap();
        let pos = Position::new(2, 2);
        world.place_object(ObjectState::Fire, pos).unwrap();
        assert!(matches!(
            world.remove_object_at(ObjectKind::Wall, pos),
            Err(WorldError::NothingToRemove { .. })
        ));
        assert_eq!(world.remove_object_at(ObjectKind::Fire, pos).unwrap().kind(), ObjectKind::Fire);
        assert!(world.objects_at(pos).is_empty());
    }

    #[test]
    fn moving_into_a_wall_fails_and_changes_nothing() {
        let mut world = World::new(4, 1).unwrap();
        world.place_object(ObjectState::Wall, Position::new(1, 0)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        let before = world.clone();

        let err = world.move_actor(&id("agent1"), Direction::Right);
        assert_eq!(err, Err(WorldError::Impassable(Position::new(1, 0))));
        assert!(world.diff(&before).is_empty());
    }

    #[test]
    fn moving_collects_loot_and_takes_damage() {
        let mut world = World::new(5, 1).unwrap();
        let door = world
            .place_object(ObjectState::Door { locked: true }, Position::new(4, 4))
            .unwrap();
        world
            .place_object(
                ObjectState::Key {
                    unlocks: door.id().clone(),
                    taken: false,
                },
                Position::new(1, 0),
            )
            .unwrap();
        world.place_object(ObjectState::Coin { value: 3 }, Position::new(1, 0)).unwrap();
        world.place_object(ObjectState::Trap { hidden: true }, Position::new(2, 0)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        let agent1 = id("agent1");

        world.arm(&agent1).unwrap();
        world.move_actor(&agent1, Direction::Right).unwrap();
        let actor = world.actor(&agent1).unwrap();
        assert_eq!(actor.armed, ArmedState::Unarmed);
        assert_eq!(actor.coins, 3);
        assert!(actor.has_key_for(door.id()));
        assert!(world.objects_at(Position::new(1, 0)).is_empty());

        world.move_actor(&agent1, Direction::Right).unwrap();
        assert_eq!(world.actor(&agent1).unwrap().health, Health::Critical);
        assert!(world.objects_at(Position::new(2, 0))[0].is_visible());
    }

    #[test]
    fn broken_actors_cannot_move() {
        let mut world = World::new(5, 1).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        world.users_mut().get_mut(&id("agent1")).unwrap().health = Health::Broken;
        assert_eq!(
            world.move_actor(&id("agent1"), Direction::Down),
            Err(WorldError::ActorBroken(id("agent1")))
        );
    }

    #[test]
    fn unlocking_requires_adjacency_and_key() {
        let mut world = World::new(5, 1).unwrap();
        let coin = WorldObject::new(ObjectState::Coin { value: 7 }, Position::new(2, 1), 0);
        let chest = world
            .place_object(
                ObjectState::Chest {
                    locked: true,
                    contains: Some(Box::new(coin)),
                },
                Position::new(2, 1),
            )
            .unwrap();
        world
            .place_object(
                ObjectState::Key {
                    unlocks: chest.id().clone(),
                    taken: false,
                },
                Position::new(0, 1),
            )
            .unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        let agent1 = id("agent1");

        assert!(!world.unlock_at(&agent1, Position::new(2, 1)).unwrap());
        world.move_actor(&agent1, Direction::Down).unwrap();
        assert!(!world.unlock_at(&agent1, Position::new(2, 1)).unwrap());
        world.move_actor(&agent1, Direction::Right).unwrap();
        assert!(world.unlock_at(&agent1, Position::new(2, 1)).unwrap());

        let actor = world.actor(&agent1).unwrap();
        assert_eq!(actor.coins, 7);
        assert!(!world.object(chest.id()).unwrap().is_locked());
        assert!(!world.unlock_at(&agent1, Position::new(2, 1)).unwrap());
    }

    #[test]
    fn detonation_without_arming_is_a_no_op() {
        let mut world = World::new(5, 1).unwrap();
        world.place_object(npc(false), Position::new(1, 1)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        let agent1 = id("agent1");

        world.arm(&agent1).unwrap();
        let before = world.clone();
        assert_eq!(world.detonate_at(&agent1).unwrap(), 0);
        assert_eq!(world.actor(&agent1).unwrap().armed, ArmedState::Unarmed);
        assert!(world.diff(&before).is_empty());
        assert_eq!(world.score(), before.score());

        let outcome = world.apply_action(&agent1, Action::Detonate);
        assert_eq!(outcome, Err(WorldError::NotArmed(agent1)));
    }

    #[test]
    fn armed_detonation_kills_in_range_and_resets() {
        let mut world = World::new(6, 1).unwrap();
        world.place_object(npc(false), Position::new(1, 1)).unwrap();
        world.place_object(npc(true), Position::new(0, 1)).unwrap();
        world.place_object(npc(false), Position::new(3, 3)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        let agent1 = id("agent1");

        world.arm(&agent1).unwrap();
        world.arm(&agent1).unwrap();
        assert_eq!(world.detonate_at(&agent1).unwrap(), 2);
        assert_eq!(world.actor(&agent1).unwrap().armed, ArmedState::Unarmed);

        let score = world.score();
        assert_eq!(score.enemies, 2);
        assert_eq!(score.enemies_killed, 1);
        assert_eq!(score.civilians_alive, 0);
        assert!((score.enemy_kill_rate - 0.5).abs() < f64::EPSILON);
        assert!(!world.all_enemies_eliminated());
    }

    #[test]
    fn empty_score_conventions() {
        let world = World::new(3, 1).unwrap();
        let score = world.score();
        assert!(score.enemy_kill_rate.abs() < f64::EPSILON);
        assert!((score.civilian_survival_rate - 1.0).abs() < f64::EPSILON);
        assert!(!world.all_enemies_eliminated());
    }

    #[test]
    fn perception_hides_traps_and_shows_operators_hostiles() {
        let mut world = World::new(8, 1).unwrap();
        world.place_object(ObjectState::Trap { hidden: true }, Position::new(1, 0)).unwrap();
        let hostile = world.place_object(npc(false), Position::new(7, 7)).unwrap();
        let civilian = world.place_object(npc(true), Position::new(7, 6)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        world
            .add_actor(Actor::new(id("op"), Role::Operator, Position::new(0, 2), 1))
            .unwrap();

        let agent_view = &world.actor(&id("agent1")).unwrap().knowledge;
        assert!(agent_view.view.objects_at(Position::new(1, 0)).is_empty());
        assert!(!agent_view.knows(hostile.id()));

        let op_view = &world.actor(&id("op")).unwrap().knowledge;
        assert!(op_view.knows(hostile.id()));
        assert!(!op_view.knows(civilian.id()));
        assert!(op_view.view.actor(&id("agent1")).is_none());
    }

    #[test]
    fn sharing_pins_objects() {
        let mut world = World::new(8, 1).unwrap();
        let wall = world.place_object(ObjectState::Wall, Position::new(7, 7)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        world.share_object(&id("agent1"), wall.id()).unwrap();
        world.perceive(&id("agent1")).unwrap();
        assert!(world.actor(&id("agent1")).unwrap().knowledge.knows(wall.id()));
    }

    #[test]
    fn serde_is_idempotent() {
        let mut world = World::new(5, 2).unwrap();
        let door = world
            .place_object(ObjectState::Door { locked: true }, Position::new(2, 2))
            .unwrap();
        world
            .place_object(
                ObjectState::Key {
                    unlocks: door.id().clone(),
                    taken: false,
                },
                Position::new(0, 1),
            )
            .unwrap();
        world.place_object(npc(true), Position::new(4, 4)).unwrap();
        world.add_actor(agent("agent1", 0, 0)).unwrap();
        world.move_actor(&id("agent1"), Direction::Down).unwrap();

        let first = serde_json::to_string(&world).unwrap();
        let restored: World = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&restored).unwrap();
        assert_eq!(first, second);
        assert_eq!(restored, world);
    }
}
