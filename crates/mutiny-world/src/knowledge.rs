//! Per-actor partial knowledge ("fog of war").
//!
//! A [`Knowledge`] is a [`World`] restricted to what its actor currently
//! perceives, plus pinned facts that survive leaving the vision window.
//! Objects become pinned when another actor shares them; operators also
//! receive every hostile NPC on each perception step.

use std::collections::BTreeSet;

use mutiny_types::{ObjectId, Position};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::object::WorldObject;
use crate::world::{DEFAULT_BOMB_RANGE, World};

/// An actor's restricted view of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knowledge {
    /// What the actor believes the world looks like.
    pub view: World,
    /// Objects kept outside the vision window.
    pub pinned: BTreeSet<ObjectId>,
}

impl Default for Knowledge {
    fn default() -> Self {
        Self::new(0, DEFAULT_BOMB_RANGE)
    }
}

impl Knowledge {
    /// Empty knowledge of a `dim` x `dim` world.
    pub fn new(dim: i32, bomb_range: u32) -> Self {
        Self {
            view: World::blank(dim, bomb_range),
            pinned: BTreeSet::new(),
        }
    }

    /// Replace the perceived part of the view.
    ///
    /// Tiles inside the window centred on `center` are overwritten, tiles
    /// outside it are forgotten except for pinned objects, and every object
    /// in `visible_objects` is inserted wherever it lies. A negative
    /// `radius` puts the whole grid inside the window. The actor list is
    /// replaced by `visible_actors`.
    pub fn update(
        &mut self,
        visible_objects: &[WorldObject],
        visible_actors: Vec<Actor>,
        center: Position,
        radius: i32,
    ) {
        let in_window = |pos: Position| {
            radius < 0 || u32::try_from(radius).is_ok_and(|r| center.chebyshev(pos) <= r)
        };
        let pinned = &self.pinned;
        self.view.tiles_mut().retain(|pos, objects| {
            if in_window(*pos) {
                return false;
            }
            objects.retain(|obj| pinned.contains(obj.id()));
            !objects.is_empty()
        });

        for obj in visible_objects {
            self.insert(obj.clone());
        }

        let users = self.view.users_mut();
        users.clear();
        for actor in visible_actors {
            users.insert(actor.id.clone(), actor.public_view());
        }
    }

    /// Pin an object so it is remembered outside the vision window.
    pub fn learn(&mut self, obj: WorldObject) {
        self.pinned.insert(obj.id().clone());
        self.insert(obj);
    }

    /// Whether the object is known, pinned or perceived.
    pub fn knows(&self, id: &ObjectId) -> bool {
        self.view.object(id).is_some()
    }

    fn insert(&mut self, obj: WorldObject) {
        let tiles = self.view.tiles_mut();
        for objects in tiles.values_mut() {
            objects.retain(|existing| existing.id() != obj.id());
        }
        tiles.retain(|_, objects| !objects.is_empty());
        tiles.entry(obj.position()).or_default().push(obj);
    }
}
