//! Declarative scenario files.
//!
//! A scenario describes a starting world in YAML:
//!
//! ```yaml
//! dim: 5
//! bomb_range: 1
//! objects:
//!   - { kind: wall, at: { x: 2, y: 0 } }
//!   - { kind: door, at: { x: 2, y: 2 } }
//!   - { kind: key, at: { x: 0, y: 4 }, unlocks: { x: 2, y: 2 } }
//!   - { kind: npc, at: { x: 4, y: 4 } }
//! actors:
//!   - { id: agent1, at: { x: 0, y: 0 }, vision_radius: 2 }
//!   - { id: op, role: operator, at: { x: 0, y: 1 } }
//! ```
//!
//! Keys name their door or chest by position. Because door and chest
//! identities depend only on their tile, a key may reference a lock
//! declared anywhere in the file.

use std::path::Path;

use mutiny_types::{ActorId, ObjectId, Position, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actor::Actor;
use crate::error::WorldError;
use crate::object::{ObjectState, WorldObject};
use crate::world::{DEFAULT_BOMB_RANGE, World};

/// Errors raised while loading or building a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// The scenario file is not valid YAML for a scenario.
    #[error("failed to parse scenario YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// The scenario describes an illegal world.
    #[error("invalid scenario: {0}")]
    World(#[from] WorldError),
}

const fn default_true() -> bool {
    true
}

const fn default_bomb_range() -> u32 {
    DEFAULT_BOMB_RANGE
}

const fn default_vision_radius() -> i32 {
    2
}

/// A loose item stored in a chest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSpec {
    /// A key for the lock at `unlocks`.
    Key {
        /// Tile of the door or chest it opens.
        unlocks: Position,
    },
    /// A coin.
    Coin {
        /// Face value.
        value: u32,
    },
}

/// One object in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectSpec {
    /// A wall.
    Wall {
        /// Tile.
        at: Position,
    },
    /// A door, locked unless stated otherwise.
    Door {
        /// Tile.
        at: Position,
        /// Initial lock state.
        #[serde(default = "default_true")]
        locked: bool,
    },
    /// A chest, locked unless stated otherwise.
    Chest {
        /// Tile.
        at: Position,
        /// Initial lock state.
        #[serde(default = "default_true")]
        locked: bool,
        /// Optional key or coin inside.
        #[serde(default)]
        contains: Option<ItemSpec>,
    },
    /// A loose key.
    Key {
        /// Tile.
        at: Position,
        /// Tile of the door or chest it opens.
        unlocks: Position,
    },
    /// A loose coin.
    Coin {
        /// Tile.
        at: Position,
        /// Face value.
        value: u32,
    },
    /// Fire.
    Fire {
        /// Tile.
        at: Position,
    },
    /// A trap, hidden unless stated otherwise.
    Trap {
        /// Tile.
        at: Position,
        /// Initial visibility.
        #[serde(default = "default_true")]
        hidden: bool,
    },
    /// A living NPC, hostile unless flagged civilian.
    Npc {
        /// Tile.
        at: Position,
        /// Whether the NPC is a protected civilian.
        #[serde(default)]
        civilian: bool,
    },
}

impl ObjectSpec {
    const fn build_phase(&self) -> u8 {
        match self {
            Self::Wall { .. }
            | Self::Door { .. }
            | Self::Fire { .. }
            | Self::Trap { .. }
            | Self::Npc { .. } => 0,
            Self::Chest { .. } => 1,
            Self::Key { .. } | Self::Coin { .. } => 2,
        }
    }
}

/// One actor in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpec {
    /// Actor name.
    pub id: ActorId,
    /// Agent or operator.
    #[serde(default)]
    pub role: Role,
    /// Starting tile.
    pub at: Position,
    /// Vision radius; -1 sees everything.
    #[serde(default = "default_vision_radius")]
    pub vision_radius: i32,
}

/// A complete starting world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Grid side length.
    pub dim: i32,
    /// Detonation blast radius.
    #[serde(default = "default_bomb_range")]
    pub bomb_range: u32,
    /// Objects, in any order.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    /// Actors, in any order.
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
}

impl ScenarioSpec {
    /// Load a scenario from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a scenario from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Build the world: fixtures first, then chests, then loose items,
    /// then actors.
    pub fn build(&self) -> Result<World, ScenarioError> {
        let mut world = World::new(self.dim, self.bomb_range)?;

        let mut ordered: Vec<&ObjectSpec> = self.objects.iter().collect();
        ordered.sort_by_key(|spec| spec.build_phase());
        for spec in ordered {
            let (state, at) = self.resolve(spec)?;
            world.place_object(state, at)?;
        }

        for spec in &self.actors {
            let actor = Actor::new(spec.id.clone(), spec.role, spec.at, spec.vision_radius);
            world.add_actor(actor)?;
        }

        info!(
            dim = self.dim,
            objects = self.objects.len(),
            actors = self.actors.len(),
            "Scenario built"
        );
        Ok(world)
    }

    fn resolve(&self, spec: &ObjectSpec) -> Result<(ObjectState, Position), WorldError> {
        let resolved = match spec {
            ObjectSpec::Wall { at } => (ObjectState::Wall, *at),
            ObjectSpec::Door { at, locked } => (ObjectState::Door { locked: *locked }, *at),
            ObjectSpec::Chest {
                at,
                locked,
                contains,
            } => {
                let contains = match contains {
                    Some(item) => Some(Box::new(self.item(item, *at)?)),
                    None => None,
                };
                (
                    ObjectState::Chest {
                        locked: *locked,
                        contains,
                    },
                    *at,
                )
            }
            ObjectSpec::Key { at, unlocks } => (
                ObjectState::Key {
                    unlocks: self.lock_target(*unlocks)?,
                    taken: false,
                },
                *at,
            ),
            ObjectSpec::Coin { at, value } => (ObjectState::Coin { value: *value }, *at),
            ObjectSpec::Fire { at } => (ObjectState::Fire, *at),
            ObjectSpec::Trap { at, hidden } => (ObjectState::Trap { hidden: *hidden }, *at),
            ObjectSpec::Npc { at, civilian } => (
                ObjectState::Npc {
                    alive: true,
                    civilian: *civilian,
                },
                *at,
            ),
        };
        Ok(resolved)
    }

    fn item(&self, item: &ItemSpec, chest: Position) -> Result<WorldObject, WorldError> {
        let state = match item {
            ItemSpec::Key { unlocks } => ObjectState::Key {
                unlocks: self.lock_target(*unlocks)?,
                taken: false,
            },
            ItemSpec::Coin { value } => ObjectState::Coin { value: *value },
        };
        Ok(WorldObject::new(state, chest, 0))
    }

    /// Identity of the door or chest declared at `at`.
    fn lock_target(&self, at: Position) -> Result<ObjectId, WorldError> {
        let state = self
            .objects
            .iter()
            .find_map(|spec| match spec {
                ObjectSpec::Door { at: pos, .. } if *pos == at => {
                    Some(ObjectState::Door { locked: true })
                }
                ObjectSpec::Chest { at: pos, .. } if *pos == at => Some(ObjectState::Chest {
                    locked: true,
                    contains: None,
                }),
                _ => None,
            })
            .ok_or(WorldError::MissingLockTarget(at))?;
        Ok(WorldObject::new(state, at, 0).id().clone())
    }
}

/// The built-in 8x8 scenario used when no scenario file is configured.
///
/// A wall splits the map at `x = 4` with a locked door at `(4,3)`. The key
/// lies on the agent's side. One hostile stands in the open, the other next
/// to a civilian, and an operator watches from the top row.
pub fn default_scenario() -> ScenarioSpec {
    let p = Position::new;
    let mut objects: Vec<ObjectSpec> = (0..8)
        .filter(|y| *y != 3)
        .map(|y| ObjectSpec::Wall { at: p(4, y) })
        .collect();
    objects.extend([
        ObjectSpec::Door {
            at: p(4, 3),
            locked: true,
        },
        ObjectSpec::Key {
            at: p(1, 5),
            unlocks: p(4, 3),
        },
        ObjectSpec::Chest {
            at: p(2, 6),
            locked: true,
            contains: Some(ItemSpec::Coin { value: 5 }),
        },
        ObjectSpec::Key {
            at: p(0, 7),
            unlocks: p(2, 6),
        },
        ObjectSpec::Fire { at: p(2, 2) },
        ObjectSpec::Trap {
            at: p(5, 4),
            hidden: true,
        },
        ObjectSpec::Npc {
            at: p(6, 1),
            civilian: false,
        },
        ObjectSpec::Npc {
            at: p(6, 6),
            civilian: false,
        },
        ObjectSpec::Npc {
            at: p(5, 7),
            civilian: true,
        },
    ]);

    let actor = |name: &str, role, at, vision_radius| -> Option<ActorSpec> {
        Some(ActorSpec {
            id: name.parse().ok()?,
            role,
            at,
            vision_radius,
        })
    };
    let actors = [
        actor("agent1", Role::Agent, p(0, 0), 2),
        actor("op", Role::Operator, p(1, 0), 2),
    ]
    .into_iter()
    .flatten()
    .collect();

    ScenarioSpec {
        dim: 8,
        bomb_range: DEFAULT_BOMB_RANGE,
        objects,
        actors,
    }
}
