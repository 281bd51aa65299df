//! World objects and their content-derived identity.
//!
//! An object's [`ObjectId`] is the type tag followed by the first 64 bits
//! of a SHA-256 digest over its canonical textual form:
//!
//! ```text
//! <tag>@<x>,<y>#<ordinal>[<immutable attributes>]
//! ```
//!
//! Only immutable fields take part, so a door keeps its identity after it
//! is unlocked and an NPC keeps its identity after it dies. The ordinal
//! separates otherwise identical loose items stacked on one tile. Two
//! processes that build the same world therefore agree on every identity
//! without sharing any allocation state.

use mutiny_types::{ObjectId, ObjectKind, Position};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fire damage in health levels.
pub const FIRE_DAMAGE: u8 = 1;
/// Trap damage in health levels.
pub const TRAP_DAMAGE: u8 = 2;

/// Variant-specific state of a world object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectState {
    /// Always blocking.
    Wall,
    /// Blocking while locked.
    Door {
        /// Whether the door is locked.
        locked: bool,
    },
    /// Always blocking; may hold one key or coin.
    Chest {
        /// Whether the chest is locked.
        locked: bool,
        /// The single item inside, if any.
        contains: Option<Box<WorldObject>>,
    },
    /// Unlocks one door or chest.
    Key {
        /// Identity of the door or chest this key opens.
        unlocks: ObjectId,
        /// Set once an actor carries the key.
        taken: bool,
    },
    /// Currency.
    Coin {
        /// Face value.
        value: u32,
    },
    /// Damages actors entering the tile.
    Fire,
    /// Damages actors entering the tile; invisible until triggered.
    Trap {
        /// Whether the trap is still hidden.
        hidden: bool,
    },
    /// Non-player character.
    Npc {
        /// Whether the NPC is alive.
        alive: bool,
        /// Protected non-combatant when true, legitimate target otherwise.
        civilian: bool,
    },
}

impl ObjectState {
    /// The kind tag of this state.
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Wall => ObjectKind::Wall,
            Self::Door { .. } => ObjectKind::Door,
            Self::Chest { .. } => ObjectKind::Chest,
            Self::Key { .. } => ObjectKind::Key,
            Self::Coin { .. } => ObjectKind::Coin,
            Self::Fire => ObjectKind::Fire,
            Self::Trap { .. } => ObjectKind::Trap,
            Self::Npc { .. } => ObjectKind::Npc,
        }
    }

    /// Canonical rendering of the immutable attributes.
    fn immutable_attributes(&self) -> String {
        match self {
            Self::Key { unlocks, .. } => format!("[unlocks={unlocks}]"),
            Self::Coin { value } => format!("[value={value}]"),
            Self::Npc { civilian, .. } => format!("[civilian={civilian}]"),
            Self::Wall | Self::Door { .. } | Self::Chest { .. } | Self::Fire | Self::Trap { .. } => {
                String::new()
            }
        }
    }
}

/// A located object with a content-derived identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    id: ObjectId,
    position: Position,
    state: ObjectState,
}

impl WorldObject {
    /// Create an object, deriving its identity from its canonical form.
    pub fn new(state: ObjectState, position: Position, ordinal: usize) -> Self {
        let canonical = canonical_form(&state, position, ordinal);
        let digest = Sha256::digest(canonical.as_bytes());
        let id = ObjectId::from_digest(state.kind().tag(), &hex::encode(digest));
        Self { id, position, state }
    }

    /// The object's identity.
    pub const fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The tile the object sits on.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// The object's variant state.
    pub const fn state(&self) -> &ObjectState {
        &self.state
    }

    pub(crate) const fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    /// The object's kind.
    pub const fn kind(&self) -> ObjectKind {
        self.state.kind()
    }

    /// Whether an actor may enter this object's tile.
    ///
    /// With `treat_doors_open`, locked doors count as passable; chests never
    /// do.
    pub const fn is_passable(&self, treat_doors_open: bool) -> bool {
        match &self.state {
            ObjectState::Wall | ObjectState::Chest { .. } => false,
            ObjectState::Door { locked } => !*locked || treat_doors_open,
            ObjectState::Key { .. }
            | ObjectState::Coin { .. }
            | ObjectState::Fire
            | ObjectState::Trap { .. } => true,
            ObjectState::Npc { alive, .. } => !*alive,
        }
    }

    /// Whether the object is a locked door or chest.
    pub const fn is_locked(&self) -> bool {
        matches!(
            self.state,
            ObjectState::Door { locked: true } | ObjectState::Chest { locked: true, .. }
        )
    }

    /// Whether perception can see the object. Hidden traps cannot be seen.
    pub const fn is_visible(&self) -> bool {
        !matches!(self.state, ObjectState::Trap { hidden: true })
    }

    /// Health levels lost by an actor entering the tile.
    pub const fn entry_damage(&self) -> u8 {
        match self.state {
            ObjectState::Fire => FIRE_DAMAGE,
            ObjectState::Trap { .. } => TRAP_DAMAGE,
            _ => 0,
        }
    }

    /// Whether this is a living NPC.
    pub const fn is_living_npc(&self) -> bool {
        matches!(self.state, ObjectState::Npc { alive: true, .. })
    }

    /// Whether this is an NPC flagged as a civilian, alive or not.
    pub const fn is_civilian(&self) -> bool {
        matches!(self.state, ObjectState::Npc { civilian: true, .. })
    }

    /// Whether this is a hostile (non-civilian) NPC, alive or not.
    pub const fn is_hostile(&self) -> bool {
        matches!(self.state, ObjectState::Npc { civilian: false, .. })
    }

    /// Whether `state` placed on this tile would share this object's
    /// canonical form up to the ordinal.
    pub(crate) fn same_form_as(&self, state: &ObjectState) -> bool {
        canonical_form(&self.state, self.position, 0) == canonical_form(state, self.position, 0)
    }
}

fn canonical_form(state: &ObjectState, position: Position, ordinal: usize) -> String {
    format!(
        "{}@{},{}#{ordinal}{}",
        state.kind().tag(),
        position.x,
        position.y,
        state.immutable_attributes()
    )
}
