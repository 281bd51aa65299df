//! Enumeration types for the simulation.

use serde::{Deserialize, Serialize};

/// Actor health on a four-level scale.
///
/// [`Health::Broken`] is terminal: a broken actor can no longer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Health {
    /// No damage taken.
    Healthy,
    /// One level of damage.
    Damaged,
    /// Two levels of damage; one more hit breaks the actor.
    Critical,
    /// Terminal state.
    Broken,
}

impl Health {
    /// Apply `levels` of damage, saturating at [`Health::Broken`].
    pub const fn damaged_by(self, levels: u8) -> Self {
        let current = match self {
            Self::Healthy => 0u8,
            Self::Damaged => 1,
            Self::Critical => 2,
            Self::Broken => 3,
        };
        match current.saturating_add(levels) {
            0 => Self::Healthy,
            1 => Self::Damaged,
            2 => Self::Critical,
            _ => Self::Broken,
        }
    }

    /// Whether this is the terminal broken state.
    pub const fn is_broken(self) -> bool {
        matches!(self, Self::Broken)
    }
}

/// Detonation readiness.
///
/// Advances one step per `arm` action, resets on any move, and is
/// consumed by a detonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArmedState {
    /// Not armed.
    #[default]
    Unarmed,
    /// Armed once; needs one more `arm` action.
    Arming,
    /// Ready to detonate.
    Armed,
}

impl ArmedState {
    /// The state after one more `arm` action.
    pub const fn advanced(self) -> Self {
        match self {
            Self::Unarmed => Self::Arming,
            Self::Arming | Self::Armed => Self::Armed,
        }
    }
}

/// Whether an actor pursues goals or issues them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Autonomous agent acting in the world.
    #[default]
    Agent,
    /// Human or automated operator who owns goals.
    Operator,
}

/// The closed set of world object variants, without their state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Impassable wall.
    Wall,
    /// Door, blocking while locked.
    Door,
    /// Lockable container, always blocking.
    Chest,
    /// Key that unlocks one door or chest.
    Key,
    /// Coin with a value.
    Coin,
    /// Fire; damages actors entering the tile.
    Fire,
    /// Trap; damages actors entering the tile and starts hidden.
    Trap,
    /// Non-player character, civilian or hostile.
    Npc,
}

impl ObjectKind {
    /// Every kind, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Wall,
        Self::Door,
        Self::Chest,
        Self::Key,
        Self::Coin,
        Self::Fire,
        Self::Trap,
        Self::Npc,
    ];

    /// The lowercase tag used in identities and scenario files.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Door => "door",
            Self::Chest => "chest",
            Self::Key => "key",
            Self::Coin => "coin",
            Self::Fire => "fire",
            Self::Trap => "trap",
            Self::Npc => "npc",
        }
    }

    /// Whether an object of this kind claims the tile's single fixture slot.
    ///
    /// At most one such object may occupy a tile; keys and coins are loose
    /// items and may pile up freely.
    pub const fn occupies_tile(self) -> bool {
        !matches!(self, Self::Key | Self::Coin)
    }
}

impl core::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}
