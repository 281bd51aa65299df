//! Error types for the `mutiny-world` crate.
//!
//! Every illegal world mutation is reported through [`WorldError`]. Callers
//! on the network boundary turn these into failure receipts; they are never
//! fatal to the server.

use mutiny_types::{ActorId, ObjectId, ObjectKind, Position};

/// Errors that can occur during world operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The grid dimension must be positive.
    #[error("invalid grid dimension {0}")]
    InvalidDimension(i32),

    /// The position lies outside the grid.
    #[error("position {0} is out of bounds")]
    OutOfBounds(Position),

    /// The tile already holds a tile-occupying object.
    #[error("tile {position} is already occupied by a {existing}")]
    TileOccupied {
        /// The contested tile.
        position: Position,
        /// Kind of the object already there.
        existing: ObjectKind,
    },

    /// An actor stands on the tile.
    #[error("tile {position} is occupied by actor {actor}")]
    ActorOnTile {
        /// The contested tile.
        position: Position,
        /// The actor standing there.
        actor: ActorId,
    },

    /// No object of the requested kind is on the tile.
    #[error("no {kind} at {position}")]
    NothingToRemove {
        /// Requested kind.
        kind: ObjectKind,
        /// Inspected tile.
        position: Position,
    },

    /// No object with this identity exists.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    /// The actor is not part of this world.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// An actor with the same id already exists.
    #[error("duplicate actor {0}")]
    DuplicateActor(ActorId),

    /// The actor is broken and cannot act.
    #[error("actor {0} is broken")]
    ActorBroken(ActorId),

    /// The actor has stood down and no longer acts.
    #[error("actor {0} has stood down")]
    ActorInactive(ActorId),

    /// The destination tile cannot be entered.
    #[error("tile {0} is impassable")]
    Impassable(Position),

    /// A key referenced a tile without a lockable object.
    #[error("no door or chest at {0} for a key to unlock")]
    MissingLockTarget(Position),

    /// Unlocking failed: not adjacent, nothing locked, or no matching key.
    #[error("actor {actor} cannot unlock {target}")]
    UnlockRefused {
        /// The acting actor.
        actor: ActorId,
        /// The targeted tile.
        target: Position,
    },

    /// Detonation was requested while not armed.
    #[error("actor {0} is not armed")]
    NotArmed(ActorId),

    /// A chest may only contain a key or a coin.
    #[error("a chest cannot contain a {0}")]
    InvalidChestContents(ObjectKind),
}
