//! Action tokens and their outcomes.
//!
//! Tokens are the payload of an `ACTION_SEND` frame:
//!
//! | Token            | Action                         |
//! |------------------|--------------------------------|
//! | `move:<dir>`     | step up, down, left, or right  |
//! | `arm`            | advance the armed state        |
//! | `detonate`       | fire when armed                |
//! | `unlock:<x>,<y>` | unlock the door or chest there |
//! | `wait`           | do nothing                     |

use core::fmt;
use core::str::FromStr;

use mutiny_types::{ArmedState, Direction, Health, Position};
use serde::{Deserialize, Serialize};

/// Errors raised when an action token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    /// The verb is not a known action.
    #[error("unknown action {0:?}")]
    UnknownAction(String),

    /// The verb is known but its argument is not.
    #[error("invalid argument for {verb}: {reason}")]
    InvalidArgument {
        /// The action verb.
        verb: String,
        /// Why the argument was rejected.
        reason: String,
    },
}

/// A parsed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Step one tile.
    Move(Direction),
    /// Advance the armed state.
    Arm,
    /// Detonate at the actor's position.
    Detonate,
    /// Unlock the door or chest on the tile.
    Unlock(Position),
    /// Do nothing this round.
    Wait,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(direction) => write!(f, "move:{direction}"),
            Self::Arm => f.write_str("arm"),
            Self::Detonate => f.write_str("detonate"),
            Self::Unlock(target) => write!(f, "unlock:{},{}", target.x, target.y),
            Self::Wait => f.write_str("wait"),
        }
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let (verb, arg) = match token.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (token, None),
        };
        let invalid = |reason: String| ActionParseError::InvalidArgument {
            verb: verb.to_owned(),
            reason,
        };

        match (verb, arg) {
            ("move", Some(arg)) => arg.parse().map(Self::Move).map_err(invalid),
            ("unlock", Some(arg)) => arg.parse().map(Self::Unlock).map_err(invalid),
            ("move" | "unlock", None) => Err(invalid(String::from("missing argument"))),
            ("arm", None) => Ok(Self::Arm),
            ("detonate", None) => Ok(Self::Detonate),
            ("wait", None) => Ok(Self::Wait),
            ("arm" | "detonate" | "wait", Some(_)) => {
                Err(invalid(String::from("takes no argument")))
            }
            _ => Err(ActionParseError::UnknownAction(token.to_owned())),
        }
    }
}

/// What an applied action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The actor stepped onto a new tile.
    Moved {
        /// The new tile.
        to: Position,
        /// Health after entry damage.
        health: Health,
    },
    /// The armed state advanced.
    Armed {
        /// The new armed state.
        state: ArmedState,
    },
    /// The bomb went off.
    Detonated {
        /// NPCs killed by the blast.
        kills: usize,
    },
    /// A door or chest was unlocked.
    Unlocked {
        /// The unlocked tile.
        target: Position,
    },
    /// Nothing happened.
    Waited,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved { to, health } => write!(f, "moved to {to} ({health:?})"),
            Self::Armed { state } => write!(f, "armed state {state:?}"),
            Self::Detonated { kills } => write!(f, "detonated, {kills} killed"),
            Self::Unlocked { target } => write!(f, "unlocked {target}"),
            Self::Waited => f.write_str("waited"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_and_print() {
        for token in ["move:up", "move:right", "arm", "detonate", "unlock:2,2", "wait"] {
            let action: Action = token.parse().unwrap();
            assert_eq!(action.to_string(), token);
        }
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert!(matches!(
            "jump".parse::<Action>(),
            Err(ActionParseError::UnknownAction(_))
        ));
        assert!(matches!(
            "move:sideways".parse::<Action>(),
            Err(ActionParseError::InvalidArgument { .. })
        ));
        assert!(matches!(
            "unlock".parse::<Action>(),
            Err(ActionParseError::InvalidArgument { .. })
        ));
        assert!(matches!(
            "wait:5".parse::<Action>(),
            Err(ActionParseError::InvalidArgument { .. })
        ));
    }
}
