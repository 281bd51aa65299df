//! Goals and their token form.
//!
//! Goals travel between operators and agents as short tokens:
//!
//! ```text
//! agent-at(4,4)
//! open(2,2)
//! killed(npc-0a1b2c3d4e5f6071)
//! ```
//!
//! Parsing is fail-closed: a predicate name outside the closed set is an
//! error, never a silently ignored goal.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::{ActorId, IdError, ObjectId};

/// Errors raised when a goal token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GoalParseError {
    /// The token is not of the form `name(args)`.
    #[error("malformed goal token {0:?}")]
    Malformed(String),

    /// The predicate name is not one of the known predicates.
    #[error("unknown goal predicate {0:?}")]
    UnknownPredicate(String),

    /// The arguments do not fit the predicate.
    #[error("invalid arguments for {predicate}: {reason}")]
    InvalidArguments {
        /// The predicate name.
        predicate: String,
        /// Why the arguments were rejected.
        reason: String,
    },
}

impl From<IdError> for GoalParseError {
    fn from(err: IdError) -> Self {
        Self::InvalidArguments {
            predicate: String::from("killed"),
            reason: err.to_string(),
        }
    }
}

/// What a goal asks for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPredicate {
    /// The actor stands on the tile.
    AgentAt(Position),
    /// The door or chest on the tile is unlocked.
    Open(Position),
    /// The NPC is dead.
    Killed(ObjectId),
}

impl GoalPredicate {
    /// The predicate name used in tokens.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AgentAt(_) => "agent-at",
            Self::Open(_) => "open",
            Self::Killed(_) => "killed",
        }
    }
}

impl fmt::Display for GoalPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentAt(p) | Self::Open(p) => write!(f, "{}({},{})", self.name(), p.x, p.y),
            Self::Killed(target) => write!(f, "killed({target})"),
        }
    }
}

impl FromStr for GoalPredicate {
    type Err = GoalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let (name, rest) = token
            .split_once('(')
            .ok_or_else(|| GoalParseError::Malformed(token.to_owned()))?;
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| GoalParseError::Malformed(token.to_owned()))?;
        let name = name.trim();

        let position = |predicate: &str| {
            args.parse::<Position>()
                .map_err(|reason| GoalParseError::InvalidArguments {
                    predicate: predicate.to_owned(),
                    reason,
                })
        };

        match name {
            "agent-at" => Ok(Self::AgentAt(position(name)?)),
            "open" => Ok(Self::Open(position(name)?)),
            "killed" => Ok(Self::Killed(args.trim().parse::<ObjectId>()?)),
            other => Err(GoalParseError::UnknownPredicate(other.to_owned())),
        }
    }
}

/// A goal owned by an actor, optionally decomposed from a parent goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// What the goal asks for.
    pub predicate: GoalPredicate,
    /// The actor who issued the goal and arbitrates disputes about it.
    pub owner: ActorId,
    /// The goal this one was synthesised to unblock.
    pub parent: Option<Box<Goal>>,
}

impl Goal {
    /// A top-level goal.
    pub const fn new(predicate: GoalPredicate, owner: ActorId) -> Self {
        Self {
            predicate,
            owner,
            parent: None,
        }
    }

    /// A sub-goal of `parent`, inheriting its owner.
    pub fn subgoal(predicate: GoalPredicate, parent: &Self) -> Self {
        Self {
            predicate,
            owner: parent.owner.clone(),
            parent: Some(Box::new(parent.clone())),
        }
    }

    /// Parse a goal token issued by `owner`.
    pub fn parse(token: &str, owner: ActorId) -> Result<Self, GoalParseError> {
        Ok(Self::new(token.parse()?, owner))
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_and_print() {
        for token in ["agent-at(4,4)", "open(2,2)", "killed(npc-0123456789abcdef)"] {
            let parsed: GoalPredicate = token.parse().unwrap();
            assert_eq!(parsed.to_string(), token);
        }
    }

    #[test]
    fn unknown_predicate_is_an_error() {
        let result = "dance(1,1)".parse::<GoalPredicate>();
        assert_eq!(
            result,
            Err(GoalParseError::UnknownPredicate(String::from("dance")))
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            "agent-at 4 4".parse::<GoalPredicate>(),
            Err(GoalParseError::Malformed(_))
        ));
        assert!(matches!(
            "open(2)".parse::<GoalPredicate>(),
            Err(GoalParseError::InvalidArguments { .. })
        ));
        assert!(matches!(
            "killed(bob)".parse::<GoalPredicate>(),
            Err(GoalParseError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn subgoal_inherits_owner() {
        let owner: ActorId = "op".parse().unwrap();
        let parent = Goal::new(GoalPredicate::AgentAt(Position::new(4, 4)), owner.clone());
        let child = Goal::subgoal(GoalPredicate::Open(Position::new(2, 2)), &parent);
        assert_eq!(child.owner, owner);
        assert_eq!(child.parent.as_deref(), Some(&parent));
    }
}
