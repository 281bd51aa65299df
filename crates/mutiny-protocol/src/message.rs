//! Message types and the JSON payloads carried by replies.

use core::fmt;
use core::str::FromStr;

use mutiny_types::ActorId;
use mutiny_world::{Actor, Knowledge};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Sender name the server uses for receipts and notices.
pub const SERVER_SENDER: &str = "server";

/// The eight request kinds understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Request the sender's knowledge snapshot.
    WorldStateReq,
    /// Apply an action token.
    ActionSend,
    /// `list`, `share <recipient> <object-id>`, or `stand-down`.
    UpdateSend,
    /// Queue a goal for another actor.
    GoalSend,
    /// Drain the sender's queued goals.
    GoalReq,
    /// Request the sender's own actor record.
    AgentReq,
    /// Queue a free-text message for another actor.
    DialogSend,
    /// Take the sender's queued messages, optionally from one sender only.
    DialogReq,
}

impl MessageType {
    /// Every message type, in wire order.
    pub const ALL: [Self; 8] = [
        Self::WorldStateReq,
        Self::ActionSend,
        Self::UpdateSend,
        Self::GoalSend,
        Self::GoalReq,
        Self::AgentReq,
        Self::DialogSend,
        Self::DialogReq,
    ];

    /// The tag written on the wire.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::WorldStateReq => "WORLD_STATE_REQ",
            Self::ActionSend => "ACTION_SEND",
            Self::UpdateSend => "UPDATE_SEND",
            Self::GoalSend => "GOAL_SEND",
            Self::GoalReq => "GOAL_REQ",
            Self::AgentReq => "AGENT_REQ",
            Self::DialogSend => "DIALOG_SEND",
            Self::DialogReq => "DIALOG_REQ",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| ProtocolError::UnknownMessageType(s.to_owned()))
    }
}

/// Reply to `WORLD_STATE_REQ`: who the actor is and what it knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    /// The actor without its knowledge.
    pub actor: Actor,
    /// The actor's current knowledge.
    pub knowledge: Knowledge,
}

impl KnowledgeSnapshot {
    /// Split an actor into its public record and its knowledge.
    pub fn of(actor: &Actor) -> Self {
        Self {
            actor: actor.public_view(),
            knowledge: actor.knowledge.clone(),
        }
    }

    /// Reassemble the actor with its knowledge.
    pub fn into_actor(self) -> Actor {
        let mut actor = self.actor;
        actor.knowledge = self.knowledge;
        actor
    }
}

/// A queued free-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogMessage {
    /// Who sent it; `server` for receipts.
    pub from: String,
    /// Message body.
    pub text: String,
}

impl DialogMessage {
    /// A message from an actor.
    pub fn from_actor(from: &ActorId, text: impl Into<String>) -> Self {
        Self {
            from: from.to_string(),
            text: text.into(),
        }
    }

    /// A message from the server itself.
    pub fn from_server(text: impl Into<String>) -> Self {
        Self {
            from: String::from(SERVER_SENDER),
            text: text.into(),
        }
    }
}

/// A queued goal token together with the actor who issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalEnvelope {
    /// The issuing actor, who arbitrates rebellions over this goal.
    pub owner: ActorId,
    /// The goal token, e.g. `agent-at(4,4)`.
    pub goal: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mutiny_types::{Position, Role};

    use super::*;

    #[test]
    fn tags_parse_back() {
        for kind in MessageType::ALL {
            assert_eq!(kind.tag().parse::<MessageType>().unwrap(), kind);
        }
        assert!(matches!(
            "WORLD_STATE".parse::<MessageType>(),
            Err(ProtocolError::UnknownMessageType(_))
        ));
    }

    #[test]
    fn snapshot_keeps_knowledge_apart() {
        let mut actor = Actor::new("agent1".parse().unwrap(), Role::Agent, Position::new(1, 1), 2);
        actor.knowledge = Knowledge::new(5, 1);
        let snapshot = KnowledgeSnapshot::of(&actor);
        assert_eq!(snapshot.actor.knowledge, Knowledge::default());
        assert_eq!(snapshot.into_actor(), actor);
    }
}
