//! Bounded rebellion: refusing a goal and negotiating a replacement.
//!
//! When a goal is objectionable the agent removes it from its active set,
//! tells the goal's owner why, and offers enumerated alternatives:
//!
//! ```text
//! 0) killed(npc-...)   every other currently valid target
//! 1) keep original
//! 2) none              the agent stands down
//! ```
//!
//! The agent then polls the dialog channel until the owner answers with a
//! number in range. Anything else is logged and re-prompted. The owner
//! always has the final word.

use core::fmt;
use core::future::Future;
use std::time::Duration;

use mutiny_types::{ActorId, Goal, GoalPredicate, ObjectId};
use mutiny_world::{Actor, World};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::goals::{Discrepancy, valid_targets};

/// Errors that end a negotiation without an answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebellionError {
    /// The owner did not answer before the deadline.
    #[error("owner {owner} did not answer the rebellion over {goal} within {waited_ms}ms")]
    DeadlineExpired {
        /// The goal owner.
        owner: ActorId,
        /// The contested goal, in token form.
        goal: String,
        /// How long the agent waited.
        waited_ms: u64,
    },
}

/// One option offered to the goal owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    /// Attack a different target instead.
    Attack(ObjectId),
    /// Insist on the original goal.
    KeepOriginal,
    /// Release the agent from duty.
    StandDown,
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack(target) => write!(f, "killed({target})"),
            Self::KeepOriginal => f.write_str("keep original"),
            Self::StandDown => f.write_str("none"),
        }
    }
}

/// A refused goal and the options offered in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebellion {
    /// The refusing actor.
    pub rebel: ActorId,
    /// The refused goal.
    pub goal: Goal,
    /// Why it was refused.
    pub reason: Discrepancy,
    /// Entities the goal would harm.
    pub affected: Vec<ObjectId>,
    /// Ranked options: other targets, then keep original, then none.
    pub alternatives: Vec<Alternative>,
}

/// The owner's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Pursue this goal instead.
    NewGoal(Goal),
    /// Pursue the original goal after all.
    KeepOriginal(Goal),
    /// Stop acting.
    StandDown,
}

impl Rebellion {
    /// Build a rebellion over `goal` from the actor's view.
    pub fn new(view: &World, actor: &Actor, goal: Goal, reason: Discrepancy) -> Self {
        let affected = match &reason {
            Discrepancy::CiviKilled { civilians, .. } => civilians.clone(),
            _ => Vec::new(),
        };
        let rejected = match &goal.predicate {
            GoalPredicate::Killed(target) => Some(target),
            _ => None,
        };
        let mut alternatives: Vec<Alternative> = valid_targets(view, actor, rejected)
            .into_iter()
            .map(Alternative::Attack)
            .collect();
        alternatives.push(Alternative::KeepOriginal);
        alternatives.push(Alternative::StandDown);

        Self {
            rebel: actor.id.clone(),
            goal,
            reason,
            affected,
            alternatives,
        }
    }

    /// The owner of the refused goal.
    pub const fn owner(&self) -> &ActorId {
        &self.goal.owner
    }

    /// The single-line message sent to the owner.
    pub fn prompt(&self) -> String {
        let affected = if self.affected.is_empty() {
            String::from("none")
        } else {
            self.affected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let options = self
            .alternatives
            .iter()
            .enumerate()
            .map(|(i, alt)| format!("{i}) {alt}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "rebellion: {} refuses {} ({}); affected: {affected}; reply with a number: {options}",
            self.rebel,
            self.goal,
            self.reason.tag()
        )
    }

    /// The alternative picked by a reply, if the reply is a number in range.
    pub fn parse_choice(&self, reply: &str) -> Option<&Alternative> {
        reply
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.alternatives.get(index))
    }

    /// Turn the owner's choice into a resolution.
    pub fn resolve(&self, choice: &Alternative) -> Resolution {
        match choice {
            Alternative::Attack(target) => Resolution::NewGoal(Goal::new(
                GoalPredicate::Killed(target.clone()),
                self.goal.owner.clone(),
            )),
            Alternative::KeepOriginal => Resolution::KeepOriginal(self.goal.clone()),
            Alternative::StandDown => Resolution::StandDown,
        }
    }
}

// ---------------------------------------------------------------------------
// Negotiation
// ---------------------------------------------------------------------------

/// Transport for dialog messages between actors.
pub trait DialogChannel {
    /// Send `text` to `to`. Returns false when the message was not delivered.
    fn send(&self, to: &ActorId, text: &str) -> impl Future<Output = bool> + Send;

    /// Take the pending messages sent by `from`, oldest first.
    fn receive(&self, from: &ActorId) -> impl Future<Output = Vec<String>> + Send;
}

/// Polling cadence and optional deadline for a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPolicy {
    /// Delay between polls of the dialog channel.
    pub poll_interval: Duration,
    /// Give up after this long; wait forever when unset.
    pub deadline: Option<Duration>,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            deadline: None,
        }
    }
}

/// Present a rebellion to its owner and wait for a valid choice.
pub async fn negotiate<C: DialogChannel + Sync>(
    channel: &C,
    rebellion: &Rebellion,
    policy: &NegotiationPolicy,
) -> Result<Resolution, RebellionError> {
    let owner = rebellion.owner();
    let started = Instant::now();
    let prompt = rebellion.prompt();

    info!(
        rebel = %rebellion.rebel,
        owner = %owner,
        goal = %rebellion.goal,
        reason = rebellion.reason.tag(),
        options = rebellion.alternatives.len(),
        "Rebelling against goal"
    );
    let mut prompted = channel.send(owner, &prompt).await;

    loop {
        if !prompted {
            prompted = channel.send(owner, &prompt).await;
        }

        for reply in channel.receive(owner).await {
            if let Some(choice) = rebellion.parse_choice(&reply) {
                info!(rebel = %rebellion.rebel, choice = %choice, "Rebellion resolved");
                return Ok(rebellion.resolve(choice));
            }
            warn!(
                rebel = %rebellion.rebel,
                owner = %owner,
                reply = %reply,
                "Malformed rebellion reply, re-prompting"
            );
            let retry = format!(
                "invalid choice {reply:?}, reply with a number from 0 to {}",
                rebellion.alternatives.len().saturating_sub(1)
            );
            prompted = channel.send(owner, &retry).await;
        }

        if let Some(deadline) = policy.deadline
            && started.elapsed() >= deadline
        {
            return Err(RebellionError::DeadlineExpired {
                owner: owner.clone(),
                goal: rebellion.goal.to_string(),
                waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            });
        }

        debug!(rebel = %rebellion.rebel, "Awaiting rebellion reply");
        tokio::time::sleep(policy.poll_interval).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::VecDeque;

    use mutiny_types::{ObjectKind, Position, Role};
    use mutiny_world::ObjectState;
    use tokio::sync::Mutex;

    use super::*;
    use crate::goals::{Explanation, check, explain};

    /// Replays scripted replies, one batch per poll, and records sends.
    #[derive(Default)]
    struct ScriptedChannel {
        replies: Mutex<VecDeque<Vec<String>>>,
        sent: Mutex<Vec<(ActorId, String)>>,
    }

    impl ScriptedChannel {
        fn with_replies(batches: &[&[&str]]) -> Self {
            let replies = batches
                .iter()
                .map(|batch| batch.iter().map(|s| (*s).to_owned()).collect())
                .collect();
            Self {
                replies: Mutex::new(replies),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl DialogChannel for ScriptedChannel {
        async fn send(&self, to: &ActorId, text: &str) -> bool {
            self.sent.lock().await.push((to.clone(), text.to_owned()));
            true
        }

        async fn receive(&self, _from: &ActorId) -> Vec<String> {
            self.replies.lock().await.pop_front().unwrap_or_default()
        }
    }

    fn fast() -> NegotiationPolicy {
        NegotiationPolicy {
            poll_interval: Duration::from_millis(5),
            deadline: Some(Duration::from_millis(200)),
        }
    }

    /// Two hostiles; the one at (5,3) has a civilian beside its firing
    /// position, the one at (5,0) is clean.
    fn contested() -> Rebellion {
        let mut world = World::new(8, 1).unwrap();
        let npc = |civilian| ObjectState::Npc {
            alive: true,
            civilian,
        };
        let guarded = world.place_object(npc(false), Position::new(5, 3)).unwrap();
        world.place_object(npc(false), Position::new(5, 0)).unwrap();
        world.place_object(npc(true), Position::new(3, 2)).unwrap();
        let agent = Actor::new("agent1".parse().unwrap(), Role::Agent, Position::new(0, 3), -1);

        let goal = Goal::new(
            GoalPredicate::Killed(guarded.id().clone()),
            "op".parse().unwrap(),
        );
        let discrepancy = check(&world, &agent, &goal).unwrap_err();
        match explain(&world, &agent, &goal, discrepancy) {
            Explanation::Rebel(rebellion) => rebellion,
            other => panic!("expected a rebellion, got {other:?}"),
        }
    }

    #[test]
    fn alternatives_are_ranked() {
        let rebellion = contested();
        assert_eq!(rebellion.alternatives.len(), 3);
        assert!(matches!(
            rebellion.alternatives.first(),
            Some(Alternative::Attack(id)) if id.tag() == ObjectKind::Npc.tag()
        ));
        assert_eq!(rebellion.alternatives.get(1), Some(&Alternative::KeepOriginal));
        assert_eq!(rebellion.alternatives.get(2), Some(&Alternative::StandDown));
        assert_eq!(rebellion.affected.len(), 1);
        assert!(rebellion.prompt().contains("2) none"));
    }

    #[test]
    fn choices_must_be_in_range() {
        let rebellion = contested();
        assert_eq!(rebellion.parse_choice(" 1 "), Some(&Alternative::KeepOriginal));
        assert_eq!(rebellion.parse_choice("3"), None);
        assert_eq!(rebellion.parse_choice("yes"), None);
    }

    #[tokio::test]
    async fn malformed_replies_are_reprompted() {
        let rebellion = contested();
        let channel = ScriptedChannel::with_replies(&[&[], &["maybe", "7"], &["0"]]);

        let resolution = negotiate(&channel, &rebellion, &fast()).await.unwrap();
        let Resolution::NewGoal(goal) = resolution else {
            panic!("expected a new goal, got {resolution:?}");
        };
        assert!(matches!(goal.predicate, GoalPredicate::Killed(_)));
        assert_eq!(goal.owner, *rebellion.owner());

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(to, _)| to == rebellion.owner()));
        assert!(sent.get(1).unwrap().1.starts_with("invalid choice"));
    }

    #[tokio::test]
    async fn standing_down_and_keeping_the_goal() {
        let rebellion = contested();
        let channel = ScriptedChannel::with_replies(&[&["2"]]);
        assert_eq!(
            negotiate(&channel, &rebellion, &fast()).await,
            Ok(Resolution::StandDown)
        );

        let channel = ScriptedChannel::with_replies(&[&["1"]]);
        assert_eq!(
            negotiate(&channel, &rebellion, &fast()).await,
            Ok(Resolution::KeepOriginal(rebellion.goal.clone()))
        );
    }

    #[tokio::test]
    async fn silent_owner_hits_the_deadline() {
        let rebellion = contested();
        let channel = ScriptedChannel::default();
        let policy = NegotiationPolicy {
            poll_interval: Duration::from_millis(5),
            deadline: Some(Duration::from_millis(30)),
        };
        assert!(matches!(
            negotiate(&channel, &rebellion, &policy).await,
            Err(RebellionError::DeadlineExpired { .. })
        ));
    }
}
