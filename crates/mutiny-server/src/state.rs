//! Server-side state: the canonical world plus the goal and dialog
//! mailboxes, and the run it belongs to.
//!
//! Every method here is synchronous and runs inside the owner task, so
//! no two requests ever touch the world at the same time.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use mutiny_core::{EndReason, ResultRecord, SimulationRun};
use mutiny_protocol::{DialogMessage, GoalEnvelope, KnowledgeSnapshot};
use mutiny_types::{ActorId, Goal, ObjectId};
use mutiny_world::{Action, Actor, World, WorldObject};
use tracing::{debug, info, warn};

use crate::error::ServerError;

/// The canonical world and its mailboxes.
#[derive(Debug)]
pub struct WorldState {
    world: World,
    goals: BTreeMap<ActorId, VecDeque<GoalEnvelope>>,
    dialogs: BTreeMap<ActorId, Vec<DialogMessage>>,
    run: SimulationRun,
}

impl WorldState {
    /// Wrap a world for the given run.
    pub fn new(world: World, run: SimulationRun) -> Self {
        Self {
            world,
            goals: BTreeMap::new(),
            dialogs: BTreeMap::new(),
            run,
        }
    }

    /// The canonical world.
    pub const fn world(&self) -> &World {
        &self.world
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Refresh and return the actor's knowledge snapshot.
    pub fn observe(&mut self, user: &ActorId) -> Option<KnowledgeSnapshot> {
        if let Err(err) = self.world.perceive(user) {
            warn!(user = %user, error = %err, "Snapshot requested for unknown actor");
            return None;
        }
        self.world.actor(user).map(KnowledgeSnapshot::of)
    }

    /// Refresh and return the actor's full record.
    pub fn agent(&mut self, user: &ActorId) -> Option<Actor> {
        self.world.perceive(user).ok()?;
        self.world.actor(user).cloned()
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Apply an action token and queue a receipt for the sender.
    pub fn act(&mut self, user: &ActorId, token: &str) {
        let receipt = match token.parse::<Action>() {
            Err(err) => format!("invalid action {token:?}: {err}"),
            Ok(action) => match self.world.apply_action(user, action) {
                Ok(outcome) => {
                    debug!(user = %user, action = %action, outcome = %outcome, "Action applied");
                    format!("ok {action}: {outcome}")
                }
                Err(err) => {
                    debug!(user = %user, action = %action, error = %err, "Action refused");
                    format!("failed {action}: {err}")
                }
            },
        };
        self.notify(user, receipt);
    }

    /// Handle an `UPDATE_SEND` payload.
    ///
    /// `list` returns the objects the sender knows; `share` and
    /// `stand-down` return `None`.
    pub fn update(
        &mut self,
        user: &ActorId,
        payload: &str,
    ) -> Result<Option<Vec<WorldObject>>, ServerError> {
        let mut words = payload.split_whitespace();
        match (words.next(), words.next(), words.next(), words.next()) {
            (Some("list"), None, None, None) => {
                let known: Option<Vec<WorldObject>> = self
                    .world
                    .actor(user)
                    .map(|actor| actor.knowledge.view.objects().cloned().collect());
                match known {
                    Some(objects) => Ok(Some(objects)),
                    None => Err(self.reject(user, "unknown actor")),
                }
            }
            (Some("share"), Some(recipient), Some(object), None) => {
                self.share(user, recipient, object)?;
                Ok(None)
            }
            (Some("stand-down"), None, None, None) => {
                self.world
                    .stand_down(user)
                    .map_err(|err| self.reject(user, &err.to_string()))?;
                info!(user = %user, "Actor stood down");
                Ok(None)
            }
            _ => Err(self.reject(user, &format!("invalid update {payload:?}"))),
        }
    }

    fn share(&mut self, user: &ActorId, recipient: &str, object: &str) -> Result<(), ServerError> {
        let recipient: ActorId = recipient
            .parse()
            .map_err(|err| self.reject(user, &format!("invalid recipient: {err}")))?;
        let object: ObjectId = object
            .parse()
            .map_err(|err| self.reject(user, &format!("invalid object id: {err}")))?;
        let known = self
            .world
            .actor(user)
            .is_some_and(|actor| actor.knowledge.knows(&object));
        if !known {
            return Err(self.reject(user, &format!("cannot share unknown object {object}")));
        }
        self.world
            .share_object(&recipient, &object)
            .map_err(|err| self.reject(user, &err.to_string()))?;
        self.world
            .record_event(Some(user), format!("shared {object} with {recipient}"));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mailboxes
    // -----------------------------------------------------------------------

    /// Queue a goal `<recipient> <goal>` issued by `user`.
    pub fn send_goal(&mut self, user: &ActorId, payload: &str) -> Result<(), ServerError> {
        let (recipient, token) = payload
            .trim()
            .split_once(' ')
            .ok_or_else(|| self.reject(user, &format!("expected <recipient> <goal>, got {payload:?}")))?;
        let recipient: ActorId = recipient
            .parse()
            .map_err(|err| self.reject(user, &format!("invalid recipient: {err}")))?;
        let goal = Goal::parse(token, user.clone())
            .map_err(|err| self.reject(user, &format!("invalid goal: {err}")))?;
        if self.world.actor(&recipient).is_none() {
            return Err(self.reject(user, &format!("unknown recipient {recipient}")));
        }

        info!(owner = %user, recipient = %recipient, goal = %goal, "Goal queued");
        self.goals
            .entry(recipient)
            .or_default()
            .push_back(GoalEnvelope {
                owner: goal.owner,
                goal: goal.predicate.to_string(),
            });
        Ok(())
    }

    /// Drain the goals queued for `user`, oldest first.
    pub fn take_goals(&mut self, user: &ActorId) -> Vec<GoalEnvelope> {
        self.goals
            .remove(user)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Queue a message `<recipient> <text>` from `user`.
    pub fn send_dialog(&mut self, user: &ActorId, payload: &str) -> Result<(), ServerError> {
        let (recipient, text) = payload
            .split_once(' ')
            .ok_or_else(|| self.reject(user, &format!("expected <recipient> <text>, got {payload:?}")))?;
        let recipient: ActorId = recipient
            .parse()
            .map_err(|err| self.reject(user, &format!("invalid recipient: {err}")))?;
        if self.world.actor(&recipient).is_none() {
            return Err(self.reject(user, &format!("unknown recipient {recipient}")));
        }
        self.dialogs
            .entry(recipient)
            .or_default()
            .push(DialogMessage::from_actor(user, text));
        Ok(())
    }

    /// Take the messages queued for `user`, optionally only those from
    /// `from`. Returned messages are removed; the rest stay queued.
    pub fn take_dialogs(&mut self, user: &ActorId, from: Option<&str>) -> Vec<DialogMessage> {
        let Some(queue) = self.dialogs.get_mut(user) else {
            return Vec::new();
        };
        let taken = match from {
            None => std::mem::take(queue),
            Some(sender) => {
                let (taken, kept): (Vec<DialogMessage>, Vec<DialogMessage>) = std::mem::take(queue)
                    .into_iter()
                    .partition(|msg| msg.from == sender);
                *queue = kept;
                taken
            }
        };
        if queue.is_empty() {
            self.dialogs.remove(user);
        }
        taken
    }

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    /// Whether the run should end at `now`.
    pub fn check(&self, now: DateTime<Utc>) -> Option<EndReason> {
        self.run.check(&self.world, now)
    }

    /// Freeze the result record.
    pub fn finish(&mut self, reason: EndReason) -> ResultRecord {
        self.world
            .record_event(None, format!("run ended: {reason}"));
        self.run.finish(&self.world, reason)
    }

    fn notify(&mut self, user: &ActorId, text: impl Into<String>) {
        self.dialogs
            .entry(user.clone())
            .or_default()
            .push(DialogMessage::from_server(text));
    }

    /// Tell the sender its command was rejected and build the error.
    fn reject(&mut self, user: &ActorId, reason: &str) -> ServerError {
        warn!(user = %user, reason, "Command rejected");
        self.notify(user, format!("rejected: {reason}"));
        ServerError::Rejected {
            user: user.to_string(),
            reason: reason.to_owned(),
        }
    }
}
