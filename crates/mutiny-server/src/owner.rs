//! The single task that owns [`WorldState`].
//!
//! Connection tasks never touch the world directly; they send a
//! [`Command`] over an mpsc channel and wait on a oneshot reply. After
//! every command the owner re-checks the run's end conditions and
//! publishes the first end reason it sees on a watch channel.

use chrono::Utc;
use mutiny_core::{EndReason, ResultRecord};
use mutiny_protocol::{DialogMessage, GoalEnvelope, KnowledgeSnapshot};
use mutiny_types::ActorId;
use mutiny_world::{Actor, WorldObject};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::state::WorldState;

const COMMAND_BUFFER: usize = 256;

type Reply<T> = oneshot::Sender<T>;

/// A request for the owner task.
#[derive(Debug)]
pub enum Command {
    /// `WORLD_STATE_REQ`.
    Observe {
        /// Requesting actor.
        user: ActorId,
        /// Reply slot.
        reply: Reply<Option<KnowledgeSnapshot>>,
    },
    /// `ACTION_SEND`.
    Act {
        /// Requesting actor.
        user: ActorId,
        /// Action token.
        token: String,
        /// Signalled once the action is applied.
        reply: Reply<()>,
    },
    /// `UPDATE_SEND`.
    Update {
        /// Requesting actor.
        user: ActorId,
        /// Raw payload.
        payload: String,
        /// Reply slot.
        reply: Reply<Result<Option<Vec<WorldObject>>, ServerError>>,
    },
    /// `GOAL_SEND`.
    SendGoal {
        /// Requesting actor.
        user: ActorId,
        /// Raw payload.
        payload: String,
        /// Reply slot.
        reply: Reply<Result<(), ServerError>>,
    },
    /// `GOAL_REQ`.
    TakeGoals {
        /// Requesting actor.
        user: ActorId,
        /// Reply slot.
        reply: Reply<Vec<GoalEnvelope>>,
    },
    /// `AGENT_REQ`.
    Agent {
        /// Requesting actor.
        user: ActorId,
        /// Reply slot.
        reply: Reply<Option<Actor>>,
    },
    /// `DIALOG_SEND`.
    SendDialog {
        /// Requesting actor.
        user: ActorId,
        /// Raw payload.
        payload: String,
        /// Reply slot.
        reply: Reply<Result<(), ServerError>>,
    },
    /// `DIALOG_REQ`.
    TakeDialogs {
        /// Requesting actor.
        user: ActorId,
        /// Only messages from this sender, when set.
        from: Option<String>,
        /// Reply slot.
        reply: Reply<Vec<DialogMessage>>,
    },
    /// Periodic end-condition check.
    CheckTermination {
        /// Reply slot.
        reply: Reply<Option<EndReason>>,
    },
    /// Freeze the result record and stop.
    Finish {
        /// Why the run ended.
        reason: EndReason,
        /// Reply slot.
        reply: Reply<ResultRecord>,
    },
}

/// Cloneable sender side of the owner task.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    tx: mpsc::Sender<Command>,
}

impl WorldHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ServerError::OwnerStopped)?;
        rx.await.map_err(|_| ServerError::OwnerStopped)
    }

    /// Knowledge snapshot for `user`.
    pub async fn observe(&self, user: ActorId) -> Result<Option<KnowledgeSnapshot>, ServerError> {
        self.request(|reply| Command::Observe { user, reply }).await
    }

    /// Apply an action token. The outcome is queued as a receipt.
    pub async fn act(&self, user: ActorId, token: String) -> Result<(), ServerError> {
        self.request(|reply| Command::Act { user, token, reply })
            .await
    }

    /// Apply an `UPDATE_SEND` payload.
    pub async fn update(
        &self,
        user: ActorId,
        payload: String,
    ) -> Result<Option<Vec<WorldObject>>, ServerError> {
        self.request(|reply| Command::Update {
            user,
            payload,
            reply,
        })
        .await?
    }

    /// Queue a goal.
    pub async fn send_goal(&self, user: ActorId, payload: String) -> Result<(), ServerError> {
        self.request(|reply| Command::SendGoal {
            user,
            payload,
            reply,
        })
        .await?
    }

    /// Drain queued goals.
    pub async fn take_goals(&self, user: ActorId) -> Result<Vec<GoalEnvelope>, ServerError> {
        self.request(|reply| Command::TakeGoals { user, reply }).await
    }

    /// The actor's full record.
    pub async fn agent(&self, user: ActorId) -> Result<Option<Actor>, ServerError> {
        self.request(|reply| Command::Agent { user, reply }).await
    }

    /// Queue a message.
    pub async fn send_dialog(&self, user: ActorId, payload: String) -> Result<(), ServerError> {
        self.request(|reply| Command::SendDialog {
            user,
            payload,
            reply,
        })
        .await?
    }

    /// Take queued messages.
    pub async fn take_dialogs(
        &self,
        user: ActorId,
        from: Option<String>,
    ) -> Result<Vec<DialogMessage>, ServerError> {
        self.request(|reply| Command::TakeDialogs { user, from, reply })
            .await
    }

    /// Check end conditions now.
    pub async fn check_termination(&self) -> Result<Option<EndReason>, ServerError> {
        self.request(|reply| Command::CheckTermination { reply })
            .await
    }

    /// Freeze the result record; the owner stops afterwards.
    pub async fn finish(&self, reason: EndReason) -> Result<ResultRecord, ServerError> {
        self.request(|reply| Command::Finish { reason, reply })
            .await
    }
}

/// Start the owner task.
///
/// The returned receiver yields the end reason once a command or a
/// periodic check finds the run finished.
pub fn spawn_owner(
    state: WorldState,
) -> (WorldHandle, watch::Receiver<Option<EndReason>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (ended_tx, ended_rx) = watch::channel(None);
    let task = tokio::spawn(run_owner(state, rx, ended_tx));
    (WorldHandle { tx }, ended_rx, task)
}

async fn run_owner(
    mut state: WorldState,
    mut rx: mpsc::Receiver<Command>,
    ended: watch::Sender<Option<EndReason>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Observe { user, reply } => {
                let _ = reply.send(state.observe(&user));
            }
            Command::Act { user, token, reply } => {
                state.act(&user, &token);
                let _ = reply.send(());
            }
            Command::Update {
                user,
                payload,
                reply,
            } => {
                let _ = reply.send(state.update(&user, &payload));
            }
            Command::SendGoal {
                user,
                payload,
                reply,
            } => {
                let _ = reply.send(state.send_goal(&user, &payload));
            }
            Command::TakeGoals { user, reply } => {
                let _ = reply.send(state.take_goals(&user));
            }
            Command::Agent { user, reply } => {
                let _ = reply.send(state.agent(&user));
            }
            Command::SendDialog {
                user,
                payload,
                reply,
            } => {
                let _ = reply.send(state.send_dialog(&user, &payload));
            }
            Command::TakeDialogs { user, from, reply } => {
                let _ = reply.send(state.take_dialogs(&user, from.as_deref()));
            }
            Command::CheckTermination { reply } => {
                let _ = reply.send(state.check(Utc::now()));
            }
            Command::Finish { reason, reply } => {
                let _ = reply.send(state.finish(reason));
                info!(%reason, "World owner finished");
                return;
            }
        }

        if let Some(reason) = state.check(Utc::now()) {
            ended.send_if_modified(|current| {
                if current.is_some() {
                    return false;
                }
                debug!(%reason, "End condition reached");
                *current = Some(reason);
                true
            });
        }
    }
}
