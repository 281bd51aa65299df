//! Client session used by agent and operator processes.
//!
//! Every request opens a fresh connection, writes one frame, reads exactly
//! one framed reply when the message type has one, and closes. Requests
//! without a reply half-close the connection and wait for the server to
//! close its side, which it does only after the command is applied. Socket and
//! decoding failures are logged and surface as "no data this round"
//! (`None`, `false`, or an empty list) so callers simply retry on their
//! next cycle.

use std::time::Duration;

use mutiny_types::{ActorId, GoalPredicate, ObjectId};
use mutiny_world::{Action, Actor, WorldObject};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::frame::{Frame, FrameBuffer, read_frame, write_frame};
use crate::message::{DialogMessage, GoalEnvelope, KnowledgeSnapshot, MessageType};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A session bound to one server address and one actor.
#[derive(Debug, Clone)]
pub struct WorldClient {
    addr: String,
    user: ActorId,
    timeout: Duration,
}

impl WorldClient {
    /// A session for `user` against the server at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>, user: ActorId) -> Self {
        Self {
            addr: addr.into(),
            user,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the connect and read timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The actor this session speaks for.
    pub const fn user(&self) -> &ActorId {
        &self.user
    }

    /// Send one request and optionally read the reply frame.
    pub async fn exchange(
        &self,
        kind: MessageType,
        payload: &str,
        expect_reply: bool,
    ) -> Result<Option<Frame>, ProtocolError> {
        let ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ProtocolError::Timeout { ms })??;

        let request = Frame::new(kind, self.user.clone(), payload);
        write_frame(&mut stream, &request).await?;
        debug!(kind = %kind, user = %self.user, "Request sent");

        if !expect_reply {
            stream.shutdown().await?;
            let mut rest = Vec::new();
            tokio::time::timeout(self.timeout, stream.read_to_end(&mut rest))
                .await
                .map_err(|_| ProtocolError::Timeout { ms })??;
            return Ok(None);
        }
        let mut buffer = FrameBuffer::new();
        let reply = read_frame(&mut stream, &mut buffer, self.timeout).await?;
        Ok(Some(reply))
    }

    async fn fetch<T: DeserializeOwned>(&self, kind: MessageType, payload: &str) -> Option<T> {
        let result = match self.exchange(kind, payload, true).await {
            Ok(Some(reply)) => serde_json::from_str(&reply.payload).map_err(ProtocolError::from),
            Ok(None) => Err(ProtocolError::ConnectionClosed),
            Err(err) => Err(err),
        };
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(kind = %kind, user = %self.user, error = %err, "Request failed, no data this round");
                None
            }
        }
    }

    async fn notify(&self, kind: MessageType, payload: &str) -> bool {
        match self.exchange(kind, payload, false).await {
            Ok(_) => true,
            Err(err) => {
                warn!(kind = %kind, user = %self.user, error = %err, "Send failed");
                false
            }
        }
    }

    /// The actor's current knowledge snapshot.
    pub async fn observe(&self) -> Option<KnowledgeSnapshot> {
        self.fetch(MessageType::WorldStateReq, "").await
    }

    /// Submit an action. Returns once the server has applied it; the
    /// outcome is queued as a dialog receipt.
    pub async fn act(&self, action: Action) -> bool {
        self.notify(MessageType::ActionSend, &action.to_string()).await
    }

    /// Every object the actor currently knows about.
    pub async fn known_objects(&self) -> Option<Vec<WorldObject>> {
        self.fetch(MessageType::UpdateSend, "list").await
    }

    /// Share a known object with another actor.
    pub async fn share(&self, recipient: &ActorId, object: &ObjectId) -> bool {
        self.notify(MessageType::UpdateSend, &format!("share {recipient} {object}"))
            .await
    }

    /// Mark the actor inactive.
    pub async fn stand_down(&self) -> bool {
        self.notify(MessageType::UpdateSend, "stand-down").await
    }

    /// Queue a goal for `recipient`, owned by this session's actor.
    pub async fn send_goal(&self, recipient: &ActorId, goal: &GoalPredicate) -> bool {
        self.notify(MessageType::GoalSend, &format!("{recipient} {goal}"))
            .await
    }

    /// Drain goals queued for this actor.
    pub async fn goals(&self) -> Vec<GoalEnvelope> {
        self.fetch(MessageType::GoalReq, "").await.unwrap_or_default()
    }

    /// The actor's own record as the server holds it.
    pub async fn agent(&self) -> Option<Actor> {
        self.fetch(MessageType::AgentReq, "").await
    }

    /// Queue a message for `recipient`.
    pub async fn send_dialog(&self, recipient: &str, text: &str) -> bool {
        self.notify(MessageType::DialogSend, &format!("{recipient} {text}"))
            .await
    }

    /// Take queued messages, optionally only those from `from`.
    pub async fn dialogs(&self, from: Option<&str>) -> Vec<DialogMessage> {
        self.fetch(MessageType::DialogReq, from.unwrap_or_default())
            .await
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn unreachable_server_is_no_data() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WorldClient::new(addr.to_string(), "agent1".parse().unwrap())
            .with_timeout(Duration::from_millis(200));
        assert!(client.observe().await.is_none());
        assert!(client.goals().await.is_empty());
        assert!(!client.act(Action::Wait).await);
    }

    #[tokio::test]
    async fn reply_frame_is_decoded() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = FrameBuffer::new();
            let request = read_frame(&mut stream, &mut buffer, Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(request.kind, MessageType::GoalReq);
            let body = r#"[{"owner":"op","goal":"agent-at(4,4)"}]"#;
            let reply = Frame::new(MessageType::GoalReq, "server".parse().unwrap(), body);
            write_frame(&mut stream, &reply).await.unwrap();
        });

        let client = WorldClient::new(addr.to_string(), "agent1".parse().unwrap());
        let goals = client.goals().await;
        server.await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals.first().map(|g| g.goal.as_str()), Some("agent-at(4,4)"));
    }

    #[tokio::test]
    async fn sends_wait_until_the_server_closes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let applied = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&applied);
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = FrameBuffer::new();
            let request = read_frame(&mut stream, &mut buffer, Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(request.kind, MessageType::GoalSend);
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
            drop(stream);
        });

        let client = WorldClient::new(addr.to_string(), "op".parse().unwrap());
        let goal = GoalPredicate::AgentAt(mutiny_types::Position::new(1, 1));
        assert!(client.send_goal(&"agent1".parse().unwrap(), &goal).await);
        assert!(applied.load(Ordering::SeqCst));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_times_out_a_send() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(stream);
        });

        let client = WorldClient::new(addr.to_string(), "agent1".parse().unwrap())
            .with_timeout(Duration::from_millis(100));
        assert!(!client.act(Action::Wait).await);
        server.await.unwrap();
    }
}
