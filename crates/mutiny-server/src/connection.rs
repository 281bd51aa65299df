//! Per-connection request handling.

use std::time::Duration;

use mutiny_protocol::{Frame, FrameBuffer, MessageType, ProtocolError, read_frame, write_frame};
use mutiny_types::ActorId;
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ServerError;
use crate::owner::WorldHandle;

/// Serve frames on one connection until the peer closes it.
///
/// Clients normally send one request per connection. A request is fully
/// applied before the next read, so a client that half-closes after a
/// send sees the connection close only once its command has taken
/// effect. Any frame that cannot be decoded ends the connection with an
/// error.
pub async fn handle_connection(
    mut stream: TcpStream,
    handle: WorldHandle,
    read_timeout: Duration,
) -> Result<(), ServerError> {
    let mut buffer = FrameBuffer::new();
    loop {
        let frame = match read_frame(&mut stream, &mut buffer, read_timeout).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) if buffer.pending().is_empty() => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        debug!(kind = %frame.kind, user = %frame.user, "Request received");
        dispatch(&mut stream, &handle, frame).await?;
    }
}

async fn dispatch(
    stream: &mut TcpStream,
    handle: &WorldHandle,
    frame: Frame,
) -> Result<(), ServerError> {
    let Frame {
        kind,
        user,
        payload,
    } = frame;

    match kind {
        MessageType::WorldStateReq => {
            let snapshot = handle.observe(user.clone()).await?;
            reply(stream, kind, &user, &snapshot).await
        }
        MessageType::ActionSend => handle.act(user, payload.trim().to_owned()).await,
        MessageType::UpdateSend => {
            let expects_reply = payload.trim() == "list";
            let result = handle.update(user.clone(), payload).await;
            if expects_reply {
                let objects = result?.unwrap_or_default();
                reply(stream, kind, &user, &objects).await
            } else {
                result.map(|_| ())
            }
        }
        MessageType::GoalSend => handle.send_goal(user, payload).await,
        MessageType::GoalReq => {
            let goals = handle.take_goals(user.clone()).await?;
            reply(stream, kind, &user, &goals).await
        }
        MessageType::AgentReq => {
            let actor = handle.agent(user.clone()).await?;
            reply(stream, kind, &user, &actor).await
        }
        MessageType::DialogSend => handle.send_dialog(user, payload).await,
        MessageType::DialogReq => {
            let filter = payload.trim();
            let from = (!filter.is_empty()).then(|| filter.to_owned());
            let messages = handle.take_dialogs(user.clone(), from).await?;
            reply(stream, kind, &user, &messages).await
        }
    }
}

async fn reply<T: Serialize>(
    stream: &mut TcpStream,
    kind: MessageType,
    user: &ActorId,
    body: &T,
) -> Result<(), ServerError> {
    let json = serde_json::to_string(body).map_err(ProtocolError::from)?;
    let frame = Frame::new(kind, user.clone(), json);
    write_frame(stream, &frame).await?;
    Ok(())
}
