//! Frame encoding and buffered decoding.
//!
//! A frame is `type:userId:payload` followed by the terminator byte
//! `0x04`. The payload may itself contain `:`; only the first two
//! separators are structural. Receivers buffer until a terminator arrives
//! and keep whatever follows it for the next frame.

use std::time::Duration;

use mutiny_types::ActorId;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::message::MessageType;

/// End-of-frame marker.
pub const TERMINATOR: u8 = 0x04;

/// Largest frame a receiver will buffer.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type.
    pub kind: MessageType,
    /// Sending actor.
    pub user: ActorId,
    /// Raw payload text.
    pub payload: String,
}

impl Frame {
    /// A new frame.
    pub fn new(kind: MessageType, user: ActorId, payload: impl Into<String>) -> Self {
        Self {
            kind,
            user,
            payload: payload.into(),
        }
    }

    /// Wire bytes including the terminator.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.payload.as_bytes().contains(&TERMINATOR) {
            return Err(ProtocolError::TerminatorInPayload);
        }
        let mut bytes = format!("{}:{}:{}", self.kind, self.user, self.payload).into_bytes();
        bytes.push(TERMINATOR);
        Ok(bytes)
    }

    /// Decode one frame body (terminator already stripped).
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(body)
            .map_err(|e| ProtocolError::Malformed(format!("frame is not utf-8: {e}")))?;
        let mut parts = text.splitn(3, ':');
        let (Some(kind), Some(user), Some(payload)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProtocolError::Malformed(format!(
                "expected type:userId:payload, got {text:?}"
            )));
        };
        Ok(Self {
            kind: kind.parse()?,
            user: user.parse()?,
            payload: payload.to_owned(),
        })
    }
}

/// Accumulates bytes and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// An empty buffer.
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Take the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Result<Frame, ProtocolError>> {
        let end = self.pending.iter().position(|b| *b == TERMINATOR)?;
        let mut body: Vec<u8> = self.pending.drain(..=end).collect();
        body.pop();
        Some(Frame::decode(&body))
    }
}

/// Read one frame, waiting at most `timeout` for each chunk.
pub async fn read_frame<R>(
    reader: &mut R,
    buffer: &mut FrameBuffer,
    timeout: Duration,
) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0_u8; READ_CHUNK];
    loop {
        if let Some(frame) = buffer.next_frame() {
            return frame;
        }
        if buffer.pending().len() > MAX_FRAME_BYTES {
            return Err(ProtocolError::FrameTooLarge {
                limit: MAX_FRAME_BYTES,
            });
        }
        let read = tokio::time::timeout(timeout, reader.read(&mut chunk))
            .await
            .map_err(|_| ProtocolError::Timeout {
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;
        if read == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        buffer.extend(chunk.get(..read).unwrap_or_default());
    }
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()?).await?;
    writer.flush().await?;
    Ok(())
}
