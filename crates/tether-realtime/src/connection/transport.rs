//! Duplex frame transport owned by a connection.
//!
//! The HTTP upgrade happens elsewhere; by the time the engine sees a
//! connection it is just a sink of outgoing [`Frame`]s and a stream of
//! incoming ones. `tether-api` adapts axum's WebSocket into this shape.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream};
use thiserror::Error;

use tether_core::error::{AppError, ErrorKind};

/// Close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent by a peer that is going away (tab closed, server restart).
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code reported when the socket dropped without a close handshake.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// One transport-level frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame carrying a JSON envelope.
    Text(String),
    /// Binary data frame.
    Binary(Bytes),
    /// Heartbeat probe.
    Ping(Bytes),
    /// Heartbeat acknowledgment.
    Pong(Bytes),
    /// Close handshake, with the peer's close code if one was sent.
    Close(Option<u16>),
}

/// Failure reading from or writing to a transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The peer closed the connection or the stream ended.
    #[error("connection closed by peer (code {code:?})")]
    Closed {
        /// Close code from the peer's close frame, if any.
        code: Option<u16>,
    },
    /// The peer sent a frame above the read limit.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Received frame size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// No pong arrived before the read deadline.
    #[error("read deadline elapsed without a pong")]
    ReadTimeout,
    /// A closing connection could not flush within its write deadline.
    #[error("write deadline elapsed while closing")]
    WriteTimeout,
    /// Any other I/O or protocol failure.
    #[error("transport error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether this is an ordinary disconnect rather than something worth
    /// a warning. Only affects log verbosity.
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Closed { code: None } => true,
            Self::Closed { code: Some(code) } => {
                matches!(*code, CLOSE_NORMAL | CLOSE_GOING_AWAY | CLOSE_ABNORMAL)
            }
            _ => false,
        }
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::with_source(ErrorKind::Transport, err.to_string(), err)
    }
}

/// Outgoing half of a transport.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Incoming half of a transport.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// An established duplex connection to one client.
pub struct Transport {
    sink: FrameSink,
    stream: FrameStream,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

impl Transport {
    /// Wraps a sink/stream pair.
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<Frame, Error = TransportError> + Send + 'static,
        R: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Splits into independently owned halves, one per pump.
    pub fn split(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }

    /// Sends a close frame and closes the outgoing half.
    ///
    /// Used to turn away a stream that was never admitted.
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.sink.send(Frame::Close(None)).await?;
        self.sink.close().await
    }
}
