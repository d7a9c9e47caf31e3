//! The two per-connection tasks.
//!
//! The read pump owns the incoming half of the transport: it enforces the
//! pong deadline, decodes frames, and routes events. The write pump owns
//! the outgoing half: it drains the outbound queue and emits heartbeat
//! pings. Either one ending asks the registry to remove the connection;
//! the sibling then notices the cancelled token or closed queue and exits.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info_span, warn};

use tether_core::error::AppError;

use super::handle::Connection;
use super::registry::ConnectionRegistry;
use super::transport::{Frame, FrameSink, FrameStream, Transport, TransportError};
use crate::message::serializer::{decode_event, encode_event};
use crate::message::types::Event;
use crate::message::validator::check_frame_size;
use crate::metrics::RealtimeMetrics;
use crate::router::EventContext;

/// Why a pump stopped.
#[derive(Debug)]
enum Exit {
    /// Teardown was requested by someone else.
    Shutdown,
    /// The stream failed or the peer went away.
    Transport(TransportError),
    /// The peer sent something that is not an event.
    Decode(AppError),
    /// An outbound event could not be serialized.
    Encode(AppError),
}

impl Exit {
    fn log(&self, pump: &'static str) {
        match self {
            Self::Shutdown => debug!(pump, "Pump stopped"),
            Self::Transport(err) if err.is_expected() => {
                debug!(pump, error = %err, "Peer disconnected")
            }
            Self::Transport(err) => warn!(pump, error = %err, "Transport failure"),
            Self::Decode(err) => warn!(pump, error = %err, "Malformed inbound frame"),
            Self::Encode(err) => warn!(pump, error = %err, "Failed to encode outbound event"),
        }
    }
}

/// Starts both pumps for a freshly registered connection.
pub(crate) fn spawn(
    conn: Arc<Connection>,
    transport: Transport,
    outbound: mpsc::Receiver<Event>,
    registry: Arc<ConnectionRegistry>,
) {
    let (sink, stream) = transport.split();
    let span = info_span!("connection", conn_id = %conn.id());

    tokio::spawn(read_pump(conn.clone(), stream, registry.clone()).instrument(span.clone()));
    tokio::spawn(write_pump(conn, sink, outbound, registry).instrument(span));
}

/// Inbound loop. Routing is awaited in-line, so a slow handler throttles
/// this connection's reads and nothing else.
async fn read_pump(
    conn: Arc<Connection>,
    mut stream: FrameStream,
    registry: Arc<ConnectionRegistry>,
) {
    let pong_wait = registry.config().pong_wait();
    let limit = registry.config().max_message_size;
    let metrics = registry.metrics().clone();
    let ctx = EventContext::new(conn.clone(), registry.clone());

    let mut deadline = Instant::now() + pong_wait;

    let exit = loop {
        let next = tokio::select! {
            biased;
            _ = conn.closing() => break Exit::Shutdown,
            next = time::timeout_at(deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => break Exit::Transport(TransportError::ReadTimeout),
            Ok(None) => break Exit::Transport(TransportError::Closed { code: None }),
            Ok(Some(Err(err))) => break Exit::Transport(err),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Frame::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                conn.record_pong();
            }
            // Answered by the transport itself
            Frame::Ping(_) => {}
            Frame::Close(code) => break Exit::Transport(TransportError::Closed { code }),
            Frame::Binary(data) => {
                break Exit::Decode(AppError::decode(format!(
                    "Binary frames are not accepted ({} bytes)",
                    data.len()
                )));
            }
            Frame::Text(text) => {
                if let Err(err) = check_frame_size(text.len(), limit) {
                    break Exit::Transport(err);
                }
                let event = match decode_event(&text) {
                    Ok(event) => event,
                    Err(err) => break Exit::Decode(err),
                };
                metrics.message_received();

                let event_type = event.event_type.clone();
                if let Err(err) = registry.router().route(event, &ctx).await {
                    metrics.routing_failed();
                    warn!(
                        event_type = %event_type,
                        kind = %err.kind,
                        error = %err,
                        "Event not handled"
                    );
                }
            }
        }
    };

    exit.log("read");
    registry.remove(&conn.id());
}

/// Outbound side of a connection.
///
/// Runs unbounded while the connection is active. Once teardown starts,
/// whatever is left (queued events, the close frame) gets `write_wait`;
/// past that the sink is dropped without a close handshake.
async fn write_pump(
    conn: Arc<Connection>,
    mut sink: FrameSink,
    mut outbound: mpsc::Receiver<Event>,
    registry: Arc<ConnectionRegistry>,
) {
    let write_wait = registry.config().write_wait();
    let ping_interval = registry.config().ping_interval();
    let metrics = registry.metrics().clone();

    let exit = {
        let drain = write_loop(&mut sink, &mut outbound, ping_interval, &metrics);
        tokio::pin!(drain);
        tokio::select! {
            biased;
            exit = &mut drain => exit,
            _ = conn.closing() => time::timeout(write_wait, &mut drain)
                .await
                .unwrap_or(Exit::Transport(TransportError::WriteTimeout)),
        }
    };

    exit.log("write");
    registry.remove(&conn.id());
    if !matches!(exit, Exit::Transport(TransportError::WriteTimeout)) {
        match time::timeout(write_wait, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "Stream already closed"),
            Err(_) => debug!("Stream close timed out"),
        }
    }
    drop(sink);
    conn.mark_closed();
}

/// Queued events in FIFO order, interleaved with pings, until the queue
/// closes or a write fails.
async fn write_loop(
    sink: &mut FrameSink,
    outbound: &mut mpsc::Receiver<Event>,
    ping_interval: Duration,
    metrics: &RealtimeMetrics,
) -> Exit {
    let mut ticker = time::interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(event) => {
                    let text = match encode_event(&event) {
                        Ok(text) => text,
                        Err(err) => break Exit::Encode(err),
                    };
                    if let Err(err) = sink.send(Frame::Text(text)).await {
                        break Exit::Transport(err);
                    }
                    metrics.message_sent();
                }
                None => {
                    // Fails if the peer already closed; nothing left to tell it
                    if let Err(err) = sink.send(Frame::Close(None)).await {
                        debug!(error = %err, "Close frame not delivered");
                    }
                    break Exit::Shutdown;
                }
            },
            _ = ticker.tick() => {
                if let Err(err) = sink.send(Frame::Ping(Bytes::new())).await {
                    break Exit::Transport(err);
                }
            }
        }
    }
}
