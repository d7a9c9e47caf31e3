//! Individual connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tether_core::types::ConnectionId;

use crate::message::types::Event;
use crate::metrics::RealtimeMetrics;

/// Room every connection starts in.
pub const DEFAULT_ROOM: &str = "general";

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// Both pumps running, outbound queue open.
    Active = 0,
    /// Teardown started: queue closed, read pump signalled.
    Closing = 1,
    /// Stream closed by the write pump.
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// A handle to a single admitted connection.
///
/// Holds the producer side of the outbound queue plus bookkeeping. The
/// stream itself is owned by the two pumps; handlers only ever see this.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,
    /// Producer side of the outbound queue; taken on close so the write
    /// pump observes the queue ending.
    outbound: Mutex<Option<mpsc::Sender<Event>>>,
    /// Signals the read pump to stop.
    shutdown: CancellationToken,
    /// Fired once the write pump has closed the stream.
    closed: CancellationToken,
    /// Current [`ConnectionState`] as `u8`.
    state: AtomicU8,
    /// When the connection was admitted
    connected_at: DateTime<Utc>,
    /// Last pong received
    last_pong_at: Mutex<DateTime<Utc>>,
    /// Room used by the chat handlers
    room: RwLock<String>,
    metrics: Arc<RealtimeMetrics>,
}

impl Connection {
    /// Create a new connection handle and the consumer side of its queue.
    pub(crate) fn new(
        id: ConnectionId,
        buffer: usize,
        metrics: Arc<RealtimeMetrics>,
    ) -> (Arc<Self>, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer);
        let now = Utc::now();
        let conn = Arc::new(Self {
            id,
            outbound: Mutex::new(Some(tx)),
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
            state: AtomicU8::new(ConnectionState::Active as u8),
            connected_at: now,
            last_pong_at: Mutex::new(now),
            room: RwLock::new(DEFAULT_ROOM.to_string()),
            metrics,
        });
        (conn, rx)
    }

    /// Connection identity.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the connection still accepts outbound events.
    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Enqueue an event for the write pump without blocking.
    ///
    /// Returns `false` if the event was not queued: the queue is full
    /// (event dropped) or the connection is closing.
    pub fn send(&self, event: Event) -> bool {
        let guard = self.outbound.lock();
        let Some(sender) = guard.as_ref() else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    conn_id = %self.id,
                    event_type = %event.event_type,
                    "Outbound queue full, dropping event"
                );
                self.metrics.message_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Start teardown: close the outbound queue and stop the read pump.
    ///
    /// Only the first call transitions `Active → Closing`; later calls
    /// return `false` and do nothing.
    pub(crate) fn begin_close(&self) -> bool {
        let won = self
            .state
            .compare_exchange(
                ConnectionState::Active as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            self.outbound.lock().take();
            self.shutdown.cancel();
            debug!(conn_id = %self.id, "Connection closing");
        }
        won
    }

    /// Record that the stream has been closed. Terminal.
    pub(crate) fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        self.closed.cancel();
    }

    /// Resolves once teardown has started.
    pub(crate) async fn closing(&self) {
        self.shutdown.cancelled().await;
    }

    /// Resolves once the stream has been closed.
    pub async fn wait_closed(&self) {
        self.closed.cancelled().await;
    }

    /// Record a pong response
    pub(crate) fn record_pong(&self) {
        *self.last_pong_at.lock() = Utc::now();
    }

    /// Last time the peer acknowledged a heartbeat (or admission time).
    pub fn last_pong_at(&self) -> DateTime<Utc> {
        *self.last_pong_at.lock()
    }

    /// Room this connection currently belongs to.
    pub fn room(&self) -> String {
        self.room.read().clone()
    }

    /// Move this connection to another room.
    pub fn set_room(&self, room: impl Into<String>) {
        *self.room.write() = room.into();
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            connected_at: self.connected_at,
            last_pong_at: self.last_pong_at(),
            room: self.room(),
            state: self.state(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last pong
    pub last_pong_at: DateTime<Utc>,
    /// Current room
    pub room: String,
    /// Lifecycle state
    pub state: ConnectionState,
}
