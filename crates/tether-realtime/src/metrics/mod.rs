//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug)]
pub struct RealtimeMetrics {
    /// Total connections admitted
    connections_total: AtomicU64,
    /// Connections currently registered
    connections_active: AtomicU64,
    /// Inbound events decoded
    messages_received: AtomicU64,
    /// Outbound events written to a transport
    messages_sent: AtomicU64,
    /// Outbound events dropped on a full queue
    messages_dropped: AtomicU64,
    /// Inbound events the router rejected or a handler failed on
    routing_failures: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            routing_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn routing_failed(&self) {
        self.routing_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            routing_failures: self.routing_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for RealtimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever admitted
    pub connections_total: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Inbound events decoded
    pub messages_received: u64,
    /// Outbound events written
    pub messages_sent: u64,
    /// Outbound events dropped
    pub messages_dropped: u64,
    /// Routing or handler failures
    pub routing_failures: u64,
}
