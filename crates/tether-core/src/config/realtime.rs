//! Connection engine configuration: heartbeat timing and framing limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// How long to wait for a pong before the connection is considered dead.
    #[serde(default = "default_pong_wait")]
    pub pong_wait_ms: u64,
    /// How long a closing connection may spend flushing before its stream
    /// is dropped.
    #[serde(default = "default_write_wait")]
    pub write_wait_ms: u64,
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            pong_wait_ms: default_pong_wait(),
            write_wait_ms: default_write_wait(),
            max_message_size: default_max_message_size(),
            outbound_buffer_size: default_outbound_buffer(),
        }
    }
}

impl RealtimeConfig {
    /// Read deadline armed at connection start and after every pong.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Ping cadence: 90% of the pong wait, so a probe is always in flight
    /// before the read deadline lapses.
    pub fn ping_interval(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    /// Upper bound on the write pump's remaining work once teardown starts.
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    /// Rejects values that would stall or panic the connection pumps.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ping_interval().is_zero() {
            return Err(AppError::configuration(
                "realtime.pong_wait_ms is too small to derive a ping interval",
            ));
        }
        if self.write_wait_ms == 0 {
            return Err(AppError::configuration(
                "realtime.write_wait_ms must be positive",
            ));
        }
        if self.max_message_size == 0 {
            return Err(AppError::configuration(
                "realtime.max_message_size must be positive",
            ));
        }
        if self.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be positive",
            ));
        }
        Ok(())
    }
}

fn default_pong_wait() -> u64 {
    10_000
}

fn default_write_wait() -> u64 {
    10_000
}

fn default_max_message_size() -> usize {
    512
}

fn default_outbound_buffer() -> usize {
    256
}
