//! Background eviction of stale tokens.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::TokenStore;

/// Spawns the sweep loop for `store`.
///
/// Ticks every `interval` independent of request traffic and evicts tokens
/// older than the store's retention window. Runs until `cancel` fires.
pub fn spawn_sweeper(
    store: Arc<TokenStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_sweeper(store, interval, cancel).await;
    })
}

/// Sweep loop body; exits when `cancel` is triggered.
pub async fn run_sweeper(store: Arc<TokenStore>, interval: Duration, cancel: CancellationToken) {
    info!(
        interval_ms = interval.as_millis() as u64,
        retention_ms = store.retention().as_millis() as u64,
        "Token sweeper started"
    );

    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = store.sweep();
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "Evicted expired tokens");
                }
            }
        }
    }

    info!("Token sweeper stopped");
}
