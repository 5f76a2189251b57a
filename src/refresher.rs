use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::engine::Engine;

/// Background task that re-derives table statuses as time passes, so that
/// subscribers hear about `Reserved → Occupied → Free` without anyone reading.
pub async fn run_refresher(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let changes = engine.refresh().await;
        if !changes.is_empty() {
            debug!(count = changes.len(), "refresher applied status changes");
        }
        engine.notify.prune();
    }
}
