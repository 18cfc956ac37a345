//! Periodic eviction of records that stopped changing

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::SessionStore;
use crate::config::RetentionConfig;

/// Run eviction passes every `sweep_interval` until `shutdown` fires
pub async fn run_sweeper(
    store: Arc<SessionStore>,
    retention: RetentionConfig,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(retention.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; nothing can be stale yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let report = store.evict_expired(Instant::now(), &retention).await;
                if report.total() > 0 {
                    info!(
                        delivered = report.delivered,
                        failed = report.failed,
                        abandoned = report.abandoned,
                        "Evicted expired sessions"
                    );
                }
            }
        }
    }

    debug!("Retention sweeper stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::QueueConfig;
    use crate::dispatch;

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_abandoned_sessions() {
        let (tx, _rx) = dispatch::channel(&QueueConfig::default());
        let store = Arc::new(SessionStore::new(tx));
        store.ingest("open", b"AB", false).await;

        let retention = RetentionConfig {
            sweep_interval: Duration::from_secs(1),
            idle_ttl: Duration::from_secs(3),
            ..Default::default()
        };
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(
            Arc::clone(&store),
            retention,
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.is_empty().await);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
