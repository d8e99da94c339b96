use std::time::Duration;

use storage::Storage;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Periodically deactivates chat sessions older than `ttl_hours`.
pub(crate) fn spawn(storage: Storage, ttl_hours: i64, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(error) = sweep_once(&storage, ttl_hours).await {
                error!(%error, "session sweep failed");
            }
        }
    })
}

pub(crate) async fn sweep_once(storage: &Storage, ttl_hours: i64) -> anyhow::Result<u64> {
    anyhow::ensure!(ttl_hours > 0, "session TTL must be positive, got {ttl_hours}");
    let swept = storage.deactivate_sessions_older_than(ttl_hours).await?;
    if swept > 0 {
        info!(swept, ttl_hours, "deactivated stale chat sessions");
    }
    Ok(swept)
}
