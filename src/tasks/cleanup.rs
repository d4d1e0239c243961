//! Expired Entry Sweep
//!
//! Background task that periodically removes expired cache entries nobody
//! has re-requested since they went stale.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that periodically runs [`CacheStore::clear_expired`].
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep goes through the store's write path, so reads
/// are not held up while it runs.
///
/// # Arguments
/// * `cache` - Store to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// An interval of 0 disables the sweep; the returned task finishes at once.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheStore::open("responses.json")?;
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: CacheStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        if interval.is_zero() {
            info!("Cache cleanup task disabled");
            return;
        }
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.clear_expired().await {
                Ok(0) => debug!("Cache cleanup: no expired entries found"),
                Ok(removed) => info!("Cache cleanup: removed {} expired entries", removed),
                Err(e) => warn!("Cache cleanup failed: {}", e),
            }
        }
    })
}
