//! Background removal of expired cache entries

use std::hash::Hash;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::core::Cache;
use crate::resilience::Clock;

/// Handle to a running sweep task; the task is aborted when this drops
#[derive(Debug)]
pub struct CacheSweeper {
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Spawn a task calling [`Cache::cleanup_expired`] every `interval`
    ///
    /// Returns `None` when no tokio runtime is active or the interval is
    /// zero.
    pub fn spawn<K, V, C>(cache: Cache<K, V, C>, interval: Duration) -> Option<Self>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        C: Clock + Clone,
    {
        if interval.is_zero() {
            return None;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    ticker.tick().await;

                    loop {
                        ticker.tick().await;
                        let removed = cache.cleanup_expired();
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                });
                Some(Self { handle })
            }
            Err(_) => {
                warn!("Skipping cache sweeper start: no active Tokio runtime detected");
                None
            }
        }
    }

    /// Stop the sweep task
    pub fn stop(self) {
        self.handle.abort();
    }

    /// Whether the task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
