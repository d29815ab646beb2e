use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::watch;
use tracing::debug;

use super::memory::Storage;
use crate::utility::tracing_targets;

/// Background sweeper that reclaims expired [`Storage`] entries.
///
/// Sleeps `sleep_interval`, then scans every key, compare-and-removing any
/// whose `expiresAt` has passed. Shutdown is checked once per cycle, after
/// the sleep, so a `StorageCleaner` always performs at least one scan
/// before honoring it -- it's a best-effort sweeper, not a timing
/// guarantee, and a store whose entries are never read is otherwise never
/// cleaned.
pub struct StorageCleaner {
    storage: Arc<Storage>,
    sleep_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StorageCleaner {
    /// Builds a cleaner for `storage`, returning it alongside the sender
    /// half of its shutdown signal.
    #[must_use]
    pub fn new(storage: Arc<Storage>, sleep_interval: Duration) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let cleaner = Self { storage, sleep_interval, shutdown: shutdown_rx };
        (cleaner, shutdown_tx)
    }

    /// Runs the sweep loop until shutdown is signalled.
    ///
    /// Always performs at least one sweep before checking shutdown, since
    /// the check happens only after the sleep -- a store that's never read
    /// is otherwise never cleaned, and a cleaner told to shut down before
    /// its first cycle still gets that one scan in.
    pub async fn run(self) {
        loop {
            tokio::time::sleep(self.sleep_interval).await;

            let now = Timestamp::now();
            self.storage.sweep_expired(now);
            debug!(target: tracing_targets::STORAGE, remaining = self.storage.keys().len(), "storage cleaner swept expired entries");

            if *self.shutdown.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::value::StorageValue;

    #[tokio::test]
    async fn sweeps_at_least_once_before_honoring_shutdown() {
        let storage = Arc::new(Storage::new());
        storage.set("k", StorageValue::new((), Timestamp::now() - Duration::from_secs(1)));

        let (cleaner, shutdown_tx) = StorageCleaner::new(Arc::clone(&storage), Duration::from_millis(1));
        shutdown_tx.send(true).unwrap();
        cleaner.run().await;

        assert!(storage.is_empty());
    }
}
