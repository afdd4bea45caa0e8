//! Versioned, hot-swappable config store.
//!
//! `ConfigStore<T>` wraps `Arc<RwLock<T>>` so that the SIGHUP handler can
//! swap a config section while the ingestion gate and the delivery workers
//! keep reading it. Every swap bumps a version counter, which is what the
//! reload handler reports, and is published to subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, watch};

/// A shared configuration section that can be replaced at runtime.
pub struct ConfigStore<T> {
    inner: Arc<ConfigStoreInner<T>>,
}

struct ConfigStoreInner<T> {
    data: RwLock<T>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

impl<T> ConfigStore<T> {
    /// Create a new store at version 0.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ConfigStoreInner {
                data: RwLock::new(initial),
                version: AtomicU64::new(0),
                version_tx: watch::Sender::new(0),
            }),
        }
    }

    /// Replace the stored value. Returns the new version.
    pub async fn update(&self, value: T) -> u64 {
        let mut guard = self.inner.data.write().await;
        *guard = value;
        let version = self.inner.version.fetch_add(1, Ordering::AcqRel) + 1;
        drop(guard);
        self.inner.version_tx.send_replace(version);
        version
    }

    /// Watch for updates. The receiver yields the version after each swap.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version_tx.subscribe()
    }

    /// Read the current value.
    ///
    /// Keep the guard short-lived; a pending `update` waits for it.
    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.data.read().await
    }

    /// Number of updates applied since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone the current value out of the store.
    pub async fn snapshot(&self) -> T {
        self.inner.data.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_is_visible_to_clones() {
        let store = ConfigStore::new(1u32);
        let reader = store.clone();
        assert_eq!(reader.version(), 0);

        assert_eq!(store.update(7).await, 1);
        assert_eq!(*reader.read().await, 7);
        assert_eq!(reader.snapshot().await, 7);
        assert_eq!(reader.version(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_new_version() {
        let store = ConfigStore::new("a".to_string());
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow(), 0);

        store.update("b".to_string()).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
