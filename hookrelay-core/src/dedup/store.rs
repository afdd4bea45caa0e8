//! In-memory dedup index with write-behind persistence.

use super::key::{DedupEntry, DedupKey, DedupMeta, Namespace};
use super::ledger::{DedupLedger, LedgerCommand, LedgerError};
use crate::config::DedupConfig;
use crate::events::LedgerCommandSender;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Tracks which keys were dispatched within their retention window.
///
/// Cloning the store clones a handle; all clones share one index.
///
/// An entry whose age reached its namespace window counts as absent even
/// before the sweeper removes it, so expiry does not depend on sweep timing.
#[derive(Clone)]
pub struct DedupStore {
    inner: Arc<DedupStoreInner>,
}

struct DedupStoreInner {
    index: DashMap<DedupKey, OffsetDateTime>,
    primary_retention: Duration,
    high_value_retention: Duration,
    ledger_tx: LedgerCommandSender,
    rehydrated: AtomicBool,
}

impl DedupStore {
    /// Create an empty store. Successful marks are forwarded to `ledger_tx`.
    pub fn new(config: &DedupConfig, ledger_tx: LedgerCommandSender) -> Self {
        Self {
            inner: Arc::new(DedupStoreInner {
                index: DashMap::new(),
                primary_retention: config.primary_retention,
                high_value_retention: config.high_value_retention,
                ledger_tx,
                rehydrated: AtomicBool::new(false),
            }),
        }
    }

    pub fn retention(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Primary => self.inner.primary_retention,
            Namespace::HighValue => self.inner.high_value_retention,
        }
    }

    /// Whether `key` was marked within its retention window.
    pub fn seen(&self, key: &DedupKey) -> bool {
        self.seen_at(key, OffsetDateTime::now_utc())
    }

    /// Claim `key` if it is not live. Returns `true` if this call claimed it.
    ///
    /// Two concurrent claims on the same key never both succeed.
    pub fn try_mark(&self, key: DedupKey, meta: DedupMeta) -> bool {
        self.try_mark_at(key, meta, OffsetDateTime::now_utc())
    }

    /// Mark `key` unconditionally, restarting its window.
    pub fn mark(&self, key: DedupKey, meta: DedupMeta) {
        self.mark_at(key, meta, OffsetDateTime::now_utc());
    }

    /// Remove entries of `namespace` older than `window` from the index and
    /// schedule the same purge on the ledger. Returns the number of index
    /// entries removed.
    pub fn evict_older_than(&self, namespace: Namespace, window: Duration) -> usize {
        self.evict_older_than_at(namespace, window, OffsetDateTime::now_utc())
    }

    /// Shrink the index to `target` entries, oldest first, once it grew past
    /// `soft_cap`. The ledger is not touched. Returns the number removed.
    pub fn trim(&self, soft_cap: usize, target: usize) -> usize {
        let len = self.inner.index.len();
        if len <= soft_cap {
            return 0;
        }

        let mut by_age: Vec<(DedupKey, OffsetDateTime)> = self
            .inner
            .index
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1));

        let excess = len.saturating_sub(target);
        let mut removed = 0;
        for (key, _) in by_age.into_iter().take(excess) {
            if self.inner.index.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Load live ledger entries into the index.
    ///
    /// Entries already in the index keep the newer of the two timestamps.
    pub async fn rehydrate(&self, ledger: &dyn DedupLedger) -> Result<usize, LedgerError> {
        let now = OffsetDateTime::now_utc();
        let mut loaded = 0;
        for namespace in Namespace::ALL {
            let cutoff = now - self.retention(namespace);
            let entries = match ledger.load_since(namespace, cutoff).await {
                Ok(entries) => entries,
                Err(e) => {
                    self.inner.rehydrated.store(false, Ordering::Release);
                    return Err(e);
                }
            };
            for entry in entries {
                self.inner
                    .index
                    .entry(entry.key)
                    .and_modify(|ts| {
                        if entry.created_at > *ts {
                            *ts = entry.created_at;
                        }
                    })
                    .or_insert(entry.created_at);
                loaded += 1;
            }
        }
        self.inner.rehydrated.store(true, Ordering::Release);
        info!(loaded, "Dedup index rehydrated from ledger");
        Ok(loaded)
    }

    /// Whether the last rehydration attempt succeeded.
    pub fn is_rehydrated(&self) -> bool {
        self.inner.rehydrated.load(Ordering::Acquire)
    }

    /// Entries in the index, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.index.is_empty()
    }

    // -- Clock-explicit variants --------------------------------------------

    pub(crate) fn seen_at(&self, key: &DedupKey, now: OffsetDateTime) -> bool {
        self.inner
            .index
            .get(key)
            .is_some_and(|created_at| self.is_live(key.namespace, *created_at, now))
    }

    pub(crate) fn try_mark_at(&self, key: DedupKey, meta: DedupMeta, now: OffsetDateTime) -> bool {
        let claimed = match self.inner.index.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if self.is_live(key.namespace, *occupied.get(), now) {
                    false
                } else {
                    occupied.insert(now);
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
        };

        if claimed {
            self.persist(key, meta, now);
        }
        claimed
    }

    pub(crate) fn mark_at(&self, key: DedupKey, meta: DedupMeta, now: OffsetDateTime) {
        self.inner.index.insert(key.clone(), now);
        self.persist(key, meta, now);
    }

    pub(crate) fn evict_older_than_at(
        &self,
        namespace: Namespace,
        window: Duration,
        now: OffsetDateTime,
    ) -> usize {
        let cutoff = now - window;
        let mut removed = 0;
        self.inner.index.retain(|key, created_at| {
            let keep = key.namespace != namespace || *created_at > cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });

        if self
            .inner
            .ledger_tx
            .send(LedgerCommand::Evict { namespace, cutoff })
            .is_err()
        {
            debug!(%namespace, "Ledger writer gone, skipping durable purge");
        }
        removed
    }

    // -- Private helpers ----------------------------------------------------

    fn is_live(
        &self,
        namespace: Namespace,
        created_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> bool {
        created_at > now - self.retention(namespace)
    }

    fn persist(&self, key: DedupKey, meta: DedupMeta, created_at: OffsetDateTime) {
        let entry = DedupEntry {
            key,
            created_at,
            meta,
        };
        if let Err(e) = self.inner.ledger_tx.send(LedgerCommand::Record(entry)) {
            if let LedgerCommand::Record(entry) = e.0 {
                debug!(key = %entry.key, "Ledger writer gone, entry kept in memory only");
            }
        }
    }
}
