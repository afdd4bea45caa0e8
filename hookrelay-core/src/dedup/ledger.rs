//! Durable dedup ledger.
//!
//! The ledger lets a restarted relay remember what it already dispatched and
//! backs the recent-events listing. It is best effort: nothing on the
//! ingestion path waits for it, and its failures never change what the
//! in-memory index says.

use super::key::{DedupEntry, DedupKey, Namespace};
use crate::entities::dedup_entries::{
    DeleteExpiredDedupEntries, ListLiveDedupEntries, ListRecentDedupEntries, UpsertDedupEntry,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// Errors raised by a ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend cannot be reached
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Work handed from the dedup store to the ledger writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    /// Insert or overwrite the entry for its key.
    Record(DedupEntry),
    /// Delete entries of `namespace` created at or before `cutoff`.
    Evict {
        namespace: Namespace,
        cutoff: OffsetDateTime,
    },
}

/// Storage backend for dedup entries.
///
/// Writes are keyed and idempotent, so concurrent writers are fine.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Upsert an entry.
    async fn record(&self, entry: &DedupEntry) -> Result<(), LedgerError>;

    /// Entries of `namespace` created after `cutoff`.
    async fn load_since(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<DedupEntry>, LedgerError>;

    /// Delete entries of `namespace` created at or before `cutoff`.
    /// Returns the number of deleted entries.
    async fn evict_older_than(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<u64, LedgerError>;

    /// The newest `limit` entries of `namespace`, newest first.
    async fn recent(
        &self,
        namespace: Namespace,
        limit: usize,
    ) -> Result<Vec<DedupEntry>, LedgerError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Ledger stored in the `dedup_entries` table.
pub struct PgLedger {
    db: DatabaseProcessor,
}

impl PgLedger {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DedupLedger for PgLedger {
    async fn record(&self, entry: &DedupEntry) -> Result<(), LedgerError> {
        self.db
            .process(UpsertDedupEntry {
                entry: entry.clone(),
            })
            .await?;
        Ok(())
    }

    async fn load_since(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<DedupEntry>, LedgerError> {
        let rows = self
            .db
            .process(ListLiveDedupEntries { namespace, cutoff })
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.into_entry()).collect())
    }

    async fn evict_older_than(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<u64, LedgerError> {
        Ok(self
            .db
            .process(DeleteExpiredDedupEntries { namespace, cutoff })
            .await?)
    }

    async fn recent(
        &self,
        namespace: Namespace,
        limit: usize,
    ) -> Result<Vec<DedupEntry>, LedgerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .db
            .process(ListRecentDedupEntries { namespace, limit })
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.into_entry()).collect())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local ledger. Used for `--ephemeral` runs, where a restart starts
/// with an empty dedup state, and in tests.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<DedupKey, DedupEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn get(&self, key: &DedupKey) -> Option<DedupEntry> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl DedupLedger for MemoryLedger {
    async fn record(&self, entry: &DedupEntry) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .await
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn load_since(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<DedupEntry>, LedgerError> {
        Ok(self
            .entries
            .lock()
            .await
            .values()
            .filter(|e| e.key.namespace == namespace && e.created_at > cutoff)
            .cloned()
            .collect())
    }

    async fn evict_older_than(
        &self,
        namespace: Namespace,
        cutoff: OffsetDateTime,
    ) -> Result<u64, LedgerError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, e| key.namespace != namespace || e.created_at > cutoff);
        Ok((before - entries.len()) as u64)
    }

    async fn recent(
        &self,
        namespace: Namespace,
        limit: usize,
    ) -> Result<Vec<DedupEntry>, LedgerError> {
        let mut matching: Vec<DedupEntry> = self
            .entries
            .lock()
            .await
            .values()
            .filter(|e| e.key.namespace == namespace)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}
