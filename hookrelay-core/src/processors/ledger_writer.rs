//! LedgerWriter processor.
//!
//! Applies `LedgerCommand`s from the dedup store to the durable ledger, one
//! at a time. Failures are logged and skipped; the in-memory index has
//! already moved on and stays authoritative.

use crate::dedup::{DedupLedger, LedgerCommand, LedgerError};
use crate::events::LedgerCommandReceiver;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct LedgerWriter {
    ledger: Arc<dyn DedupLedger>,
    command_rx: LedgerCommandReceiver,
}

impl LedgerWriter {
    pub fn new(ledger: Arc<dyn DedupLedger>, command_rx: LedgerCommandReceiver) -> Self {
        Self { ledger, command_rx }
    }

    /// Run until shutdown is signaled or every sender is gone, then apply
    /// whatever is still buffered.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("LedgerWriter started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("LedgerWriter received shutdown signal");
                        break;
                    }
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.apply(command).await,
                    None => {
                        info!("Ledger command channel closed");
                        break;
                    }
                },
            }
        }

        let mut flushed = 0usize;
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply(command).await;
            flushed += 1;
        }
        info!(flushed, "LedgerWriter shutdown complete");
    }

    async fn apply(&self, command: LedgerCommand) {
        if let Err(e) = self.try_apply(&command).await {
            match command {
                LedgerCommand::Record(entry) => {
                    warn!(key = %entry.key, error = %e, "Failed to persist dedup entry");
                }
                LedgerCommand::Evict { namespace, .. } => {
                    warn!(%namespace, error = %e, "Failed to purge expired dedup entries");
                }
            }
        }
    }

    async fn try_apply(&self, command: &LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::Record(entry) => self.ledger.record(entry).await,
            LedgerCommand::Evict { namespace, cutoff } => {
                let deleted = self.ledger.evict_older_than(*namespace, *cutoff).await?;
                debug!(%namespace, deleted, "Purged expired dedup entries");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{DedupEntry, DedupKey, DedupMeta, MemoryLedger, Namespace};
    use crate::events::ledger_command_channel;
    use async_trait::async_trait;
    use time::OffsetDateTime;

    fn record(id: &str, created_at: OffsetDateTime) -> LedgerCommand {
        LedgerCommand::Record(DedupEntry {
            key: DedupKey::primary(id),
            created_at,
            meta: DedupMeta::default(),
        })
    }

    #[tokio::test]
    async fn test_applies_commands_in_order_and_flushes_on_shutdown() {
        let ledger = Arc::new(MemoryLedger::new());
        let (tx, rx) = ledger_command_channel();
        let now = OffsetDateTime::now_utc();

        tx.send(record("old", now - time::Duration::hours(8))).unwrap();
        tx.send(record("new", now)).unwrap();
        tx.send(LedgerCommand::Evict {
            namespace: Namespace::Primary,
            cutoff: now - time::Duration::hours(6),
        })
        .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        LedgerWriter::new(ledger.clone(), rx).run(shutdown_rx).await;

        assert_eq!(ledger.len().await, 1);
        assert!(ledger.get(&DedupKey::primary("new")).await.is_some());
    }

    struct DownLedger;

    #[async_trait]
    impl DedupLedger for DownLedger {
        async fn record(&self, _entry: &DedupEntry) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("down".into()))
        }

        async fn load_since(
            &self,
            _namespace: Namespace,
            _cutoff: OffsetDateTime,
        ) -> Result<Vec<DedupEntry>, LedgerError> {
            Err(LedgerError::Unavailable("down".into()))
        }

        async fn evict_older_than(
            &self,
            _namespace: Namespace,
            _cutoff: OffsetDateTime,
        ) -> Result<u64, LedgerError> {
            Err(LedgerError::Unavailable("down".into()))
        }

        async fn recent(
            &self,
            _namespace: Namespace,
            _limit: usize,
        ) -> Result<Vec<DedupEntry>, LedgerError> {
            Err(LedgerError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_writer() {
        let (tx, rx) = ledger_command_channel();
        tx.send(record("a", OffsetDateTime::now_utc())).unwrap();
        tx.send(LedgerCommand::Evict {
            namespace: Namespace::HighValue,
            cutoff: OffsetDateTime::now_utc(),
        })
        .unwrap();
        drop(tx);

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        // Returns once the channel is closed and drained.
        LedgerWriter::new(Arc::new(DownLedger), rx).run(shutdown_rx).await;
    }
}
