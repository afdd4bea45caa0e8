//! RetentionSweeper processor.
//!
//! The RetentionSweeper is responsible for:
//! - Retrying rehydration of the dedup index while it has not succeeded
//! - Evicting expired entries per namespace, in memory and in the ledger
//! - Trimming the in-memory index back under its soft cap
//!
//! A sweep is idempotent; running it twice in a row changes nothing the
//! second time.

use crate::config::DedupConfig;
use crate::dedup::{DedupLedger, DedupStore, Namespace};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries loaded by a rehydration retry, if one ran and succeeded.
    pub rehydrated: Option<usize>,
    /// Entries removed by trimming.
    pub trimmed: usize,
    /// Expired entries removed from the index.
    pub expired: usize,
}

pub struct RetentionSweeper {
    dedup: DedupStore,
    ledger: Arc<dyn DedupLedger>,
    config: DedupConfig,
}

impl RetentionSweeper {
    pub fn new(dedup: DedupStore, ledger: Arc<dyn DedupLedger>, config: DedupConfig) -> Self {
        Self {
            dedup,
            ledger,
            config,
        }
    }

    /// Sweep every `sweep_interval` until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            "RetentionSweeper started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("RetentionSweeper received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.config.sweep_interval) => {
                    let report = self.sweep_once().await;
                    debug!(?report, remaining = self.dedup.len(), "Sweep finished");
                }
            }
        }

        info!("RetentionSweeper shutdown complete");
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        if !self.dedup.is_rehydrated() {
            match self.dedup.rehydrate(self.ledger.as_ref()).await {
                Ok(loaded) => report.rehydrated = Some(loaded),
                Err(e) => warn!(error = %e, "Dedup rehydration retry failed"),
            }
        }

        // Expired entries must not count toward the soft cap.
        for namespace in Namespace::ALL {
            report.expired += self
                .dedup
                .evict_older_than(namespace, self.config.retention(namespace));
        }

        report.trimmed = self
            .dedup
            .trim(self.config.soft_cap, self.config.trim_target);
        if report.trimmed > 0 {
            info!(
                trimmed = report.trimmed,
                soft_cap = self.config.soft_cap,
                "Dedup index over soft cap, trimmed oldest entries"
            );
        }

        report
    }
}
