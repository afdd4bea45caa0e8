//! IngestionGate processor.
//!
//! The IngestionGate is responsible for:
//! - Validating incoming `EventReport`s
//! - Rejecting repeats through the `DedupStore`
//! - Classifying new events and queueing one `DispatchJob` per channel
//!
//! It never waits on delivery or on the ledger.

use crate::classifier::classify;
use crate::config::{ClassifierConfig, ConfigStore, HighValueMarkPolicy};
use crate::dedup::{DedupKey, DedupMeta, DedupStore};
use crate::events::{DispatchJob, DispatchQueue, EventRecord, QueueClosed};
use crate::formatter::PayloadFormatter;
use crate::stats::RelayStats;
use compact_str::CompactString;
use hookrelay_sdk::objects::{ChannelTag, EventReport, IngestStatus};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Result of one ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    /// Trimmed identifier, when the report had one.
    pub event_id: Option<CompactString>,
    /// Primary channel, for accepted events.
    pub channel: Option<ChannelTag>,
    /// Jobs queued by this call.
    pub dispatched: usize,
    pub elapsed: Duration,
}

/// Entry point of the relay pipeline.
///
/// Cloning the gate clones a handle to the same shared state.
#[derive(Clone)]
pub struct IngestionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    dedup: DedupStore,
    queue: DispatchQueue,
    formatter: Arc<dyn PayloadFormatter>,
    rules: ConfigStore<ClassifierConfig>,
    policy: HighValueMarkPolicy,
    stats: Arc<RelayStats>,
}

impl IngestionGate {
    pub fn new(
        dedup: DedupStore,
        queue: DispatchQueue,
        formatter: Arc<dyn PayloadFormatter>,
        rules: ConfigStore<ClassifierConfig>,
        policy: HighValueMarkPolicy,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                dedup,
                queue,
                formatter,
                rules,
                policy,
                stats,
            }),
        }
    }

    /// Validate, deduplicate, classify and queue a report.
    pub async fn ingest(&self, report: EventReport) -> IngestOutcome {
        let started = Instant::now();
        let mut outcome = self.admit(report).await;
        outcome.elapsed = started.elapsed();
        self.inner.stats.record_ingest(outcome.status);
        outcome
    }

    async fn admit(&self, report: EventReport) -> IngestOutcome {
        let inner = &self.inner;

        let record = match EventRecord::try_from(report) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "Rejected report");
                return IngestOutcome::bare(IngestStatus::Rejected, None);
            }
        };
        let event_id = record.id.clone();

        let primary_key = DedupKey::primary(event_id.clone());
        if inner.dedup.seen(&primary_key) {
            debug!(event_id = %event_id, "Duplicate event");
            return IngestOutcome::bare(IngestStatus::Duplicate, Some(event_id));
        }

        // Classification and formatting share one read of the rules; the
        // guard is dropped before anything else happens.
        let (channels, primary_payload, alert_payload) = {
            let rules = inner.rules.read().await;
            let channels = classify(&record, &rules);
            let primary_payload = inner.formatter.format(&record, channels.primary(), &rules);
            let alert_payload = channels
                .is_high_value()
                .then(|| inner.formatter.format(&record, ChannelTag::HighValueAlert, &rules));
            (channels, primary_payload, alert_payload)
        };
        let primary = channels.primary();

        let meta = DedupMeta::new(primary, record.category.clone());
        if !inner.dedup.try_mark(primary_key, meta) {
            debug!(event_id = %event_id, "Lost claim race, duplicate event");
            return IngestOutcome::bare(IngestStatus::Duplicate, Some(event_id));
        }

        let mut dispatched = 0;
        if self.enqueue(DispatchJob::new(primary, event_id.clone(), primary_payload)) {
            dispatched += 1;
        }

        if let Some(alert_payload) = alert_payload {
            let alert_key = DedupKey::high_value(event_id.clone());
            let alert_meta = DedupMeta::new(ChannelTag::HighValueAlert, record.category.clone());
            let send_alert = match inner.policy {
                HighValueMarkPolicy::OnEnqueue => inner.dedup.try_mark(alert_key, alert_meta),
                HighValueMarkPolicy::OnDelivery => !inner.dedup.seen(&alert_key),
            };
            if send_alert {
                let job =
                    DispatchJob::new(ChannelTag::HighValueAlert, event_id.clone(), alert_payload);
                if self.enqueue(job) {
                    dispatched += 1;
                }
            } else {
                debug!(event_id = %event_id, "High value alert already sent");
            }
        }

        info!(
            event_id = %event_id,
            channel = %primary,
            high_value = channels.is_high_value(),
            dispatched,
            "Accepted event"
        );

        IngestOutcome {
            status: IngestStatus::Accepted,
            event_id: Some(event_id),
            channel: Some(primary),
            dispatched,
            elapsed: Duration::ZERO,
        }
    }

    fn enqueue(&self, job: DispatchJob) -> bool {
        let job_id = job.job_id;
        match self.inner.queue.enqueue(job) {
            Ok(()) => {
                debug!(job_id = %job_id, "Queued dispatch job");
                true
            }
            Err(QueueClosed(job)) => {
                error!(
                    job_id = %job_id,
                    event_id = %job.event_id,
                    channel = %job.channel,
                    "Dispatch queue closed, job dropped"
                );
                false
            }
        }
    }
}

impl IngestOutcome {
    fn bare(status: IngestStatus, event_id: Option<CompactString>) -> Self {
        Self {
            status,
            event_id,
            channel: None,
            dispatched: 0,
            elapsed: Duration::ZERO,
        }
    }
}

impl Processor<EventReport> for IngestionGate {
    type Output = IngestOutcome;
    type Error = Infallible;
    async fn process(&self, report: EventReport) -> Result<IngestOutcome, Infallible> {
        Ok(self.ingest(report).await)
    }
}
