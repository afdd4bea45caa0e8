//! DeliveryWorkerPool processor.
//!
//! The pool is responsible for:
//! - Draining `DispatchJob`s from the dispatch queue with a fixed number of workers
//! - Resolving each job's channel target from the current target table
//! - Delivering with a time bound, once; failures are logged and dropped
//! - Confirming the HIGH_VALUE dedup mark after a delivered alert, when the
//!   mark policy defers it to delivery

use crate::config::{ChannelTargets, ConfigStore, DispatchConfig, HighValueMarkPolicy};
use crate::dedup::{DedupKey, DedupMeta, DedupStore};
use crate::delivery::{Delivery, DeliveryError};
use crate::events::{DispatchJob, DispatchReceiver};
use crate::stats::RelayStats;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

/// A fixed-size pool of delivery workers sharing one dispatch queue.
pub struct DeliveryWorkerPool {
    receiver: Arc<Mutex<DispatchReceiver>>,
    ctx: Arc<WorkerContext>,
    workers: usize,
}

struct WorkerContext {
    delivery: Arc<dyn Delivery>,
    targets: ConfigStore<ChannelTargets>,
    dedup: DedupStore,
    stats: Arc<RelayStats>,
    timeout: Duration,
    policy: HighValueMarkPolicy,
}

impl DeliveryWorkerPool {
    pub fn new(
        receiver: DispatchReceiver,
        delivery: Arc<dyn Delivery>,
        targets: ConfigStore<ChannelTargets>,
        dedup: DedupStore,
        stats: Arc<RelayStats>,
        config: &DispatchConfig,
        policy: HighValueMarkPolicy,
    ) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            ctx: Arc::new(WorkerContext {
                delivery,
                targets,
                dedup,
                stats,
                timeout: config.delivery_timeout,
                policy,
            }),
            workers: config.workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the workers until shutdown is signaled or the queue closes.
    ///
    /// After the shutdown signal each worker delivers the jobs already
    /// queued, then exits. Returns once every worker has exited.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) {
        info!(workers = self.workers, "DeliveryWorkerPool started");

        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let receiver = self.receiver.clone();
                let ctx = self.ctx.clone();
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move { ctx.worker_loop(worker, receiver, shutdown_rx).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Delivery worker task failed");
            }
        }

        info!("DeliveryWorkerPool shutdown complete");
    }
}

impl WorkerContext {
    async fn worker_loop(
        &self,
        worker: usize,
        receiver: Arc<Mutex<DispatchReceiver>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        debug!(worker, "Delivery worker started");

        loop {
            let job = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!(worker, "Delivery worker received shutdown signal");
                        break;
                    }
                    continue;
                }

                job = async { receiver.lock().await.recv().await } => job,
            };

            match job {
                Some(job) => self.handle(worker, job).await,
                None => {
                    debug!(worker, "Dispatch queue closed");
                    return;
                }
            }
        }

        // Drain what was queued before the signal.
        loop {
            let job = receiver.lock().await.try_recv();
            match job {
                Some(job) => self.handle(worker, job).await,
                None => break,
            }
        }
        debug!(worker, "Delivery worker stopped");
    }

    async fn handle(&self, worker: usize, job: DispatchJob) {
        let result = AssertUnwindSafe(self.deliver(&job)).catch_unwind().await;

        match result {
            Ok(Ok(())) => {
                self.stats.record_delivery(job.channel, true);
                if job.suppress_identifier && self.policy == HighValueMarkPolicy::OnDelivery {
                    self.dedup.mark(
                        DedupKey::high_value(job.event_id.clone()),
                        DedupMeta::new(job.channel, None),
                    );
                }
                debug!(
                    worker,
                    job_id = %job.job_id,
                    channel = %job.channel,
                    "Delivered dispatch job"
                );
            }
            Ok(Err(e)) => {
                self.stats.record_delivery(job.channel, false);
                warn!(
                    worker,
                    job_id = %job.job_id,
                    channel = %job.channel,
                    error = %e,
                    "Delivery failed, job dropped"
                );
            }
            Err(_) => {
                self.stats.record_delivery(job.channel, false);
                error!(
                    worker,
                    job_id = %job.job_id,
                    channel = %job.channel,
                    "Delivery panicked, job dropped"
                );
            }
        }
    }

    async fn deliver(&self, job: &DispatchJob) -> Result<(), DeliveryError> {
        let target = self.targets.read().await.get(job.channel).clone();
        match tokio::time::timeout(
            self.timeout,
            self.delivery.deliver(&target, &job.payload, self.timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelTarget, DedupConfig};
    use crate::events::{DispatchQueue, Payload, dispatch_queue, ledger_command_channel};
    use async_trait::async_trait;
    use hookrelay_sdk::objects::ChannelTag;
    use url::Url;

    /// Records deliveries; fails or panics for configured channels.
    #[derive(Default)]
    struct ScriptedDelivery {
        delivered: std::sync::Mutex<Vec<(ChannelTag, Url)>>,
        fail: Vec<ChannelTag>,
        panic: Vec<ChannelTag>,
        stall: Vec<ChannelTag>,
    }

    impl ScriptedDelivery {
        fn channel_of(target: &ChannelTarget) -> ChannelTag {
            target
                .url
                .path()
                .trim_start_matches('/')
                .parse()
                .unwrap()
        }

        fn delivered(&self) -> Vec<ChannelTag> {
            self.delivered.lock().unwrap().iter().map(|(c, _)| *c).collect()
        }
    }

    #[async_trait]
    impl Delivery for ScriptedDelivery {
        async fn deliver(
            &self,
            target: &ChannelTarget,
            _payload: &Payload,
            _timeout: Duration,
        ) -> Result<(), DeliveryError> {
            let channel = Self::channel_of(target);
            if self.panic.contains(&channel) {
                panic!("scripted panic");
            }
            if self.stall.contains(&channel) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail.contains(&channel) {
                return Err(DeliveryError::Rejected {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.delivered
                .lock()
                .unwrap()
                .push((channel, target.url.clone()));
            Ok(())
        }
    }

    fn targets() -> ConfigStore<ChannelTargets> {
        let table = ChannelTargets::from_entries(ChannelTag::ALL.map(|tag| {
            let url = Url::parse(&format!("https://hooks.example.com/{}", tag.as_str())).unwrap();
            (tag, ChannelTarget::new(url))
        }))
        .unwrap();
        ConfigStore::new(table)
    }

    struct Harness {
        pool: DeliveryWorkerPool,
        queue: DispatchQueue,
        dedup: DedupStore,
        stats: Arc<RelayStats>,
    }

    fn harness(
        delivery: Arc<ScriptedDelivery>,
        workers: usize,
        policy: HighValueMarkPolicy,
    ) -> Harness {
        let (ledger_tx, _ledger_rx) = ledger_command_channel();
        let dedup = DedupStore::new(&DedupConfig::default(), ledger_tx);
        let (queue, rx) = dispatch_queue();
        let stats = Arc::new(RelayStats::new());
        let pool = DeliveryWorkerPool::new(
            rx,
            delivery,
            targets(),
            dedup.clone(),
            stats.clone(),
            &DispatchConfig {
                workers,
                delivery_timeout: Duration::from_secs(5),
            },
            policy,
        );
        Harness {
            pool,
            queue,
            dedup,
            stats,
        }
    }

    fn job(channel: ChannelTag, event_id: &str) -> DispatchJob {
        DispatchJob::new(channel, event_id.into(), Payload::new(serde_json::json!({})))
    }

    /// Queue `jobs`, close the queue and run the pool to completion.
    async fn run_all(h: Harness, jobs: Vec<DispatchJob>) -> (DedupStore, Arc<RelayStats>) {
        for job in jobs {
            h.queue.enqueue(job).unwrap();
        }
        drop(h.queue);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        h.pool.run(shutdown_rx).await;
        (h.dedup, h.stats)
    }

    #[tokio::test]
    async fn test_delivers_to_resolved_targets() {
        let delivery = Arc::new(ScriptedDelivery::default());
        let h = harness(delivery.clone(), 2, HighValueMarkPolicy::OnDelivery);
        let (dedup, stats) = run_all(
            h,
            vec![
                job(ChannelTag::UltraHigh, "A1"),
                job(ChannelTag::HighValueAlert, "A1"),
            ],
        )
        .await;

        let mut delivered = delivery.delivered();
        delivered.sort();
        assert_eq!(delivered, vec![ChannelTag::UltraHigh, ChannelTag::HighValueAlert]);
        assert_eq!(stats.delivered(ChannelTag::UltraHigh), 1);
        assert!(dedup.seen(&DedupKey::high_value("A1")));
    }

    #[tokio::test]
    async fn test_failed_alert_is_not_marked() {
        let delivery = Arc::new(ScriptedDelivery {
            fail: vec![ChannelTag::HighValueAlert],
            ..Default::default()
        });
        let h = harness(delivery.clone(), 1, HighValueMarkPolicy::OnDelivery);
        let (dedup, stats) = run_all(h, vec![job(ChannelTag::HighValueAlert, "A1")]).await;

        assert!(!dedup.seen(&DedupKey::high_value("A1")));
        assert_eq!(stats.failed(ChannelTag::HighValueAlert), 1);
        assert!(delivery.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_on_enqueue_policy_does_not_mark_in_worker() {
        let delivery = Arc::new(ScriptedDelivery::default());
        let h = harness(delivery, 1, HighValueMarkPolicy::OnEnqueue);
        let (dedup, _) = run_all(h, vec![job(ChannelTag::HighValueAlert, "A1")]).await;
        assert!(dedup.is_empty());
    }

    #[tokio::test]
    async fn test_panic_does_not_kill_worker() {
        let delivery = Arc::new(ScriptedDelivery {
            panic: vec![ChannelTag::Special],
            ..Default::default()
        });
        let h = harness(delivery.clone(), 1, HighValueMarkPolicy::OnDelivery);
        let (_, stats) = run_all(
            h,
            vec![job(ChannelTag::Special, "A1"), job(ChannelTag::Normal, "B2")],
        )
        .await;

        assert_eq!(delivery.delivered(), vec![ChannelTag::Normal]);
        assert_eq!(stats.failed(ChannelTag::Special), 1);
        assert_eq!(stats.delivered(ChannelTag::Normal), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_delivery_times_out() {
        let delivery = Arc::new(ScriptedDelivery {
            stall: vec![ChannelTag::Normal],
            ..Default::default()
        });
        let h = harness(delivery.clone(), 1, HighValueMarkPolicy::OnDelivery);
        let (_, stats) = run_all(
            h,
            vec![job(ChannelTag::Normal, "A1"), job(ChannelTag::Special, "B2")],
        )
        .await;

        assert_eq!(stats.failed(ChannelTag::Normal), 1);
        assert_eq!(delivery.delivered(), vec![ChannelTag::Special]);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs() {
        let delivery = Arc::new(ScriptedDelivery::default());
        let h = harness(delivery.clone(), 2, HighValueMarkPolicy::OnDelivery);
        for id in ["A1", "B2", "C3"] {
            h.queue.enqueue(job(ChannelTag::Normal, id)).unwrap();
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        // The queue is still open; the signal alone must end the run.
        h.pool.run(shutdown_rx).await;
        assert_eq!(delivery.delivered().len(), 3);
        assert_eq!(h.queue.depth(), 0);
    }
}
