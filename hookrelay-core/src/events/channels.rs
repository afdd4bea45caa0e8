//! Channel factories and handles for the relay pipeline.
//!
//! Both queues are unbounded: the ingestion path must never wait on delivery
//! or on the ledger.

use super::types::DispatchJob;
use crate::dedup::LedgerCommand;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// Sender handle for ledger commands.
pub type LedgerCommandSender = mpsc::UnboundedSender<LedgerCommand>;
/// Receiver handle for ledger commands.
pub type LedgerCommandReceiver = mpsc::UnboundedReceiver<LedgerCommand>;

/// Create the channel feeding the ledger writer.
pub fn ledger_command_channel() -> (LedgerCommandSender, LedgerCommandReceiver) {
    mpsc::unbounded_channel()
}

/// Returned by [`DispatchQueue::enqueue`] once the workers are gone.
#[derive(Debug, Error)]
#[error("dispatch queue closed")]
pub struct QueueClosed(pub DispatchJob);

/// Producer side of the dispatch queue. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<DispatchJob>,
    depth: Arc<AtomicUsize>,
}

/// Consumer side of the dispatch queue, shared by the delivery workers.
pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<DispatchJob>,
    depth: Arc<AtomicUsize>,
}

/// Create a new dispatch queue.
pub fn dispatch_queue() -> (DispatchQueue, DispatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        DispatchQueue {
            tx,
            depth: depth.clone(),
        },
        DispatchReceiver { rx, depth },
    )
}

impl DispatchQueue {
    /// Queue a job. Never blocks.
    pub fn enqueue(&self, job: DispatchJob) -> Result<(), QueueClosed> {
        // Count before sending so a fast consumer never decrements first.
        self.depth.fetch_add(1, Ordering::AcqRel);
        self.tx.send(job).map_err(|e| {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            QueueClosed(e.0)
        })
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

impl DispatchReceiver {
    /// Wait for the next job. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<DispatchJob> {
        let job = self.rx.recv().await;
        if job.is_some() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
        }
        job
    }

    /// Take a job without waiting.
    pub fn try_recv(&mut self) -> Option<DispatchJob> {
        let job = self.rx.try_recv().ok();
        if job.is_some() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
        }
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Payload;
    use hookrelay_sdk::objects::ChannelTag;

    fn job(id: &str) -> DispatchJob {
        DispatchJob::new(
            ChannelTag::Normal,
            id.into(),
            Payload::new(serde_json::Value::Null),
        )
    }

    #[tokio::test]
    async fn test_enqueue_never_blocks_and_tracks_depth() {
        let (queue, mut receiver) = dispatch_queue();
        for i in 0..10_000 {
            queue.enqueue(job(&i.to_string())).unwrap();
        }
        assert_eq!(queue.depth(), 10_000);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event_id, "0");
        assert_eq!(queue.depth(), 9_999);

        while receiver.try_recv().is_some() {}
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped() {
        let (queue, receiver) = dispatch_queue();
        drop(receiver);
        let err = queue.enqueue(job("A1")).unwrap_err();
        assert_eq!(err.0.event_id, "A1");
        assert_eq!(queue.depth(), 0);
    }
}
