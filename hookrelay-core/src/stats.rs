//! Process-wide relay counters.

use hookrelay_sdk::objects::{ChannelCounters, ChannelTag, IngestStatus};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RelayStats {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    delivered: [AtomicU64; 4],
    failed: [AtomicU64; 4],
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingest(&self, status: IngestStatus) {
        let counter = match status {
            IngestStatus::Accepted => &self.accepted,
            IngestStatus::Duplicate => &self.duplicates,
            IngestStatus::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, channel: ChannelTag, ok: bool) {
        let counters = if ok { &self.delivered } else { &self.failed };
        counters[channel.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn delivered(&self, channel: ChannelTag) -> u64 {
        self.delivered[channel.index()].load(Ordering::Relaxed)
    }

    pub fn failed(&self, channel: ChannelTag) -> u64 {
        self.failed[channel.index()].load(Ordering::Relaxed)
    }

    pub fn channel_counters(&self) -> Vec<ChannelCounters> {
        ChannelTag::ALL
            .into_iter()
            .map(|channel| ChannelCounters {
                channel,
                delivered: self.delivered(channel),
                failed: self.failed(channel),
            })
            .collect()
    }
}
