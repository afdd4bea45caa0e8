//! Application state shared across all request handlers.

use hookrelay_core::config::{ChannelTargets, ClassifierConfig, ConfigStore};
use hookrelay_core::dedup::{DedupLedger, DedupStore};
use hookrelay_core::events::DispatchQueue;
use hookrelay_core::processors::IngestionGate;
use hookrelay_core::stats::RelayStats;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub gate: IngestionGate,
    pub dedup: DedupStore,
    /// Producer handle, used for the queue depth.
    pub queue: DispatchQueue,
    /// Backs the recent listing.
    pub ledger: Arc<dyn DedupLedger>,
    pub stats: Arc<RelayStats>,
    /// Classifier rules (can be reloaded via SIGHUP).
    pub classifier: ConfigStore<ClassifierConfig>,
    /// Channel target table (can be reloaded via SIGHUP).
    pub channels: ConfigStore<ChannelTargets>,
    pub workers: usize,
}
