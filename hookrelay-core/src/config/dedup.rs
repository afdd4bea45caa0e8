//! Dedup store and retention sweeper configuration.

use crate::dedup::Namespace;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When the HIGH_VALUE dedup key is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighValueMarkPolicy {
    /// Claim the key when the alert job is queued. A failed delivery means
    /// the alert is lost for the rest of the window.
    OnEnqueue,
    /// Claim the key only after the alert was delivered. Reports arriving
    /// while the first alert is in flight may queue another one.
    #[default]
    OnDelivery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    /// How long a PRIMARY key suppresses repeats.
    pub primary_retention: Duration,
    /// How long a HIGH_VALUE key suppresses repeat alerts.
    pub high_value_retention: Duration,
    /// Index size that triggers a trim.
    pub soft_cap: usize,
    /// Index size a trim shrinks to.
    pub trim_target: usize,
    /// Time between sweeps.
    pub sweep_interval: Duration,
    pub high_value_mark: HighValueMarkPolicy,
}

impl DedupConfig {
    /// Retention window for a namespace.
    pub fn retention(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Primary => self.primary_retention,
            Namespace::HighValue => self.high_value_retention,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            primary_retention: Duration::from_secs(6 * 60 * 60),
            high_value_retention: Duration::from_secs(6 * 60 * 60),
            soft_cap: 1000,
            trim_target: 800,
            sweep_interval: Duration::from_secs(300),
            high_value_mark: HighValueMarkPolicy::OnDelivery,
        }
    }
}
