//! TOML file configuration structures.
//!
//! These structs directly map to the `hookrelay.toml` file format. Durations
//! are written in whole seconds.

use hookrelay_core::config::{
    ChannelTableError, ChannelTarget, ChannelTargets, ClassifierConfig, DedupConfig,
    DispatchConfig, HighValueMarkPolicy,
};
use hookrelay_sdk::objects::ChannelTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dedup: DedupSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    /// One webhook per channel, keyed by channel tag.
    pub channels: BTreeMap<ChannelTag, ChannelSection>,
}

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:5000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSection {
    pub primary_retention_secs: u64,
    pub high_value_retention_secs: u64,
    pub soft_cap: usize,
    pub trim_target: usize,
    pub sweep_interval_secs: u64,
    pub high_value_mark: HighValueMarkPolicy,
}

impl Default for DedupSection {
    fn default() -> Self {
        let d = DedupConfig::default();
        Self {
            primary_retention_secs: d.primary_retention.as_secs(),
            high_value_retention_secs: d.high_value_retention.as_secs(),
            soft_cap: d.soft_cap,
            trim_target: d.trim_target,
            sweep_interval_secs: d.sweep_interval.as_secs(),
            high_value_mark: d.high_value_mark,
        }
    }
}

impl From<&DedupSection> for DedupConfig {
    fn from(s: &DedupSection) -> Self {
        Self {
            primary_retention: Duration::from_secs(s.primary_retention_secs),
            high_value_retention: Duration::from_secs(s.high_value_retention_secs),
            soft_cap: s.soft_cap,
            trim_target: s.trim_target,
            sweep_interval: Duration::from_secs(s.sweep_interval_secs),
            high_value_mark: s.high_value_mark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    pub workers: usize,
    pub delivery_timeout_secs: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        let d = DispatchConfig::default();
        Self {
            workers: d.workers,
            delivery_timeout_secs: d.delivery_timeout.as_secs(),
        }
    }
}

impl From<&DispatchSection> for DispatchConfig {
    fn from(s: &DispatchSection) -> Self {
        Self {
            workers: s.workers,
            delivery_timeout: Duration::from_secs(s.delivery_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub high_value_threshold: f64,
    pub population_ceiling: u32,
    pub ultra_categories: Vec<String>,
    pub special_categories: Vec<String>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        let d = ClassifierConfig::default();
        Self {
            high_value_threshold: d.high_value_threshold,
            population_ceiling: d.population_ceiling,
            ultra_categories: d.ultra_categories,
            special_categories: d.special_categories,
        }
    }
}

impl From<&ClassifierSection> for ClassifierConfig {
    fn from(s: &ClassifierSection) -> Self {
        Self {
            high_value_threshold: s.high_value_threshold,
            population_ceiling: s.population_ceiling,
            ultra_categories: s.ultra_categories.clone(),
            special_categories: s.special_categories.clone(),
        }
    }
}

/// Webhook target of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSection {
    pub url: Url,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl FileConfig {
    /// Build the channel target table. Fails if a channel has no target.
    pub fn channel_targets(&self) -> Result<ChannelTargets, ChannelTableError> {
        ChannelTargets::from_entries(self.channels.iter().map(|(tag, section)| {
            (
                *tag,
                ChannelTarget {
                    url: section.url.clone(),
                    username: section.username.clone(),
                    avatar_url: section.avatar_url.clone(),
                },
            )
        }))
    }
}
