//! Runtime configuration types for the relay.
//!
//! These are the validated forms of the sections in the TOML file. Parsing
//! and validation live in the server crate.

mod channels;
mod classifier;
mod config_store;
mod dedup;
mod dispatch;

pub use channels::{ChannelTableError, ChannelTarget, ChannelTargets};
pub use classifier::ClassifierConfig;
pub use config_store::ConfigStore;
pub use dedup::{DedupConfig, HighValueMarkPolicy};
pub use dispatch::DispatchConfig;
