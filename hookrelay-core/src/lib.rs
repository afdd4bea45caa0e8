#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod delivery;
pub mod entities;
pub mod events;
pub mod formatter;
pub mod framework;
pub mod processors;
pub mod stats;
