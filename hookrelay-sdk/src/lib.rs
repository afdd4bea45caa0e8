#![forbid(unsafe_code)]

//! Wire types for the hookrelay notification relay.

pub mod objects;
