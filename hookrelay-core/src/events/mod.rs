//! Pipeline records and the queues that carry them.
//!
//! # Flow
//!
//! 1. `IngestionGate` turns an `EventReport` into an `EventRecord`
//! 2. The gate pushes one `DispatchJob` per channel into the `DispatchQueue`
//! 3. `DeliveryWorkerPool` drains the queue
//! 4. `DedupStore` pushes `LedgerCommand`s to the `LedgerWriter`

pub mod channels;
pub mod types;

pub use channels::{
    DispatchQueue, DispatchReceiver, LedgerCommandReceiver, LedgerCommandSender, QueueClosed,
    dispatch_queue, ledger_command_channel,
};

pub use types::{
    DispatchJob, EventRecord, Payload, ScoredEntity, ValidationError, suppresses_identifier,
};
