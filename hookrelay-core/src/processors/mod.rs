//! Long-running pieces of the relay pipeline.
//!
//! - `IngestionGate`: receives `EventReport`, emits `DispatchJob`
//! - `DeliveryWorkerPool`: receives `DispatchJob`, calls the delivery
//! - `LedgerWriter`: receives `LedgerCommand`, writes the durable ledger
//! - `RetentionSweeper`: periodic eviction and trimming of the dedup index

pub mod delivery_worker;
pub mod ingestion_gate;
pub mod ledger_writer;
pub mod retention_sweeper;

pub use delivery_worker::DeliveryWorkerPool;
pub use ingestion_gate::{IngestOutcome, IngestionGate};
pub use ledger_writer::LedgerWriter;
pub use retention_sweeper::{RetentionSweeper, SweepReport};
