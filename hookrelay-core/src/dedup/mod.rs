//! Time-windowed dedup state.

mod key;
mod ledger;
mod store;

pub use key::{DedupEntry, DedupKey, DedupMeta, Namespace};
pub use ledger::{DedupLedger, LedgerCommand, LedgerError, MemoryLedger, PgLedger};
pub use store::DedupStore;
