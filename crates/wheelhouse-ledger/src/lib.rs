//! # wheelhouse-ledger
//!
//! Coordination state shared by every agent:
//! - `LedgerStore`: a keyed store with atomic create-if-absent, backed by a
//!   directory (`FsLedgerStore`) or memory (`MemoryLedgerStore`)
//! - `ClaimManager`: per-package leases
//! - `PendingQueue`: packages waiting for their first build
//! - `GarbageCollector`: reclaims leases held past their TTL

pub mod claims;
pub mod error;
pub mod gc;
pub mod queue;
pub mod store;

pub use claims::{ClaimManager, ClaimOutcome, LeaseRecord, ReleaseOutcome};
pub use error::{LedgerError, Result};
pub use gc::{CatalogLookup, GarbageCollector, SweepReport};
pub use queue::PendingQueue;
pub use store::{
    ConditionalDelete, CreateOutcome, DeleteOutcome, FsLedgerStore, LedgerStore, MemoryLedgerStore,
};
