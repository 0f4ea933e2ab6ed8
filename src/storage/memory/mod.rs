//! In-process storage implementations.
//!
//! Used by the standalone profile and by tests. Each store exposes
//! failure toggles so compensation paths can be driven deterministically.

mod bit_store;
mod ledger_store;

pub use bit_store::MemoryBitStore;
pub use ledger_store::MemoryLedgerStore;
