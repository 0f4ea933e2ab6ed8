//! In-memory storage integration tests.
//!
//! Run with: cargo test --test storage_memory
//!
//! Runs the shared contract suites against the in-process stores, the
//! reference the other backends must agree with.

mod storage;

use sunflower_checkin::storage::{MemoryBitStore, MemoryLedgerStore};

#[tokio::test]
async fn test_memory_bit_store() {
    println!("=== Memory BitStore Tests ===");

    let store = MemoryBitStore::new();
    run_bit_store_tests!(&store, "test_memory");

    println!("=== All Memory BitStore tests PASSED ===");
}

#[tokio::test]
async fn test_memory_ledger_store() {
    println!("=== Memory LedgerStore Tests ===");

    let store = MemoryLedgerStore::new();
    run_ledger_store_tests!(&store);

    println!("=== All Memory LedgerStore tests PASSED ===");
}
