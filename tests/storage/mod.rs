//! Shared storage integration tests.
//!
//! Tests the BitStore and LedgerStore interfaces against all implementations.
//! Each implementation module imports these test functions and runs them.

#![allow(dead_code, unused_macros)]

pub mod bit_store_tests;
pub mod ledger_store_tests;
