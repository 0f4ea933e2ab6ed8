//! Redis storage implementations.

mod bit_store;

pub use bit_store::RedisBitStore;
