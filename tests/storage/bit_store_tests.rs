//! BitStore interface tests.
//!
//! Every key is namespaced by `prefix` so runs against a shared server do
//! not collide.

use sunflower_checkin::interfaces::{BitStore, StorageError};

// =============================================================================
// set_bit / get_bit
// =============================================================================

pub async fn test_set_returns_previous<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:set_previous", prefix);

    assert!(!store.set_bit(&key, 9).await.expect("set should succeed"));
    assert!(store.set_bit(&key, 9).await.expect("set should succeed"));
    assert!(store.get_bit(&key, 9).await.unwrap());
    assert!(!store.get_bit(&key, 8).await.unwrap());
}

pub async fn test_missing_key_reads_zero<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:missing", prefix);

    assert!(!store.get_bit(&key, 100).await.unwrap());
    assert_eq!(store.get_bit_range(&key, 31, 0).await.unwrap(), 0);
}

// =============================================================================
// clear_bit
// =============================================================================

pub async fn test_clear_bit<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:clear", prefix);

    store.set_bit(&key, 3).await.unwrap();
    store.set_bit(&key, 4).await.unwrap();
    store.clear_bit(&key, 3).await.expect("clear should succeed");

    assert!(!store.get_bit(&key, 3).await.unwrap());
    assert!(store.get_bit(&key, 4).await.unwrap());

    // clearing an absent bit is a no-op
    store.clear_bit(&format!("{}:clear_absent", prefix), 7).await.unwrap();
}

// =============================================================================
// get_bit_range
// =============================================================================

pub async fn test_range_is_msb_first<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:range_msb", prefix);

    // days 1, 2, 3, 5, 6, 7 of a 7-day window starting at offset 31
    for day in [1u32, 2, 3, 5, 6, 7] {
        store.set_bit(&key, 31 + day - 1).await.unwrap();
    }

    assert_eq!(store.get_bit_range(&key, 7, 31).await.unwrap(), 0b1110111);
    assert_eq!(store.get_bit_range(&key, 1, 31).await.unwrap(), 1);
    assert_eq!(store.get_bit_range(&key, 4, 34).await.unwrap(), 0b0111);
}

pub async fn test_range_spans_bytes<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:range_span", prefix);

    store.set_bit(&key, 0).await.unwrap();
    store.set_bit(&key, 62).await.unwrap();

    let value = store.get_bit_range(&key, 63, 0).await.unwrap();
    assert_eq!(value, (1u64 << 62) | 1);
}

pub async fn test_range_width_bounds<S: BitStore>(store: &S, prefix: &str) {
    let key = format!("{}:range_width", prefix);

    assert!(matches!(
        store.get_bit_range(&key, 0, 0).await,
        Err(StorageError::InvalidBitRange { .. })
    ));
    assert!(matches!(
        store.get_bit_range(&key, 64, 0).await,
        Err(StorageError::InvalidBitRange { .. })
    ));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all BitStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_bit_store_tests {
    ($store:expr, $prefix:expr) => {
        use $crate::storage::bit_store_tests::*;

        test_set_returns_previous($store, $prefix).await;
        println!("  test_set_returns_previous: PASSED");

        test_missing_key_reads_zero($store, $prefix).await;
        println!("  test_missing_key_reads_zero: PASSED");

        test_clear_bit($store, $prefix).await;
        println!("  test_clear_bit: PASSED");

        test_range_is_msb_first($store, $prefix).await;
        println!("  test_range_is_msb_first: PASSED");

        test_range_spans_bytes($store, $prefix).await;
        println!("  test_range_spans_bytes: PASSED");

        test_range_width_bounds($store, $prefix).await;
        println!("  test_range_width_bounds: PASSED");
    };
}
