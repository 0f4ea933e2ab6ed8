//! LedgerStore interface tests.
//!
//! Each test uses its own user id, so the suite can run against a store that
//! already holds data from other tests.

use sunflower_checkin::interfaces::{
    ApplyOutcome, BonusLogEntry, BonusTier, LedgerEntry, LedgerStore, TransactionKind,
};

fn credit(user_id: i64, delta: i64, reference: &str) -> LedgerEntry {
    LedgerEntry {
        user_id,
        delta,
        kind: TransactionKind::Daily,
        reference: reference.to_string(),
        description: "Daily check-in reward".to_string(),
        min_balance: None,
        bonus: None,
    }
}

fn applied(outcome: ApplyOutcome) -> sunflower_checkin::interfaces::PointsTransaction {
    match outcome {
        ApplyOutcome::Applied(transaction) => transaction,
        other => panic!("expected Applied, got {:?}", other),
    }
}

// =============================================================================
// apply / balance
// =============================================================================

pub async fn test_missing_balance<S: LedgerStore>(store: &S) {
    let balance = store.balance(9001).await.expect("balance should succeed");
    assert!(balance.is_none(), "new user should have no balance row");
}

pub async fn test_apply_updates_balance<S: LedgerStore>(store: &S) {
    let user = 9002;

    let first = applied(store.apply(credit(user, 5, "a")).await.unwrap());
    assert_eq!(first.balance, 5);
    assert_eq!(first.user_id, user);
    assert_eq!(first.kind, TransactionKind::Daily);

    let second = applied(store.apply(credit(user, 3, "b")).await.unwrap());
    assert_eq!(second.balance, 8);
    assert!(second.id > first.id, "ids should increase");

    let balance = store.balance(user).await.unwrap().unwrap();
    assert_eq!(balance.points, 8);
    assert_eq!(balance.lifetime_points, 8);
}

pub async fn test_negative_delta_keeps_lifetime<S: LedgerStore>(store: &S) {
    let user = 9003;
    store.apply(credit(user, 10, "a")).await.unwrap();
    store.apply(credit(user, -4, "b")).await.unwrap();

    let balance = store.balance(user).await.unwrap().unwrap();
    assert_eq!(balance.points, 6);
    assert_eq!(balance.lifetime_points, 10);
}

pub async fn test_duplicate_reference<S: LedgerStore>(store: &S) {
    let user = 9004;
    store.apply(credit(user, 1, "daily:2025-01-10")).await.unwrap();

    let outcome = store.apply(credit(user, 1, "daily:2025-01-10")).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Duplicate);
    assert_eq!(store.balance(user).await.unwrap().unwrap().points, 1);

    // references are per user
    let other = applied(store.apply(credit(user + 1000, 1, "daily:2025-01-10")).await.unwrap());
    assert_eq!(other.balance, 1);
}

pub async fn test_min_balance_guard<S: LedgerStore>(store: &S) {
    let user = 9005;
    store.apply(credit(user, 150, "seed")).await.unwrap();

    let mut debit = credit(user, -100, "retro:2025-01-08");
    debit.kind = TransactionKind::Retroactive;
    debit.min_balance = Some(100);
    let transaction = applied(store.apply(debit.clone()).await.unwrap());
    assert_eq!(transaction.balance, 50);

    debit.reference = "retro:2025-01-07".to_string();
    let outcome = store.apply(debit).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Insufficient { balance: 50 });

    let (records, total) = store.transactions(user, 0, 10).await.unwrap();
    assert_eq!(total, 2, "rejected debit must not be logged");
    assert_eq!(records[0].kind, TransactionKind::Retroactive);
}

// =============================================================================
// bonus log
// =============================================================================

pub async fn test_bonus_log_unique<S: LedgerStore>(store: &S) {
    let user = 9006;
    let bonus = |tier: i32, reference: &str| {
        let mut entry = credit(user, 5, reference);
        entry.kind = TransactionKind::ConsecutiveBonus;
        entry.bonus = Some(BonusLogEntry {
            year_month: "202501".to_string(),
            tier: BonusTier(tier),
            description: "streak".to_string(),
        });
        entry
    };

    applied(store.apply(bonus(1, "bonus:202501:1")).await.unwrap());
    applied(store.apply(bonus(2, "bonus:202501:2")).await.unwrap());

    // same tier under a different reference still collides on the log
    let outcome = store.apply(bonus(1, "bonus:202501:1:again")).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Duplicate);

    let tiers = store.bonus_tiers(user, "202501").await.unwrap();
    assert_eq!(tiers, vec![BonusTier(1), BonusTier(2)]);
    assert!(store.bonus_tiers(user, "202502").await.unwrap().is_empty());
    assert_eq!(store.balance(user).await.unwrap().unwrap().points, 10);
}

// =============================================================================
// transactions / has_reference
// =============================================================================

pub async fn test_transactions_paging<S: LedgerStore>(store: &S) {
    let user = 9007;
    for i in 0..5 {
        store
            .apply(credit(user, 1, &format!("ref-{}", i)))
            .await
            .unwrap();
    }

    let (page, total) = store.transactions(user, 0, 2).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].reference, "ref-4", "newest first");
    assert_eq!(page[1].reference, "ref-3");

    let (page, _) = store.transactions(user, 4, 2).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].reference, "ref-0");

    let (page, total) = store.transactions(user + 1000, 0, 10).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 0);
}

pub async fn test_has_reference<S: LedgerStore>(store: &S) {
    let user = 9008;
    assert!(!store.has_reference(user, "daily:2025-01-10").await.unwrap());
    store.apply(credit(user, 1, "daily:2025-01-10")).await.unwrap();
    assert!(store.has_reference(user, "daily:2025-01-10").await.unwrap());
    assert!(!store.has_reference(user, "daily:2025-01-11").await.unwrap());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all LedgerStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_ledger_store_tests {
    ($store:expr) => {
        use $crate::storage::ledger_store_tests::*;

        test_missing_balance($store).await;
        println!("  test_missing_balance: PASSED");

        test_apply_updates_balance($store).await;
        println!("  test_apply_updates_balance: PASSED");

        test_negative_delta_keeps_lifetime($store).await;
        println!("  test_negative_delta_keeps_lifetime: PASSED");

        test_duplicate_reference($store).await;
        println!("  test_duplicate_reference: PASSED");

        test_min_balance_guard($store).await;
        println!("  test_min_balance_guard: PASSED");

        test_bonus_log_unique($store).await;
        println!("  test_bonus_log_unique: PASSED");

        test_transactions_paging($store).await;
        println!("  test_transactions_paging: PASSED");

        test_has_reference($store).await;
        println!("  test_has_reference: PASSED");
    };
}
