//! SQLite LedgerStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::interfaces::{
    ApplyOutcome, BonusTier, LedgerEntry, LedgerStore, PointsBalance, PointsTransaction, Result,
    StorageError, TransactionKind,
};
use crate::storage::schema::{
    MonthlyBonusLog, PointsTransactions, UserPoints, CREATE_LEDGER_TABLES,
};

/// SQLite implementation of LedgerStore.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        for statement in CREATE_LEDGER_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Read, check, and write within an already-started transaction.
    ///
    /// Returning anything but `Applied` means the caller must roll back.
    async fn apply_in_tx(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<ApplyOutcome> {
        let current = Self::read_balance(&mut *conn, entry.user_id)
            .await?
            .unwrap_or_else(|| PointsBalance::empty(entry.user_id));

        if let Some(min) = entry.min_balance {
            if current.points < min {
                return Ok(ApplyOutcome::Insufficient {
                    balance: current.points,
                });
            }
        }

        let balance = current.points + entry.delta;
        let lifetime_points = current.lifetime_points + entry.delta.max(0);
        let now = Utc::now();
        let created_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);

        let (sql, values) = Query::insert()
            .into_table(PointsTransactions::Table)
            .columns([
                PointsTransactions::UserId,
                PointsTransactions::PointsChange,
                PointsTransactions::Balance,
                PointsTransactions::TransactionType,
                PointsTransactions::Reference,
                PointsTransactions::Description,
                PointsTransactions::CreatedAt,
            ])
            .values_panic([
                entry.user_id.into(),
                entry.delta.into(),
                balance.into(),
                entry.kind.code().into(),
                entry.reference.clone().into(),
                entry.description.clone().into(),
                created_at.clone().into(),
            ])
            .build_sqlx(SqliteQueryBuilder);

        let id = match sqlx::query_with(&sql, values).execute(&mut *conn).await {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Ok(ApplyOutcome::Duplicate);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(bonus) = &entry.bonus {
            let (sql, values) = Query::insert()
                .into_table(MonthlyBonusLog::Table)
                .columns([
                    MonthlyBonusLog::UserId,
                    MonthlyBonusLog::YearMonth,
                    MonthlyBonusLog::BonusTier,
                    MonthlyBonusLog::Description,
                    MonthlyBonusLog::CreatedAt,
                ])
                .values_panic([
                    entry.user_id.into(),
                    bonus.year_month.clone().into(),
                    bonus.tier.0.into(),
                    bonus.description.clone().into(),
                    created_at.clone().into(),
                ])
                .build_sqlx(SqliteQueryBuilder);

            match sqlx::query_with(&sql, values).execute(&mut *conn).await {
                Ok(_) => {}
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    return Ok(ApplyOutcome::Duplicate);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let (sql, values) = Query::insert()
            .into_table(UserPoints::Table)
            .columns([
                UserPoints::UserId,
                UserPoints::Points,
                UserPoints::LifetimePoints,
                UserPoints::UpdatedAt,
            ])
            .values_panic([
                entry.user_id.into(),
                balance.into(),
                lifetime_points.into(),
                created_at.into(),
            ])
            .on_conflict(
                OnConflict::column(UserPoints::UserId)
                    .update_columns([
                        UserPoints::Points,
                        UserPoints::LifetimePoints,
                        UserPoints::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .build_sqlx(SqliteQueryBuilder);

        sqlx::query_with(&sql, values).execute(&mut *conn).await?;

        Ok(ApplyOutcome::Applied(PointsTransaction {
            id,
            user_id: entry.user_id,
            delta: entry.delta,
            balance,
            kind: entry.kind,
            reference: entry.reference.clone(),
            description: entry.description.clone(),
            created_at: now,
        }))
    }

    async fn apply_detached(pool: SqlitePool, entry: LedgerEntry) -> Result<ApplyOutcome> {
        // BEGIN IMMEDIATE takes the write lock before the balance read, so two
        // writers for the same user cannot both read the old balance.
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::apply_in_tx(&mut conn, &entry).await;

        match result {
            Ok(ApplyOutcome::Applied(transaction)) => {
                if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
                    // a failed COMMIT can leave the transaction open on a pooled connection
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    return Err(e.into());
                }
                debug!(
                    user_id = entry.user_id,
                    reference = %entry.reference,
                    balance = transaction.balance,
                    "ledger transaction committed"
                );
                Ok(ApplyOutcome::Applied(transaction))
            }
            Ok(outcome) => {
                sqlx::query("ROLLBACK").execute(&mut *conn).await?;
                debug!(
                    user_id = entry.user_id,
                    reference = %entry.reference,
                    ?outcome,
                    "ledger transaction rolled back"
                );
                Ok(outcome)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn read_balance(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<PointsBalance>> {
        let (sql, values) = Query::select()
            .columns([UserPoints::Points, UserPoints::LifetimePoints])
            .from(UserPoints::Table)
            .and_where(Expr::col(UserPoints::UserId).eq(user_id))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values).fetch_optional(conn).await?;

        match row {
            Some(row) => Ok(Some(PointsBalance {
                user_id,
                points: row.try_get("points")?,
                lifetime_points: row.try_get("lifetime_points")?,
            })),
            None => Ok(None),
        }
    }
}

fn row_to_transaction(row: &SqliteRow) -> Result<PointsTransaction> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| StorageError::InvalidTimestamp(created_at.clone()))?
        .with_timezone(&Utc);

    Ok(PointsTransaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        delta: row.try_get("points_change")?,
        balance: row.try_get("balance")?,
        kind: TransactionKind::from_code(row.try_get("transaction_type")?)?,
        reference: row.try_get("reference")?,
        description: row.try_get("description")?,
        created_at,
    })
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn apply(&self, entry: LedgerEntry) -> Result<ApplyOutcome> {
        // Runs on its own task so a dropped caller cannot hand a connection
        // back to the pool with the transaction still open.
        let pool = self.pool.clone();
        tokio::spawn(Self::apply_detached(pool, entry)).await?
    }

    async fn balance(&self, user_id: i64) -> Result<Option<PointsBalance>> {
        let mut conn = self.pool.acquire().await?;
        Self::read_balance(&mut conn, user_id).await
    }

    async fn transactions(
        &self,
        user_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PointsTransaction>, u64)> {
        let (sql, values) = Query::select()
            .columns([
                PointsTransactions::Id,
                PointsTransactions::UserId,
                PointsTransactions::PointsChange,
                PointsTransactions::Balance,
                PointsTransactions::TransactionType,
                PointsTransactions::Reference,
                PointsTransactions::Description,
                PointsTransactions::CreatedAt,
            ])
            .from(PointsTransactions::Table)
            .and_where(Expr::col(PointsTransactions::UserId).eq(user_id))
            .order_by(PointsTransactions::CreatedAt, Order::Desc)
            .order_by(PointsTransactions::Id, Order::Desc)
            .limit(u64::from(limit))
            .offset(u64::from(offset))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(row_to_transaction)
            .collect::<Result<Vec<_>>>()?;

        let (sql, values) = Query::select()
            .expr(Expr::col(PointsTransactions::Id).count())
            .from(PointsTransactions::Table)
            .and_where(Expr::col(PointsTransactions::UserId).eq(user_id))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get(0)?;

        Ok((records, total.max(0) as u64))
    }

    async fn has_reference(&self, user_id: i64, reference: &str) -> Result<bool> {
        let (sql, values) = Query::select()
            .column(PointsTransactions::Id)
            .from(PointsTransactions::Table)
            .and_where(Expr::col(PointsTransactions::UserId).eq(user_id))
            .and_where(Expr::col(PointsTransactions::Reference).eq(reference))
            .limit(1)
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn bonus_tiers(&self, user_id: i64, year_month: &str) -> Result<Vec<BonusTier>> {
        let (sql, values) = Query::select()
            .column(MonthlyBonusLog::BonusTier)
            .from(MonthlyBonusLog::Table)
            .and_where(Expr::col(MonthlyBonusLog::UserId).eq(user_id))
            .and_where(Expr::col(MonthlyBonusLog::YearMonth).eq(year_month))
            .order_by(MonthlyBonusLog::BonusTier, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<BonusTier> { Ok(BonusTier(row.try_get("bonus_tier")?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteLedgerStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to connect to SQLite");
        let store = SqliteLedgerStore::new(pool);
        store.init().await.expect("Failed to create schema");
        store
    }

    fn entry(user_id: i64, delta: i64, reference: &str) -> LedgerEntry {
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

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = store().await;
        store.init().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_balance_is_none() {
        let store = store().await;
        assert!(store.balance(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_round_trips_transaction() {
        let store = store().await;

        let outcome = store.apply(entry(7, 1, "daily:2025-01-10")).await.unwrap();
        let ApplyOutcome::Applied(written) = outcome else {
            panic!("expected Applied, got {outcome:?}");
        };

        let (page, total) = store.transactions(7, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, written.id);
        assert_eq!(page[0].kind, TransactionKind::Daily);
        assert_eq!(page[0].balance, 1);
        assert_eq!(page[0].reference, "daily:2025-01-10");
    }

    #[tokio::test]
    async fn test_duplicate_reference_rolls_back_balance() {
        let store = store().await;

        store.apply(entry(7, 1, "daily:2025-01-10")).await.unwrap();
        let again = store.apply(entry(7, 1, "daily:2025-01-10")).await.unwrap();

        assert_eq!(again, ApplyOutcome::Duplicate);
        assert_eq!(store.balance(7).await.unwrap().unwrap().points, 1);
        assert!(store.has_reference(7, "daily:2025-01-10").await.unwrap());
        assert!(!store.has_reference(7, "daily:2025-01-11").await.unwrap());
    }

    #[tokio::test]
    async fn test_insufficient_balance_writes_nothing() {
        let store = store().await;
        store.apply(entry(7, 99, "seed")).await.unwrap();

        let mut debit = entry(7, -100, "retro:2025-01-08");
        debit.kind = TransactionKind::Retroactive;
        debit.min_balance = Some(100);

        assert_eq!(
            store.apply(debit).await.unwrap(),
            ApplyOutcome::Insufficient { balance: 99 }
        );
        let (_, total) = store.transactions(7, 0, 10).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_connection_reusable() {
        let store = store().await;
        for statement in [
            "PRAGMA foreign_keys = ON",
            "CREATE TABLE commit_guard_parent (id INTEGER PRIMARY KEY)",
            "CREATE TABLE commit_guard (parent_id INTEGER REFERENCES commit_guard_parent(id) DEFERRABLE INITIALLY DEFERRED)",
            "CREATE TRIGGER break_commit AFTER INSERT ON user_points_transactions \
             BEGIN INSERT INTO commit_guard (parent_id) VALUES (-1); END",
        ] {
            sqlx::query(statement).execute(&store.pool).await.unwrap();
        }

        // the deferred foreign key only fails at COMMIT
        assert!(store.apply(entry(7, 1, "daily:2025-01-10")).await.is_err());

        sqlx::query("DROP TRIGGER break_commit")
            .execute(&store.pool)
            .await
            .unwrap();
        assert!(store.balance(7).await.unwrap().is_none());
        assert!(!store.has_reference(7, "daily:2025-01-10").await.unwrap());

        let outcome = store.apply(entry(7, 1, "daily:2025-01-10")).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Applied(_)));
        assert_eq!(store.balance(7).await.unwrap().unwrap().points, 1);
    }
}
