//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Balance table schema.
#[derive(Iden)]
pub enum UserPoints {
    #[iden = "user_points"]
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "points"]
    Points,
    #[iden = "lifetime_points"]
    LifetimePoints,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Transaction log schema.
#[derive(Iden)]
pub enum PointsTransactions {
    #[iden = "user_points_transactions"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "points_change"]
    PointsChange,
    #[iden = "balance"]
    Balance,
    #[iden = "transaction_type"]
    TransactionType,
    #[iden = "reference"]
    Reference,
    #[iden = "description"]
    Description,
    #[iden = "created_at"]
    CreatedAt,
}

/// Bonus-issuance log schema.
#[derive(Iden)]
pub enum MonthlyBonusLog {
    #[iden = "user_monthly_bonus_log"]
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "year_month"]
    YearMonth,
    #[iden = "bonus_tier"]
    BonusTier,
    #[iden = "description"]
    Description,
    #[iden = "created_at"]
    CreatedAt,
}

/// Statements creating the ledger tables, executed in order.
pub const CREATE_LEDGER_TABLES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS user_points (
    user_id INTEGER PRIMARY KEY,
    points INTEGER NOT NULL DEFAULT 0,
    lifetime_points INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS user_points_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    points_change INTEGER NOT NULL,
    balance INTEGER NOT NULL,
    transaction_type INTEGER NOT NULL,
    reference TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_points_tx_reference ON user_points_transactions(user_id, reference)",
    "CREATE INDEX IF NOT EXISTS idx_points_tx_user_created ON user_points_transactions(user_id, created_at)",
    r#"
CREATE TABLE IF NOT EXISTS user_monthly_bonus_log (
    user_id INTEGER NOT NULL,
    year_month TEXT NOT NULL,
    bonus_tier INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, year_month, bonus_tier)
)"#,
];
