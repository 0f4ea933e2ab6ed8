//! Streak bonus rules and evaluation.
//!
//! After any check-in the month's longest streak is compared against the
//! rule table; every tier whose trigger is met and that has not been logged
//! for the month is granted. The bonus-log row is written in the same ledger
//! transaction as the grant, so a tier is paid at most once per month even
//! when two check-ins race.

mod rules;

pub use rules::{BonusRule, BonusRules};

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::YearMonth;
use crate::interfaces::BonusTier;
use crate::ledger::{Grant, PointsLedger};

/// One bonus paid during an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantedBonus {
    pub tier: BonusTier,
    pub points: i64,
    pub description: String,
    /// Balance right after this grant.
    pub balance: i64,
}

/// What an evaluation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BonusReport {
    pub granted: Vec<GrantedBonus>,
    /// Tiers that a concurrent evaluation granted first.
    pub suppressed: Vec<BonusTier>,
    /// Set when evaluation stopped on a storage failure. Tiers not yet
    /// granted are picked up by the next check-in of the month.
    pub deferred: Option<String>,
}

impl BonusReport {
    pub fn total_points(&self) -> i64 {
        self.granted.iter().map(|g| g.points).sum()
    }

    /// Balance after the last grant, if any was made.
    pub fn last_balance(&self) -> Option<i64> {
        self.granted.last().map(|g| g.balance)
    }
}

/// Grants due streak bonuses through the points ledger.
#[derive(Clone)]
pub struct BonusEngine {
    rules: BonusRules,
    ledger: PointsLedger,
}

impl BonusEngine {
    pub fn new(rules: BonusRules, ledger: PointsLedger) -> Self {
        Self { rules, ledger }
    }

    pub fn rules(&self) -> &BonusRules {
        &self.rules
    }

    /// Grant every tier due for `streak` that `month` has not logged yet.
    ///
    /// Storage failures never fail the caller's check-in. They are logged and
    /// reported through [`BonusReport::deferred`].
    pub async fn apply_due_bonuses(&self, user_id: i64, month: YearMonth, streak: u32) -> BonusReport {
        let mut report = BonusReport::default();

        let due: Vec<&BonusRule> = self.rules.due(streak).collect();
        if due.is_empty() {
            return report;
        }

        let logged: HashSet<BonusTier> = match self.ledger.bonus_tiers(user_id, month).await {
            Ok(tiers) => tiers.into_iter().collect(),
            Err(e) => {
                warn!(user_id, month = %month, error = %e, "bonus log read failed, deferring");
                report.deferred = Some(e.to_string());
                return report;
            }
        };

        for rule in due.into_iter().filter(|r| !logged.contains(&r.tier)) {
            match self.ledger.grant_bonus(user_id, month, rule).await {
                Ok(Grant::Applied(transaction)) => {
                    info!(
                        user_id,
                        month = %month,
                        tier = %rule.tier,
                        points = rule.points,
                        streak,
                        "streak bonus granted"
                    );
                    report.granted.push(GrantedBonus {
                        tier: rule.tier,
                        points: rule.points,
                        description: rule.description.clone(),
                        balance: transaction.balance,
                    });
                }
                Ok(Grant::Duplicate) => {
                    info!(user_id, month = %month, tier = %rule.tier, "bonus already granted");
                    report.suppressed.push(rule.tier);
                }
                Err(e) => {
                    warn!(
                        user_id,
                        month = %month,
                        tier = %rule.tier,
                        error = %e,
                        "bonus grant failed, deferring"
                    );
                    report.deferred = Some(e.to_string());
                    break;
                }
            }
        }

        report
    }
}
