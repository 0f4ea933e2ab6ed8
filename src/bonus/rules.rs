//! Bonus rule table.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::interfaces::BonusTier;

/// A streak milestone and its reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusRule {
    pub tier: BonusTier,
    /// Longest streak in the month needed to earn this tier.
    pub trigger_days: u32,
    pub points: i64,
    pub description: String,
}

impl BonusRule {
    fn new(tier: i32, trigger_days: u32, points: i64, description: &str) -> Self {
        Self {
            tier: BonusTier(tier),
            trigger_days,
            points,
            description: description.to_string(),
        }
    }
}

/// Validated, immutable rule table ordered by trigger.
///
/// Cheap to clone; built once at startup and shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusRules {
    rules: Arc<[BonusRule]>,
}

impl BonusRules {
    /// Validate and freeze a rule table.
    ///
    /// Triggers must be positive and strictly ascending, points positive,
    /// and tiers unique.
    pub fn new(rules: Vec<BonusRule>) -> Result<Self, ConfigError> {
        let mut tiers = HashSet::new();
        let mut previous_trigger = 0;

        for rule in &rules {
            if rule.trigger_days == 0 {
                return Err(ConfigError::InvalidRules(format!(
                    "tier {} has a zero-day trigger",
                    rule.tier
                )));
            }
            if rule.trigger_days <= previous_trigger {
                return Err(ConfigError::InvalidRules(format!(
                    "tier {} trigger {} is not above the previous trigger {}",
                    rule.tier, rule.trigger_days, previous_trigger
                )));
            }
            if rule.points <= 0 {
                return Err(ConfigError::InvalidRules(format!(
                    "tier {} awards {} points",
                    rule.tier, rule.points
                )));
            }
            if !tiers.insert(rule.tier) {
                return Err(ConfigError::InvalidRules(format!(
                    "tier {} appears more than once",
                    rule.tier
                )));
            }
            previous_trigger = rule.trigger_days;
        }

        Ok(Self {
            rules: rules.into(),
        })
    }

    /// The default table: 3, 7, 15 and 28 days.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                BonusRule::new(1, 3, 5, "3-day streak bonus"),
                BonusRule::new(2, 7, 10, "7-day streak bonus"),
                BonusRule::new(3, 15, 20, "15-day streak bonus"),
                BonusRule::new(4, 28, 100, "28-day streak bonus"),
            ]
            .into(),
        }
    }

    /// Rules whose trigger `streak` meets, in trigger order.
    pub fn due(&self, streak: u32) -> impl Iterator<Item = &BonusRule> {
        self.rules.iter().filter(move |r| streak >= r.trigger_days)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BonusRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn to_vec(&self) -> Vec<BonusRule> {
        self.rules.to_vec()
    }
}

impl Default for BonusRules {
    fn default() -> Self {
        Self::standard()
    }
}
