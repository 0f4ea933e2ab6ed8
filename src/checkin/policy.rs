//! Reward policy.

use crate::config::{CheckinConfig, ConfigError};

/// Fixed point amounts and the retro quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub daily_points: i64,
    pub retro_cost: i64,
    pub retro_quota: u32,
}

impl RewardPolicy {
    pub fn from_config(config: &CheckinConfig) -> Result<Self, ConfigError> {
        if config.daily_points <= 0 {
            return Err(ConfigError::InvalidPolicy(format!(
                "daily_points must be positive, got {}",
                config.daily_points
            )));
        }
        if config.retro_cost <= 0 {
            return Err(ConfigError::InvalidPolicy(format!(
                "retro_cost must be positive, got {}",
                config.retro_cost
            )));
        }
        Ok(Self {
            daily_points: config.daily_points,
            retro_cost: config.retro_cost,
            retro_quota: config.retro_quota,
        })
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            daily_points: crate::config::DEFAULT_DAILY_POINTS,
            retro_cost: crate::config::DEFAULT_RETRO_COST,
            retro_quota: crate::config::DEFAULT_RETRO_QUOTA,
        }
    }
}
