//! Engine configuration.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::ConfigError;
use crate::energy::state::{SOC_MAX, SOC_MIN};
use crate::geo::is_valid_coordinate;
use crate::steps::state::{default_rewards, Reward};

/// Step & Reward Engine configuration.
#[derive(Debug, Clone)]
pub struct StepEngineConfig {
    /// Delay between automatic step increments.
    pub tick_interval: Duration,
    /// Steps added per automatic tick, drawn uniformly.
    pub step_increment: RangeInclusive<u64>,
    /// Seed for reproducible draws. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Starting origin as (latitude, longitude) in degrees.
    pub origin: (f64, f64),
    /// Starting daily step goal.
    pub daily_goal_steps: u64,
    /// Per-subscriber snapshot buffer.
    pub stream_capacity: usize,
    /// Reward catalog the engine starts with.
    pub rewards: Vec<Reward>,
}

impl Default for StepEngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            step_increment: 2..=7,
            seed: None,
            // Canberra
            origin: (-35.2820, 149.1287),
            daily_goal_steps: 8000,
            stream_capacity: 64,
            rewards: default_rewards(),
        }
    }
}

impl StepEngineConfig {
    /// Checks the configuration before an engine is built from it.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval {
                engine: "steps".to_string(),
            });
        }
        if self.step_increment.is_empty() {
            return Err(ConfigError::EmptyStepIncrement {
                min: *self.step_increment.start(),
                max: *self.step_increment.end(),
            });
        }
        if self.stream_capacity == 0 {
            return Err(ConfigError::ZeroStreamCapacity);
        }
        let (lat, lon) = self.origin;
        if !is_valid_coordinate(lat, lon) {
            return Err(ConfigError::InvalidOrigin { lat, lon });
        }
        let mut seen = HashSet::new();
        for reward in &self.rewards {
            if reward.points_required == 0 {
                return Err(ConfigError::ZeroRewardPrice {
                    id: reward.id.clone(),
                });
            }
            if !seen.insert(reward.id.as_str()) {
                return Err(ConfigError::DuplicateRewardId {
                    id: reward.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Energy Simulation Engine configuration.
#[derive(Debug, Clone)]
pub struct EnergyEngineConfig {
    /// Delay between simulation ticks while connected.
    pub tick_interval: Duration,
    /// Seed for reproducible draws. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Battery state of charge at start, in percent.
    pub initial_battery_soc: i32,
    /// Per-subscriber snapshot buffer.
    pub stream_capacity: usize,
}

impl Default for EnergyEngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            seed: None,
            initial_battery_soc: 62,
            stream_capacity: 64,
        }
    }
}

impl EnergyEngineConfig {
    /// Checks the configuration before an engine is built from it.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval {
                engine: "energy".to_string(),
            });
        }
        if self.stream_capacity == 0 {
            return Err(ConfigError::ZeroStreamCapacity);
        }
        if !(SOC_MIN..=SOC_MAX).contains(&self.initial_battery_soc) {
            return Err(ConfigError::BatterySocOutOfRange {
                soc: self.initial_battery_soc,
                min: SOC_MIN,
                max: SOC_MAX,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        StepEngineConfig::default().validate().unwrap();
        EnergyEngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = StepEngineConfig {
            tick_interval: Duration::ZERO,
            ..StepEngineConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::ZeroTickInterval {
                engine: "steps".to_string()
            }
        );
    }

    #[test]
    fn empty_increment_is_rejected() {
        #[allow(clippy::reversed_empty_ranges)]
        let cfg = StepEngineConfig {
            step_increment: 7..=2,
            ..StepEngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyStepIncrement { min: 7, max: 2 })));
    }

    #[test]
    fn origin_outside_globe_is_rejected() {
        let cfg = StepEngineConfig {
            origin: (91.0, 0.0),
            ..StepEngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidOrigin { .. })));
    }

    #[test]
    fn free_reward_is_rejected() {
        let mut cfg = StepEngineConfig::default();
        cfg.rewards.push(Reward::new("free", "Free coffee", 0, "Local Cafe"));
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::ZeroRewardPrice {
                id: "free".to_string()
            }
        );
    }

    #[test]
    fn duplicate_reward_id_is_rejected() {
        let mut cfg = StepEngineConfig::default();
        cfg.rewards.push(Reward::new("cafe5", "Another latte", 700, "Other Cafe"));
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::DuplicateRewardId {
                id: "cafe5".to_string()
            }
        );
    }

    #[test]
    fn empty_catalog_is_allowed() {
        let cfg = StepEngineConfig {
            rewards: Vec::new(),
            ..StepEngineConfig::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn battery_soc_outside_band_is_rejected() {
        let cfg = EnergyEngineConfig {
            initial_battery_soc: 96,
            ..EnergyEngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::BatterySocOutOfRange { soc: 96, .. })));

        let cfg = EnergyEngineConfig {
            stream_capacity: 0,
            ..EnergyEngineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::ZeroStreamCapacity);
    }
}
