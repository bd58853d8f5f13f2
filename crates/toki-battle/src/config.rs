//! Battle configuration.
//!
//! [`BattleConfig`] gathers every tunable constant of the battle core. It is
//! serde-friendly so hosts can load it next to their rosters; every field has
//! a default, so a partial JSON object is enough.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A [`BattleConfig`] value that the engine refuses to run with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The meter rate must be positive and finite.
    #[error("meter_rate must be positive and finite, got {0}")]
    MeterRate(f64),

    /// The readiness threshold must be positive and finite.
    #[error("meter_threshold must be positive and finite, got {0}")]
    MeterThreshold(f64),

    /// The crit multiplier must be at least 1.0.
    #[error("critical_multiplier must be >= 1.0, got {0}")]
    CriticalMultiplier(f64),

    /// Minimum damage cannot be negative.
    #[error("minimum_damage must be >= 0, got {0}")]
    MinimumDamage(i32),

    /// The paralysis factor must lie in `[0, 1]`.
    #[error("paralysis_speed_factor must be within [0, 1], got {0}")]
    ParalysisFactor(f64),

    /// A scheduling pass needs room for at least one tick.
    #[error("max_idle_ticks must be at least 1")]
    MaxIdleTicks,

    /// The stalemate guard needs at least one turn.
    #[error("stalemate_turns must be at least 1")]
    StalemateTurns,
}

// ---------------------------------------------------------------------------
// BattleConfig
// ---------------------------------------------------------------------------

/// Tunable constants for one battle session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Action meter gained per tick per point of effective speed.
    pub meter_rate: f64,
    /// Meter value at which an entity becomes ready.
    pub meter_threshold: f64,
    /// Damage multiplier applied on a critical hit.
    pub critical_multiplier: f64,
    /// Floor for attack damage after all multipliers.
    pub minimum_damage: i32,
    /// Meter gain factor applied while paralyzed.
    pub paralysis_speed_factor: f64,
    /// Upper bound on ticks in a single scheduling pass.
    pub max_idle_ticks: u32,
    /// Optional turn limit. Reaching it ends the battle in a draw.
    pub max_turns: Option<u32>,
    /// Consecutive turns without any damage after which the battle ends in
    /// a draw.
    pub stalemate_turns: u32,
    /// Seed for the battle RNG (crit rolls, status chances, auto-targeting).
    pub seed: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            meter_rate: 0.1,
            meter_threshold: 100.0,
            critical_multiplier: 1.5,
            minimum_damage: 1,
            paralysis_speed_factor: 0.5,
            max_idle_ticks: 10_000,
            max_turns: None,
            stalemate_turns: 100,
            seed: 0,
        }
    }
}

impl BattleConfig {
    /// Builder-style seed override.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every field for a usable value.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, in field declaration order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.meter_rate > 0.0 && self.meter_rate.is_finite()) {
            return Err(ConfigError::MeterRate(self.meter_rate));
        }
        if !(self.meter_threshold > 0.0 && self.meter_threshold.is_finite()) {
            return Err(ConfigError::MeterThreshold(self.meter_threshold));
        }
        if !(self.critical_multiplier >= 1.0 && self.critical_multiplier.is_finite()) {
            return Err(ConfigError::CriticalMultiplier(self.critical_multiplier));
        }
        if self.minimum_damage < 0 {
            return Err(ConfigError::MinimumDamage(self.minimum_damage));
        }
        if !(0.0..=1.0).contains(&self.paralysis_speed_factor) {
            return Err(ConfigError::ParalysisFactor(self.paralysis_speed_factor));
        }
        if self.max_idle_ticks == 0 {
            return Err(ConfigError::MaxIdleTicks);
        }
        if self.stalemate_turns == 0 {
            return Err(ConfigError::StalemateTurns);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
