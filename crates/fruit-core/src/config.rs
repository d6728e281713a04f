//! Game configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a valid
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::fruit::{FruitRegistry, FruitTier};
use crate::merge::{DEFAULT_MAX_MERGE_BONUS, MergePolicy};

/// Highest accepted scheduler tick rate.
pub const MAX_TICK_RATE_HZ: f32 = 1000.0;

/// Playfield dimensions in pixels. Interior spans `[0, width] x (-inf, height]`, y down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 600.0,
        }
    }
}

/// Drop selection and one-in-flight settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Relative weights for tiers `0..weights.len()`. Higher tiers are never dropped.
    pub weights: Vec<u32>,
    /// Vertical coordinate at which dropped fruits appear.
    pub drop_y: f32,
    /// Speed (px/s) under which an in-flight fruit counts as settled.
    pub settle_speed: f32,
    /// Ticks before an in-flight fruit may count as settled.
    pub min_settle_ticks: u32,
    /// Ticks after which an in-flight fruit is released regardless of speed.
    pub max_in_flight_ticks: u32,
    /// Ticks to wait after a drop before accepting the next one.
    pub drop_cooldown_ticks: u32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            weights: vec![5, 4, 3, 2, 1],
            drop_y: 40.0,
            settle_speed: 20.0,
            min_settle_ticks: 10,
            max_in_flight_ticks: 90,
            drop_cooldown_ticks: 0,
        }
    }
}

/// Complete configuration for a game controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub playfield: PlayfieldConfig,
    /// y coordinate of the death-line. A fruit whose top edge is above it
    /// (smaller y) for `grace_period_secs` ends the session.
    pub death_line_y: f32,
    pub grace_period_secs: f32,
    /// Distance past the walls or floor after which a fruit is swept away.
    pub out_of_bounds_margin: f32,
    /// Target tick rate of the scheduler.
    pub tick_rate_hz: f32,
    pub max_merge_bonus: u32,
    pub seed: u64,
    pub spawner: SpawnerConfig,
    /// Custom fruit table. `None` uses the classic table.
    pub fruits: Option<Vec<FruitTier>>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            playfield: PlayfieldConfig::default(),
            death_line_y: 100.0,
            grace_period_secs: 2.0,
            out_of_bounds_margin: 64.0,
            tick_rate_hz: 60.0,
            max_merge_bonus: DEFAULT_MAX_MERGE_BONUS,
            seed: 12345,
            spawner: SpawnerConfig::default(),
            fruits: None,
        }
    }
}

impl GameConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GameError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Builds the fruit registry described by this configuration.
    pub fn registry(&self) -> Result<FruitRegistry> {
        match &self.fruits {
            Some(tiers) => FruitRegistry::new(tiers.clone()),
            None => Ok(FruitRegistry::classic()),
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            max_merge_bonus: self.max_merge_bonus,
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let PlayfieldConfig { width, height } = self.playfield;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(GameError::Config(format!(
                "playfield must be positive, got {width}x{height}"
            )));
        }
        if !(self.tick_rate_hz > 0.0 && self.tick_rate_hz <= MAX_TICK_RATE_HZ) {
            return Err(GameError::Config(format!(
                "tick_rate_hz must be in (0, {MAX_TICK_RATE_HZ}], got {}",
                self.tick_rate_hz
            )));
        }
        if !(self.grace_period_secs.is_finite() && self.grace_period_secs >= 0.0) {
            return Err(GameError::Config(format!(
                "grace_period_secs must be non-negative, got {}",
                self.grace_period_secs
            )));
        }
        if !self.death_line_y.is_finite() || !self.spawner.drop_y.is_finite() {
            return Err(GameError::Config("death_line_y and drop_y must be finite".to_string()));
        }
        if self.spawner.drop_y >= height {
            return Err(GameError::Config(format!(
                "drop_y must be above the floor ({height}), got {}",
                self.spawner.drop_y
            )));
        }
        if !(self.out_of_bounds_margin.is_finite() && self.out_of_bounds_margin >= 0.0) {
            return Err(GameError::Config(format!(
                "out_of_bounds_margin must be finite and non-negative, got {}",
                self.out_of_bounds_margin
            )));
        }
        if !(self.spawner.settle_speed.is_finite() && self.spawner.settle_speed >= 0.0) {
            return Err(GameError::Config(format!(
                "settle_speed must be finite and non-negative, got {}",
                self.spawner.settle_speed
            )));
        }

        let registry = self.registry()?;
        let weights = &self.spawner.weights;
        if weights.is_empty() || weights.iter().all(|w| *w == 0) {
            return Err(GameError::Config("spawner weights must not all be zero".to_string()));
        }
        if weights.len() > registry.len() {
            return Err(GameError::Config(format!(
                "spawner has {} weights but only {} tiers exist",
                weights.len(),
                registry.len()
            )));
        }
        let widest = registry
            .iter()
            .take(weights.len())
            .map(|t| t.radius * 2.0)
            .fold(0.0_f32, f32::max);
        if widest > width {
            return Err(GameError::Config(format!(
                "droppable fruit of diameter {widest} does not fit a playfield {width} wide"
            )));
        }
        Ok(())
    }
}
