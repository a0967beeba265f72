//! Session configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "seed": 7, "character_max_health": 6 }
//! ```

use std::path::Path;

use onslaught_core::spawner::{DelayRange, SpawnerConfig};
use serde::{Deserialize, Serialize};

use crate::frame::FrameConfig;
use crate::ConfigError;

/// Spawn policies of the two bonus spawners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusSpawnConfigs {
    pub heal: SpawnerConfig,
    pub defense: SpawnerConfig,
}

impl Default for BonusSpawnConfigs {
    /// One of each at a time, every 20 to 30 seconds. Hearts hold back for
    /// the first 20 seconds.
    fn default() -> Self {
        let every = SpawnerConfig::new(DelayRange::new(20_000, 30_000), 1);
        Self {
            heal: every.clone().with_first_spawn_delay(20_000),
            defense: every,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed of the arena's random generator.
    pub seed: u64,
    /// Fixed frame step in milliseconds. Must be positive.
    pub frame_ms: u64,
    /// Pause between one slime wave draining and the next starting.
    pub wave_change_delay_ms: u64,
    pub character_max_health: u32,
    /// How long the dead character lingers before the game is over.
    pub game_over_delay_ms: u64,
    /// Initial size of the pool projectiles are fired from.
    pub projectile_pool_size: usize,
    /// Initial size of the pool duplicating slimes split into.
    pub duplicant_pool_size: usize,
    pub bonuses: BonusSpawnConfigs,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            frame_ms: 16,
            wave_change_delay_ms: 3000,
            character_max_health: 4,
            game_over_delay_ms: 2000,
            projectile_pool_size: 10,
            duplicant_pool_size: 10,
            bonuses: BonusSpawnConfigs::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_ms == 0 {
            return Err(ConfigError::Invalid("frame_ms must be positive".into()));
        }
        if self.character_max_health == 0 {
            return Err(ConfigError::Invalid("character_max_health must be positive".into()));
        }
        Ok(())
    }

    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            fixed_dt_ms: self.frame_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default() {
        let config = SessionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = SessionConfig::from_json_str(r#"{ "seed": 7, "bonuses": { "defense": { "spawn_delay": { "min": 5, "max": 9 }, "max_on_screen": 2 } } }"#)
            .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.frame_ms, 16);
        assert_eq!(config.bonuses.defense.max_on_screen, 2);
        assert_eq!(config.bonuses.defense.first_spawn_delay, None);
        assert_eq!(config.bonuses.heal, BonusSpawnConfigs::default().heal);
    }

    #[test]
    fn zero_frame_step_is_rejected() {
        let err = SessionConfig::from_json_str(r#"{ "frame_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SessionConfig::from_json_str("{ seed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SessionConfig::from_path("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, "/definitely/not/here.json"),
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
