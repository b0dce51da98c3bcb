//! Engine configuration.
//!
//! Loaded from RON. Every field has a default, so a config file only needs
//! the values it changes:
//!
//! ```ron
//! (
//!     turn_length_seconds: 3600,
//!     generation: (size: 32, terrain: ProvinceVaried),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map_generation::GenerationConfig;
use crate::pathfinding::DEFAULT_MAX_EXPANSIONS;

/// Default real-time length of a turn: three hours.
pub const DEFAULT_TURN_LENGTH_SECONDS: u32 = 10_800;
/// Default bound on resolve-until-max iterations per call.
pub const DEFAULT_RESOLVE_ITERATION_CAP: usize = 1_000;
/// Default seat count of a new match.
pub const DEFAULT_MAX_PLAYERS: u8 = 8;

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Turn length given to new matches, in seconds.
    pub turn_length_seconds: u32,
    /// Seat count given to new matches.
    pub max_players: u8,
    /// World generation defaults; `generation.size` is the chunk size.
    pub generation: GenerationConfig,
    /// Node expansion cap per path search.
    pub max_path_expansions: usize,
    /// Iteration cap of one resolve-until-max call.
    pub resolve_iteration_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turn_length_seconds: DEFAULT_TURN_LENGTH_SECONDS,
            max_players: DEFAULT_MAX_PLAYERS,
            generation: GenerationConfig::default(),
            max_path_expansions: DEFAULT_MAX_EXPANSIONS,
            resolve_iteration_cap: DEFAULT_RESOLVE_ITERATION_CAP,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_length_seconds == 0 {
            return Err(ConfigError::Invalid(
                "turn_length_seconds must be positive".to_string(),
            ));
        }
        if self.max_players == 0 {
            return Err(ConfigError::Invalid("max_players must be positive".to_string()));
        }
        if self.max_path_expansions == 0 || self.resolve_iteration_cap == 0 {
            return Err(ConfigError::Invalid(
                "expansion and iteration caps must be positive".to_string(),
            ));
        }
        self.generation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Chunk edge length for new matches.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.generation.size
    }
}
