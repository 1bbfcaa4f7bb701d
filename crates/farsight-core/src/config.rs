//! Engine configuration.
//!
//! All structs deserialize from JSON with missing fields taking their
//! defaults, so a config file only has to name what it changes:
//!
//! ```
//! use farsight_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "visibility": { "sight_range": 250.0 } }"#).unwrap();
//! assert_eq!(config.visibility.sight_range, 250.0);
//! assert_eq!(config.visibility.stealth_detect_range, 9.0);
//! ```

use cellmap::{ConfigError, GridConfig};
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Default distance at which observers see other entities.
pub const DEFAULT_SIGHT_RANGE: f32 = 100.0;

/// Default distance at which stealthed units are detected.
pub const DEFAULT_STEALTH_DETECT_RANGE: f32 = 9.0;

/// Distances used by visibility and sight decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Maximum distance at which anything is visible
    pub sight_range: f32,
    /// Maximum distance at which a stealthed unit is detected
    pub stealth_detect_range: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            sight_range: DEFAULT_SIGHT_RANGE,
            stealth_detect_range: DEFAULT_STEALTH_DETECT_RANGE,
        }
    }
}

impl VisibilityConfig {
    /// Check that both ranges are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidRadius`] naming the offending range.
    pub fn validate(&self) -> Result<(), GridError> {
        for range in [self.sight_range, self.stealth_detect_range] {
            if !range.is_finite() || range < 0.0 {
                return Err(GridError::InvalidRadius(range));
            }
        }
        Ok(())
    }
}

/// Top-level configuration of the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cell partitioning
    pub grid: GridConfig,
    /// Visibility ranges
    pub visibility: VisibilityConfig,
}

impl EngineConfig {
    /// Parse and validate a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Config`] for malformed JSON or an unusable grid,
    /// and [`GridError::InvalidRadius`] for bad visibility ranges.
    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// See [`GridConfig::validate`] and [`VisibilityConfig::validate`].
    pub fn validate(&self) -> Result<(), GridError> {
        self.grid.validate()?;
        self.visibility.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.visibility.sight_range, DEFAULT_SIGHT_RANGE);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config.visibility, VisibilityConfig::default());
        assert_eq!(config.grid.cell_size, cellmap::config::DEFAULT_CELL_SIZE);
    }

    #[test]
    fn negative_sight_range_rejected() {
        let err = EngineConfig::from_json(r#"{ "visibility": { "sight_range": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidRadius(r) if r == -1.0));
    }

    #[test]
    fn bad_cell_size_rejected() {
        let err = EngineConfig::from_json(r#"{ "grid": { "cell_size": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, GridError::Config(ConfigError::InvalidCellSize(_))));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GridError::Config(ConfigError::Json(_))));
    }

    #[test]
    fn json_roundtrip() {
        let mut config = EngineConfig::default();
        config.visibility.stealth_detect_range = 20.0;
        let json = serde_json::to_string(&config).unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.visibility, config.visibility);
    }
}
