//! Grid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Bounds;

/// Edge length of one cell: an eighth of a 533.33 unit map tile.
pub const DEFAULT_CELL_SIZE: f32 = 533.333_3 / 8.0;

/// Errors raised while loading or validating a [`GridConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cell size must be a positive, finite number.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    /// World bounds have no volume.
    #[error("world bounds are degenerate: min {min}, max {max}")]
    DegenerateBounds {
        /// Minimum corner as configured
        min: glam::Vec3,
        /// Maximum corner as configured
        max: glam::Vec3,
    },

    /// The JSON document could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration for a cell grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World bounds; positions outside are rejected
    pub bounds: Bounds,
    /// Edge length of a cell in world units
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl GridConfig {
    /// Create a config with square bounds of `extent` and the given cell size.
    #[must_use]
    pub fn square(extent: f32, cell_size: f32) -> Self {
        Self {
            bounds: Bounds::new(extent, extent, extent),
            cell_size,
        }
    }

    /// Parse and validate a config from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input and the validation
    /// errors of [`GridConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the cell size and bounds are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCellSize`] or
    /// [`ConfigError::DegenerateBounds`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        if self.bounds.is_degenerate() {
            return Err(ConfigError::DegenerateBounds {
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }
        Ok(())
    }
}
