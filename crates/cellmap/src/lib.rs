//! # Cellmap
//!
//! Cell partitioning substrate for spatial queries.
//!
//! Cellmap cuts the world's horizontal plane into square cells of a fixed
//! size. A query circle touches a small set of cells, and only the contents
//! of those cells need to be examined:
//!
//! - **Stable addressing**: every position maps to exactly one [`CellCoord`]
//! - **Bounded fan-out**: [`CellSpan`] enumerates the cells a circle touches,
//!   pruning corner cells that the circle cannot reach
//! - **Deterministic order**: spans iterate in the same order as `CellCoord`'s
//!   `Ord`, so callers storing cells in a `BTreeMap` see one order everywhere
//!
//! Cellmap knows nothing about what lives inside a cell; containers are owned
//! by the layer above.
//!
//! ## Quick Start
//!
//! ```
//! use cellmap::{CellCoord, CellSpan, GridConfig};
//! use glam::Vec3;
//!
//! let config = GridConfig::default();
//! let origin = Vec3::new(10.0, 10.0, 0.0);
//!
//! let home = CellCoord::containing(origin, config.cell_size);
//! let span = CellSpan::around(origin, 100.0, config.cell_size);
//!
//! assert!(span.iter().any(|c| c == home));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coord;

pub use config::{ConfigError, GridConfig};
pub use coord::{CellCoord, CellSpan};

/// Axis-aligned bounding box of the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: glam::Vec3,
    /// Maximum corner
    pub max: glam::Vec3,
}

impl Bounds {
    /// Create bounds from dimensions (centered at origin).
    #[must_use]
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            min: glam::Vec3::new(-width / 2.0, -height / 2.0, -depth / 2.0),
            max: glam::Vec3::new(width / 2.0, height / 2.0, depth / 2.0),
        }
    }

    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: glam::Vec3, max: glam::Vec3) -> Self {
        Self { min, max }
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> glam::Vec3 {
        self.max - self.min
    }

    /// Returns `true` when any extent is zero, negative or not finite.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !size.is_finite() || size.min_element() <= 0.0
    }

    /// Check if a point is inside the bounds.
    #[must_use]
    pub fn contains(&self, point: glam::Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

impl Default for Bounds {
    /// A square world of 64 x 64 tiles, each 533.33 units wide.
    fn default() -> Self {
        Self::new(34_133.33, 34_133.33, 4_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds::new(10.0, 10.0, 10.0);
        assert!(bounds.contains(Vec3::ZERO));
        assert!(bounds.contains(Vec3::new(4.0, 4.0, 4.0)));
        assert!(!bounds.contains(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_bounds_degenerate() {
        assert!(!Bounds::new(10.0, 10.0, 10.0).is_degenerate());
        assert!(Bounds::new(10.0, 0.0, 10.0).is_degenerate());
        assert!(Bounds::from_min_max(Vec3::ONE, Vec3::ZERO).is_degenerate());
        assert!(Bounds::new(f32::INFINITY, 1.0, 1.0).is_degenerate());
    }
}
