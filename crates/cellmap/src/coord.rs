//! Cell addressing.
//!
//! Cells tile the horizontal (x, y) plane; height never affects which cell a
//! position belongs to.

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Integer address of one cell.
///
/// Ordering is by `x` then `y`, which is also the iteration order of
/// [`CellSpan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column index
    pub x: i32,
    /// Row index
    pub y: i32,
}

impl CellCoord {
    /// Create a coordinate from raw indices.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell containing `position`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(position: Vec3, cell_size: f32) -> Self {
        Self {
            x: (position.x / cell_size).floor() as i32,
            y: (position.y / cell_size).floor() as i32,
        }
    }

    /// Lower-left corner of the cell in world units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn min_corner(self, cell_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * cell_size, self.y as f32 * cell_size)
    }

    /// Squared planar distance from `point` to the nearest point of the cell.
    ///
    /// Zero when the point lies inside the cell.
    #[must_use]
    pub fn distance_squared_to(self, point: Vec2, cell_size: f32) -> f32 {
        let min = self.min_corner(cell_size);
        let max = min + Vec2::splat(cell_size);
        let closest = point.clamp(min, max);
        point.distance_squared(closest)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The set of cells a query circle touches.
///
/// Built from the circle's bounding square; corner cells the circle cannot
/// reach are skipped during iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSpan {
    min: CellCoord,
    max: CellCoord,
    center: Vec2,
    radius: f32,
    cell_size: f32,
}

impl CellSpan {
    /// Cells touched by a circle of `radius` around `center` (height ignored).
    #[must_use]
    pub fn around(center: Vec3, radius: f32, cell_size: f32) -> Self {
        let reach = Vec3::new(radius, radius, 0.0);
        Self {
            min: CellCoord::containing(center - reach, cell_size),
            max: CellCoord::containing(center + reach, cell_size),
            center: center.truncate(),
            radius,
            cell_size,
        }
    }

    /// Lowest corner of the bounding square, in cell coordinates.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Highest corner of the bounding square, in cell coordinates.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Number of cells in the bounding square (upper bound of `iter().count()`).
    #[must_use]
    pub fn bounding_len(&self) -> u64 {
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return 0;
        }
        let width = u64::from(self.max.x.abs_diff(self.min.x)) + 1;
        let height = u64::from(self.max.y.abs_diff(self.min.y)) + 1;
        width.saturating_mul(height)
    }

    /// Returns `true` if the circle reaches into `coord`.
    #[must_use]
    pub fn touches(&self, coord: CellCoord) -> bool {
        coord.x >= self.min.x
            && coord.x <= self.max.x
            && coord.y >= self.min.y
            && coord.y <= self.max.y
            && coord.distance_squared_to(self.center, self.cell_size) <= self.radius * self.radius
    }

    /// Iterates the touched cells ordered by `x`, then `y`.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (self.min.x..=self.max.x)
            .flat_map(move |x| (self.min.y..=self.max.y).map(move |y| CellCoord::new(x, y)))
            .filter(move |coord| self.touches(*coord))
    }
}
