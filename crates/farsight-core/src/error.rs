//! Error types for grid construction and region handles.
//!
//! Traversals themselves never fail; "nothing found" is expressed as `None`
//! or an empty collection. Errors only arise when building the grid or a
//! region handle from bad input.

use glam::Vec3;
use thiserror::Error;

use crate::entity::EntityId;

/// Errors raised by [`Grid`](crate::grid::Grid) operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// The grid configuration is invalid.
    #[error(transparent)]
    Config(#[from] cellmap::ConfigError),

    /// An entity with this id is already stored.
    #[error("entity {0} is already present in the grid")]
    DuplicateEntity(EntityId),

    /// The position lies outside the configured world bounds.
    #[error("position {0} lies outside the world bounds")]
    OutOfBounds(Vec3),

    /// A region was requested around a non-finite origin.
    #[error("query origin must be finite, got {0}")]
    InvalidOrigin(Vec3),

    /// A region was requested with a negative or non-finite radius.
    #[error("query radius must be finite and non-negative, got {0}")]
    InvalidRadius(f32),

    /// No entity with this id is stored.
    #[error("entity {0} not found")]
    UnknownEntity(EntityId),
}
