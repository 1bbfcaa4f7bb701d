//! # Farsight Core
//!
//! Spatial query and notification engine for a multiplayer world server.
//!
//! Given a region of the world, the engine can:
//!
//! - **Search**: find the first, best or every entity passing a [`Check`]
//! - **Act**: run an action on every entity in range
//! - **Notify visibility**: diff what each observer knew against what it sees now
//! - **Distribute**: fan a message out to observers, building one payload per locale
//! - **Apply area effects**: hit or refresh every target inside an area object
//!
//! ## Architecture
//!
//! - [`grid`]: cells with one container per entity kind, owned by [`Grid`]
//! - [`region`]: borrowed views over the cells of one query circle, and the
//!   [`Visitor`] protocol that walks their containers
//! - [`check`] and [`search`]: predicates and the strategies that drive them
//! - [`rules`]: the capability object answering faction, combat and sight questions
//! - [`visibility`], [`distribution`], [`area_effect`], [`actions`]: the notifiers
//!
//! Traversals never fail. "Nothing found" is `None` or an empty collection;
//! only building a grid or a region handle from bad input returns a
//! [`GridError`].
//!
//! ## Usage
//!
//! ```
//! use farsight_core::check::NearestAttackableUnitInRange;
//! use farsight_core::entity::{Entity, EntityId};
//! use farsight_core::rules::{FactionTable, StandardRules};
//! use farsight_core::{find_best, Grid};
//! use glam::Vec3;
//!
//! let rules = StandardRules::new(FactionTable::new().with_hostility(1, 2));
//! let mut grid = Grid::default();
//!
//! let mut hunter = Entity::new_mobile(EntityId::new(1), Vec3::ZERO, 10);
//! hunter.as_unit_mut().unwrap().faction = 1;
//! let mut prey = Entity::new_mobile(EntityId::new(2), Vec3::new(12.0, 0.0, 0.0), 20);
//! prey.as_unit_mut().unwrap().faction = 2;
//! grid.insert(hunter.clone()).unwrap();
//! grid.insert(prey).unwrap();
//!
//! let region = grid.region(hunter.position(), 30.0).unwrap();
//! let check = NearestAttackableUnitInRange::new(&hunter, 30.0, &rules);
//! assert_eq!(find_best(&region, &check).map(Entity::id), Some(EntityId::new(2)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export cellmap for grid configuration
pub use cellmap;

pub mod actions;
pub mod area_effect;
pub mod check;
pub mod config;
pub mod distribution;
pub mod entity;
pub mod error;
pub mod grid;
pub mod hash;
pub mod region;
pub mod rules;
pub mod search;
pub mod spell;
pub mod visibility;

pub use area_effect::{apply_area_effect, AreaEffectReport};
pub use check::{Check, Verdict};
pub use config::{EngineConfig, VisibilityConfig};
pub use distribution::{broadcast, distribute_localized, DeliveryPolicy, PacketSink};
pub use entity::{Entity, EntityId, EntityKind, KindMask};
pub use error::GridError;
pub use grid::{Cell, Grid};
pub use region::{Region, RegionMut, Visitor, VisitorMut};
pub use rules::{Reaction, Rules, StandardRules};
pub use search::{apply_to_all, apply_to_all_mut, collect_all, find_best, find_first, WorkerScope};
pub use visibility::{notify_visibility, ObserverRegistry, ObserverState, VisibilityDelta};

#[cfg(test)]
mod tests;
