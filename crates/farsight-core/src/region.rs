//! Borrowed region handles and visitor dispatch.
//!
//! A [`Region`] is a view over the cells touched by one query circle. It
//! borrows the cells for exactly as long as the caller holds it, so nothing a
//! traversal produces can outlive the grid borrow it came from.
//!
//! Operations implement [`Visitor`] (or [`VisitorMut`]) and override the
//! methods of the categories they care about. The dispatcher hands every
//! non-empty container of every cell to the visitor, in [`EntityKind::ALL`]
//! order, and never looks at what the visitor does with it.
//!
//! # Example
//!
//! ```
//! use farsight_core::entity::Entity;
//! use farsight_core::grid::Grid;
//! use farsight_core::region::Visitor;
//! use glam::Vec3;
//!
//! #[derive(Default)]
//! struct CountMobiles(usize);
//!
//! impl<'g> Visitor<'g> for CountMobiles {
//!     fn visit_mobiles(&mut self, mobiles: &'g [Entity]) {
//!         self.0 += mobiles.len();
//!     }
//! }
//!
//! let mut grid = Grid::default();
//! let id = grid.next_id();
//! grid.insert(Entity::new_mobile(id, Vec3::new(5.0, 5.0, 0.0), 1)).unwrap();
//!
//! let region = grid.region(Vec3::ZERO, 20.0).unwrap();
//! let mut counter = CountMobiles::default();
//! region.visit(&mut counter);
//! assert_eq!(counter.0, 1);
//! ```

use glam::Vec3;

use crate::entity::{Entity, EntityId, EntityKind};
use crate::grid::Cell;

/// Read-only operation over a region's typed containers.
///
/// Every category method defaults to a no-op. Operations that treat all
/// categories alike may override [`Visitor::visit_container`] instead.
pub trait Visitor<'g> {
    /// Observers of one cell.
    fn visit_observers(&mut self, _observers: &'g [Entity]) {}

    /// Mobiles of one cell.
    fn visit_mobiles(&mut self, _mobiles: &'g [Entity]) {}

    /// Inert objects of one cell.
    fn visit_inert(&mut self, _objects: &'g [Entity]) {}

    /// Corpses of one cell.
    fn visit_corpses(&mut self, _corpses: &'g [Entity]) {}

    /// Area objects of one cell.
    fn visit_area_objects(&mut self, _areas: &'g [Entity]) {}

    /// Entry point used by the dispatcher for every container.
    fn visit_container(&mut self, kind: EntityKind, entities: &'g [Entity]) {
        match kind {
            EntityKind::Observer => self.visit_observers(entities),
            EntityKind::Mobile => self.visit_mobiles(entities),
            EntityKind::Inert => self.visit_inert(entities),
            EntityKind::Corpse => self.visit_corpses(entities),
            EntityKind::AreaObject => self.visit_area_objects(entities),
        }
    }

    /// Returning `true` stops dispatch before the next container.
    fn is_done(&self) -> bool {
        false
    }
}

/// Mutating operation over a region's typed containers.
///
/// Containers are handed out as slices: a visitor can change entities but
/// never add or remove them.
pub trait VisitorMut {
    /// Observers of one cell.
    fn visit_observers(&mut self, _observers: &mut [Entity]) {}

    /// Mobiles of one cell.
    fn visit_mobiles(&mut self, _mobiles: &mut [Entity]) {}

    /// Inert objects of one cell.
    fn visit_inert(&mut self, _objects: &mut [Entity]) {}

    /// Corpses of one cell.
    fn visit_corpses(&mut self, _corpses: &mut [Entity]) {}

    /// Area objects of one cell.
    fn visit_area_objects(&mut self, _areas: &mut [Entity]) {}

    /// Entry point used by the dispatcher for every container.
    fn visit_container(&mut self, kind: EntityKind, entities: &mut [Entity]) {
        match kind {
            EntityKind::Observer => self.visit_observers(entities),
            EntityKind::Mobile => self.visit_mobiles(entities),
            EntityKind::Inert => self.visit_inert(entities),
            EntityKind::Corpse => self.visit_corpses(entities),
            EntityKind::AreaObject => self.visit_area_objects(entities),
        }
    }

    /// Returning `true` stops dispatch before the next container.
    fn is_done(&self) -> bool {
        false
    }
}

/// Read-only view over the cells covering a query circle.
#[derive(Debug, Clone)]
pub struct Region<'g> {
    cells: Vec<&'g Cell>,
    center: Vec3,
    radius: f32,
}

impl<'g> Region<'g> {
    /// Builds a region from cells the caller selected.
    ///
    /// [`Grid::region`](crate::grid::Grid::region) is the usual way to get
    /// one; this constructor serves callers that keep their own cells.
    #[must_use]
    pub fn from_cells(cells: Vec<&'g Cell>, center: Vec3, radius: f32) -> Self {
        Self {
            cells,
            center,
            radius,
        }
    }

    /// A region with no cells.
    #[must_use]
    pub fn empty(center: Vec3) -> Self {
        Self::from_cells(Vec::new(), center, 0.0)
    }

    /// Center of the query circle.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Radius of the query circle.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Number of cells covered.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of entities across all covered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().map(|cell| cell.len()).sum()
    }

    /// Returns `true` if no covered cell holds an entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_empty())
    }

    /// Dispatches `visitor` over every non-empty container.
    pub fn visit<V: Visitor<'g> + ?Sized>(&self, visitor: &mut V) {
        for &cell in &self.cells {
            for kind in EntityKind::ALL {
                if visitor.is_done() {
                    return;
                }
                let entities = cell.container(kind);
                if !entities.is_empty() {
                    visitor.visit_container(kind, entities);
                }
            }
        }
    }

    /// Iterates every entity in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &'g Entity> + '_ {
        self.cells.iter().flat_map(|&cell| cell.iter())
    }

    /// Looks an entity up by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&'g Entity> {
        self.iter().find(|entity| entity.id() == id)
    }
}

/// Mutable view over the cells covering a query circle.
#[derive(Debug)]
pub struct RegionMut<'g> {
    cells: Vec<&'g mut Cell>,
    center: Vec3,
    radius: f32,
}

impl<'g> RegionMut<'g> {
    /// Builds a mutable region from cells the caller selected.
    #[must_use]
    pub fn from_cells(cells: Vec<&'g mut Cell>, center: Vec3, radius: f32) -> Self {
        Self {
            cells,
            center,
            radius,
        }
    }

    /// Center of the query circle.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Radius of the query circle.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Number of cells covered.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of entities across all covered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().map(|cell| cell.len()).sum()
    }

    /// Returns `true` if no covered cell holds an entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_empty())
    }

    /// Dispatches `visitor` over every non-empty container.
    pub fn visit<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) {
        for cell in &mut self.cells {
            for kind in EntityKind::ALL {
                if visitor.is_done() {
                    return;
                }
                let entities = cell.container_mut(kind);
                if !entities.is_empty() {
                    visitor.visit_container(kind, entities);
                }
            }
        }
    }

    /// Reborrows the region read-only.
    #[must_use]
    pub fn as_region(&self) -> Region<'_> {
        Region::from_cells(
            self.cells.iter().map(|cell| &**cell).collect(),
            self.center,
            self.radius,
        )
    }

    /// Looks an entity up by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.cells.iter().find_map(|cell| cell.find(id))
    }

    /// Looks an entity up by id for mutation.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.cells.iter_mut().find_map(|cell| cell.find_mut(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_with(entities: Vec<Entity>) -> Cell {
        let mut cell = Cell::new();
        for entity in entities {
            cell.push(entity);
        }
        cell
    }

    #[derive(Default)]
    struct KindLog(Vec<EntityKind>);

    impl<'g> Visitor<'g> for KindLog {
        fn visit_container(&mut self, kind: EntityKind, _entities: &'g [Entity]) {
            self.0.push(kind);
        }
    }

    #[test]
    fn dispatch_follows_kind_order_and_skips_empty() {
        let cell = cell_with(vec![
            Entity::new_inert(EntityId::new(1), Vec3::ZERO, 1),
            Entity::new_observer(EntityId::new(2), Vec3::ZERO),
        ]);
        let region = Region::from_cells(vec![&cell], Vec3::ZERO, 10.0);

        let mut log = KindLog::default();
        region.visit(&mut log);
        assert_eq!(log.0, vec![EntityKind::Observer, EntityKind::Inert]);
    }

    #[test]
    fn unimplemented_categories_are_noops() {
        struct OnlyCorpses(usize);
        impl<'g> Visitor<'g> for OnlyCorpses {
            fn visit_corpses(&mut self, corpses: &'g [Entity]) {
                self.0 += corpses.len();
            }
        }

        let cell = cell_with(vec![
            Entity::new_mobile(EntityId::new(1), Vec3::ZERO, 1),
            Entity::new_corpse(EntityId::new(2), Vec3::ZERO, EntityId::new(9), 0),
        ]);
        let region = Region::from_cells(vec![&cell], Vec3::ZERO, 10.0);
        let mut visitor = OnlyCorpses(0);
        region.visit(&mut visitor);
        assert_eq!(visitor.0, 1);
    }

    #[test]
    fn is_done_stops_dispatch() {
        struct StopAfterFirst(usize);
        impl<'g> Visitor<'g> for StopAfterFirst {
            fn visit_container(&mut self, _kind: EntityKind, _entities: &'g [Entity]) {
                self.0 += 1;
            }
            fn is_done(&self) -> bool {
                self.0 > 0
            }
        }

        let a = cell_with(vec![Entity::new_observer(EntityId::new(1), Vec3::ZERO)]);
        let b = cell_with(vec![Entity::new_observer(EntityId::new(2), Vec3::ZERO)]);
        let region = Region::from_cells(vec![&a, &b], Vec3::ZERO, 10.0);
        let mut visitor = StopAfterFirst(0);
        region.visit(&mut visitor);
        assert_eq!(visitor.0, 1);
    }

    #[test]
    fn empty_region_visits_nothing() {
        let region = Region::empty(Vec3::ZERO);
        let mut log = KindLog::default();
        region.visit(&mut log);
        assert!(log.0.is_empty());
        assert!(region.is_empty());
        assert_eq!(region.iter().count(), 0);
    }

    #[test]
    fn mutable_region_lookup() {
        let mut cell = cell_with(vec![Entity::new_mobile(EntityId::new(5), Vec3::ZERO, 3)]);
        let mut region = RegionMut::from_cells(vec![&mut cell], Vec3::ZERO, 10.0);

        region.get_mut(EntityId::new(5)).unwrap().as_unit_mut().unwrap().health = 1;
        assert_eq!(region.get(EntityId::new(5)).unwrap().as_unit().unwrap().health, 1);
        assert_eq!(region.as_region().len(), 1);
        assert!(region.get(EntityId::new(6)).is_none());
    }
}
