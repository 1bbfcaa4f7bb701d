//! Cell containers and the grid that owns them.
//!
//! The [`Grid`] partitions the world plane into square cells (see
//! [`cellmap`]) and keeps every entity in the typed container of the cell its
//! position falls in. It is the "broader simulation" side of the engine: it
//! owns entities between ticks and lends them out as [`Region`]s for the
//! duration of one operation.
//!
//! # Determinism
//!
//! Cells live in a `BTreeMap` keyed by [`CellCoord`], so region construction
//! and traversal visit cells in the same order on every run. The id index is
//! a `HashMap` that is only ever queried by key.
//!
//! # Example
//!
//! ```
//! use farsight_core::entity::{EntityInner, MobileComponents};
//! use farsight_core::grid::Grid;
//! use glam::Vec3;
//!
//! let mut grid = Grid::default();
//! let wolf = grid
//!     .spawn(Vec3::new(10.0, 10.0, 0.0), EntityInner::Mobile(MobileComponents::default()))
//!     .unwrap();
//!
//! grid.relocate(wolf, Vec3::new(400.0, 10.0, 0.0)).unwrap();
//! assert_eq!(grid.region(Vec3::ZERO, 50.0).unwrap().len(), 0);
//! assert_eq!(grid.region(Vec3::new(400.0, 0.0, 0.0), 50.0).unwrap().len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use cellmap::{CellCoord, CellSpan, GridConfig};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::area_effect::{self, AreaEffectReport};
use crate::entity::{Entity, EntityId, EntityInner, EntityKind, UnitFlags};
use crate::error::GridError;
use crate::region::{Region, RegionMut};
use crate::rules::Rules;

/// One spatial partition with an independent container per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    observers: Vec<Entity>,
    mobiles: Vec<Entity>,
    inert: Vec<Entity>,
    corpses: Vec<Entity>,
    area_objects: Vec<Entity>,
}

impl Cell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The container holding entities of `kind`.
    #[must_use]
    pub fn container(&self, kind: EntityKind) -> &[Entity] {
        match kind {
            EntityKind::Observer => &self.observers,
            EntityKind::Mobile => &self.mobiles,
            EntityKind::Inert => &self.inert,
            EntityKind::Corpse => &self.corpses,
            EntityKind::AreaObject => &self.area_objects,
        }
    }

    pub(crate) fn container_mut(&mut self, kind: EntityKind) -> &mut [Entity] {
        self.vec_mut(kind)
    }

    fn vec_mut(&mut self, kind: EntityKind) -> &mut Vec<Entity> {
        match kind {
            EntityKind::Observer => &mut self.observers,
            EntityKind::Mobile => &mut self.mobiles,
            EntityKind::Inert => &mut self.inert,
            EntityKind::Corpse => &mut self.corpses,
            EntityKind::AreaObject => &mut self.area_objects,
        }
    }

    /// Appends an entity to the container of its kind.
    pub fn push(&mut self, entity: Entity) {
        self.vec_mut(entity.kind()).push(entity);
    }

    /// Removes an entity, keeping the order of the rest of its container.
    pub fn take(&mut self, id: EntityId, kind: EntityKind) -> Option<Entity> {
        let container = self.vec_mut(kind);
        let index = container.iter().position(|e| e.id() == id)?;
        Some(container.remove(index))
    }

    /// Finds an entity in any container.
    #[must_use]
    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.iter().find(|e| e.id() == id)
    }

    /// Finds an entity in any container for mutation.
    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        [
            &mut self.observers,
            &mut self.mobiles,
            &mut self.inert,
            &mut self.corpses,
            &mut self.area_objects,
        ]
        .into_iter()
        .flat_map(|container| container.iter_mut())
        .find(|e| e.id() == id)
    }

    /// Iterates all entities in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        EntityKind::ALL
            .into_iter()
            .flat_map(move |kind| self.container(kind).iter())
    }

    /// Total number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
            + self.mobiles.len()
            + self.inert.len()
            + self.corpses.len()
            + self.area_objects.len()
    }

    /// Returns `true` if every container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner of all cells and the entities inside them.
#[derive(Debug, Clone)]
pub struct Grid {
    config: GridConfig,
    cells: BTreeMap<CellCoord, Cell>,
    index: HashMap<EntityId, (CellCoord, EntityKind)>,
    next_id: u64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            config: GridConfig::default(),
            cells: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }
}

impl Grid {
    /// Creates an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Config`] if the configuration does not validate.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// The grid configuration.
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the grid holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The id [`Grid::spawn`] would assign next.
    #[must_use]
    pub const fn next_id(&self) -> EntityId {
        EntityId::new(self.next_id)
    }

    /// Allocates an id and stores a new entity in the default phase.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `position` is outside the world.
    pub fn spawn(&mut self, position: Vec3, inner: EntityInner) -> Result<EntityId, GridError> {
        let id = self.next_id();
        self.insert(Entity::new(id, position, inner))?;
        Ok(id)
    }

    /// Stores an entity built by the caller.
    ///
    /// Ids at or above [`Grid::next_id`] advance the allocator past them.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DuplicateEntity`] or [`GridError::OutOfBounds`].
    pub fn insert(&mut self, entity: Entity) -> Result<(), GridError> {
        let id = entity.id();
        if self.index.contains_key(&id) {
            return Err(GridError::DuplicateEntity(id));
        }
        let coord = self.coord_for(entity.position())?;
        self.next_id = self.next_id.max(id.as_u64().saturating_add(1));
        self.index.insert(id, (coord, entity.kind()));
        trace!(entity = %id, kind = %entity.kind(), cell = %coord, "inserted");
        self.cells.entry(coord).or_default().push(entity);
        Ok(())
    }

    /// Removes an entity and returns it.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let (coord, kind) = self.index.remove(&id)?;
        let cell = self.cells.get_mut(&coord)?;
        let entity = cell.take(id, kind);
        if cell.is_empty() {
            self.cells.remove(&coord);
        }
        trace!(entity = %id, cell = %coord, "removed");
        entity
    }

    /// Returns the entity with `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let (coord, _) = self.index.get(&id)?;
        self.cells.get(coord)?.find(id)
    }

    /// Returns the entity with `id` for mutation.
    ///
    /// Positions can only change through [`Grid::relocate`].
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let (coord, _) = self.index.get(&id)?;
        self.cells.get_mut(coord)?.find_mut(id)
    }

    /// Moves an entity, switching cells when it crosses a boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownEntity`] or [`GridError::OutOfBounds`]; the
    /// entity is left untouched on error.
    pub fn relocate(&mut self, id: EntityId, position: Vec3) -> Result<(), GridError> {
        let (from, kind) = *self.index.get(&id).ok_or(GridError::UnknownEntity(id))?;
        let to = self.coord_for(position)?;

        if from == to {
            if let Some(entity) = self.get_mut(id) {
                entity.set_position(position);
            }
            return Ok(());
        }

        let mut entity = self
            .cells
            .get_mut(&from)
            .and_then(|cell| cell.take(id, kind))
            .ok_or(GridError::UnknownEntity(id))?;
        if self.cells.get(&from).is_some_and(Cell::is_empty) {
            self.cells.remove(&from);
        }
        entity.set_position(position);
        self.cells.entry(to).or_default().push(entity);
        self.index.insert(id, (to, kind));
        trace!(entity = %id, from = %from, to = %to, "relocated");
        Ok(())
    }

    /// Iterates all entities, cell by cell in coordinate order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.cells.values().flat_map(Cell::iter)
    }

    /// Iterates the non-empty cells in coordinate order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        self.cells.iter().map(|(coord, cell)| (*coord, cell))
    }

    /// Builds a read-only region over the cells touched by a query circle.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidOrigin`] for a non-finite center and
    /// [`GridError::InvalidRadius`] for a negative or non-finite radius. No
    /// traversal can start from a rejected handle.
    pub fn region(&self, center: Vec3, radius: f32) -> Result<Region<'_>, GridError> {
        let span = self.span(center, radius)?;
        let cells: Vec<&Cell> = self
            .cells
            .range(span.min()..=span.max())
            .filter(|(coord, _)| span.touches(**coord))
            .map(|(_, cell)| cell)
            .collect();
        trace!(cells = cells.len(), radius, "region built");
        Ok(Region::from_cells(cells, center, radius))
    }

    /// Builds a mutable region over the cells touched by a query circle.
    ///
    /// # Errors
    ///
    /// Same as [`Grid::region`].
    pub fn region_mut(&mut self, center: Vec3, radius: f32) -> Result<RegionMut<'_>, GridError> {
        let span = self.span(center, radius)?;
        let cells: Vec<&mut Cell> = self
            .cells
            .range_mut(span.min()..=span.max())
            .filter(|(coord, _)| span.touches(**coord))
            .map(|(_, cell)| cell)
            .collect();
        trace!(cells = cells.len(), radius, "mutable region built");
        Ok(RegionMut::from_cells(cells, center, radius))
    }

    /// Runs one area-effect tick for the area object `area_id`.
    ///
    /// The region covers the object's radius around its position. An area
    /// whose caster is gone affects nobody.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownEntity`] if `area_id` is not a stored area
    /// object.
    pub fn apply_area_effect(
        &mut self,
        area_id: EntityId,
        rules: &dyn Rules,
    ) -> Result<AreaEffectReport, GridError> {
        let area = self.get(area_id).ok_or(GridError::UnknownEntity(area_id))?;
        let components = area
            .as_area_object()
            .ok_or(GridError::UnknownEntity(area_id))?;
        let (position, radius, caster_id) = (area.position(), components.radius, components.caster);

        let Some(caster) = self.get(caster_id).cloned() else {
            warn!(area = %area_id, caster = %caster_id, "area caster missing");
            return Ok(AreaEffectReport::new(area_id));
        };

        // Player-controlled casters also touch targets by their combat reach.
        let reach = if caster.has_unit_flags(UnitFlags::PLAYER_CONTROLLED) {
            self.widest_combat_reach()
        } else {
            0.0
        };
        let mut region = self.region_mut(position, radius + reach)?;
        Ok(area_effect::apply_area_effect(
            &mut region,
            area_id,
            &caster,
            rules,
        ))
    }

    /// Largest finite combat reach among stored units, zero when there are
    /// none.
    #[must_use]
    pub fn widest_combat_reach(&self) -> f32 {
        self.cells
            .values()
            .flat_map(|cell| {
                cell.container(EntityKind::Observer)
                    .iter()
                    .chain(cell.container(EntityKind::Mobile))
            })
            .filter_map(Entity::as_unit)
            .map(|unit| unit.combat_reach)
            .filter(|reach| reach.is_finite())
            .fold(0.0, f32::max)
    }

    /// Advances timers by `elapsed_ms`: ticks unit auras and expires area
    /// objects. Returns the ids of area objects that were removed.
    pub fn advance(&mut self, elapsed_ms: u32) -> Vec<EntityId> {
        let mut expired = Vec::new();
        for cell in self.cells.values_mut() {
            for kind in [EntityKind::Observer, EntityKind::Mobile] {
                for entity in cell.container_mut(kind) {
                    if let Some(unit) = entity.as_unit_mut() {
                        unit.advance_auras(elapsed_ms);
                    }
                }
            }
            for entity in cell.container_mut(EntityKind::AreaObject) {
                if let Some(area) = entity.as_area_object_mut() {
                    if area.advance(elapsed_ms) {
                        expired.push(entity.id());
                    }
                }
            }
        }
        for id in &expired {
            self.remove(*id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "area objects expired");
        }
        expired
    }

    fn span(&self, center: Vec3, radius: f32) -> Result<CellSpan, GridError> {
        if !center.is_finite() {
            return Err(GridError::InvalidOrigin(center));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(GridError::InvalidRadius(radius));
        }
        Ok(CellSpan::around(center, radius, self.config.cell_size))
    }

    fn coord_for(&self, position: Vec3) -> Result<CellCoord, GridError> {
        if !position.is_finite() || !self.config.bounds.contains(position) {
            return Err(GridError::OutOfBounds(position));
        }
        Ok(CellCoord::containing(position, self.config.cell_size))
    }
}
