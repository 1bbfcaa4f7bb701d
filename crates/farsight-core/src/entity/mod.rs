//! Entity model of the simulated world.
//!
//! This module provides the core entity types:
//! - [`EntityId`]: Unique identifier for entities
//! - [`EntityKind`]: The container category an entity lives in
//! - [`KindMask`]: A set of categories an operation cares about
//! - [`EntityInner`]: Type-safe storage for kind-specific components
//! - [`Entity`]: The complete entity
//!
//! Entities are owned by the [`Grid`](crate::grid::Grid) (or whatever the
//! caller uses to hold cells). Engine operations only ever borrow them for the
//! duration of one call.
//!
//! # Example
//!
//! ```
//! use farsight_core::entity::{Entity, EntityId, EntityKind};
//! use glam::Vec3;
//!
//! let wolf = Entity::new_mobile(EntityId::new(42), Vec3::new(1.0, 2.0, 0.0), 299);
//!
//! assert_eq!(wolf.id().as_u64(), 42);
//! assert_eq!(wolf.kind(), EntityKind::Mobile);
//! assert!(wolf.is_alive());
//! ```

pub mod components;

use std::fmt;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use components::{
    AreaObjectComponents, AuraHolder, CorpseComponents, CreatureType, InertComponents, InertRole,
    Locale, MobileComponents, ObserverComponents, SessionState, UnitFlags, UnitState,
};

use crate::spell::AreaSpell;

/// Phase every entity starts in.
pub const DEFAULT_PHASE: u32 = 1;

/// Unique identifier for an entity.
///
/// Entity IDs are immutable once assigned and unique within a grid. They are
/// ordered by their numeric value.
///
/// # Example
///
/// ```
/// use farsight_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Container category of an entity.
///
/// Every cell keeps one container per kind, and visitors are dispatched over
/// them in the order of [`EntityKind::ALL`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Unit with a network session
    Observer,
    /// Mobile non-player actor
    Mobile,
    /// Inert world object
    Inert,
    /// Corpse left behind by an observer
    Corpse,
    /// Transient area object applying a persistent effect
    AreaObject,
}

impl EntityKind {
    /// All kinds in dispatch order.
    pub const ALL: [Self; 5] = [
        Self::Observer,
        Self::Mobile,
        Self::Inert,
        Self::Corpse,
        Self::AreaObject,
    ];

    /// The single-kind mask for this kind.
    #[must_use]
    pub const fn mask(self) -> KindMask {
        match self {
            Self::Observer => KindMask::OBSERVERS,
            Self::Mobile => KindMask::MOBILES,
            Self::Inert => KindMask::INERT,
            Self::Corpse => KindMask::CORPSES,
            Self::AreaObject => KindMask::AREA_OBJECTS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observer => write!(f, "Observer"),
            Self::Mobile => write!(f, "Mobile"),
            Self::Inert => write!(f, "Inert"),
            Self::Corpse => write!(f, "Corpse"),
            Self::AreaObject => write!(f, "AreaObject"),
        }
    }
}

bitflags! {
    /// Set of entity kinds an operation is interested in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindMask: u8 {
        /// Observers
        const OBSERVERS = 1 << 0;
        /// Mobiles
        const MOBILES = 1 << 1;
        /// Inert objects
        const INERT = 1 << 2;
        /// Corpses
        const CORPSES = 1 << 3;
        /// Area objects
        const AREA_OBJECTS = 1 << 4;
        /// Everything that has a [`UnitState`]
        const UNITS = Self::OBSERVERS.bits() | Self::MOBILES.bits();
    }
}

impl KindMask {
    /// Returns `true` if `kind` is part of the mask.
    #[must_use]
    pub fn includes(self, kind: EntityKind) -> bool {
        self.contains(kind.mask())
    }
}

/// Type-safe storage for kind-specific components.
///
/// The variant decides the entity's [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityInner {
    /// Observer components (unit state and session)
    Observer(ObserverComponents),
    /// Mobile components (unit state, entry, creature type)
    Mobile(MobileComponents),
    /// Inert object components
    Inert(InertComponents),
    /// Corpse components
    Corpse(CorpseComponents),
    /// Area object components
    AreaObject(AreaObjectComponents),
}

impl EntityInner {
    /// Returns the kind matching this variant.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Observer(_) => EntityKind::Observer,
            Self::Mobile(_) => EntityKind::Mobile,
            Self::Inert(_) => EntityKind::Inert,
            Self::Corpse(_) => EntityKind::Corpse,
            Self::AreaObject(_) => EntityKind::AreaObject,
        }
    }
}

/// An entity of the simulated world.
///
/// # Invariants
///
/// - The `EntityId` is unique within a grid
/// - The kind never changes; it is derived from the [`EntityInner`] variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    position: Vec3,
    phase_mask: u32,
    inner: EntityInner,
}

impl Entity {
    /// Creates a new entity in the default phase.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, inner: EntityInner) -> Self {
        Self {
            id,
            position,
            phase_mask: DEFAULT_PHASE,
            inner,
        }
    }

    /// Creates an observer with default unit and session state.
    #[must_use]
    pub fn new_observer(id: EntityId, position: Vec3) -> Self {
        Self::new(id, position, EntityInner::Observer(ObserverComponents::default()))
    }

    /// Creates a mobile of the given template entry.
    #[must_use]
    pub fn new_mobile(id: EntityId, position: Vec3, entry: u32) -> Self {
        Self::new(
            id,
            position,
            EntityInner::Mobile(MobileComponents {
                entry,
                ..MobileComponents::default()
            }),
        )
    }

    /// Creates a spawned inert object of the given template entry.
    #[must_use]
    pub fn new_inert(id: EntityId, position: Vec3, entry: u32) -> Self {
        Self::new(
            id,
            position,
            EntityInner::Inert(InertComponents {
                entry,
                ..InertComponents::default()
            }),
        )
    }

    /// Creates a corpse belonging to `owner`.
    #[must_use]
    pub fn new_corpse(id: EntityId, position: Vec3, owner: EntityId, faction: u32) -> Self {
        Self::new(
            id,
            position,
            EntityInner::Corpse(CorpseComponents { owner, faction }),
        )
    }

    /// Creates an area object with an empty application record.
    #[must_use]
    pub fn new_area_object(
        id: EntityId,
        position: Vec3,
        caster: EntityId,
        spell: AreaSpell,
        radius: f32,
        duration_ms: u32,
    ) -> Self {
        Self::new(
            id,
            position,
            EntityInner::AreaObject(AreaObjectComponents::new(caster, spell, radius, duration_ms)),
        )
    }

    /// Moves the entity to another phase mask.
    #[must_use]
    pub const fn with_phase(mut self, phase_mask: u32) -> Self {
        self.phase_mask = phase_mask;
        self
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    /// Returns the entity's position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Updates the position without touching any cell bookkeeping.
    ///
    /// Use [`Grid::relocate`](crate::grid::Grid::relocate) for entities stored
    /// in a grid.
    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Returns the phase mask.
    #[must_use]
    pub const fn phase_mask(&self) -> u32 {
        self.phase_mask
    }

    /// Returns `true` if the two entities share at least one phase.
    #[must_use]
    pub const fn in_same_phase(&self, other: &Self) -> bool {
        self.phase_mask & other.phase_mask != 0
    }

    /// Squared distance between the two positions.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        self.position.distance_squared(other.position)
    }

    /// Distance between the two positions.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Returns `true` if `other` shares a phase and lies within `range`.
    #[must_use]
    pub fn is_within_dist_in_map(&self, other: &Self, range: f32) -> bool {
        self.in_same_phase(other) && self.distance_squared(other) <= range * range
    }

    /// Returns a reference to the kind-specific components.
    #[must_use]
    pub const fn inner(&self) -> &EntityInner {
        &self.inner
    }

    /// Returns a mutable reference to the kind-specific components.
    #[must_use]
    pub fn inner_mut(&mut self) -> &mut EntityInner {
        &mut self.inner
    }

    /// Returns `true` if this entity is an observer.
    #[must_use]
    pub const fn is_observer(&self) -> bool {
        matches!(self.inner, EntityInner::Observer(_))
    }

    /// Returns `true` if this entity is a mobile.
    #[must_use]
    pub const fn is_mobile(&self) -> bool {
        matches!(self.inner, EntityInner::Mobile(_))
    }

    /// Unit state of observers and mobiles, `None` for other kinds.
    #[must_use]
    pub const fn as_unit(&self) -> Option<&UnitState> {
        match &self.inner {
            EntityInner::Observer(c) => Some(&c.unit),
            EntityInner::Mobile(c) => Some(&c.unit),
            _ => None,
        }
    }

    /// Mutable unit state of observers and mobiles.
    #[must_use]
    pub fn as_unit_mut(&mut self) -> Option<&mut UnitState> {
        match &mut self.inner {
            EntityInner::Observer(c) => Some(&mut c.unit),
            EntityInner::Mobile(c) => Some(&mut c.unit),
            _ => None,
        }
    }

    /// Observer components if this is an observer.
    #[must_use]
    pub const fn as_observer(&self) -> Option<&ObserverComponents> {
        match &self.inner {
            EntityInner::Observer(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable observer components if this is an observer.
    #[must_use]
    pub fn as_observer_mut(&mut self) -> Option<&mut ObserverComponents> {
        match &mut self.inner {
            EntityInner::Observer(c) => Some(c),
            _ => None,
        }
    }

    /// Mobile components if this is a mobile.
    #[must_use]
    pub const fn as_mobile(&self) -> Option<&MobileComponents> {
        match &self.inner {
            EntityInner::Mobile(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable mobile components if this is a mobile.
    #[must_use]
    pub fn as_mobile_mut(&mut self) -> Option<&mut MobileComponents> {
        match &mut self.inner {
            EntityInner::Mobile(c) => Some(c),
            _ => None,
        }
    }

    /// Inert components if this is an inert object.
    #[must_use]
    pub const fn as_inert(&self) -> Option<&InertComponents> {
        match &self.inner {
            EntityInner::Inert(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable inert components if this is an inert object.
    #[must_use]
    pub fn as_inert_mut(&mut self) -> Option<&mut InertComponents> {
        match &mut self.inner {
            EntityInner::Inert(c) => Some(c),
            _ => None,
        }
    }

    /// Corpse components if this is a corpse.
    #[must_use]
    pub const fn as_corpse(&self) -> Option<&CorpseComponents> {
        match &self.inner {
            EntityInner::Corpse(c) => Some(c),
            _ => None,
        }
    }

    /// Area object components if this is an area object.
    #[must_use]
    pub const fn as_area_object(&self) -> Option<&AreaObjectComponents> {
        match &self.inner {
            EntityInner::AreaObject(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable area object components if this is an area object.
    #[must_use]
    pub fn as_area_object_mut(&mut self) -> Option<&mut AreaObjectComponents> {
        match &mut self.inner {
            EntityInner::AreaObject(c) => Some(c),
            _ => None,
        }
    }

    /// Returns `true` for living units. Non-units are never alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        match self.as_unit() {
            Some(unit) => unit.is_alive(),
            None => false,
        }
    }

    /// Returns `true` for units carrying every flag in `flags`.
    #[must_use]
    pub fn has_unit_flags(&self, flags: UnitFlags) -> bool {
        self.as_unit().is_some_and(|u| u.has_flags(flags))
    }

    /// Template entry of mobiles and inert objects.
    #[must_use]
    pub const fn entry(&self) -> Option<u32> {
        match &self.inner {
            EntityInner::Mobile(c) => Some(c.entry),
            EntityInner::Inert(c) => Some(c.entry),
            _ => None,
        }
    }

    /// Player group of observers and of the pets they control.
    ///
    /// Mobiles that are not player-controlled never belong to a group.
    #[must_use]
    pub fn group(&self) -> Option<u32> {
        match &self.inner {
            EntityInner::Observer(c) => c.session.group,
            EntityInner::Mobile(c) if c.unit.has_flags(UnitFlags::PLAYER_CONTROLLED) => c.owner_group,
            _ => None,
        }
    }

    /// Faction of units and corpses.
    #[must_use]
    pub const fn faction(&self) -> Option<u32> {
        match &self.inner {
            EntityInner::Observer(c) => Some(c.unit.faction),
            EntityInner::Mobile(c) => Some(c.unit.faction),
            EntityInner::Corpse(c) => Some(c.faction),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod entity_id_tests {
        use super::*;

        #[test]
        fn ordering() {
            let mut ids = vec![EntityId::new(3), EntityId::new(1), EntityId::new(2)];
            ids.sort();
            assert_eq!(ids, vec![EntityId::new(1), EntityId::new(2), EntityId::new(3)]);
        }

        #[test]
        fn debug_and_display_format() {
            let id = EntityId::new(42);
            assert_eq!(format!("{id:?}"), "EntityId(42)");
            assert_eq!(format!("{id}"), "42");
        }

        #[test]
        fn from_u64() {
            let id: EntityId = 42u64.into();
            assert_eq!(id.as_u64(), 42);
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn dispatch_order_is_fixed() {
            assert_eq!(EntityKind::ALL[0], EntityKind::Observer);
            assert_eq!(EntityKind::ALL[4], EntityKind::AreaObject);
        }

        #[test]
        fn masks_cover_single_kinds() {
            for kind in EntityKind::ALL {
                assert!(kind.mask().includes(kind));
                assert_eq!(kind.mask().bits().count_ones(), 1);
            }
            assert!(KindMask::UNITS.includes(EntityKind::Observer));
            assert!(KindMask::UNITS.includes(EntityKind::Mobile));
            assert!(!KindMask::UNITS.includes(EntityKind::Corpse));
        }

        #[test]
        fn display_format() {
            assert_eq!(EntityKind::AreaObject.to_string(), "AreaObject");
        }
    }

    mod entity_tests {
        use super::*;

        #[test]
        fn kind_follows_inner() {
            let e = Entity::new_corpse(EntityId::new(1), Vec3::ZERO, EntityId::new(2), 4);
            assert_eq!(e.kind(), EntityKind::Corpse);
            assert_eq!(e.faction(), Some(4));
            assert!(!e.is_alive());
        }

        #[test]
        fn unit_accessors() {
            let mut e = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
            assert!(e.as_unit().is_some());
            assert!(e.as_observer().is_some());
            assert!(e.as_mobile().is_none());

            e.as_unit_mut().unwrap().health = 0;
            assert!(!e.is_alive());
        }

        #[test]
        fn entry_only_for_templated_kinds() {
            let mob = Entity::new_mobile(EntityId::new(1), Vec3::ZERO, 17);
            let obj = Entity::new_inert(EntityId::new(2), Vec3::ZERO, 23);
            let obs = Entity::new_observer(EntityId::new(3), Vec3::ZERO);
            assert_eq!(mob.entry(), Some(17));
            assert_eq!(obj.entry(), Some(23));
            assert_eq!(obs.entry(), None);
        }

        #[test]
        fn group_of_observers_and_pets() {
            let mut player = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
            assert_eq!(player.group(), None);
            player.as_observer_mut().unwrap().session.group = Some(4);
            assert_eq!(player.group(), Some(4));

            let mut pet = Entity::new_mobile(EntityId::new(2), Vec3::ZERO, 1);
            pet.as_mobile_mut().unwrap().owner_group = Some(4);
            assert_eq!(pet.group(), None);
            pet.as_unit_mut().unwrap().flags |= UnitFlags::PLAYER_CONTROLLED;
            assert_eq!(pet.group(), Some(4));
        }

        #[test]
        fn phases_gate_distance_checks() {
            let a = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
            let b = Entity::new_mobile(EntityId::new(2), Vec3::new(3.0, 4.0, 0.0), 1);
            assert!(a.is_within_dist_in_map(&b, 5.0));
            assert!(!a.is_within_dist_in_map(&b, 4.9));

            let b = b.with_phase(2);
            assert!(!a.in_same_phase(&b));
            assert!(!a.is_within_dist_in_map(&b, 100.0));
        }

        #[test]
        fn serialization_roundtrip() {
            let entity = Entity::new_mobile(EntityId::new(42), Vec3::new(1.0, 2.0, 3.0), 7);
            let json = serde_json::to_string(&entity).unwrap();
            let back: Entity = serde_json::from_str(&json).unwrap();
            assert_eq!(entity, back);
        }
    }
}
