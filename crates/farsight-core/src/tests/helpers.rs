//! Test helper functions for setting up grids and rule doubles.

use std::collections::BTreeSet;

use glam::Vec3;

use crate::distribution::PacketSink;
use crate::entity::{AuraHolder, Entity, EntityId, Locale, SessionState};
use crate::grid::Grid;
use crate::rules::{FactionTable, Reaction, Rules};
use crate::spell::{AreaSpell, SpellId};

/// Installs a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Rules with a faction table plus explicit sight blockers and immunities.
#[derive(Debug, Clone, Default)]
pub struct TestRules {
    pub factions: FactionTable,
    /// Entities nothing has line of sight to
    pub hidden: BTreeSet<EntityId>,
    /// Entities immune to every area spell
    pub immune: BTreeSet<EntityId>,
}

impl TestRules {
    /// Factions 1 and 2 are hostile.
    pub fn hostile_pair() -> Self {
        Self {
            factions: FactionTable::new().with_hostility(1, 2),
            ..Self::default()
        }
    }
}

impl Rules for TestRules {
    fn reaction(&self, source: &Entity, target: &Entity) -> Reaction {
        match (source.faction(), target.faction()) {
            (Some(a), Some(b)) => self.factions.reaction(a, b),
            _ => Reaction::Neutral,
        }
    }

    fn in_line_of_sight(&self, _from: &Entity, to: &Entity) -> bool {
        !self.hidden.contains(&to.id())
    }

    fn is_immune(&self, target: &Entity, _spell: &AreaSpell) -> bool {
        self.immune.contains(&target.id())
    }
}

/// Sink remembering every delivery in order.
#[derive(Debug, Default)]
pub struct RecordingSink<P> {
    pub sent: Vec<(EntityId, P)>,
}

impl<P: Clone> PacketSink<P> for RecordingSink<P> {
    fn send(&mut self, recipient: EntityId, packet: &P) {
        self.sent.push((recipient, packet.clone()));
    }
}

impl<P> RecordingSink<P> {
    /// Recipients in delivery order.
    pub fn recipients(&self) -> Vec<EntityId> {
        self.sent.iter().map(|(id, _)| *id).collect()
    }
}

/// Spawns an observer of `faction` at `(x, y)`.
pub fn spawn_observer(grid: &mut Grid, x: f32, y: f32, faction: u32, locale: Option<u8>) -> EntityId {
    let id = grid.next_id();
    let mut entity = Entity::new_observer(id, Vec3::new(x, y, 0.0));
    if let Some(observer) = entity.as_observer_mut() {
        observer.unit.faction = faction;
        observer.session = SessionState {
            locale: locale.map(Locale),
            team: faction,
            group: None,
        };
    }
    grid.insert(entity).unwrap();
    id
}

/// Spawns a mobile of `faction` and `entry` at `(x, y)`.
pub fn spawn_mobile(grid: &mut Grid, x: f32, y: f32, faction: u32, entry: u32) -> EntityId {
    let id = grid.next_id();
    let mut entity = Entity::new_mobile(id, Vec3::new(x, y, 0.0), entry);
    if let Some(unit) = entity.as_unit_mut() {
        unit.faction = faction;
    }
    grid.insert(entity).unwrap();
    id
}

/// Spawns an area object owned by `caster` at `(x, y)`.
pub fn spawn_area(
    grid: &mut Grid,
    caster: EntityId,
    x: f32,
    y: f32,
    spell: AreaSpell,
    radius: f32,
    duration_ms: u32,
) -> EntityId {
    let id = grid.next_id();
    grid.insert(Entity::new_area_object(
        id,
        Vec3::new(x, y, 0.0),
        caster,
        spell,
        radius,
        duration_ms,
    ))
    .unwrap();
    id
}

/// Sets the health of a unit in the grid.
pub fn set_health(grid: &mut Grid, id: EntityId, health: u32) {
    if let Some(unit) = grid.get_mut(id).and_then(Entity::as_unit_mut) {
        unit.health = health;
    }
}

/// The holder of `spell` from `caster` on `target`.
pub fn aura_of(grid: &Grid, target: EntityId, spell: SpellId, caster: EntityId) -> Option<AuraHolder> {
    grid.get(target)?.as_unit()?.aura(spell, caster).cloned()
}
