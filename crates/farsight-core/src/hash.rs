//! State hashing for determinism checks.
//!
//! Two grids holding the same entities in the same cells hash identically.
//! Read-only operations (searches, visibility passes, broadcasts) must leave
//! the hash unchanged.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec3;

use crate::entity::{AuraHolder, Entity, EntityInner, EntityKind, InertRole, UnitState};
use crate::grid::Grid;

/// Computes a deterministic hash of every cell and entity in the grid.
#[must_use]
pub fn hash_grid(grid: &Grid) -> u64 {
    let mut hasher = DefaultHasher::new();
    grid.config().cell_size.to_bits().hash(&mut hasher);

    for (coord, cell) in grid.cells() {
        coord.hash(&mut hasher);
        for kind in EntityKind::ALL {
            let container = cell.container(kind);
            container.len().hash(&mut hasher);
            for entity in container {
                hash_entity(entity, &mut hasher);
            }
        }
    }

    hasher.finish()
}

fn hash_entity<H: Hasher>(entity: &Entity, hasher: &mut H) {
    entity.id().hash(hasher);
    entity.kind().hash(hasher);
    hash_vec3(entity.position(), hasher);
    entity.phase_mask().hash(hasher);

    match entity.inner() {
        EntityInner::Observer(c) => {
            hash_unit(&c.unit, hasher);
            c.session.hash(hasher);
        }
        EntityInner::Mobile(c) => {
            hash_unit(&c.unit, hasher);
            c.entry.hash(hasher);
            c.creature_type.hash(hasher);
            c.owner_group.hash(hasher);
        }
        EntityInner::Inert(c) => {
            c.entry.hash(hasher);
            c.spawned.hash(hasher);
            match c.role {
                InertRole::Generic => 0u8.hash(hasher),
                InertRole::SpellFocus { focus_id, radius } => {
                    1u8.hash(hasher);
                    focus_id.hash(hasher);
                    radius.to_bits().hash(hasher);
                }
            }
        }
        EntityInner::Corpse(c) => c.hash(hasher),
        EntityInner::AreaObject(c) => {
            c.caster.hash(hasher);
            c.spell.hash(hasher);
            c.radius.to_bits().hash(hasher);
            c.duration_ms.hash(hasher);
            c.affected.hash(hasher);
        }
    }
}

fn hash_unit<H: Hasher>(unit: &UnitState, hasher: &mut H) {
    unit.health.hash(hasher);
    unit.max_health.hash(hasher);
    unit.faction.hash(hasher);
    unit.flags.hash(hasher);
    unit.combat_reach.to_bits().hash(hasher);
    unit.auras.len().hash(hasher);
    for aura in &unit.auras {
        hash_aura(aura, hasher);
    }
}

fn hash_aura<H: Hasher>(aura: &AuraHolder, hasher: &mut H) {
    aura.spell.hash(hasher);
    aura.caster.hash(hasher);
    aura.duration_ms.hash(hasher);
    aura.effects.hash(hasher);
}

fn hash_vec3<H: Hasher>(v: Vec3, hasher: &mut H) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
    v.z.to_bits().hash(hasher);
}
