//! Persistent area effects.
//!
//! An area object re-applies its spell to every qualifying unit inside its
//! radius once per tick. The object's `affected` set records who already
//! received the initial hit, so a unit that stays inside is hit once and
//! refreshed on every later tick.
//!
//! Units that leave the area or stop qualifying keep their aura until it runs
//! out on its own (see [`UnitState::advance_auras`]); the tracker never strips
//! it.
//!
//! [`UnitState::advance_auras`]: crate::entity::UnitState::advance_auras

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{AreaObjectComponents, AuraHolder, Entity, EntityId, EntityKind, UnitFlags};
use crate::region::{RegionMut, VisitorMut};
use crate::rules::Rules;
use crate::spell::{Polarity, SpellAttributes, MAX_EFFECT_INDEX};

/// What one area-effect tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaEffectReport {
    /// The area object
    pub area: EntityId,
    /// Targets hit for the first time
    pub initial_hits: Vec<EntityId>,
    /// Targets already affected that were hit again
    pub refreshed: Vec<EntityId>,
    /// Targets whose existing aura was lengthened
    pub extended: Vec<EntityId>,
}

impl AreaEffectReport {
    /// An empty report for `area`.
    #[must_use]
    pub fn new(area: EntityId) -> Self {
        Self {
            area,
            ..Self::default()
        }
    }

    /// Number of targets hit this tick.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.initial_hits.len() + self.refreshed.len()
    }
}

struct AreaTick<'a> {
    area: &'a Entity,
    components: &'a AreaObjectComponents,
    caster: &'a Entity,
    rules: &'a dyn Rules,
    report: AreaEffectReport,
}

impl AreaTick<'_> {
    fn qualifies(&self, target: &Entity) -> bool {
        let Some(unit) = target.as_unit() else {
            return false;
        };
        if !unit.is_alive() || unit.flags.intersects(UnitFlags::TAXI_FLYING | UnitFlags::TOTEM) {
            return false;
        }

        let mut radius = self.components.radius;
        if self.caster.has_unit_flags(UnitFlags::PLAYER_CONTROLLED)
            && !unit.has_flags(UnitFlags::PLAYER_CONTROLLED)
        {
            radius += unit.combat_reach;
        }
        if !self.area.is_within_dist_in_map(target, radius) || self.rules.is_evading(target) {
            return false;
        }

        if target.kind() == EntityKind::Observer
            && target.id() != self.caster.id()
            && unit.flags.intersects(UnitFlags::GAME_MASTER | UnitFlags::INVISIBLE)
        {
            return false;
        }

        let spell = &self.components.spell;
        if spell.target_entries.is_empty() {
            let allowed = match spell.polarity {
                Polarity::Positive => self.rules.can_assist(self.caster, target),
                Polarity::Negative => self.rules.can_attack(self.caster, target),
                Polarity::Neutral => true,
            };
            if !allowed {
                return false;
            }
        } else if !target.entry().is_some_and(|entry| spell.target_entries.contains(&entry)) {
            return false;
        }

        if spell.has(SpellAttributes::ONLY_ON_PLAYERS) && target.kind() != EntityKind::Observer {
            return false;
        }
        if !spell.has(SpellAttributes::NO_IMMUNITIES) && self.rules.is_immune(target, spell) {
            return false;
        }
        spell.has(SpellAttributes::IGNORE_LINE_OF_SIGHT) || self.rules.in_line_of_sight(self.area, target)
    }

    fn apply(&mut self, target: &mut Entity) {
        let id = target.id();
        let Some(unit) = target.as_unit_mut() else {
            return;
        };
        let spell = &self.components.spell;
        let remaining = self.components.duration_ms;

        match unit.aura_mut(spell.id, self.caster.id()) {
            Some(holder) => {
                if !holder.has_effect(spell.effect_index) {
                    holder.add_effect(spell.effect_index);
                } else if let Some(current) = holder.duration_ms {
                    if current < remaining {
                        holder.duration_ms = Some(remaining);
                        self.report.extended.push(id);
                    }
                }
            }
            None => unit.auras.push(AuraHolder::new(
                spell.id,
                self.caster.id(),
                spell.effect_index,
                Some(remaining),
            )),
        }

        if self.components.is_affecting(id) {
            self.report.refreshed.push(id);
        } else {
            self.report.initial_hits.push(id);
        }
    }

    fn tick_all(&mut self, targets: &mut [Entity]) {
        for target in targets {
            if self.qualifies(target) {
                self.apply(target);
            }
        }
    }
}

impl VisitorMut for AreaTick<'_> {
    fn visit_observers(&mut self, observers: &mut [Entity]) {
        self.tick_all(observers);
    }

    fn visit_mobiles(&mut self, mobiles: &mut [Entity]) {
        self.tick_all(mobiles);
    }
}

/// Runs one tick of the area object `area_id` over `region`.
///
/// `region` must contain the area object and cover its radius, widened by
/// the largest target combat reach when the caster is player-controlled.
/// `caster` is a snapshot of the area's owner taken before the region was
/// borrowed. An id that names no area object inside the region, or an area
/// whose spell drives an effect slot past [`MAX_EFFECT_INDEX`], yields an
/// empty report.
pub fn apply_area_effect(
    region: &mut RegionMut<'_>,
    area_id: EntityId,
    caster: &Entity,
    rules: &dyn Rules,
) -> AreaEffectReport {
    let Some(area) = region.get(area_id).cloned() else {
        debug!(area = %area_id, "area object not in region");
        return AreaEffectReport::new(area_id);
    };
    let Some(components) = area.as_area_object() else {
        debug!(area = %area_id, "entity is not an area object");
        return AreaEffectReport::new(area_id);
    };
    if components.spell.effect_index > MAX_EFFECT_INDEX {
        warn!(
            area = %area_id,
            effect_index = components.spell.effect_index,
            "area spell drives no valid effect slot"
        );
        return AreaEffectReport::new(area_id);
    }

    let mut tick = AreaTick {
        area: &area,
        components,
        caster,
        rules,
        report: AreaEffectReport::new(area_id),
    };
    region.visit(&mut tick);
    let report = tick.report;

    if let Some(record) = region.get_mut(area_id).and_then(Entity::as_area_object_mut) {
        record.affected.extend(report.initial_hits.iter().copied());
    }

    debug!(
        area = %area_id,
        initial = report.initial_hits.len(),
        refreshed = report.refreshed.len(),
        extended = report.extended.len(),
        "area effect tick"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::rules::{FactionTable, StandardRules};
    use crate::spell::{AreaSpell, SpellId};
    use glam::Vec3;

    fn rules() -> StandardRules {
        StandardRules::new(FactionTable::new().with_hostility(1, 2))
    }

    fn unit_at(grid: &mut Grid, id: u64, faction: u32, x: f32) -> EntityId {
        let mut e = Entity::new_mobile(EntityId::new(id), Vec3::new(x, 0.0, 0.0), 50);
        e.as_unit_mut().unwrap().faction = faction;
        grid.insert(e).unwrap();
        EntityId::new(id)
    }

    fn area(grid: &mut Grid, caster: EntityId, spell: AreaSpell, duration_ms: u32) -> EntityId {
        let id = grid.next_id();
        grid.insert(Entity::new_area_object(id, Vec3::ZERO, caster, spell, 8.0, duration_ms))
            .unwrap();
        id
    }

    fn aura_duration(grid: &Grid, target: EntityId, spell: u32, caster: EntityId) -> Option<u32> {
        grid.get(target)?
            .as_unit()?
            .aura(SpellId(spell), caster)?
            .duration_ms
    }

    #[test]
    fn harmful_area_hits_enemies_only() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 3.0);
        let friend = unit_at(&mut grid, 3, 1, 3.0);
        let far_enemy = unit_at(&mut grid, 4, 2, 30.0);
        let id = area(&mut grid, caster, AreaSpell::harmful(9), 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![enemy]);
        assert!(aura_duration(&grid, enemy, 9, caster).is_some());
        assert!(aura_duration(&grid, friend, 9, caster).is_none());
        assert!(aura_duration(&grid, far_enemy, 9, caster).is_none());
    }

    #[test]
    fn beneficial_area_includes_caster() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let friend = unit_at(&mut grid, 2, 1, 2.0);
        unit_at(&mut grid, 3, 2, 2.0);
        let id = area(&mut grid, caster, AreaSpell::beneficial(4), 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![caster, friend]);
    }

    #[test]
    fn neutral_spells_hit_friend_and_foe() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 2.0);
        let friend = unit_at(&mut grid, 3, 1, 2.0);
        let far = unit_at(&mut grid, 4, 2, 30.0);
        let mut spell = AreaSpell::harmful(4);
        spell.polarity = Polarity::Neutral;
        let id = area(&mut grid, caster, spell, 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert!(report.initial_hits.contains(&enemy));
        assert!(report.initial_hits.contains(&friend));
        assert!(!report.initial_hits.contains(&far));
    }

    #[test]
    fn neutral_spells_still_skip_evading_targets() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let evading = unit_at(&mut grid, 2, 2, 2.0);
        grid.get_mut(evading).unwrap().as_unit_mut().unwrap().flags |= UnitFlags::EVADING;
        let mut spell = AreaSpell::harmful(4);
        spell.polarity = Polarity::Neutral;
        let id = area(&mut grid, caster, spell, 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert!(!report.initial_hits.contains(&evading));
    }

    #[test]
    fn target_entries_override_polarity() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let friend = unit_at(&mut grid, 2, 1, 2.0);
        let spell = AreaSpell::harmful(4).with_target_entries(vec![50]);
        let id = area(&mut grid, caster, spell, 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert!(report.initial_hits.contains(&friend));
    }

    #[test]
    fn players_only_attribute() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        unit_at(&mut grid, 2, 2, 2.0);
        let mut player = Entity::new_observer(EntityId::new(3), Vec3::new(2.0, 0.0, 0.0));
        player.as_unit_mut().unwrap().faction = 2;
        grid.insert(player).unwrap();

        let spell = AreaSpell::harmful(4).with_attributes(SpellAttributes::ONLY_ON_PLAYERS);
        let id = area(&mut grid, caster, spell, 5000);
        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![EntityId::new(3)]);
    }

    #[test]
    fn game_master_observers_are_skipped() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let mut gm = Entity::new_observer(EntityId::new(2), Vec3::new(2.0, 0.0, 0.0));
        gm.as_unit_mut().unwrap().faction = 1;
        gm.as_unit_mut().unwrap().flags |= UnitFlags::GAME_MASTER;
        grid.insert(gm).unwrap();

        let id = area(&mut grid, caster, AreaSpell::beneficial(4), 5000);
        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![caster]);
    }

    #[test]
    fn player_controlled_casters_reach_further() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        grid.get_mut(caster).unwrap().as_unit_mut().unwrap().flags |= UnitFlags::PLAYER_CONTROLLED;
        let edge = unit_at(&mut grid, 2, 2, 9.0);
        let id = area(&mut grid, caster, AreaSpell::harmful(4), 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![edge]);
    }

    #[test]
    fn large_combat_reach_is_not_capped() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        grid.get_mut(caster).unwrap().as_unit_mut().unwrap().flags |= UnitFlags::PLAYER_CONTROLLED;
        let giant = unit_at(&mut grid, 2, 2, 22.0);
        grid.get_mut(giant).unwrap().as_unit_mut().unwrap().combat_reach = 15.0;
        let small = unit_at(&mut grid, 3, 2, 22.0);
        let id = area(&mut grid, caster, AreaSpell::harmful(4), 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![giant]);
        assert!(!report.initial_hits.contains(&small));
    }

    #[test]
    fn existing_aura_gains_missing_effect() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 3.0);
        grid.get_mut(enemy)
            .unwrap()
            .as_unit_mut()
            .unwrap()
            .auras
            .push(AuraHolder::new(SpellId(4), caster, 0, Some(100)));

        let spell = AreaSpell::harmful(4).with_effect_index(2);
        let id = area(&mut grid, caster, spell, 5000);
        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert!(report.extended.is_empty());
        assert_eq!(report.initial_hits, vec![enemy]);

        let unit = grid.get(enemy).unwrap().as_unit().unwrap();
        let holder = unit.aura(SpellId(4), caster).unwrap();
        assert!(holder.has_effect(0));
        assert!(holder.has_effect(2));
        assert_eq!(holder.duration_ms, Some(100));
        assert_eq!(unit.auras.len(), 1);
    }

    #[test]
    fn existing_effect_is_extended() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 3.0);
        grid.get_mut(enemy)
            .unwrap()
            .as_unit_mut()
            .unwrap()
            .auras
            .push(AuraHolder::new(SpellId(4), caster, 0, Some(100)));

        let id = area(&mut grid, caster, AreaSpell::harmful(4), 5000);
        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.extended, vec![enemy]);
        assert_eq!(aura_duration(&grid, enemy, 4, caster), Some(5000));
    }

    #[test]
    fn out_of_range_effect_slot_applies_nothing() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 3.0);
        let mut spell = AreaSpell::harmful(4);
        spell.effect_index = 8;
        let id = area(&mut grid, caster, spell, 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report, AreaEffectReport::new(id));
        assert!(aura_duration(&grid, enemy, 4, caster).is_none());
    }

    #[test]
    fn effect_index_builder_is_bounded() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        let enemy = unit_at(&mut grid, 2, 2, 3.0);
        let id = area(&mut grid, caster, AreaSpell::harmful(4).with_effect_index(8), 5000);

        let report = grid.apply_area_effect(id, &rules()).unwrap();
        assert_eq!(report.initial_hits, vec![enemy]);
        let unit = grid.get(enemy).unwrap().as_unit().unwrap();
        assert!(unit.aura(SpellId(4), caster).unwrap().has_effect(MAX_EFFECT_INDEX));
    }

    #[test]
    fn missing_caster_affects_nobody() {
        let mut grid = Grid::default();
        unit_at(&mut grid, 2, 2, 3.0);
        let id = area(&mut grid, EntityId::new(77), AreaSpell::harmful(4), 5000);
        assert_eq!(grid.apply_area_effect(id, &rules()).unwrap(), AreaEffectReport::new(id));
    }

    #[test]
    fn unknown_area_is_an_error() {
        let mut grid = Grid::default();
        let caster = unit_at(&mut grid, 1, 1, 0.0);
        assert!(grid.apply_area_effect(caster, &rules()).is_err());
        assert!(grid.apply_area_effect(EntityId::new(42), &rules()).is_err());
    }
}
