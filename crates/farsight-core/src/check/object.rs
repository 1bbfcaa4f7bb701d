//! Checks over inert objects and corpses.

use crate::entity::{CreatureType, Entity, EntityKind, InertRole, KindMask};
use crate::rules::Rules;

use super::{narrow_by_distance, Check, Verdict};

fn spawned_with_entry(candidate: &Entity, entry: u32) -> bool {
    candidate
        .as_inert()
        .is_some_and(|object| object.spawned && object.entry == entry)
}

/// The nearest spawned inert object of a template entry.
#[derive(Debug, Clone, Copy)]
pub struct NearestInertEntryInRange<'a> {
    focus: &'a Entity,
    entry: u32,
    range: f32,
}

impl<'a> NearestInertEntryInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, entry: u32, range: f32) -> Self {
        Self { focus, entry, range }
    }
}

impl Check for NearestInertEntryInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::INERT
    }

    fn initial_bound(&self) -> Option<f32> {
        Some(self.range)
    }

    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        if !spawned_with_entry(candidate, self.entry) {
            return Verdict::REJECT;
        }
        narrow_by_distance(self.focus, candidate, bound, self.range)
    }
}

/// Every inert object of a template entry in range, spawned or not.
#[derive(Debug, Clone, Copy)]
pub struct AllInertEntriesInRange<'a> {
    focus: &'a Entity,
    entry: u32,
    range: f32,
}

impl<'a> AllInertEntriesInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, entry: u32, range: f32) -> Self {
        Self { focus, entry, range }
    }
}

impl Check for AllInertEntriesInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::INERT
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.entry() == Some(self.entry) && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}

/// A spawned spell focus of the requested kind whose own radius covers the
/// focus entity.
#[derive(Debug, Clone, Copy)]
pub struct SpellFocusInRange<'a> {
    focus: &'a Entity,
    focus_id: u32,
}

impl<'a> SpellFocusInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, focus_id: u32) -> Self {
        Self { focus, focus_id }
    }
}

impl Check for SpellFocusInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::INERT
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let Some(object) = candidate.as_inert().filter(|o| o.spawned) else {
            return Verdict::REJECT;
        };
        match object.role {
            InertRole::SpellFocus { focus_id, radius } if focus_id == self.focus_id => {
                self.focus.is_within_dist_in_map(candidate, radius).into()
            }
            _ => Verdict::REJECT,
        }
    }
}

/// Remains the focus could feed on: dead non-friendly observers, dead
/// humanoid or undead mobiles, and non-friendly corpses.
#[derive(Clone, Copy)]
pub struct CannibalizeTarget<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> CannibalizeTarget<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for CannibalizeTarget<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::OBSERVERS | KindMask::MOBILES | KindMask::CORPSES
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        if !self.focus.is_within_dist_in_map(candidate, self.range) {
            return Verdict::REJECT;
        }
        let edible = match candidate.kind() {
            EntityKind::Observer => !candidate.is_alive() && !self.rules.is_friendly(self.focus, candidate),
            EntityKind::Mobile => {
                !candidate.is_alive()
                    && candidate.as_mobile().is_some_and(|m| {
                        matches!(m.creature_type, CreatureType::Humanoid | CreatureType::Undead)
                    })
            }
            EntityKind::Corpse => !self.rules.is_friendly(self.focus, candidate),
            EntityKind::Inert | EntityKind::AreaObject => false,
        };
        edible.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::rules::{FactionTable, StandardRules};
    use glam::Vec3;

    fn object(id: u64, entry: u32, x: f32) -> Entity {
        Entity::new_inert(EntityId::new(id), Vec3::new(x, 0.0, 0.0), entry)
    }

    #[test]
    fn nearest_inert_skips_despawned() {
        let focus = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        let check = NearestInertEntryInRange::new(&focus, 5, 20.0);

        assert_eq!(check.check(&object(2, 5, 10.0), check.initial_bound()), Verdict::narrowed(10.0));

        let mut hidden = object(3, 5, 2.0);
        hidden.as_inert_mut().unwrap().spawned = false;
        assert_eq!(check.check(&hidden, Some(10.0)), Verdict::REJECT);
        assert_eq!(check.check(&object(4, 6, 2.0), Some(10.0)), Verdict::REJECT);
    }

    #[test]
    fn all_inert_entries_include_despawned() {
        let focus = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        let check = AllInertEntriesInRange::new(&focus, 5, 20.0);
        let mut hidden = object(2, 5, 2.0);
        hidden.as_inert_mut().unwrap().spawned = false;
        assert!(check.check(&hidden, None).matched);
        assert!(!check.check(&object(3, 5, 30.0), None).matched);
    }

    #[test]
    fn spell_focus_uses_own_radius() {
        let caster = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        let mut anvil = object(2, 100, 4.0);
        anvil.as_inert_mut().unwrap().role = InertRole::SpellFocus {
            focus_id: 3,
            radius: 5.0,
        };

        assert!(SpellFocusInRange::new(&caster, 3).check(&anvil, None).matched);
        assert!(!SpellFocusInRange::new(&caster, 4).check(&anvil, None).matched);

        anvil.as_inert_mut().unwrap().role = InertRole::SpellFocus {
            focus_id: 3,
            radius: 3.0,
        };
        assert!(!SpellFocusInRange::new(&caster, 3).check(&anvil, None).matched);
    }

    #[test]
    fn cannibalize_targets() {
        let rules = StandardRules::new(FactionTable::new().with_hostility(1, 2));
        let mut ghoul = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        ghoul.as_unit_mut().unwrap().faction = 1;
        let check = CannibalizeTarget::new(&ghoul, 10.0, &rules);

        let mut dead_enemy = Entity::new_observer(EntityId::new(2), Vec3::X);
        dead_enemy.as_unit_mut().unwrap().faction = 2;
        dead_enemy.as_unit_mut().unwrap().health = 0;
        assert!(check.check(&dead_enemy, None).matched);

        let mut dead_friend = dead_enemy.clone();
        dead_friend.as_unit_mut().unwrap().faction = 1;
        assert!(!check.check(&dead_friend, None).matched);

        let mut dead_beast = Entity::new_mobile(EntityId::new(3), Vec3::X, 1);
        dead_beast.as_unit_mut().unwrap().health = 0;
        dead_beast.as_mobile_mut().unwrap().creature_type = CreatureType::Beast;
        assert!(!check.check(&dead_beast, None).matched);
        dead_beast.as_mobile_mut().unwrap().creature_type = CreatureType::Undead;
        assert!(check.check(&dead_beast, None).matched);

        let corpse = Entity::new_corpse(EntityId::new(4), Vec3::X, EntityId::new(8), 2);
        assert!(check.check(&corpse, None).matched);
        let far_corpse = Entity::new_corpse(EntityId::new(5), Vec3::new(50.0, 0.0, 0.0), EntityId::new(8), 2);
        assert!(!check.check(&far_corpse, None).matched);
    }
}
