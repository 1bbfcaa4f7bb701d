//! Component structs for each entity kind.
//!
//! Observers and mobiles share [`UnitState`]; the remaining kinds carry only
//! what the engine reads from them.

use std::collections::BTreeSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::spell::{AreaSpell, SpellId, MAX_EFFECT_INDEX};

/// Combat reach given to units unless configured otherwise.
pub const DEFAULT_COMBAT_REACH: f32 = 1.5;

bitflags! {
    /// Status flags of a unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitFlags: u32 {
        /// Engaged in combat.
        const IN_COMBAT = 1 << 0;
        /// Evading: exempt from engagement and area effects.
        const EVADING = 1 << 1;
        /// Stealthed: only visible to observers that detect it.
        const STEALTHED = 1 << 2;
        /// On a flight path; ignored by most checks.
        const TAXI_FLYING = 1 << 3;
        /// Game master mode.
        const GAME_MASTER = 1 << 4;
        /// Visibility switched off entirely.
        const INVISIBLE = 1 << 5;
        /// Stunned, feared or charmed: cannot react on its own.
        const LOST_CONTROL = 1 << 6;
        /// Controlled by a player (the player itself or its pet).
        const PLAYER_CONTROLLED = 1 << 7;
        /// A totem; skipped by area targeting.
        const TOTEM = 1 << 8;
    }
}

/// Creature classification used by corpse-related checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CreatureType {
    /// Animals
    Beast,
    /// Humanoids
    Humanoid,
    /// Undead
    Undead,
    /// Anything else
    #[default]
    Other,
}

/// Client language index of a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Locale(pub u8);

/// An applied spell, possibly covering several effect slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraHolder {
    /// Spell template
    pub spell: SpellId,
    /// Who applied it
    pub caster: EntityId,
    /// Remaining duration in milliseconds, `None` when permanent
    pub duration_ms: Option<u32>,
    /// Bit `i` set when effect slot `i` is active
    pub effects: u8,
}

impl AuraHolder {
    /// Create a holder with a single active effect slot.
    #[must_use]
    pub fn new(spell: SpellId, caster: EntityId, effect_index: u8, duration_ms: Option<u32>) -> Self {
        Self {
            spell,
            caster,
            duration_ms,
            effects: effect_bit(effect_index),
        }
    }

    /// Returns `true` if the effect slot is active.
    #[must_use]
    pub fn has_effect(&self, effect_index: u8) -> bool {
        let bit = effect_bit(effect_index);
        bit != 0 && self.effects & bit != 0
    }

    /// Activate an effect slot. Slots past [`MAX_EFFECT_INDEX`] are ignored.
    pub fn add_effect(&mut self, effect_index: u8) {
        self.effects |= effect_bit(effect_index);
    }
}

fn effect_bit(effect_index: u8) -> u8 {
    if effect_index > MAX_EFFECT_INDEX {
        return 0;
    }
    1 << effect_index
}

/// State shared by every unit (observers and mobiles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    /// Current health; zero means dead
    pub health: u32,
    /// Maximum health
    pub max_health: u32,
    /// Faction used for friend-or-foe decisions
    pub faction: u32,
    /// Status flags
    pub flags: UnitFlags,
    /// Melee reach, added to some area radii
    pub combat_reach: f32,
    /// Applied spells
    pub auras: Vec<AuraHolder>,
}

impl Default for UnitState {
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            faction: 0,
            flags: UnitFlags::empty(),
            combat_reach: DEFAULT_COMBAT_REACH,
            auras: Vec::new(),
        }
    }
}

impl UnitState {
    /// A living unit of the given faction at full health.
    #[must_use]
    pub fn of_faction(faction: u32) -> Self {
        Self {
            faction,
            ..Self::default()
        }
    }

    /// Returns `true` while health is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Returns `true` if every flag in `flags` is set.
    #[must_use]
    pub fn has_flags(&self, flags: UnitFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Returns `true` while engaged in combat.
    #[must_use]
    pub fn in_combat(&self) -> bool {
        self.flags.contains(UnitFlags::IN_COMBAT)
    }

    /// Health points below maximum.
    #[must_use]
    pub const fn missing_health(&self) -> u32 {
        self.max_health.saturating_sub(self.health)
    }

    /// Current health as a percentage of maximum.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn health_percent(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 * 100.0 / self.max_health as f32
    }

    /// Returns `true` if any caster's holder of `spell` is present.
    #[must_use]
    pub fn has_aura(&self, spell: SpellId) -> bool {
        self.auras.iter().any(|a| a.spell == spell)
    }

    /// The holder of `spell` applied by `caster`, if any.
    #[must_use]
    pub fn aura(&self, spell: SpellId, caster: EntityId) -> Option<&AuraHolder> {
        self.auras
            .iter()
            .find(|a| a.spell == spell && a.caster == caster)
    }

    /// Mutable access to the holder of `spell` applied by `caster`.
    pub fn aura_mut(&mut self, spell: SpellId, caster: EntityId) -> Option<&mut AuraHolder> {
        self.auras
            .iter_mut()
            .find(|a| a.spell == spell && a.caster == caster)
    }

    /// Counts down timed auras and drops the ones that ran out.
    ///
    /// Returns the spells whose holders expired, in holder order.
    pub fn advance_auras(&mut self, elapsed_ms: u32) -> Vec<SpellId> {
        let mut expired = Vec::new();
        self.auras.retain_mut(|aura| match aura.duration_ms {
            Some(remaining) if remaining <= elapsed_ms => {
                expired.push(aura.spell);
                false
            }
            Some(remaining) => {
                aura.duration_ms = Some(remaining - elapsed_ms);
                true
            }
            None => true,
        });
        expired
    }
}

/// Network session data of an observer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionState {
    /// Client locale, `None` for the default language
    pub locale: Option<Locale>,
    /// Team used by team-only broadcasts
    pub team: u32,
    /// Player group, if the observer is in one
    #[serde(default)]
    pub group: Option<u32>,
}

/// Components of an observer (a unit with a network session).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverComponents {
    /// Unit state
    pub unit: UnitState,
    /// Session data
    pub session: SessionState,
}

/// Components of a mobile non-player actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileComponents {
    /// Unit state
    pub unit: UnitState,
    /// Template entry
    pub entry: u32,
    /// Creature classification
    pub creature_type: CreatureType,
    /// Group of the owning player, for player-controlled pets
    #[serde(default)]
    pub owner_group: Option<u32>,
}

/// What an inert world object is used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum InertRole {
    /// Decoration, doors, chests and the like
    #[default]
    Generic,
    /// Required nearby to cast certain spells
    SpellFocus {
        /// Focus identifier spells ask for
        focus_id: u32,
        /// Distance within which the focus counts
        radius: f32,
    },
}

/// Components of an inert world object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InertComponents {
    /// Template entry
    pub entry: u32,
    /// Whether the object is currently spawned
    pub spawned: bool,
    /// Purpose of the object
    pub role: InertRole,
}

impl Default for InertComponents {
    fn default() -> Self {
        Self {
            entry: 0,
            spawned: true,
            role: InertRole::Generic,
        }
    }
}

/// Components of a corpse left by an observer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpseComponents {
    /// The observer the corpse belongs to
    pub owner: EntityId,
    /// The owner's faction at time of death
    pub faction: u32,
}

/// Components of a persistent area object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaObjectComponents {
    /// Unit that created the area
    pub caster: EntityId,
    /// Spell the area keeps applying
    pub spell: AreaSpell,
    /// Radius of the affected area
    pub radius: f32,
    /// Remaining lifetime in milliseconds
    pub duration_ms: u32,
    /// Targets that already received the initial hit
    pub affected: BTreeSet<EntityId>,
}

impl AreaObjectComponents {
    /// Create an area with an empty application record.
    #[must_use]
    pub fn new(caster: EntityId, spell: AreaSpell, radius: f32, duration_ms: u32) -> Self {
        Self {
            caster,
            spell,
            radius,
            duration_ms,
            affected: BTreeSet::new(),
        }
    }

    /// Returns `true` if `target` already received the initial hit.
    #[must_use]
    pub fn is_affecting(&self, target: EntityId) -> bool {
        self.affected.contains(&target)
    }

    /// Counts down the lifetime; returns `true` once it has run out.
    pub fn advance(&mut self, elapsed_ms: u32) -> bool {
        self.duration_ms = self.duration_ms.saturating_sub(elapsed_ms);
        self.duration_ms == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_defaults_alive_at_full_health() {
        let unit = UnitState::default();
        assert!(unit.is_alive());
        assert_eq!(unit.missing_health(), 0);
        assert!((unit.health_percent() - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn health_percent_handles_zero_max() {
        let unit = UnitState {
            health: 0,
            max_health: 0,
            ..UnitState::default()
        };
        assert_eq!(unit.health_percent(), 0.0);
    }

    #[test]
    fn aura_lookup_is_per_caster() {
        let mut unit = UnitState::default();
        unit.auras
            .push(AuraHolder::new(SpellId(5), EntityId::new(1), 0, Some(1000)));

        assert!(unit.has_aura(SpellId(5)));
        assert!(unit.aura(SpellId(5), EntityId::new(1)).is_some());
        assert!(unit.aura(SpellId(5), EntityId::new(2)).is_none());
    }

    #[test]
    fn advance_auras_drops_expired_and_keeps_permanent() {
        let mut unit = UnitState::default();
        unit.auras
            .push(AuraHolder::new(SpellId(1), EntityId::new(9), 0, Some(500)));
        unit.auras
            .push(AuraHolder::new(SpellId(2), EntityId::new(9), 0, Some(2000)));
        unit.auras
            .push(AuraHolder::new(SpellId(3), EntityId::new(9), 0, None));

        let expired = unit.advance_auras(500);

        assert_eq!(expired, vec![SpellId(1)]);
        assert_eq!(unit.auras.len(), 2);
        assert_eq!(
            unit.aura(SpellId(2), EntityId::new(9)).unwrap().duration_ms,
            Some(1500)
        );
        assert_eq!(unit.aura(SpellId(3), EntityId::new(9)).unwrap().duration_ms, None);
    }

    #[test]
    fn holder_effect_mask() {
        let mut holder = AuraHolder::new(SpellId(1), EntityId::new(1), 1, None);
        assert!(holder.has_effect(1));
        assert!(!holder.has_effect(0));
        holder.add_effect(0);
        assert!(holder.has_effect(0));
    }

    #[test]
    fn holder_ignores_slots_past_the_last() {
        let mut holder = AuraHolder::new(SpellId(1), EntityId::new(1), 8, None);
        assert_eq!(holder.effects, 0);
        holder.add_effect(MAX_EFFECT_INDEX + 1);
        holder.add_effect(u8::MAX);
        assert_eq!(holder.effects, 0);
        assert!(!holder.has_effect(8));
        assert!(!holder.has_effect(u8::MAX));
        holder.add_effect(MAX_EFFECT_INDEX);
        assert!(holder.has_effect(MAX_EFFECT_INDEX));
    }

    #[test]
    fn area_object_lifetime() {
        let mut area =
            AreaObjectComponents::new(EntityId::new(1), AreaSpell::harmful(1), 8.0, 1000);
        assert!(!area.advance(400));
        assert_eq!(area.duration_ms, 600);
        assert!(area.advance(700));
        assert_eq!(area.duration_ms, 0);
    }

    #[test]
    fn component_structs_are_serializable() {
        let mobile = MobileComponents::default();
        let json = serde_json::to_string(&mobile).unwrap();
        let back: MobileComponents = serde_json::from_str(&json).unwrap();
        assert_eq!(mobile, back);
    }
}
