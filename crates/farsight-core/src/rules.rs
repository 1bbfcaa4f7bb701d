//! Game rules the engine consults but does not own.
//!
//! Faction standing, combat state, line of sight and immunities are decided
//! by other systems. Every check, notifier and tracker receives them through
//! one explicit [`Rules`] object instead of looking them up globally.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::VisibilityConfig;
use crate::entity::{Entity, EntityKind, UnitFlags};
use crate::spell::AreaSpell;

/// Standing of one entity towards another.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    /// Will fight
    Hostile,
    /// Neither helps nor fights
    Neutral,
    /// Will help
    Friendly,
}

/// Capability object answering rule questions about entities.
///
/// Only [`Rules::reaction`] is required. The provided methods derive the
/// other answers from entity state and can be overridden by callers with
/// richer knowledge (terrain, immunity tables, detection modifiers).
///
/// Implementations must be `Sync`: visibility passes for many observers share
/// one rules object across threads.
pub trait Rules: Sync {
    /// How `source` regards `target`.
    fn reaction(&self, source: &Entity, target: &Entity) -> Reaction;

    /// Returns `true` if `source` regards `target` as friendly.
    fn is_friendly(&self, source: &Entity, target: &Entity) -> bool {
        self.reaction(source, target) == Reaction::Friendly
    }

    /// Returns `true` if `source` regards `target` as hostile.
    fn is_hostile(&self, source: &Entity, target: &Entity) -> bool {
        self.reaction(source, target) == Reaction::Hostile
    }

    /// Returns `true` if the unit is exempt from engagement while it
    /// returns home.
    fn is_evading(&self, entity: &Entity) -> bool {
        entity.has_unit_flags(UnitFlags::EVADING)
    }

    /// Whether `attacker` may target `target` with harmful effects.
    ///
    /// Liveness is left to the caller.
    fn can_attack(&self, attacker: &Entity, target: &Entity) -> bool {
        let Some(unit) = target.as_unit() else {
            return false;
        };
        attacker.id() != target.id()
            && !unit.flags.intersects(UnitFlags::TAXI_FLYING | UnitFlags::GAME_MASTER)
            && !self.is_evading(target)
            && !self.is_friendly(attacker, target)
    }

    /// Whether `helper` may target `target` with beneficial effects.
    fn can_assist(&self, helper: &Entity, target: &Entity) -> bool {
        target.as_unit().is_some() && self.is_friendly(helper, target)
    }

    /// Whether an unobstructed line runs from `from` to `to`.
    fn in_line_of_sight(&self, _from: &Entity, _to: &Entity) -> bool {
        true
    }

    /// Whether `target` ignores `spell`.
    fn is_immune(&self, _target: &Entity, _spell: &AreaSpell) -> bool {
        false
    }

    /// Whether `observer` notices `target` despite stealth.
    fn can_detect(&self, observer: &Entity, target: &Entity, config: &VisibilityConfig) -> bool {
        if !target.has_unit_flags(UnitFlags::STEALTHED)
            || observer.has_unit_flags(UnitFlags::GAME_MASTER)
            || self.is_friendly(observer, target)
        {
            return true;
        }
        observer.distance_squared(target) <= config.stealth_detect_range * config.stealth_detect_range
    }

    /// Whether `target` is currently visible to `observer`.
    ///
    /// An entity never sees itself. Beyond that the target must share a
    /// phase, lie within sight range and not be hidden by invisibility,
    /// stealth or being despawned.
    fn is_visible_for(&self, observer: &Entity, target: &Entity, config: &VisibilityConfig) -> bool {
        if observer.id() == target.id() || !observer.is_within_dist_in_map(target, config.sight_range) {
            return false;
        }
        if target.kind() == EntityKind::Inert && !target.as_inert().is_some_and(|o| o.spawned) {
            return false;
        }
        if target.has_unit_flags(UnitFlags::INVISIBLE) && !observer.has_unit_flags(UnitFlags::GAME_MASTER) {
            return false;
        }
        self.can_detect(observer, target, config)
    }
}

/// Symmetric table of hostile faction pairs.
///
/// Units of the same faction are friendly, listed pairs are hostile and
/// everything else is neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionTable {
    hostile: BTreeSet<(u32, u32)>,
}

impl FactionTable {
    /// An empty table: every distinct pair is neutral.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `a` and `b` as hostile to each other.
    #[must_use]
    pub fn with_hostility(mut self, a: u32, b: u32) -> Self {
        self.hostile.insert((a.min(b), a.max(b)));
        self
    }

    /// Standing between two factions.
    #[must_use]
    pub fn reaction(&self, a: u32, b: u32) -> Reaction {
        if a == b {
            Reaction::Friendly
        } else if self.hostile.contains(&(a.min(b), a.max(b))) {
            Reaction::Hostile
        } else {
            Reaction::Neutral
        }
    }
}

/// Rules driven by a [`FactionTable`] over open terrain.
#[derive(Debug, Clone, Default)]
pub struct StandardRules {
    factions: FactionTable,
}

impl StandardRules {
    /// Creates rules from a faction table.
    #[must_use]
    pub const fn new(factions: FactionTable) -> Self {
        Self { factions }
    }

    /// The faction table in use.
    #[must_use]
    pub const fn factions(&self) -> &FactionTable {
        &self.factions
    }
}

impl Rules for StandardRules {
    fn reaction(&self, source: &Entity, target: &Entity) -> Reaction {
        match (source.faction(), target.faction()) {
            (Some(a), Some(b)) => self.factions.reaction(a, b),
            _ => Reaction::Neutral,
        }
    }
}
