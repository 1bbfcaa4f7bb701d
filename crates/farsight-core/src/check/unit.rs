//! Checks over units (observers and mobiles).

use crate::entity::{Entity, EntityKind, KindMask, UnitFlags, UnitState};
use crate::rules::Rules;
use crate::spell::SpellId;

use super::{narrow_by_distance, Check, Verdict};

fn living_unit(candidate: &Entity) -> Option<&UnitState> {
    candidate.as_unit().filter(|unit| unit.is_alive())
}

fn is_totem(candidate: &Entity) -> bool {
    candidate.has_unit_flags(UnitFlags::TOTEM)
}

/// Any living unit within range.
#[derive(Debug, Clone, Copy)]
pub struct AnyUnitInRange<'a> {
    focus: &'a Entity,
    range: f32,
}

impl<'a> AnyUnitInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32) -> Self {
        Self { focus, range }
    }
}

impl Check for AnyUnitInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.is_alive() && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}

/// Any dead unit within range.
#[derive(Debug, Clone, Copy)]
pub struct AnyDeadUnit<'a> {
    focus: &'a Entity,
    range: f32,
}

impl<'a> AnyDeadUnit<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32) -> Self {
        Self { focus, range }
    }
}

impl Check for AnyDeadUnit<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let dead = candidate.as_unit().is_some_and(|unit| !unit.is_alive());
        (dead && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}

/// Any living, stealthed unit the focus could attack.
#[derive(Clone, Copy)]
pub struct AnyStealthedUnit<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> AnyStealthedUnit<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for AnyStealthedUnit<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let stealthed = living_unit(candidate).is_some_and(|unit| unit.has_flags(UnitFlags::STEALTHED));
        (stealthed
            && self.focus.is_within_dist_in_map(candidate, self.range)
            && self.rules.can_attack(self.focus, candidate))
        .into()
    }
}

/// Any living observer within range.
#[derive(Debug, Clone, Copy)]
pub struct AnyPlayerInRange<'a> {
    focus: &'a Entity,
    range: f32,
}

impl<'a> AnyPlayerInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32) -> Self {
        Self { focus, range }
    }
}

impl Check for AnyPlayerInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::OBSERVERS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.is_alive() && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}

/// Any living observer within range carrying `spell`.
#[derive(Debug, Clone, Copy)]
pub struct AnyPlayerWithAuraInRange<'a> {
    focus: &'a Entity,
    range: f32,
    spell: SpellId,
}

impl<'a> AnyPlayerWithAuraInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, spell: SpellId) -> Self {
        Self { focus, range, spell }
    }
}

impl Check for AnyPlayerWithAuraInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::OBSERVERS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let has_aura = living_unit(candidate).is_some_and(|unit| unit.has_aura(self.spell));
        (has_aura && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}

/// Any living, non-friendly unit in range and in line of sight. Totems are
/// ignored.
#[derive(Clone, Copy)]
pub struct AnyUnfriendlyUnitInRange<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> AnyUnfriendlyUnitInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for AnyUnfriendlyUnitInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.is_alive()
            && !is_totem(candidate)
            && self.focus.is_within_dist_in_map(candidate, self.range)
            && !self.rules.is_friendly(self.focus, candidate)
            && self.rules.in_line_of_sight(self.focus, candidate))
        .into()
    }
}

/// Any living, friendly unit in range. The focus itself qualifies.
#[derive(Clone, Copy)]
pub struct AnyFriendlyUnitInRange<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> AnyFriendlyUnitInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for AnyFriendlyUnitInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.is_alive()
            && self.focus.is_within_dist_in_map(candidate, self.range)
            && self.rules.is_friendly(self.focus, candidate))
        .into()
    }
}

/// Any unit a harmful area effect centered on the focus could hit.
#[derive(Clone, Copy)]
pub struct AnyAoeTargetInRange<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> AnyAoeTargetInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for AnyAoeTargetInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.is_alive()
            && !is_totem(candidate)
            && self.focus.is_within_dist_in_map(candidate, self.range)
            && self.rules.can_attack(self.focus, candidate)
            && self.rules.in_line_of_sight(self.focus, candidate))
        .into()
    }
}

/// A friendly unit in range that lacks `spell`.
///
/// By default only units in combat qualify, matching buff-on-demand
/// behavior; [`FriendlyMissingAuraInRange::any_combat_state`] lifts that.
#[derive(Clone, Copy)]
pub struct FriendlyMissingAuraInRange<'a> {
    focus: &'a Entity,
    range: f32,
    spell: SpellId,
    in_combat_only: bool,
    rules: &'a dyn Rules,
}

impl<'a> FriendlyMissingAuraInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, spell: SpellId, rules: &'a dyn Rules) -> Self {
        Self {
            focus,
            range,
            spell,
            in_combat_only: true,
            rules,
        }
    }

    /// Also accept units out of combat.
    #[must_use]
    pub const fn any_combat_state(mut self) -> Self {
        self.in_combat_only = false;
        self
    }
}

impl Check for FriendlyMissingAuraInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let Some(unit) = living_unit(candidate) else {
            return Verdict::REJECT;
        };
        (!unit.has_aura(self.spell)
            && (!self.in_combat_only || unit.in_combat())
            && self.focus.is_within_dist_in_map(candidate, self.range)
            && self.rules.can_assist(self.focus, candidate))
        .into()
    }
}

/// An impaired friendly unit in combat that a dispel could free.
///
/// Candidates must have lost control of themselves. When `dispellable` is
/// non-empty they must also carry one of those spells. The focus is skipped
/// unless [`FriendlyEligibleForDispelInRange::including_self`] is used.
#[derive(Clone, Copy)]
pub struct FriendlyEligibleForDispelInRange<'a> {
    focus: &'a Entity,
    range: f32,
    dispellable: &'a [SpellId],
    include_self: bool,
    rules: &'a dyn Rules,
}

impl<'a> FriendlyEligibleForDispelInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(
        focus: &'a Entity,
        range: f32,
        dispellable: &'a [SpellId],
        rules: &'a dyn Rules,
    ) -> Self {
        Self {
            focus,
            range,
            dispellable,
            include_self: false,
            rules,
        }
    }

    /// Let the focus select itself.
    #[must_use]
    pub const fn including_self(mut self) -> Self {
        self.include_self = true;
        self
    }
}

impl Check for FriendlyEligibleForDispelInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        let Some(unit) = living_unit(candidate) else {
            return Verdict::REJECT;
        };
        if !unit.in_combat()
            || !unit.has_flags(UnitFlags::LOST_CONTROL)
            || (!self.include_self && candidate.id() == self.focus.id())
            || !self.rules.can_assist(self.focus, candidate)
            || !self.focus.is_within_dist_in_map(candidate, self.range)
        {
            return Verdict::REJECT;
        }
        (self.dispellable.is_empty() || self.dispellable.iter().any(|spell| unit.has_aura(*spell))).into()
    }
}

/// A living unit near `center` that the focus can assist and that plays on
/// the players' side.
///
/// With a group, only members of that group (observers and their pets)
/// qualify. Without one, any observer or player-controlled mobile does;
/// ordinary mobiles never do. Range is measured from `center`, not from the
/// focus.
#[derive(Clone, Copy)]
pub struct AnyFriendlyOrGroupMemberInRange<'a> {
    focus: &'a Entity,
    center: &'a Entity,
    group: Option<u32>,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> AnyFriendlyOrGroupMemberInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(
        focus: &'a Entity,
        center: &'a Entity,
        group: Option<u32>,
        range: f32,
        rules: &'a dyn Rules,
    ) -> Self {
        Self {
            focus,
            center,
            group,
            range,
            rules,
        }
    }
}

impl Check for AnyFriendlyOrGroupMemberInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        if !candidate.is_alive()
            || !self.center.is_within_dist_in_map(candidate, self.range)
            || !self.rules.can_assist(self.focus, candidate)
        {
            return Verdict::REJECT;
        }
        match self.group {
            Some(group) => (candidate.group() == Some(group)).into(),
            None => (candidate.kind() == EntityKind::Observer
                || candidate.has_unit_flags(UnitFlags::PLAYER_CONTROLLED))
            .into(),
        }
    }
}

/// Shared eligibility of the "most deficient" checks.
#[derive(Clone, Copy)]
struct Deficiency<'a> {
    focus: &'a Entity,
    range: f32,
    in_combat_only: bool,
    exclude_self: bool,
    rules: &'a dyn Rules,
}

impl Deficiency<'_> {
    fn eligible<'e>(&self, candidate: &'e Entity) -> Option<&'e UnitState> {
        let unit = living_unit(candidate)?;
        let eligible = (!self.in_combat_only || unit.in_combat())
            && !(self.exclude_self && candidate.id() == self.focus.id())
            && self.rules.can_assist(self.focus, candidate)
            && self.focus.is_within_dist_in_map(candidate, self.range);
        eligible.then_some(unit)
    }
}

/// The assistable unit missing the most health points.
///
/// Used with [`find_best`](crate::search::find_best): each match raises the
/// threshold, and ties keep the earlier candidate.
#[derive(Clone, Copy)]
pub struct MostHealthMissingInRange<'a> {
    base: Deficiency<'a>,
    min_missing: u32,
}

impl<'a> MostHealthMissingInRange<'a> {
    /// Creates the check. Candidates must miss more than `min_missing` health.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, min_missing: u32, rules: &'a dyn Rules) -> Self {
        Self {
            base: Deficiency {
                focus,
                range,
                in_combat_only: true,
                exclude_self: false,
                rules,
            },
            min_missing,
        }
    }

    /// Also accept units out of combat.
    #[must_use]
    pub const fn any_combat_state(mut self) -> Self {
        self.base.in_combat_only = false;
        self
    }

    /// Never select the focus itself.
    #[must_use]
    pub const fn excluding_self(mut self) -> Self {
        self.base.exclude_self = true;
        self
    }
}

impl Check for MostHealthMissingInRange<'_> {
    fn focus(&self) -> &Entity {
        self.base.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    #[allow(clippy::cast_precision_loss)]
    fn initial_bound(&self) -> Option<f32> {
        Some(self.min_missing as f32)
    }

    #[allow(clippy::cast_precision_loss)]
    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        let Some(unit) = self.base.eligible(candidate) else {
            return Verdict::REJECT;
        };
        let missing = unit.missing_health() as f32;
        if missing > bound.unwrap_or(self.min_missing as f32) {
            Verdict::narrowed(missing)
        } else {
            Verdict::REJECT
        }
    }
}

/// The assistable unit missing the largest share of its health.
#[derive(Clone, Copy)]
pub struct MostHealthPercentMissingInRange<'a> {
    base: Deficiency<'a>,
    min_missing_percent: f32,
}

impl<'a> MostHealthPercentMissingInRange<'a> {
    /// Creates the check. Candidates must miss more than `min_missing_percent`.
    #[must_use]
    pub const fn new(
        focus: &'a Entity,
        range: f32,
        min_missing_percent: f32,
        rules: &'a dyn Rules,
    ) -> Self {
        Self {
            base: Deficiency {
                focus,
                range,
                in_combat_only: true,
                exclude_self: false,
                rules,
            },
            min_missing_percent,
        }
    }

    /// Also accept units out of combat.
    #[must_use]
    pub const fn any_combat_state(mut self) -> Self {
        self.base.in_combat_only = false;
        self
    }

    /// Never select the focus itself.
    #[must_use]
    pub const fn excluding_self(mut self) -> Self {
        self.base.exclude_self = true;
        self
    }
}

impl Check for MostHealthPercentMissingInRange<'_> {
    fn focus(&self) -> &Entity {
        self.base.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn initial_bound(&self) -> Option<f32> {
        Some(self.min_missing_percent)
    }

    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        let Some(unit) = self.base.eligible(candidate) else {
            return Verdict::REJECT;
        };
        let missing = 100.0 - unit.health_percent();
        if missing > bound.unwrap_or(self.min_missing_percent) {
            Verdict::narrowed(missing)
        } else {
            Verdict::REJECT
        }
    }
}

/// The nearest living unit the focus can attack and see.
#[derive(Clone, Copy)]
pub struct NearestAttackableUnitInRange<'a> {
    focus: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> NearestAttackableUnitInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self { focus, range, rules }
    }
}

impl Check for NearestAttackableUnitInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::UNITS
    }

    fn initial_bound(&self) -> Option<f32> {
        Some(self.range)
    }

    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        if !candidate.is_alive()
            || !self.rules.can_attack(self.focus, candidate)
            || !self.rules.in_line_of_sight(self.focus, candidate)
        {
            return Verdict::REJECT;
        }
        narrow_by_distance(self.focus, candidate, bound, self.range)
    }
}

/// The nearest idle mobile willing to help the focus against `enemy`.
#[derive(Clone, Copy)]
pub struct NearestAssistCreatureInRange<'a> {
    focus: &'a Entity,
    enemy: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
}

impl<'a> NearestAssistCreatureInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, enemy: &'a Entity, range: f32, rules: &'a dyn Rules) -> Self {
        Self {
            focus,
            enemy,
            range,
            rules,
        }
    }
}

impl Check for NearestAssistCreatureInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::MOBILES
    }

    fn initial_bound(&self) -> Option<f32> {
        Some(self.range)
    }

    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        let Some(unit) = living_unit(candidate) else {
            return Verdict::REJECT;
        };
        if candidate.id() == self.focus.id()
            || unit.in_combat()
            || !self.rules.is_friendly(candidate, self.focus)
            || !self.rules.can_attack(candidate, self.enemy)
            || !self.rules.in_line_of_sight(self.focus, candidate)
        {
            return Verdict::REJECT;
        }
        narrow_by_distance(self.focus, candidate, bound, self.range)
    }
}

/// Liveness filter of [`NearestCreatureEntryInRange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiveState {
    /// Only living mobiles
    #[default]
    Alive,
    /// Only dead mobiles
    Dead,
    /// Either
    Any,
}

impl LiveState {
    fn admits(self, candidate: &Entity) -> bool {
        match self {
            Self::Alive => candidate.is_alive(),
            Self::Dead => !candidate.is_alive(),
            Self::Any => true,
        }
    }
}

/// The nearest mobile of a template entry.
#[derive(Debug, Clone, Copy)]
pub struct NearestCreatureEntryInRange<'a> {
    focus: &'a Entity,
    entry: u32,
    range: f32,
    live: LiveState,
    exclude_self: bool,
}

impl<'a> NearestCreatureEntryInRange<'a> {
    /// Creates the check for living mobiles, the focus included.
    #[must_use]
    pub const fn new(focus: &'a Entity, entry: u32, range: f32) -> Self {
        Self {
            focus,
            entry,
            range,
            live: LiveState::Alive,
            exclude_self: false,
        }
    }

    /// Restricts candidates by liveness.
    #[must_use]
    pub const fn live_state(mut self, live: LiveState) -> Self {
        self.live = live;
        self
    }

    /// Never select the focus itself.
    #[must_use]
    pub const fn excluding_self(mut self) -> Self {
        self.exclude_self = true;
        self
    }
}

impl Check for NearestCreatureEntryInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::MOBILES
    }

    fn initial_bound(&self) -> Option<f32> {
        Some(self.range)
    }

    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict {
        if candidate.entry() != Some(self.entry)
            || !self.live.admits(candidate)
            || (self.exclude_self && candidate.id() == self.focus.id())
        {
            return Verdict::REJECT;
        }
        narrow_by_distance(self.focus, candidate, bound, self.range)
    }
}

/// Every mobile of a template entry in range, dead or alive.
#[derive(Debug, Clone, Copy)]
pub struct AllCreaturesOfEntryInRange<'a> {
    focus: &'a Entity,
    entry: u32,
    range: f32,
}

impl<'a> AllCreaturesOfEntryInRange<'a> {
    /// Creates the check.
    #[must_use]
    pub const fn new(focus: &'a Entity, entry: u32, range: f32) -> Self {
        Self { focus, entry, range }
    }
}

impl Check for AllCreaturesOfEntryInRange<'_> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        KindMask::MOBILES
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (candidate.entry() == Some(self.entry) && self.focus.is_within_dist_in_map(candidate, self.range)).into()
    }
}
