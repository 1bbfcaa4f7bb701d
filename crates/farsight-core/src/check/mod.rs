//! Predicates deciding whether a candidate qualifies for a search.
//!
//! A [`Check`] is immutable while a search runs. Checks that narrow toward a
//! best candidate (nearest, most wounded) do not keep that state themselves:
//! they receive the current bound and answer with a [`Verdict`] that may
//! carry a tighter one. The search algorithm owns the bound and feeds it back
//! on the next candidate.
//!
//! The catalogue is split by what the checks look at:
//! - [`unit`]: liveness, faction, auras and health of observers and mobiles
//! - [`object`]: inert objects, spell foci and corpses

pub mod object;
pub mod unit;

use std::fmt;

use crate::entity::{Entity, KindMask};

pub use object::{AllInertEntriesInRange, CannibalizeTarget, NearestInertEntryInRange, SpellFocusInRange};
pub use unit::{
    AllCreaturesOfEntryInRange, AnyAoeTargetInRange, AnyDeadUnit, AnyFriendlyUnitInRange,
    AnyPlayerInRange, AnyPlayerWithAuraInRange, AnyStealthedUnit, AnyUnfriendlyUnitInRange,
    AnyUnitInRange, AnyFriendlyOrGroupMemberInRange, FriendlyEligibleForDispelInRange,
    FriendlyMissingAuraInRange, LiveState, MostHealthMissingInRange,
    MostHealthPercentMissingInRange, NearestAssistCreatureInRange, NearestAttackableUnitInRange,
    NearestCreatureEntryInRange,
};

/// Answer of a [`Check`] for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Whether the candidate qualifies
    pub matched: bool,
    /// Tightened bound to use for later candidates, if any
    pub bound: Option<f32>,
}

impl Verdict {
    /// The candidate does not qualify.
    pub const REJECT: Self = Self {
        matched: false,
        bound: None,
    };

    /// The candidate qualifies without changing the bound.
    pub const ACCEPT: Self = Self {
        matched: true,
        bound: None,
    };

    /// The candidate qualifies and tightens the bound to `bound`.
    #[must_use]
    pub const fn narrowed(bound: f32) -> Self {
        Self {
            matched: true,
            bound: Some(bound),
        }
    }
}

impl From<bool> for Verdict {
    fn from(matched: bool) -> Self {
        if matched {
            Self::ACCEPT
        } else {
            Self::REJECT
        }
    }
}

/// Predicate over candidate entities.
pub trait Check {
    /// Entity the check is evaluated from; searches skip candidates outside
    /// its phase.
    fn focus(&self) -> &Entity;

    /// Categories the check looks at. Other containers are skipped.
    fn kinds(&self) -> KindMask;

    /// Bound a best-match search starts from.
    fn initial_bound(&self) -> Option<f32> {
        None
    }

    /// Evaluates one candidate against the current bound.
    fn check(&self, candidate: &Entity, bound: Option<f32>) -> Verdict;
}

/// A [`Check`] built from a closure.
///
/// ```
/// use farsight_core::check::{Check, FnCheck};
/// use farsight_core::entity::{Entity, EntityId, KindMask};
/// use glam::Vec3;
///
/// let me = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
/// let wounded = FnCheck::new(&me, KindMask::UNITS, |e: &Entity| {
///     e.as_unit().is_some_and(|u| u.missing_health() > 0)
/// });
/// assert!(!wounded.check(&me, None).matched);
/// ```
pub struct FnCheck<'a, F> {
    focus: &'a Entity,
    kinds: KindMask,
    predicate: F,
}

impl<'a, F: Fn(&Entity) -> bool> FnCheck<'a, F> {
    /// Wraps `predicate` as a check over `kinds`, evaluated from `focus`.
    #[must_use]
    pub const fn new(focus: &'a Entity, kinds: KindMask, predicate: F) -> Self {
        Self {
            focus,
            kinds,
            predicate,
        }
    }
}

impl<F> fmt::Debug for FnCheck<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCheck")
            .field("focus", &self.focus.id())
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl<F: Fn(&Entity) -> bool> Check for FnCheck<'_, F> {
    fn focus(&self) -> &Entity {
        self.focus
    }

    fn kinds(&self) -> KindMask {
        self.kinds
    }

    fn check(&self, candidate: &Entity, _bound: Option<f32>) -> Verdict {
        (self.predicate)(candidate).into()
    }
}

/// Accepts `candidate` if it lies within the current bound (or `range` before
/// the first match) and narrows the bound to its distance.
pub(crate) fn narrow_by_distance(focus: &Entity, candidate: &Entity, bound: Option<f32>, range: f32) -> Verdict {
    if !focus.in_same_phase(candidate) {
        return Verdict::REJECT;
    }
    let limit = bound.unwrap_or(range);
    let distance = focus.distance(candidate);
    if distance <= limit {
        Verdict::narrowed(distance)
    } else {
        Verdict::REJECT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use glam::Vec3;

    #[test]
    fn verdict_from_bool() {
        assert_eq!(Verdict::from(true), Verdict::ACCEPT);
        assert_eq!(Verdict::from(false), Verdict::REJECT);
        assert_eq!(Verdict::narrowed(2.0).bound, Some(2.0));
    }

    #[test]
    fn narrowing_uses_range_then_bound() {
        let focus = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        let near = Entity::new_mobile(EntityId::new(2), Vec3::new(3.0, 0.0, 0.0), 1);
        let far = Entity::new_mobile(EntityId::new(3), Vec3::new(8.0, 0.0, 0.0), 1);

        assert_eq!(narrow_by_distance(&focus, &far, None, 10.0), Verdict::narrowed(8.0));
        assert_eq!(narrow_by_distance(&focus, &far, Some(3.0), 10.0), Verdict::REJECT);
        assert_eq!(narrow_by_distance(&focus, &near, Some(8.0), 10.0), Verdict::narrowed(3.0));
        assert_eq!(narrow_by_distance(&focus, &far, None, 5.0), Verdict::REJECT);
    }

    #[test]
    fn narrowing_ignores_other_phases() {
        let focus = Entity::new_observer(EntityId::new(1), Vec3::ZERO);
        let ghost = Entity::new_mobile(EntityId::new(2), Vec3::X, 1).with_phase(8);
        assert_eq!(narrow_by_distance(&focus, &ghost, None, 10.0), Verdict::REJECT);
    }
}
