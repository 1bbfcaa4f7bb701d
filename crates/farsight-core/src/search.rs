//! Search strategies shared by every check.
//!
//! | Strategy | Stops early | Result |
//! |----------|-------------|--------|
//! | [`find_first`] | on the first match | `Option<&Entity>` |
//! | [`find_best`] | never | `Option<&Entity>`, the last candidate that narrowed the bound |
//! | [`collect_all`] | never | `Vec<&Entity>` in traversal order |
//! | [`apply_to_all`] / [`apply_to_all_mut`] | never | action side effects |
//!
//! All strategies only look at the containers a check (or scope) names, and
//! skip candidates that share no phase with the check's focus. An empty
//! region is not an error: it yields `None` or an empty `Vec`.

use tracing::trace;

use crate::check::Check;
use crate::entity::{Entity, EntityKind, KindMask};
use crate::region::{Region, RegionMut, Visitor, VisitorMut};

fn in_scope<C: Check + ?Sized>(check: &C, candidate: &Entity) -> bool {
    candidate.in_same_phase(check.focus())
}

struct FirstMatch<'g, 'c, C: ?Sized> {
    check: &'c C,
    found: Option<&'g Entity>,
}

impl<'g, C: Check + ?Sized> Visitor<'g> for FirstMatch<'g, '_, C> {
    fn visit_container(&mut self, kind: EntityKind, entities: &'g [Entity]) {
        if !self.check.kinds().includes(kind) {
            return;
        }
        let check = self.check;
        self.found = entities
            .iter()
            .find(|c| in_scope(check, c) && check.check(c, None).matched);
    }

    fn is_done(&self) -> bool {
        self.found.is_some()
    }
}

/// Returns the first qualifying entity in traversal order.
///
/// No container is visited after a match is found.
pub fn find_first<'g, C: Check + ?Sized>(region: &Region<'g>, check: &C) -> Option<&'g Entity> {
    let mut search = FirstMatch { check, found: None };
    region.visit(&mut search);
    trace!(found = ?search.found.map(Entity::id), "first-match search");
    search.found
}

struct BestMatch<'g, 'c, C: ?Sized> {
    check: &'c C,
    bound: Option<f32>,
    best: Option<&'g Entity>,
}

impl<'g, C: Check + ?Sized> Visitor<'g> for BestMatch<'g, '_, C> {
    fn visit_container(&mut self, kind: EntityKind, entities: &'g [Entity]) {
        let check = self.check;
        if !check.kinds().includes(kind) {
            return;
        }
        for candidate in entities.iter().filter(|c| in_scope(check, c)) {
            let verdict = check.check(candidate, self.bound);
            if verdict.matched {
                self.best = Some(candidate);
                if verdict.bound.is_some() {
                    self.bound = verdict.bound;
                }
            }
        }
    }
}

/// Returns the best qualifying entity.
///
/// Every candidate is examined. A check that narrows its bound on each match
/// (nearest first, most wounded first) makes the last match the best one;
/// ties between equally good candidates go to traversal order.
pub fn find_best<'g, C: Check + ?Sized>(region: &Region<'g>, check: &C) -> Option<&'g Entity> {
    let mut search = BestMatch {
        check,
        bound: check.initial_bound(),
        best: None,
    };
    region.visit(&mut search);
    trace!(found = ?search.best.map(Entity::id), bound = ?search.bound, "best-match search");
    search.best
}

struct CollectAll<'g, 'c, C: ?Sized> {
    check: &'c C,
    out: Vec<&'g Entity>,
}

impl<'g, C: Check + ?Sized> Visitor<'g> for CollectAll<'g, '_, C> {
    fn visit_container(&mut self, kind: EntityKind, entities: &'g [Entity]) {
        let check = self.check;
        if !check.kinds().includes(kind) {
            return;
        }
        self.out.extend(
            entities
                .iter()
                .filter(|c| in_scope(check, c) && check.check(c, None).matched),
        );
    }
}

/// Returns every qualifying entity in traversal order.
pub fn collect_all<'g, C: Check + ?Sized>(region: &Region<'g>, check: &C) -> Vec<&'g Entity> {
    let mut search = CollectAll {
        check,
        out: Vec::new(),
    };
    region.visit(&mut search);
    trace!(count = search.out.len(), "collect-all search");
    search.out
}

/// Which entities an unconditional action reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerScope {
    /// Categories the action applies to
    pub kinds: KindMask,
    /// Phases the action applies to
    pub phase_mask: u32,
}

impl WorkerScope {
    /// Every entity of `kinds` in any phase.
    #[must_use]
    pub const fn new(kinds: KindMask) -> Self {
        Self {
            kinds,
            phase_mask: u32::MAX,
        }
    }

    /// Restricts the scope to entities sharing a phase with `phase_mask`.
    #[must_use]
    pub const fn in_phase(mut self, phase_mask: u32) -> Self {
        self.phase_mask = phase_mask;
        self
    }

    fn admits(&self, kind: EntityKind, entity: &Entity) -> bool {
        self.kinds.includes(kind) && entity.phase_mask() & self.phase_mask != 0
    }
}

struct Worker<F> {
    scope: WorkerScope,
    action: F,
}

impl<'g, F: FnMut(&'g Entity)> Visitor<'g> for Worker<F> {
    fn visit_container(&mut self, kind: EntityKind, entities: &'g [Entity]) {
        for entity in entities {
            if self.scope.admits(kind, entity) {
                (self.action)(entity);
            }
        }
    }
}

impl<F: FnMut(&mut Entity)> VisitorMut for Worker<F> {
    fn visit_container(&mut self, kind: EntityKind, entities: &mut [Entity]) {
        for entity in entities {
            if self.scope.admits(kind, entity) {
                (self.action)(entity);
            }
        }
    }
}

/// Runs `action` on every entity in scope.
pub fn apply_to_all<'g, F: FnMut(&'g Entity)>(region: &Region<'g>, scope: WorkerScope, action: F) {
    region.visit(&mut Worker { scope, action });
}

/// Runs a mutating `action` on every entity in scope.
pub fn apply_to_all_mut<F: FnMut(&mut Entity)>(region: &mut RegionMut<'_>, scope: WorkerScope, action: F) {
    region.visit(&mut Worker { scope, action });
}
