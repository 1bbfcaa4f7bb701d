//! Per-observer visibility diffing.
//!
//! Each observer's session knows a set of entities the client has been told
//! about. A visibility pass compares that set with what the observer can see
//! right now:
//!
//! 1. The previously known set becomes the working set.
//! 2. Every entity visible now is removed from the working set and added to
//!    the new known set. It counts as *refreshed* if it was removed, and as
//!    *appeared* otherwise.
//! 3. Whatever is left in the working set has *disappeared*.
//!
//! An entity therefore can never both appear and disappear in one pass, and
//! a second pass over an unchanged world reports no appearances.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::VisibilityConfig;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::grid::Grid;
use crate::region::{Region, Visitor};
use crate::rules::Rules;

/// Entities an observer's client currently knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverState {
    known: BTreeSet<EntityId>,
}

impl ObserverState {
    /// An observer that knows nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The known set.
    #[must_use]
    pub const fn known(&self) -> &BTreeSet<EntityId> {
        &self.known
    }

    /// Returns `true` if `id` is in the known set.
    #[must_use]
    pub fn knows(&self, id: EntityId) -> bool {
        self.known.contains(&id)
    }

    /// Drops `id` from the known set, as after sending its removal
    /// out of band. Returns `true` if it was known.
    pub fn forget(&mut self, id: EntityId) -> bool {
        self.known.remove(&id)
    }
}

/// Outcome of one visibility pass. Each list is sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityDelta {
    /// Visible now, unknown before: send a create
    pub appeared: Vec<EntityId>,
    /// Visible now and before: send an update
    pub refreshed: Vec<EntityId>,
    /// Known before, not visible now: send a destroy
    pub disappeared: Vec<EntityId>,
}

impl VisibilityDelta {
    /// Returns `true` if nothing appeared or disappeared.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.appeared.is_empty() && self.disappeared.is_empty()
    }
}

struct VisibilityPass<'a> {
    observer: &'a Entity,
    rules: &'a dyn Rules,
    config: &'a VisibilityConfig,
    working: BTreeSet<EntityId>,
    visible_now: BTreeSet<EntityId>,
    appeared: BTreeSet<EntityId>,
}

impl<'g> Visitor<'g> for VisibilityPass<'_> {
    fn visit_container(&mut self, _kind: EntityKind, entities: &'g [Entity]) {
        for target in entities {
            if !self.rules.is_visible_for(self.observer, target, self.config) {
                continue;
            }
            let id = target.id();
            if !self.working.remove(&id) && !self.visible_now.contains(&id) {
                self.appeared.insert(id);
            }
            self.visible_now.insert(id);
        }
    }
}

/// Runs one visibility pass for `observer` over `region`.
///
/// `region` should cover the observer's sight range. The observer's known set
/// is replaced by the set visible now.
pub fn notify_visibility(
    state: &mut ObserverState,
    observer: &Entity,
    region: &Region<'_>,
    rules: &dyn Rules,
    config: &VisibilityConfig,
) -> VisibilityDelta {
    let mut pass = VisibilityPass {
        observer,
        rules,
        config,
        working: std::mem::take(&mut state.known),
        visible_now: BTreeSet::new(),
        appeared: BTreeSet::new(),
    };
    region.visit(&mut pass);

    let refreshed = pass
        .visible_now
        .iter()
        .copied()
        .filter(|id| !pass.appeared.contains(id))
        .collect();
    let delta = VisibilityDelta {
        appeared: pass.appeared.into_iter().collect(),
        refreshed,
        disappeared: pass.working.into_iter().collect(),
    };
    state.known = pass.visible_now;

    trace!(
        observer = %observer.id(),
        appeared = delta.appeared.len(),
        refreshed = delta.refreshed.len(),
        disappeared = delta.disappeared.len(),
        "visibility pass"
    );
    delta
}

/// Observer states of everyone currently in the world.
#[derive(Debug, Clone, Default)]
pub struct ObserverRegistry {
    states: BTreeMap<EntityId, ObserverState>,
}

impl ObserverRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer entering the world. Returns `false` if it was
    /// already registered.
    pub fn enter_world(&mut self, observer: EntityId) -> bool {
        if self.states.contains_key(&observer) {
            return false;
        }
        self.states.insert(observer, ObserverState::new());
        debug!(observer = %observer, "observer entered world");
        true
    }

    /// Drops an observer leaving the world together with its known set.
    pub fn leave_world(&mut self, observer: EntityId) -> Option<ObserverState> {
        let state = self.states.remove(&observer);
        if state.is_some() {
            debug!(observer = %observer, "observer left world");
        }
        state
    }

    /// The state of one observer.
    #[must_use]
    pub fn state(&self, observer: EntityId) -> Option<&ObserverState> {
        self.states.get(&observer)
    }

    /// The state of one observer for a manual pass.
    pub fn state_mut(&mut self, observer: EntityId) -> Option<&mut ObserverState> {
        self.states.get_mut(&observer)
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Observers whose client knows `target`, in id order.
    #[must_use]
    pub fn observers_aware_of(&self, target: EntityId) -> Vec<EntityId> {
        self.states
            .iter()
            .filter(|(_, state)| state.knows(target))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Removes `target` from every known set, returning the observers that
    /// need a destroy notice.
    pub fn forget_everywhere(&mut self, target: EntityId) -> Vec<EntityId> {
        self.states
            .iter_mut()
            .filter_map(|(id, state)| state.forget(target).then_some(*id))
            .collect()
    }

    /// Runs a visibility pass for every registered observer.
    ///
    /// Passes run in parallel: each touches only its own state and reads the
    /// grid. Observers missing from the grid are skipped and keep their
    /// state. Deltas are keyed by observer id.
    pub fn update_all(
        &mut self,
        grid: &Grid,
        rules: &dyn Rules,
        config: &VisibilityConfig,
    ) -> BTreeMap<EntityId, VisibilityDelta> {
        let deltas: BTreeMap<EntityId, VisibilityDelta> = self
            .states
            .par_iter_mut()
            .filter_map(|(id, state)| {
                let Some(observer) = grid.get(*id) else {
                    warn!(observer = %id, "registered observer not in grid");
                    return None;
                };
                let region = match grid.region(observer.position(), config.sight_range) {
                    Ok(region) => region,
                    Err(err) => {
                        warn!(observer = %id, error = %err, "cannot build sight region");
                        return None;
                    }
                };
                Some((*id, notify_visibility(state, observer, &region, rules, config)))
            })
            .collect();
        debug!(observers = deltas.len(), "visibility update");
        deltas
    }
}
