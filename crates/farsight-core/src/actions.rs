//! Unconditional world actions built on the dispatch protocol.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VisibilityConfig;
use crate::entity::{Entity, EntityId, UnitFlags};
use crate::region::{Region, RegionMut, Visitor, VisitorMut};
use crate::rules::Rules;

/// Brings dead mobiles back to full health and respawns despawned inert
/// objects. Observers and corpses are left alone.
#[derive(Debug, Clone, Default)]
pub struct RespawnAction {
    respawned: Vec<EntityId>,
}

impl RespawnAction {
    /// A fresh action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities respawned so far, in traversal order.
    #[must_use]
    pub fn respawned(&self) -> &[EntityId] {
        &self.respawned
    }

    /// Consumes the action, returning what it respawned.
    #[must_use]
    pub fn into_respawned(self) -> Vec<EntityId> {
        self.respawned
    }
}

impl VisitorMut for RespawnAction {
    fn visit_mobiles(&mut self, mobiles: &mut [Entity]) {
        for mobile in mobiles {
            let id = mobile.id();
            if let Some(unit) = mobile.as_unit_mut().filter(|u| !u.is_alive()) {
                unit.health = unit.max_health;
                unit.flags.remove(UnitFlags::IN_COMBAT | UnitFlags::EVADING);
                unit.auras.clear();
                self.respawned.push(id);
            }
        }
    }

    fn visit_inert(&mut self, objects: &mut [Entity]) {
        for object in objects {
            let id = object.id();
            if let Some(inert) = object.as_inert_mut().filter(|o| !o.spawned) {
                inert.spawned = true;
                self.respawned.push(id);
            }
        }
    }
}

/// Respawns everything dead or despawned in `region`.
pub fn respawn_all(region: &mut RegionMut<'_>) -> Vec<EntityId> {
    let mut action = RespawnAction::new();
    region.visit(&mut action);
    debug!(count = action.respawned().len(), "respawned");
    action.into_respawned()
}

struct CallForHelp<'a> {
    caller: &'a Entity,
    enemy: &'a Entity,
    range: f32,
    rules: &'a dyn Rules,
    helpers: Vec<EntityId>,
}

impl CallForHelp<'_> {
    fn will_help(&self, mobile: &Entity) -> bool {
        let Some(unit) = mobile.as_unit() else {
            return false;
        };
        mobile.id() != self.caller.id()
            && unit.is_alive()
            && !unit.in_combat()
            && !unit.has_flags(UnitFlags::LOST_CONTROL)
            && !self.rules.is_evading(mobile)
            && self.rules.is_friendly(mobile, self.caller)
            && self.rules.can_attack(mobile, self.enemy)
            && self.caller.is_within_dist_in_map(mobile, self.range)
            && self.rules.in_line_of_sight(self.caller, mobile)
    }
}

impl VisitorMut for CallForHelp<'_> {
    fn visit_mobiles(&mut self, mobiles: &mut [Entity]) {
        for mobile in mobiles {
            if !self.will_help(mobile) {
                continue;
            }
            let id = mobile.id();
            if let Some(unit) = mobile.as_unit_mut() {
                unit.flags.insert(UnitFlags::IN_COMBAT);
                self.helpers.push(id);
            }
        }
    }
}

/// Rallies idle mobiles within `range` of `caller` against `enemy`.
///
/// A mobile answers when it is alive, out of combat, in control of itself,
/// friendly to `caller`, able to attack `enemy` and in line of sight of
/// `caller`. Helpers enter combat; their ids are returned in traversal order.
/// `caller` and `enemy` are snapshots taken before `region` was borrowed.
pub fn call_for_help(
    region: &mut RegionMut<'_>,
    caller: &Entity,
    enemy: &Entity,
    range: f32,
    rules: &dyn Rules,
) -> Vec<EntityId> {
    let mut call = CallForHelp {
        caller,
        enemy,
        range,
        rules,
        helpers: Vec::new(),
    };
    region.visit(&mut call);
    debug!(caller = %caller.id(), helpers = call.helpers.len(), "call for help");
    call.helpers
}

#[derive(Default)]
struct MobileCollector(BTreeSet<EntityId>);

impl<'g> Visitor<'g> for MobileCollector {
    fn visit_mobiles(&mut self, mobiles: &'g [Entity]) {
        self.0.extend(mobiles.iter().map(Entity::id));
    }
}

/// Ids of every mobile in `region`, for the per-tick object update.
#[must_use]
pub fn collect_mobiles_for_update(region: &Region<'_>) -> BTreeSet<EntityId> {
    let mut collector = MobileCollector::default();
    region.visit(&mut collector);
    collector.0
}

/// `watcher` noticed `noticed` moving into sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SightEvent {
    /// The mobile whose AI reacts
    pub watcher: EntityId,
    /// The unit it noticed
    pub noticed: EntityId,
}

struct SightNotifier<'a> {
    moved: &'a Entity,
    rules: &'a dyn Rules,
    config: &'a VisibilityConfig,
    events: Vec<SightEvent>,
}

impl SightNotifier<'_> {
    fn can_react(&self, watcher: &Entity, other: &Entity) -> bool {
        watcher.is_alive()
            && !watcher.has_unit_flags(UnitFlags::LOST_CONTROL)
            && !self.rules.is_evading(watcher)
            && self.rules.is_visible_for(watcher, other, self.config)
    }
}

impl<'g> Visitor<'g> for SightNotifier<'_> {
    fn visit_mobiles(&mut self, mobiles: &'g [Entity]) {
        for mobile in mobiles {
            if mobile.id() == self.moved.id() {
                continue;
            }
            if self.can_react(mobile, self.moved) {
                self.events.push(SightEvent {
                    watcher: mobile.id(),
                    noticed: self.moved.id(),
                });
            }
            if self.moved.is_mobile() && self.can_react(self.moved, mobile) {
                self.events.push(SightEvent {
                    watcher: self.moved.id(),
                    noticed: mobile.id(),
                });
            }
        }
    }
}

/// Line-of-sight reactions caused by `moved` changing position.
///
/// Every mobile in `region` able to see `moved` notices it. When `moved` is a
/// mobile itself, it also notices every mobile it can see.
#[must_use]
pub fn sight_events(
    region: &Region<'_>,
    moved: &Entity,
    rules: &dyn Rules,
    config: &VisibilityConfig,
) -> Vec<SightEvent> {
    let mut notifier = SightNotifier {
        moved,
        rules,
        config,
        events: Vec::new(),
    };
    region.visit(&mut notifier);
    notifier.events
}
