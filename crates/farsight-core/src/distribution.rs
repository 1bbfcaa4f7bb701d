//! Message fan-out to observers in range.
//!
//! The engine does not encode packets. Callers hand over a prepared payload
//! (or a builder for one) and a [`PacketSink`] that owns the actual sending.
//! [`DeliveryPolicy`] decides which observers receive it.

use tracing::debug;

use crate::entity::{Entity, EntityId, KindMask, Locale};
use crate::region::Region;
use crate::search::{apply_to_all, WorkerScope};

/// Receiver of outgoing payloads.
pub trait PacketSink<P: ?Sized> {
    /// Queues `packet` for `recipient`.
    fn send(&mut self, recipient: EntityId, packet: &P);
}

impl<P: ?Sized, F: FnMut(EntityId, &P)> PacketSink<P> for F {
    fn send(&mut self, recipient: EntityId, packet: &P) {
        self(recipient, packet);
    }
}

/// Which observers receive a message.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryPolicy {
    /// Maximum distance from the source, `None` for the whole region
    pub range: Option<f32>,
    /// Whether the source receives its own message
    pub include_self: bool,
    /// Only observers on the source's team
    pub own_team_only: bool,
    /// One observer to leave out
    pub except: Option<EntityId>,
}

impl DeliveryPolicy {
    /// Everyone within `range` except the source.
    #[must_use]
    pub fn within(range: f32) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    /// Also deliver to the source.
    #[must_use]
    pub const fn including_self(mut self) -> Self {
        self.include_self = true;
        self
    }

    /// Only deliver to the source's team.
    #[must_use]
    pub const fn team_only(mut self) -> Self {
        self.own_team_only = true;
        self
    }

    /// Leave `id` out.
    #[must_use]
    pub const fn except(mut self, id: EntityId) -> Self {
        self.except = Some(id);
        self
    }

    /// Returns `true` if `recipient` should receive a message from `source`.
    ///
    /// A team-only message from a source without a session reaches nobody.
    #[must_use]
    pub fn admits(&self, source: &Entity, recipient: &Entity) -> bool {
        let Some(session) = recipient.as_observer().map(|o| &o.session) else {
            return false;
        };
        if recipient.id() == source.id() {
            return self.include_self;
        }
        if self.except == Some(recipient.id()) || !source.in_same_phase(recipient) {
            return false;
        }
        if let Some(range) = self.range {
            if source.distance_squared(recipient) > range * range {
                return false;
            }
        }
        !self.own_team_only
            || source
                .as_observer()
                .is_some_and(|own| own.session.team == session.team)
    }
}

/// Sends the same `packet` to every admitted observer in `region`.
///
/// Returns the number of recipients.
pub fn broadcast<P: ?Sized, S: PacketSink<P> + ?Sized>(
    region: &Region<'_>,
    source: &Entity,
    policy: &DeliveryPolicy,
    packet: &P,
    sink: &mut S,
) -> usize {
    let mut delivered = 0;
    apply_to_all(region, WorkerScope::new(KindMask::OBSERVERS), |recipient| {
        if policy.admits(source, recipient) {
            sink.send(recipient.id(), packet);
            delivered += 1;
        }
    });
    debug!(source = %source.id(), delivered, "broadcast");
    delivered
}

/// Payloads built during one localized distribution, one per locale.
///
/// Slot zero holds the default-locale payload; locale `n` lives in slot
/// `n + 1`.
#[derive(Debug)]
pub struct LocaleCache<P> {
    slots: Vec<Option<P>>,
    builds: usize,
}

impl<P> Default for LocaleCache<P> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            builds: 0,
        }
    }
}

impl<P> LocaleCache<P> {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot index of `locale`.
    #[must_use]
    pub fn slot(locale: Option<Locale>) -> usize {
        locale.map_or(0, |l| usize::from(l.0) + 1)
    }

    /// Returns the cached payload for `locale`, building it on first use.
    pub fn get_or_build<B: FnMut(Option<Locale>) -> P>(&mut self, locale: Option<Locale>, build: &mut B) -> &P {
        let slot = Self::slot(locale);
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].is_none() {
            self.builds += 1;
        }
        self.slots[slot].get_or_insert_with(|| build(locale))
    }

    /// Number of payloads built so far.
    #[must_use]
    pub const fn builds(&self) -> usize {
        self.builds
    }
}

/// Sends a per-locale payload to every admitted observer in `region`.
///
/// `build` runs at most once per distinct locale among the recipients. The
/// cache lives for this call only. Returns the number of recipients.
pub fn distribute_localized<P, B, S>(
    region: &Region<'_>,
    source: &Entity,
    policy: &DeliveryPolicy,
    mut build: B,
    sink: &mut S,
) -> usize
where
    B: FnMut(Option<Locale>) -> P,
    S: PacketSink<P> + ?Sized,
{
    let mut cache = LocaleCache::new();
    let mut delivered = 0;
    apply_to_all(region, WorkerScope::new(KindMask::OBSERVERS), |recipient| {
        if !policy.admits(source, recipient) {
            return;
        }
        let locale = recipient.as_observer().and_then(|o| o.session.locale);
        sink.send(recipient.id(), cache.get_or_build(locale, &mut build));
        delivered += 1;
    });
    debug!(source = %source.id(), delivered, builds = cache.builds(), "localized distribution");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SessionState;
    use crate::grid::Grid;
    use glam::Vec3;

    fn observer(id: u64, x: f32, team: u32, locale: Option<u8>) -> Entity {
        let mut e = Entity::new_observer(EntityId::new(id), Vec3::new(x, 0.0, 0.0));
        e.as_observer_mut().unwrap().session = SessionState {
            locale: locale.map(Locale),
            team,
            group: None,
        };
        e
    }

    #[test]
    fn locale_slots_are_offset_by_one() {
        assert_eq!(LocaleCache::<()>::slot(None), 0);
        assert_eq!(LocaleCache::<()>::slot(Some(Locale(0))), 1);
        assert_eq!(LocaleCache::<()>::slot(Some(Locale(7))), 8);
    }

    #[test]
    fn cache_builds_once_per_locale() {
        let mut cache = LocaleCache::new();
        let mut build = |l: Option<Locale>| format!("{l:?}");
        assert_eq!(cache.get_or_build(Some(Locale(3)), &mut build), "Some(Locale(3))");
        cache.get_or_build(Some(Locale(3)), &mut build);
        cache.get_or_build(None, &mut build);
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn policy_filters() {
        let source = observer(1, 0.0, 1, None);
        let teammate = observer(2, 5.0, 1, None);
        let rival = observer(3, 5.0, 2, None);
        let far = observer(4, 50.0, 1, None);
        let mob = Entity::new_mobile(EntityId::new(5), Vec3::X, 1);

        let policy = DeliveryPolicy::within(10.0);
        assert!(policy.admits(&source, &teammate));
        assert!(policy.admits(&source, &rival));
        assert!(!policy.admits(&source, &far));
        assert!(!policy.admits(&source, &source));
        assert!(!policy.admits(&source, &mob));
        assert!(policy.including_self().admits(&source, &source));
        assert!(!policy.team_only().admits(&source, &rival));
        assert!(!policy.except(EntityId::new(2)).admits(&source, &teammate));

        let npc_source = Entity::new_mobile(EntityId::new(6), Vec3::ZERO, 1);
        assert!(!policy.team_only().admits(&npc_source, &teammate));
    }

    #[test]
    fn broadcast_counts_recipients() {
        let mut grid = Grid::default();
        let source = observer(1, 0.0, 1, None);
        grid.insert(source.clone()).unwrap();
        grid.insert(observer(2, 5.0, 1, None)).unwrap();
        grid.insert(observer(3, 8.0, 2, None)).unwrap();
        let region = grid.region(Vec3::ZERO, 20.0).unwrap();

        let mut sent = Vec::new();
        let mut sink = |to: EntityId, packet: &str| sent.push((to, packet.to_owned()));
        let count = broadcast(&region, &source, &DeliveryPolicy::within(20.0), "hello", &mut sink);
        assert_eq!(count, 2);
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, p)| p == "hello"));
    }
}
