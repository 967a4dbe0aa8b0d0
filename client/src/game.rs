//! Replicated world view rebuilt from per-tick server snapshots

use log::debug;
use shared::spatial::{self, QueryHit};
use shared::{EntityId, EntitySnapshot, Faction, GameEvent, Health, Role, StatBlock, Vec2};
use std::collections::BTreeMap;

/// One entity as this client currently knows it. Pure observer state:
/// the health replica only moves through `apply_sync`, and position and
/// facing are whatever the latest snapshot said.
pub struct ViewEntity {
    pub id: EntityId,
    pub faction: Faction,
    pub stats: StatBlock,
    pub pos: Vec2,
    pub facing: f32,
    pub health: Health,
}

impl ViewEntity {
    fn from_snapshot(snap: &EntitySnapshot) -> Self {
        Self {
            id: snap.id,
            faction: snap.faction,
            stats: snap.role.stats(),
            pos: snap.pos,
            facing: snap.facing,
            health: Health::observer(snap.health, snap.health_rev, snap.max_health),
        }
    }

    pub fn role(&self) -> Role {
        self.stats.role
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }
}

/// A broadcast event tagged with the position it happened at, resolved
/// before despawns are applied so death markers still have somewhere to
/// draw. Feeds presentation only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewEvent {
    pub event: GameEvent,
    pub pos: Vec2,
}

/// Client-side mirror of the authoritative world. Presence in the latest
/// snapshot defines liveness: entities the server stops sending are
/// dropped here, and nothing on this side ever writes health directly.
pub struct WorldView {
    entities: BTreeMap<EntityId, ViewEntity>,
    events: Vec<ViewEvent>,
    last_server_tick: u32,
}

impl WorldView {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            events: Vec::new(),
            last_server_tick: 0,
        }
    }

    /// Folds one snapshot into the view: refresh known entities, insert
    /// new ones, drop the rest. Out-of-order datagrams are discarded by
    /// tick number.
    pub fn apply_snapshot(
        &mut self,
        tick: u32,
        entities: Vec<EntitySnapshot>,
        events: Vec<GameEvent>,
    ) {
        if self.last_server_tick != 0 && tick <= self.last_server_tick {
            debug!(
                "Dropping snapshot for tick {} (already at {})",
                tick, self.last_server_tick
            );
            return;
        }
        self.last_server_tick = tick;

        // Resolve event positions against the incoming snapshot first,
        // then the pre-sweep view: a Died entity is already absent from
        // the snapshot that reports it.
        for event in events {
            match self.locate(&entities, event) {
                Some(pos) => self.events.push(ViewEvent { event, pos }),
                None => debug!("Ignoring event for unknown entity: {:?}", event),
            }
        }

        let mut live = Vec::with_capacity(entities.len());
        for snap in &entities {
            live.push(snap.id);
            match self.entities.get_mut(&snap.id) {
                Some(entity) => {
                    entity.pos = snap.pos;
                    entity.facing = snap.facing;
                    entity.health.apply_sync(snap.health, snap.health_rev);
                }
                None => {
                    self.entities.insert(snap.id, ViewEntity::from_snapshot(snap));
                }
            }
        }
        self.entities.retain(|id, _| live.contains(id));
    }

    fn locate(&self, entities: &[EntitySnapshot], event: GameEvent) -> Option<Vec2> {
        let id = match event {
            GameEvent::AttackSwung { target, .. } => target,
            GameEvent::Healed { target, .. } => target,
            GameEvent::Died { entity } => entity,
        };
        entities
            .iter()
            .find(|snap| snap.id == id)
            .map(|snap| snap.pos)
            .or_else(|| self.entities.get(&id).map(|e| e.pos))
    }

    pub fn get(&self, id: EntityId) -> Option<&ViewEntity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &ViewEntity> {
        self.entities.values()
    }

    pub fn last_server_tick(&self) -> u32 {
        self.last_server_tick
    }

    /// Events gathered since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    /// Living entities of `faction` within `radius` of `origin`, excluding
    /// `exclude`, capped like the server's query. Id order keeps the cap
    /// deterministic on both sides.
    pub fn query_nearby(
        &self,
        origin: Vec2,
        radius: f32,
        faction: Faction,
        exclude: Option<EntityId>,
    ) -> Vec<QueryHit> {
        let candidates = self
            .entities
            .values()
            .filter(|e| e.faction == faction && e.is_alive() && Some(e.id) != exclude)
            .map(|e| (e.id, e.pos));
        spatial::within_radius(origin, radius, candidates)
    }

    /// Deterministic nearest living opposing entity as seen from `id`.
    /// Same ranking the server uses, so an accepted proposal names the
    /// target the authority would pick from the same state.
    pub fn nearest_opposing(&self, id: EntityId, radius: f32) -> Option<QueryHit> {
        let entity = self.get(id)?;
        let hits = self.query_nearby(entity.pos, radius, entity.faction.opposing(), Some(id));
        spatial::nearest(&hits)
    }
}

impl Default for WorldView {
    fn default() -> Self {
        Self::new()
    }
}
