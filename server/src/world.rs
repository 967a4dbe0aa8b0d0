//! Authoritative entity registry and simulation clock

use log::info;
use shared::spatial::{self, QueryHit};
use shared::{
    EntityId, EntitySnapshot, Faction, Health, Role, StatBlock, Vec2, ARENA_HALF_EXTENT,
};
use std::collections::BTreeMap;

/// One live entity in the authoritative world. Everything mutable and
/// replicated about it (health in particular) is owned here; clients only
/// ever see snapshots.
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    /// Controlling client, None for server-driven entities.
    pub owner: Option<u32>,
    pub faction: Faction,
    pub stats: StatBlock,
    pub pos: Vec2,
    pub facing: f32,
    pub health: Health,
    /// Where the entity entered the world. AI patrols around it, players
    /// respawn at it.
    pub spawn_origin: Vec2,
    /// Sim-clock time of the last accepted attack or heal.
    pub last_action_time: f64,
}

impl Entity {
    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            faction: self.faction,
            role: self.stats.role,
            pos: self.pos,
            facing: self.facing,
            health: self.health.current(),
            health_rev: self.health.revision(),
            max_health: self.health.max(),
        }
    }
}

/// The server-side world: entity storage plus the simulation clock.
///
/// Entities live in a BTreeMap so every iteration walks them in id order;
/// capped spatial queries and broadcast snapshots stay deterministic for
/// the same world state.
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
    time: f64,
    tick: u32,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            time: 0.0,
            tick: 0,
        }
    }

    /// Simulation clock in seconds. Advanced only by `advance`, so tests
    /// control time directly.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt as f64;
        self.tick += 1;
    }

    pub fn spawn(
        &mut self,
        owner: Option<u32>,
        faction: Faction,
        role: Role,
        pos: Vec2,
    ) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let stats = role.stats();
        let entity = Entity {
            id,
            owner,
            faction,
            stats,
            pos,
            facing: 0.0,
            health: Health::authority(stats.max_health),
            spawn_origin: pos,
            last_action_time: f64::NEG_INFINITY,
        };

        info!(
            "Spawned {:?} entity {} at ({:.1}, {:.1})",
            role, id, pos.x, pos.y
        );
        self.entities.insert(id, entity);
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            info!("Despawned entity {}", id);
        }
        removed
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
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

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Living entities of `faction` within `radius` of `origin`, excluding
    /// `exclude`, capped at the query limit. Candidates are visited in id
    /// order, so the cap is deterministic.
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

    /// Deterministic nearest living entity of the opposing faction, as seen
    /// from `id`. None when `id` is gone or nothing is in range.
    pub fn nearest_opposing(&self, id: EntityId, radius: f32) -> Option<QueryHit> {
        let entity = self.get(id)?;
        let hits = self.query_nearby(entity.pos, radius, entity.faction.opposing(), Some(id));
        spatial::nearest(&hits)
    }

    pub fn snapshot_entities(&self) -> Vec<EntitySnapshot> {
        self.entities.values().map(Entity::snapshot).collect()
    }

    /// Spawn position for a player, spread along the south edge so clients
    /// joining together do not stack.
    pub fn player_spawn_point(client_id: u32) -> Vec2 {
        let span = 2.0 * ARENA_HALF_EXTENT - 10.0;
        let lane = (client_id as f32 * 5.0) % span;
        Vec2::new(lane - (ARENA_HALF_EXTENT - 5.0), -(ARENA_HALF_EXTENT - 10.0))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
