//! Authoritative simulation: input integration, enemy minds, combat
//! resolution and respawn scheduling, advanced one tick at a time

use crate::combat::{self, AttackReport, CombatRejection, HealReport};
use crate::enemy::{EnemyContext, EnemyMind};
use crate::world::World;
use log::{debug, info, warn};
use shared::tick::Actor;
use shared::{
    movement, EntityId, EntitySnapshot, Faction, GameEvent, InputState, Role, Vec2,
    ARENA_HALF_EXTENT, ENEMY_DETECTION_RANGE, RESPAWN_DELAY,
};
use std::collections::BTreeMap;
use std::f32::consts::TAU;

/// An action a client (or an enemy mind) asked the authority to perform.
/// Queued when the request arrives, resolved inside the next tick.
#[derive(Debug, Clone, Copy)]
pub enum Proposal {
    Attack {
        initiator: EntityId,
        target: EntityId,
    },
    Heal {
        initiator: EntityId,
    },
}

struct RespawnTicket {
    client_id: u32,
    role: Role,
    due: f64,
}

/// What a tick produced beyond world mutation. Respawns need unicast
/// notifications, so they surface here instead of in the event stream.
#[derive(Debug, Default)]
pub struct TickReport {
    pub respawned: Vec<(u32, EntityId)>,
}

/// The whole authoritative game: world state, one mind per enemy, queued
/// proposals and pending respawns. The network layer owns one of these and
/// calls [`Simulation::tick`] at the fixed rate.
pub struct Simulation {
    world: World,
    minds: BTreeMap<EntityId, EnemyMind>,
    pending: Vec<Proposal>,
    events: Vec<GameEvent>,
    respawns: Vec<RespawnTicket>,
    seed: u64,
}

impl Simulation {
    pub fn new(enemy_count: usize, seed: u64) -> Self {
        let mut sim = Self {
            world: World::new(),
            minds: BTreeMap::new(),
            pending: Vec::new(),
            events: Vec::new(),
            respawns: Vec::new(),
            seed,
        };

        // Enemies start evenly spread on a ring halfway to the arena edge.
        let ring_radius = ARENA_HALF_EXTENT * 0.5;
        for i in 0..enemy_count {
            let angle = i as f32 / enemy_count as f32 * TAU;
            sim.add_enemy(Vec2::from_angle(angle) * ring_radius);
        }

        info!("Simulation ready: {} enemies, seed {}", enemy_count, seed);
        sim
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn enemy_count(&self) -> usize {
        self.minds.len()
    }

    pub fn tick_count(&self) -> u32 {
        self.world.tick()
    }

    pub fn time(&self) -> f64 {
        self.world.time()
    }

    pub fn snapshot_entities(&self) -> Vec<EntitySnapshot> {
        self.world.snapshot_entities()
    }

    /// Takes the events accumulated since the last call. Each event rides
    /// exactly one snapshot.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn queue_proposal(&mut self, proposal: Proposal) {
        self.pending.push(proposal);
    }

    pub fn spawn_player(&mut self, client_id: u32, role: Role) -> EntityId {
        self.world.spawn(
            Some(client_id),
            Faction::Players,
            role,
            World::player_spawn_point(client_id),
        )
    }

    pub fn add_enemy(&mut self, pos: Vec2) -> EntityId {
        let id = self.world.spawn(None, Faction::Enemies, Role::Grunt, pos);
        let mut mind = EnemyMind::new(id, self.seed.wrapping_add(id.0 as u64));
        if let Some(mut ctx) = Self::build_context(&self.world, id) {
            mind.on_init(&mut ctx);
        }
        self.minds.insert(id, mind);
        id
    }

    /// Removes the departed client's entity and forgets any respawn it had
    /// coming.
    pub fn handle_disconnect(&mut self, client_id: u32, entity: EntityId) {
        if self.world.despawn(entity).is_some() {
            info!("Removed entity {} for departed client {}", entity, client_id);
        }
        self.respawns.retain(|ticket| ticket.client_id != client_id);
    }

    /// Advances the game by one fixed step:
    /// inputs move living players, minds steer enemies, queued proposals
    /// get validated and applied, due respawns produce new entities.
    pub fn tick(&mut self, dt: f32, inputs: &[(EntityId, InputState)]) -> TickReport {
        self.world.advance(dt);

        for (entity_id, input) in inputs {
            if let Some(entity) = self.world.get_mut(*entity_id) {
                if entity.is_alive() {
                    let moved = movement::step(
                        entity.pos,
                        entity.facing,
                        input.move_vector(),
                        &entity.stats,
                        dt,
                    );
                    entity.pos = moved.pos;
                    entity.facing = moved.facing;
                }
            }
        }

        let enemy_intents = self.run_minds(dt);

        for proposal in std::mem::take(&mut self.pending) {
            self.resolve(proposal, false);
        }
        for (initiator, target) in enemy_intents {
            self.resolve(Proposal::Attack { initiator, target }, true);
        }

        TickReport {
            respawned: self.process_respawns(),
        }
    }

    /// One perception/decision pass over every enemy mind. Positions are
    /// applied immediately; attack intents are returned for resolution
    /// after player proposals.
    fn run_minds(&mut self, dt: f32) -> Vec<(EntityId, EntityId)> {
        let mut intents = Vec::new();
        let ids: Vec<EntityId> = self.minds.keys().copied().collect();

        for id in ids {
            let ctx = Self::build_context(&self.world, id);
            if let Some(mut ctx) = ctx {
                if let Some(mind) = self.minds.get_mut(&id) {
                    mind.on_tick(&mut ctx, dt);
                }
                if let Some(entity) = self.world.get_mut(id) {
                    entity.pos = ctx
                        .desired_pos
                        .clamp_axes(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
                    entity.facing = ctx.desired_facing;
                }
                if let Some(target) = ctx.attack_target {
                    intents.push((id, target));
                }
            }
        }
        intents
    }

    fn build_context(world: &World, id: EntityId) -> Option<EnemyContext> {
        let entity = world.get(id)?;
        Some(EnemyContext {
            entity: id,
            pos: entity.pos,
            facing: entity.facing,
            stats: entity.stats,
            spawn_origin: entity.spawn_origin,
            nearest_target: world.nearest_opposing(id, ENEMY_DETECTION_RANGE),
            time: world.time(),
            last_action_time: entity.last_action_time,
            desired_pos: entity.pos,
            desired_facing: entity.facing,
            attack_target: None,
        })
    }

    fn resolve(&mut self, proposal: Proposal, from_mind: bool) {
        match proposal {
            Proposal::Attack { initiator, target } => {
                match combat::resolve_attack(&mut self.world, initiator, target) {
                    Ok(report) => self.apply_attack(report),
                    Err(rejection) => Self::log_rejection("attack", initiator, rejection, from_mind),
                }
            }
            Proposal::Heal { initiator } => {
                match combat::resolve_heal(&mut self.world, initiator) {
                    Ok(report) => self.apply_heal(report),
                    Err(rejection) => Self::log_rejection("heal", initiator, rejection, from_mind),
                }
            }
        }
    }

    /// Rejections are absorbed here. Stale references and cooldown races
    /// are routine packet-timing artifacts; the rest hint at a buggy or
    /// dishonest client and get logged louder. Mind intents always stay at
    /// debug, the authority racing itself is not suspicious.
    fn log_rejection(kind: &str, initiator: EntityId, rejection: CombatRejection, from_mind: bool) {
        match rejection {
            _ if from_mind => {
                debug!("Dropped mind {} from {}: {}", kind, initiator, rejection)
            }
            CombatRejection::StaleReference(_) | CombatRejection::OnCooldown { .. } => {
                debug!("Dropped {} from {}: {}", kind, initiator, rejection)
            }
            _ => warn!("Rejected {} from {}: {}", kind, initiator, rejection),
        }
    }

    fn apply_attack(&mut self, report: AttackReport) {
        debug!(
            "Entity {} hit {} for {} ({} hp left)",
            report.attacker, report.target, report.damage, report.remaining
        );
        self.events.push(GameEvent::AttackSwung {
            attacker: report.attacker,
            target: report.target,
        });
        if report.lethal {
            self.handle_death(report.target);
        }
    }

    fn apply_heal(&mut self, report: HealReport) {
        debug!(
            "Entity {} healed for {} (now {} hp)",
            report.target, report.amount, report.healed_to
        );
        self.events.push(GameEvent::Healed {
            target: report.target,
            amount: report.amount,
        });
    }

    /// A death despawns the entity in the same tick. Players leave a
    /// respawn ticket behind; enemies just lose their mind.
    fn handle_death(&mut self, entity: EntityId) {
        self.events.push(GameEvent::Died { entity });

        if let Some(dead) = self.world.despawn(entity) {
            match dead.owner {
                Some(client_id) => {
                    info!(
                        "Player entity {} died; client {} respawns in {:.1}s",
                        entity, client_id, RESPAWN_DELAY
                    );
                    self.respawns.push(RespawnTicket {
                        client_id,
                        role: dead.stats.role,
                        due: self.world.time() + RESPAWN_DELAY as f64,
                    });
                }
                None => {
                    self.minds.remove(&entity);
                    info!("Enemy {} destroyed", entity);
                }
            }
        }
    }

    fn process_respawns(&mut self) -> Vec<(u32, EntityId)> {
        let now = self.world.time();
        let mut respawned = Vec::new();

        for ticket in std::mem::take(&mut self.respawns) {
            if ticket.due <= now {
                let entity = self.spawn_player(ticket.client_id, ticket.role);
                info!("Client {} respawned as entity {}", ticket.client_id, entity);
                respawned.push((ticket.client_id, entity));
            } else {
                self.respawns.push(ticket);
            }
        }
        respawned
    }
}
