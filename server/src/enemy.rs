//! Enemy behavior: a patrol/chase/attack state machine driven by the
//! authority once per tick

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::fsm::{State, StateMachine};
use shared::spatial::QueryHit;
use shared::tick::Actor;
use shared::vec::rotate_towards;
use shared::{
    EntityId, StatBlock, Vec2, ENEMY_DETECTION_RANGE, PATROL_RADIUS, PATROL_WAIT_TIME,
};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyStateKind {
    Patrol,
    Chase,
    Attack,
}

/// What an enemy state sees and steers during one tick. The simulation
/// refreshes the perception half before running the machine and applies
/// the `desired_*` outputs to the world afterwards; states never touch
/// entities directly.
pub struct EnemyContext {
    pub entity: EntityId,
    pub pos: Vec2,
    pub facing: f32,
    pub stats: StatBlock,
    pub spawn_origin: Vec2,
    /// Nearest living opposing entity within detection range, if any.
    pub nearest_target: Option<QueryHit>,
    pub time: f64,
    pub last_action_time: f64,

    pub desired_pos: Vec2,
    pub desired_facing: f32,
    pub attack_target: Option<EntityId>,
}

impl EnemyContext {
    fn target_distance(&self) -> Option<f32> {
        self.nearest_target.map(|hit| hit.distance)
    }
}

/// Behavior policy, by priority: a target in attack range wins, then a
/// target in detection range, then patrol. Pure function of the distances
/// so it can be exercised without a world.
pub fn select_behavior(
    target_distance: Option<f32>,
    attack_range: f32,
    detection_range: f32,
) -> EnemyStateKind {
    match target_distance {
        Some(d) if d <= attack_range => EnemyStateKind::Attack,
        Some(d) if d <= detection_range => EnemyStateKind::Chase,
        _ => EnemyStateKind::Patrol,
    }
}

fn desired_state(ctx: &EnemyContext) -> EnemyStateKind {
    select_behavior(
        ctx.target_distance(),
        ctx.stats.attack_range,
        ENEMY_DETECTION_RANGE,
    )
}

/// Wanders around the spawn origin at half speed, rolling a new point
/// whenever the wait timer runs out.
struct PatrolState {
    timer: f32,
    point: Vec2,
    rng: StdRng,
}

impl PatrolState {
    fn new(seed: u64) -> Self {
        Self {
            timer: 0.0,
            point: Vec2::ZERO,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn roll_point(&mut self, origin: Vec2) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        // sqrt keeps the points uniform over the disc instead of bunching
        // at the center.
        let radius = PATROL_RADIUS * self.rng.gen::<f32>().sqrt();
        origin + Vec2::from_angle(angle) * radius
    }
}

impl State<EnemyStateKind, EnemyContext> for PatrolState {
    fn enter(&mut self, ctx: &mut EnemyContext) {
        // Expired timer, so the first patrol tick rolls a fresh point.
        self.timer = 0.0;
        self.point = ctx.pos;
    }

    fn update(&mut self, ctx: &mut EnemyContext, dt: f32) -> Option<EnemyStateKind> {
        let desired = desired_state(ctx);
        if desired != EnemyStateKind::Patrol {
            return Some(desired);
        }

        self.timer -= dt;
        if self.timer <= 0.0 {
            self.point = self.roll_point(ctx.spawn_origin);
            self.timer = PATROL_WAIT_TIME;
        }

        let step = ctx.stats.move_speed * 0.5 * dt;
        ctx.desired_pos = ctx.pos.move_towards(self.point, step);

        let to_point = self.point - ctx.pos;
        if to_point.length() > f32::EPSILON {
            ctx.desired_facing = rotate_towards(
                ctx.facing,
                to_point.angle(),
                ctx.stats.rotation_speed_rad() * dt,
            );
        }
        None
    }
}

/// Closes on the nearest target at full speed, turning at the stat rate.
struct ChaseState;

impl State<EnemyStateKind, EnemyContext> for ChaseState {
    fn update(&mut self, ctx: &mut EnemyContext, dt: f32) -> Option<EnemyStateKind> {
        let desired = desired_state(ctx);
        if desired != EnemyStateKind::Chase {
            return Some(desired);
        }

        if let Some(hit) = ctx.nearest_target {
            ctx.desired_pos = ctx.pos.move_towards(hit.pos, ctx.stats.move_speed * dt);
            let dir = hit.pos - ctx.pos;
            if dir.length() > f32::EPSILON {
                ctx.desired_facing = rotate_towards(
                    ctx.facing,
                    dir.angle(),
                    ctx.stats.rotation_speed_rad() * dt,
                );
            }
        }
        None
    }
}

/// Stands and swings: squares up to the target and emits an attack intent
/// whenever the cooldown allows. The intent still goes through the normal
/// combat validation.
struct AttackState;

impl State<EnemyStateKind, EnemyContext> for AttackState {
    fn update(&mut self, ctx: &mut EnemyContext, _dt: f32) -> Option<EnemyStateKind> {
        let desired = desired_state(ctx);
        if desired != EnemyStateKind::Attack {
            return Some(desired);
        }

        if let Some(hit) = ctx.nearest_target {
            let dir = hit.pos - ctx.pos;
            if dir.length() > f32::EPSILON {
                ctx.desired_facing = dir.angle();
            }
            if ctx.time - ctx.last_action_time >= ctx.stats.attack_cooldown as f64 {
                ctx.attack_target = Some(hit.id);
            }
        }
        None
    }
}

/// The per-enemy brain. Each mind owns its own state instances; nothing is
/// shared between enemies, so their timers and patrol RNGs stay
/// independent.
pub struct EnemyMind {
    entity: EntityId,
    machine: StateMachine<EnemyStateKind, EnemyContext>,
}

impl EnemyMind {
    pub fn new(entity: EntityId, seed: u64) -> Self {
        let mut machine = StateMachine::new();
        machine.register(EnemyStateKind::Patrol, PatrolState::new(seed));
        machine.register(EnemyStateKind::Chase, ChaseState);
        machine.register(EnemyStateKind::Attack, AttackState);
        Self { entity, machine }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> Option<EnemyStateKind> {
        self.machine.current()
    }
}

impl Actor for EnemyMind {
    type Ctx = EnemyContext;

    fn on_init(&mut self, ctx: &mut EnemyContext) {
        self.machine.change_state(EnemyStateKind::Patrol, ctx);
    }

    fn on_tick(&mut self, ctx: &mut EnemyContext, dt: f32) {
        self.machine.update(ctx, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn context(pos: Vec2, target: Option<(u32, Vec2)>) -> EnemyContext {
        let stats = shared::Role::Grunt.stats();
        EnemyContext {
            entity: EntityId(100),
            pos,
            facing: 0.0,
            stats,
            spawn_origin: Vec2::ZERO,
            nearest_target: target.map(|(id, tpos)| QueryHit {
                id: EntityId(id),
                pos: tpos,
                distance: pos.distance(tpos),
            }),
            time: 50.0,
            last_action_time: f64::NEG_INFINITY,
            desired_pos: pos,
            desired_facing: 0.0,
            attack_target: None,
        }
    }

    #[test]
    fn test_select_behavior_priority_ladder() {
        assert_eq!(select_behavior(Some(1.0), 2.5, 10.0), EnemyStateKind::Attack);
        assert_eq!(select_behavior(Some(5.0), 2.5, 10.0), EnemyStateKind::Chase);
        assert_eq!(select_behavior(Some(15.0), 2.5, 10.0), EnemyStateKind::Patrol);
        assert_eq!(select_behavior(None, 2.5, 10.0), EnemyStateKind::Patrol);
    }

    #[test]
    fn test_select_behavior_boundaries_are_inclusive() {
        assert_eq!(select_behavior(Some(2.5), 2.5, 10.0), EnemyStateKind::Attack);
        assert_eq!(select_behavior(Some(10.0), 2.5, 10.0), EnemyStateKind::Chase);
    }

    #[test]
    fn test_mind_starts_patrolling() {
        let mut ctx = context(Vec2::ZERO, None);
        let mut mind = EnemyMind::new(EntityId(100), 7);

        assert_eq!(mind.state(), None);
        mind.on_init(&mut ctx);
        assert_eq!(mind.state(), Some(EnemyStateKind::Patrol));
    }

    #[test]
    fn test_patrol_stays_inside_radius() {
        let mut ctx = context(Vec2::ZERO, None);
        let mut mind = EnemyMind::new(EntityId(100), 42);
        mind.on_init(&mut ctx);

        for _ in 0..600 {
            mind.on_tick(&mut ctx, DT);
            ctx.pos = ctx.desired_pos;
            ctx.facing = ctx.desired_facing;
            assert!(ctx.pos.distance(ctx.spawn_origin) <= PATROL_RADIUS + 1e-3);
        }
    }

    #[test]
    fn test_patrol_moves_at_half_speed() {
        let mut ctx = context(Vec2::ZERO, None);
        let mut mind = EnemyMind::new(EntityId(100), 9);
        mind.on_init(&mut ctx);

        mind.on_tick(&mut ctx, DT);
        let step = ctx.desired_pos.distance(ctx.pos);
        assert!(step <= ctx.stats.move_speed * 0.5 * DT + 1e-5);
    }

    #[test]
    fn test_target_in_detection_range_triggers_chase() {
        let mut ctx = context(Vec2::ZERO, Some((5, Vec2::new(5.0, 0.0))));
        let mut mind = EnemyMind::new(EntityId(100), 1);
        mind.on_init(&mut ctx);

        mind.on_tick(&mut ctx, DT);
        assert_eq!(mind.state(), Some(EnemyStateKind::Chase));
    }

    #[test]
    fn test_chase_closes_distance_at_full_speed() {
        let target_pos = Vec2::new(6.0, 0.0);
        let mut ctx = context(Vec2::ZERO, Some((5, target_pos)));
        let mut mind = EnemyMind::new(EntityId(100), 1);
        mind.on_init(&mut ctx);
        mind.on_tick(&mut ctx, DT);

        let before = ctx.pos.distance(target_pos);
        mind.on_tick(&mut ctx, DT);
        let moved = ctx.desired_pos.distance(ctx.pos);
        assert!((moved - ctx.stats.move_speed * DT).abs() < 1e-4);
        assert!(ctx.desired_pos.distance(target_pos) < before);
    }

    #[test]
    fn test_losing_target_returns_to_patrol() {
        let mut ctx = context(Vec2::ZERO, Some((5, Vec2::new(5.0, 0.0))));
        let mut mind = EnemyMind::new(EntityId(100), 1);
        mind.on_init(&mut ctx);
        mind.on_tick(&mut ctx, DT);
        assert_eq!(mind.state(), Some(EnemyStateKind::Chase));

        ctx.nearest_target = None;
        mind.on_tick(&mut ctx, DT);
        assert_eq!(mind.state(), Some(EnemyStateKind::Patrol));
    }

    #[test]
    fn test_attack_faces_target_and_emits_intent() {
        let mut ctx = context(Vec2::ZERO, Some((5, Vec2::new(0.0, 1.0))));
        let mut mind = EnemyMind::new(EntityId(100), 1);
        mind.on_init(&mut ctx);

        // First tick transitions into Attack, second tick swings.
        mind.on_tick(&mut ctx, DT);
        assert_eq!(mind.state(), Some(EnemyStateKind::Attack));
        mind.on_tick(&mut ctx, DT);

        assert_eq!(ctx.attack_target, Some(EntityId(5)));
        assert!((ctx.desired_facing - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_attack_respects_cooldown() {
        let mut ctx = context(Vec2::ZERO, Some((5, Vec2::new(1.0, 0.0))));
        ctx.last_action_time = ctx.time - 0.5;
        let mut mind = EnemyMind::new(EntityId(100), 1);
        mind.on_init(&mut ctx);

        mind.on_tick(&mut ctx, DT);
        mind.on_tick(&mut ctx, DT);
        // Grunt cooldown is 1.5s; half a second is not enough.
        assert_eq!(ctx.attack_target, None);

        ctx.last_action_time = ctx.time - 2.0;
        mind.on_tick(&mut ctx, DT);
        assert_eq!(ctx.attack_target, Some(EntityId(5)));
    }
}
