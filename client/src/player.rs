//! Local player controller: the input-driven state machine plus the
//! prediction that keeps the avatar responsive between snapshots

use log::debug;
use shared::fsm::{State, StateMachine};
use shared::movement;
use shared::spatial::QueryHit;
use shared::tick::Actor;
use shared::{EntityId, Role, StatBlock, Vec2, ATTACK_DURATION};

/// Predicted positions further than this from the authority snap straight
/// to it; smaller drift is blended out over a few frames.
const CORRECTION_SNAP_DISTANCE: f32 = 5.0;
const CORRECTION_GAIN: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerStateKind {
    Idle,
    Moving,
    Attacking,
}

/// What the controller states see and steer each frame. Built once when
/// the owned entity first shows up in a snapshot and kept for its whole
/// life; stats are resolved here and never looked up again.
pub struct PlayerContext {
    pub entity: EntityId,
    pub stats: StatBlock,
    pub pos: Vec2,
    pub facing: f32,
    /// Held movement input, already mapped to a world-space vector.
    pub move_input: Vec2,
    /// Client clock in seconds; the local cooldown gate runs on it.
    pub time: f64,
    pub last_action_time: f64,
    /// Latest authoritative position for this entity.
    pub server_pos: Vec2,
}

impl PlayerContext {
    pub fn spawn(entity: EntityId, role: Role, pos: Vec2) -> Self {
        Self {
            entity,
            stats: role.stats(),
            pos,
            facing: 0.0,
            move_input: Vec2::ZERO,
            time: 0.0,
            last_action_time: f64::NEG_INFINITY,
            server_pos: pos,
        }
    }

    /// Advisory cooldown gate. The authority re-validates with slack, so
    /// a gate that is never early always passes server validation.
    pub fn action_ready(&self) -> bool {
        self.time - self.last_action_time >= self.stats.attack_cooldown as f64
    }

    /// Fraction of the action cooldown elapsed, for the HUD. 1.0 = ready.
    pub fn cooldown_progress(&self) -> f32 {
        if self.stats.attack_cooldown <= 0.0 {
            return 1.0;
        }
        let elapsed = self.time - self.last_action_time;
        (elapsed / self.stats.attack_cooldown as f64).clamp(0.0, 1.0) as f32
    }
}

/// Stands still and watches the stick.
struct IdleState;

impl State<PlayerStateKind, PlayerContext> for IdleState {
    fn update(&mut self, ctx: &mut PlayerContext, _dt: f32) -> Option<PlayerStateKind> {
        if movement::is_moving(ctx.move_input) {
            return Some(PlayerStateKind::Moving);
        }
        None
    }
}

/// Integrates held input through the shared movement step, the same one
/// the server runs, so prediction and authority walk the same line.
struct MovingState;

impl State<PlayerStateKind, PlayerContext> for MovingState {
    fn update(&mut self, ctx: &mut PlayerContext, dt: f32) -> Option<PlayerStateKind> {
        if !movement::is_moving(ctx.move_input) {
            return Some(PlayerStateKind::Idle);
        }
        let moved = movement::step(ctx.pos, ctx.facing, ctx.move_input, &ctx.stats, dt);
        ctx.pos = moved.pos;
        ctx.facing = moved.facing;
        None
    }
}

/// Plays out one swing. Movement is rooted for the duration; on expiry
/// the machine falls back to whichever of Idle/Moving the input wants.
struct AttackingState {
    timer: f32,
}

impl State<PlayerStateKind, PlayerContext> for AttackingState {
    fn enter(&mut self, _ctx: &mut PlayerContext) {
        self.timer = ATTACK_DURATION;
    }

    fn update(&mut self, ctx: &mut PlayerContext, dt: f32) -> Option<PlayerStateKind> {
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        if movement::is_moving(ctx.move_input) {
            Some(PlayerStateKind::Moving)
        } else {
            Some(PlayerStateKind::Idle)
        }
    }
}

/// Pulls the predicted position toward the latest authoritative one.
/// Large drift (missed teleports, heavy packet loss) snaps; small drift
/// fades out over a few frames so the correction is invisible.
pub fn reconcile(ctx: &mut PlayerContext, dt: f32) {
    let drift = ctx.pos.distance(ctx.server_pos);
    if drift > CORRECTION_SNAP_DISTANCE {
        debug!("Prediction off by {:.2}, snapping to authority", drift);
        ctx.pos = ctx.server_pos;
    } else if drift > f32::EPSILON {
        let pull = (CORRECTION_GAIN * dt).min(1.0);
        ctx.pos = ctx.pos + (ctx.server_pos - ctx.pos) * pull;
    }
}

/// The locally controlled player. Owns the state machine and the action
/// trigger gates; the frame loop owns the context and feeds it input,
/// time and the latest authoritative position.
pub struct PlayerController {
    machine: StateMachine<PlayerStateKind, PlayerContext>,
}

impl PlayerController {
    pub fn new() -> Self {
        let mut machine = StateMachine::new();
        machine.register(PlayerStateKind::Idle, IdleState);
        machine.register(PlayerStateKind::Moving, MovingState);
        machine.register(PlayerStateKind::Attacking, AttackingState { timer: 0.0 });
        Self { machine }
    }

    pub fn state(&self) -> Option<PlayerStateKind> {
        self.machine.current()
    }

    /// Proposes an attack on `target`. Gated locally: mid-swing, cooldown
    /// not elapsed, or no target all suppress the press. The authority
    /// re-validates everything anyway, this gate just keeps pointless
    /// proposals off the wire.
    pub fn try_attack(
        &mut self,
        ctx: &mut PlayerContext,
        target: Option<QueryHit>,
    ) -> Option<EntityId> {
        if self.state() == Some(PlayerStateKind::Attacking) || !ctx.action_ready() {
            debug!("Attack suppressed: action not ready");
            return None;
        }
        let hit = match target {
            Some(hit) => hit,
            None => {
                debug!("Attack suppressed: no target in range");
                return None;
            }
        };

        let dir = hit.pos - ctx.pos;
        if dir.length() > f32::EPSILON {
            ctx.facing = dir.angle();
        }
        ctx.last_action_time = ctx.time;
        self.machine.change_state(PlayerStateKind::Attacking, ctx);
        Some(hit.id)
    }

    /// Proposes a self-heal. Healer only; shares the action cooldown with
    /// attacks and does not interrupt the movement states.
    pub fn try_heal(&mut self, ctx: &mut PlayerContext) -> bool {
        if ctx.stats.healing_power <= 0 {
            debug!("Heal suppressed: {:?} has no healing power", ctx.stats.role);
            return false;
        }
        if self.state() == Some(PlayerStateKind::Attacking) || !ctx.action_ready() {
            debug!("Heal suppressed: action not ready");
            return false;
        }
        ctx.last_action_time = ctx.time;
        true
    }
}

impl Actor for PlayerController {
    type Ctx = PlayerContext;

    fn on_init(&mut self, ctx: &mut PlayerContext) {
        self.machine.change_state(PlayerStateKind::Idle, ctx);
    }

    fn on_tick(&mut self, ctx: &mut PlayerContext, dt: f32) {
        self.machine.update(ctx, dt);
    }
}

impl Default for PlayerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::FRAC_PI_2;

    const DT: f32 = 1.0 / 60.0;

    fn spawn(role: Role) -> (PlayerController, PlayerContext) {
        let mut controller = PlayerController::new();
        let mut ctx = PlayerContext::spawn(EntityId(1), role, Vec2::ZERO);
        controller.on_init(&mut ctx);
        (controller, ctx)
    }

    fn target_at(id: u32, pos: Vec2, from: Vec2) -> QueryHit {
        QueryHit {
            id: EntityId(id),
            pos,
            distance: from.distance(pos),
        }
    }

    #[test]
    fn test_no_state_before_init() {
        let controller = PlayerController::new();
        assert_eq!(controller.state(), None);
    }

    #[test]
    fn test_init_starts_idle() {
        let (controller, _ctx) = spawn(Role::Dps);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
    }

    #[test]
    fn test_idle_to_moving_and_back() {
        let (mut controller, mut ctx) = spawn(Role::Dps);

        ctx.move_input = Vec2::new(1.0, 0.0);
        controller.on_tick(&mut ctx, DT);
        assert_eq!(controller.state(), Some(PlayerStateKind::Moving));
        // Transition frame only switches states; integration starts next.
        assert_eq!(ctx.pos, Vec2::ZERO);

        controller.on_tick(&mut ctx, DT);
        assert_approx_eq!(ctx.pos.x, 5.0 * DT, 1e-5);

        ctx.move_input = Vec2::ZERO;
        controller.on_tick(&mut ctx, DT);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
    }

    #[test]
    fn test_input_below_deadzone_stays_idle() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.move_input = Vec2::new(0.05, 0.05);
        for _ in 0..5 {
            controller.on_tick(&mut ctx, DT);
        }
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
        assert_eq!(ctx.pos, Vec2::ZERO);
    }

    #[test]
    fn test_held_input_keeps_moving() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.move_input = Vec2::new(1.0, 0.0);
        for _ in 0..10 {
            controller.on_tick(&mut ctx, DT);
        }
        assert_eq!(controller.state(), Some(PlayerStateKind::Moving));
        // One transition frame, nine integration frames.
        assert_approx_eq!(ctx.pos.x, 9.0 * 5.0 * DT, 1e-4);
    }

    #[test]
    fn test_attack_faces_target_and_enters_attacking() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        let target = target_at(7, Vec2::new(0.0, 2.0), ctx.pos);

        let accepted = controller.try_attack(&mut ctx, Some(target));
        assert_eq!(accepted, Some(EntityId(7)));
        assert_eq!(controller.state(), Some(PlayerStateKind::Attacking));
        assert_approx_eq!(ctx.facing, FRAC_PI_2, 1e-6);
        assert_eq!(ctx.last_action_time, 10.0);

        // Mid-swing presses do nothing.
        assert_eq!(controller.try_attack(&mut ctx, Some(target)), None);
    }

    #[test]
    fn test_attack_without_target_is_suppressed() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        assert_eq!(controller.try_attack(&mut ctx, None), None);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
        assert_eq!(ctx.last_action_time, f64::NEG_INFINITY);
    }

    #[test]
    fn test_attack_respects_cooldown() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        let target = target_at(7, Vec2::new(2.0, 0.0), ctx.pos);
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());

        // Let the swing play out, then press again before the cooldown.
        controller.on_tick(&mut ctx, 0.6);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
        ctx.time = 10.6;
        assert_eq!(controller.try_attack(&mut ctx, Some(target)), None);

        // Dps cooldown is 1.0s; the boundary itself is ready.
        ctx.time = 11.0;
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());
    }

    #[test]
    fn test_attacking_roots_movement() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        ctx.move_input = Vec2::new(1.0, 0.0);
        controller.on_tick(&mut ctx, DT);
        let target = target_at(7, Vec2::new(2.0, 0.0), ctx.pos);
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());

        let rooted = ctx.pos;
        controller.on_tick(&mut ctx, 0.3);
        assert_eq!(ctx.pos, rooted);
        assert_eq!(controller.state(), Some(PlayerStateKind::Attacking));
    }

    #[test]
    fn test_attacking_exits_to_moving_with_held_input() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        let target = target_at(7, Vec2::new(2.0, 0.0), ctx.pos);
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());

        ctx.move_input = Vec2::new(0.0, 1.0);
        controller.on_tick(&mut ctx, 0.3);
        assert_eq!(controller.state(), Some(PlayerStateKind::Attacking));
        controller.on_tick(&mut ctx, 0.3);
        assert_eq!(controller.state(), Some(PlayerStateKind::Moving));
    }

    #[test]
    fn test_attacking_exits_to_idle_without_input() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        let target = target_at(7, Vec2::new(2.0, 0.0), ctx.pos);
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());

        controller.on_tick(&mut ctx, 0.6);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));
    }

    #[test]
    fn test_heal_is_healer_only_and_shares_cooldown() {
        let (mut controller, mut ctx) = spawn(Role::Dps);
        ctx.time = 10.0;
        assert!(!controller.try_heal(&mut ctx));

        let (mut controller, mut ctx) = spawn(Role::Healer);
        ctx.time = 10.0;
        assert!(controller.try_heal(&mut ctx));
        assert_eq!(ctx.last_action_time, 10.0);
        assert_eq!(controller.state(), Some(PlayerStateKind::Idle));

        // The heal burned the shared action cooldown.
        let target = target_at(7, Vec2::new(2.0, 0.0), ctx.pos);
        assert_eq!(controller.try_attack(&mut ctx, Some(target)), None);
        ctx.time = 11.0;
        assert!(controller.try_attack(&mut ctx, Some(target)).is_some());
    }

    #[test]
    fn test_reconcile_snaps_large_drift() {
        let (_, mut ctx) = spawn(Role::Dps);
        ctx.server_pos = Vec2::new(10.0, 0.0);
        reconcile(&mut ctx, DT);
        assert_eq!(ctx.pos, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_reconcile_blends_small_drift() {
        let (_, mut ctx) = spawn(Role::Dps);
        ctx.server_pos = Vec2::new(1.0, 0.0);
        reconcile(&mut ctx, DT);
        assert_approx_eq!(ctx.pos.x, CORRECTION_GAIN * DT, 1e-5);
        assert!(ctx.pos.x < 1.0);
    }

    #[test]
    fn test_reconcile_leaves_converged_position_alone() {
        let (_, mut ctx) = spawn(Role::Dps);
        ctx.pos = Vec2::new(3.0, 4.0);
        ctx.server_pos = ctx.pos;
        reconcile(&mut ctx, DT);
        assert_eq!(ctx.pos, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_cooldown_progress_reports_fraction() {
        let (_, mut ctx) = spawn(Role::Dps);
        assert_eq!(ctx.cooldown_progress(), 1.0);

        ctx.time = 10.0;
        ctx.last_action_time = 10.0;
        assert_eq!(ctx.cooldown_progress(), 0.0);
        ctx.time = 10.5;
        assert_approx_eq!(ctx.cooldown_progress(), 0.5, 1e-6);
        ctx.time = 11.2;
        assert_eq!(ctx.cooldown_progress(), 1.0);
    }
}
