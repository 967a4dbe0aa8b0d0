//! Immediate-mode rendering: arena, entities, transient combat FX, HUD

use crate::camera::Camera;
use crate::game::{ViewEvent, WorldView};
use crate::network::ConnectionStatus;
use crate::player::{PlayerContext, PlayerStateKind};
use macroquad::prelude::*;
use shared::{GameEvent, Role, Vec2, ARENA_HALF_EXTENT};

/// Everything the overlay needs for one frame, gathered by the frame
/// loop so drawing stays read-only.
#[derive(Debug, Clone)]
pub struct HudConfig {
    pub status: ConnectionStatus,
    pub ping_ms: u64,
    pub entity_count: usize,
    pub role: Option<Role>,
    pub state: Option<PlayerStateKind>,
    pub health: Option<(i32, i32)>,
    pub cooldown_progress: f32,
}

enum FxKind {
    Swing,
    Heal(i32),
    Death,
}

/// One transient marker spawned from a broadcast event.
struct Fx {
    kind: FxKind,
    pos: Vec2,
    age: f32,
    ttl: f32,
}

fn role_color(role: Role) -> Color {
    match role {
        Role::Tank => Color::from_rgba(66, 135, 245, 255),
        Role::Healer => Color::from_rgba(84, 227, 141, 255),
        Role::Dps => Color::from_rgba(245, 200, 66, 255),
        Role::Grunt => Color::from_rgba(255, 68, 68, 255),
    }
}

pub struct Renderer {
    fx: Vec<Fx>,
}

impl Renderer {
    pub fn new() -> Self {
        Self { fx: Vec::new() }
    }

    /// Queues transient markers for freshly drained events.
    pub fn ingest_events(&mut self, events: &[ViewEvent]) {
        for view_event in events {
            let (kind, ttl) = match view_event.event {
                GameEvent::AttackSwung { .. } => (FxKind::Swing, 0.25),
                GameEvent::Healed { amount, .. } => (FxKind::Heal(amount), 0.9),
                GameEvent::Died { .. } => (FxKind::Death, 0.6),
            };
            self.fx.push(Fx {
                kind,
                pos: view_event.pos,
                age: 0.0,
                ttl,
            });
        }
    }

    /// Ages queued FX and drops the expired ones.
    pub fn update(&mut self, dt: f32) {
        for fx in &mut self.fx {
            fx.age += dt;
        }
        self.fx.retain(|fx| fx.age < fx.ttl);
    }

    pub fn draw(
        &self,
        view: &WorldView,
        camera: &Camera,
        local: Option<&PlayerContext>,
        hud: &HudConfig,
    ) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_arena(camera);

        let local_entity = local.map(|ctx| ctx.entity);
        for entity in view.entities() {
            if Some(entity.id) == local_entity {
                continue;
            }
            self.draw_entity(camera, entity.pos, entity.facing, role_color(entity.role()), false);
            self.draw_health_bar(camera, entity.pos, entity.health.current(), entity.health.max());
        }

        if let Some(ctx) = local {
            // The local avatar draws from the predicted context, not the
            // snapshot, so it answers input with no round trip.
            self.draw_entity(camera, ctx.pos, ctx.facing, role_color(ctx.stats.role), true);
            if let Some(entity) = view.get(ctx.entity) {
                self.draw_health_bar(camera, ctx.pos, entity.health.current(), entity.health.max());
            }
            self.draw_cooldown_bar(camera, ctx.pos, hud.cooldown_progress);
        }

        self.draw_fx(camera);
        self.draw_hud(hud);
    }

    fn draw_arena(&self, camera: &Camera) {
        let corner = Vec2::new(-ARENA_HALF_EXTENT, -ARENA_HALF_EXTENT);
        let (left, top) = camera.world_to_screen(corner, screen_width(), screen_height());
        let side = camera.scale(2.0 * ARENA_HALF_EXTENT);

        draw_rectangle(left, top, side, side, Color::from_rgba(38, 38, 38, 255));
        draw_rectangle_lines(left, top, side, side, 3.0, Color::from_rgba(68, 68, 68, 255));
    }

    fn draw_entity(&self, camera: &Camera, pos: Vec2, facing: f32, color: Color, is_local: bool) {
        let (x, y) = camera.world_to_screen(pos, screen_width(), screen_height());
        let radius = camera.scale(0.6);

        draw_circle(x, y, radius, color);
        let outline = if is_local { GREEN } else { WHITE };
        draw_circle_lines(x, y, radius, 2.0, outline);

        // Facing tick so turning is visible.
        let tip = pos + Vec2::from_angle(facing) * 1.0;
        let (tx, ty) = camera.world_to_screen(tip, screen_width(), screen_height());
        draw_line(x, y, tx, ty, 2.0, outline);
    }

    fn draw_health_bar(&self, camera: &Camera, pos: Vec2, current: i32, max: i32) {
        let (x, y) = camera.world_to_screen(pos, screen_width(), screen_height());
        let width = camera.scale(1.6);
        let height = 4.0;
        let left = x - width * 0.5;
        let top = y - camera.scale(1.1) - height;

        let fraction = if max > 0 {
            (current as f32 / max as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };
        draw_rectangle(left, top, width, height, Color::from_rgba(80, 24, 24, 255));
        draw_rectangle(left, top, width * fraction, height, Color::from_rgba(68, 204, 68, 255));
        draw_rectangle_lines(left, top, width, height, 1.0, WHITE);
    }

    fn draw_cooldown_bar(&self, camera: &Camera, pos: Vec2, progress: f32) {
        if progress >= 1.0 {
            return;
        }
        let (x, y) = camera.world_to_screen(pos, screen_width(), screen_height());
        let width = camera.scale(1.6);
        let left = x - width * 0.5;
        let top = y + camera.scale(1.1);

        draw_rectangle(left, top, width, 3.0, Color::from_rgba(51, 51, 51, 255));
        draw_rectangle(left, top, width * progress.clamp(0.0, 1.0), 3.0, YELLOW);
    }

    fn draw_fx(&self, camera: &Camera) {
        for fx in &self.fx {
            let (x, y) = camera.world_to_screen(fx.pos, screen_width(), screen_height());
            let t = (fx.age / fx.ttl).clamp(0.0, 1.0);
            let fade = ((1.0 - t) * 255.0) as u8;
            match fx.kind {
                FxKind::Swing => {
                    let radius = camera.scale(0.4 + t * 0.8);
                    draw_circle_lines(x, y, radius, 2.0, Color::from_rgba(255, 255, 255, fade));
                }
                FxKind::Heal(amount) => {
                    let text = format!("+{}", amount);
                    let rise = camera.scale(1.4) + t * 18.0;
                    draw_text(&text, x - 8.0, y - rise, 18.0, Color::from_rgba(84, 227, 141, fade));
                }
                FxKind::Death => {
                    let radius = camera.scale(0.6 + t * 1.8);
                    draw_circle_lines(x, y, radius, 3.0, Color::from_rgba(255, 68, 68, fade));
                }
            }
        }
    }

    fn draw_hud(&self, hud: &HudConfig) {
        let y_start = 10.0;

        let connection_color = match hud.status {
            ConnectionStatus::Connected => GREEN,
            ConnectionStatus::Connecting => YELLOW,
            ConnectionStatus::Disconnected => RED,
        };
        draw_rectangle(10.0, y_start, 8.0, 8.0, connection_color);
        let label = match hud.status {
            ConnectionStatus::Connected => "CON",
            ConnectionStatus::Connecting => "...",
            ConnectionStatus::Disconnected => "OFF",
        };
        draw_text(label, 22.0, y_start + 8.0, 12.0, WHITE);

        let ping_y = y_start + 15.0;
        let ping_bars = ((hud.ping_ms / 20).min(10)) as i32;
        for i in 0..10i32 {
            let bar_color = if i < ping_bars {
                if hud.ping_ms < 50 {
                    GREEN
                } else if hud.ping_ms < 100 {
                    YELLOW
                } else {
                    RED
                }
            } else {
                Color::from_rgba(51, 51, 51, 255)
            };
            draw_rectangle(10.0 + (i as f32) * 3.0, ping_y, 2.0, 8.0, bar_color);
        }
        draw_text(&format!("{}ms", hud.ping_ms), 45.0, ping_y + 8.0, 12.0, WHITE);

        let info_y = ping_y + 15.0;
        draw_text(
            &format!("{} entities", hud.entity_count),
            10.0,
            info_y + 8.0,
            12.0,
            WHITE,
        );

        if let (Some(role), Some((current, max))) = (hud.role, hud.health) {
            let state = match hud.state {
                Some(PlayerStateKind::Idle) => "idle",
                Some(PlayerStateKind::Moving) => "moving",
                Some(PlayerStateKind::Attacking) => "attacking",
                None => "-",
            };
            draw_text(
                &format!("{:?}  {}/{}  {}", role, current, max, state),
                10.0,
                info_y + 28.0,
                14.0,
                WHITE,
            );
        } else {
            match hud.status {
                ConnectionStatus::Connecting => {
                    draw_text("Connecting...", 10.0, info_y + 28.0, 16.0, YELLOW);
                }
                ConnectionStatus::Connected => {
                    draw_text("Waiting to spawn...", 10.0, info_y + 28.0, 16.0, GRAY);
                }
                ConnectionStatus::Disconnected => {
                    draw_text("Press R to reconnect", 10.0, info_y + 28.0, 16.0, YELLOW);
                }
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
