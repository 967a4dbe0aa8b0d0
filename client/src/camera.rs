//! Smoothed follow camera and the world-to-screen transform

use shared::Vec2;

const SMOOTH_SPEED: f32 = 5.0;
const PIXELS_PER_UNIT: f32 = 12.0;

/// Exponentially smoothed camera centered on a world point. All drawing
/// goes through its transform; one world unit maps to a fixed number of
/// pixels.
pub struct Camera {
    pos: Vec2,
}

impl Camera {
    pub fn new(center: Vec2) -> Self {
        Self { pos: center }
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    /// Eases toward `target`, fast enough that the residual error stays
    /// under a pixel at normal movement speeds.
    pub fn follow(&mut self, target: Vec2, dt: f32) {
        let blend = (SMOOTH_SPEED * dt).min(1.0);
        self.pos = self.pos + (target - self.pos) * blend;
    }

    /// Drops any easing and recenters immediately. Used on spawn and
    /// respawn so the view does not fly across the arena.
    pub fn snap_to(&mut self, target: Vec2) {
        self.pos = target;
    }

    /// World point to screen pixels for the current screen size.
    pub fn world_to_screen(&self, world: Vec2, screen_w: f32, screen_h: f32) -> (f32, f32) {
        (
            screen_w * 0.5 + (world.x - self.pos.x) * PIXELS_PER_UNIT,
            screen_h * 0.5 + (world.y - self.pos.y) * PIXELS_PER_UNIT,
        )
    }

    /// World length to pixels.
    pub fn scale(&self, length: f32) -> f32 {
        length * PIXELS_PER_UNIT
    }
}
