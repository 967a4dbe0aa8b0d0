use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        (other - *self).length()
    }

    /// Returns a unit-length copy, or zero if the vector is too short to
    /// normalize safely.
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len < f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// Steps from `self` toward `target` by at most `max_delta` without
    /// overshooting.
    pub fn move_towards(&self, target: Vec2, max_delta: f32) -> Vec2 {
        let to_target = target - *self;
        let dist = to_target.length();
        if dist <= max_delta || dist < f32::EPSILON {
            target
        } else {
            *self + to_target * (max_delta / dist)
        }
    }

    /// Angle of the vector in radians, measured from the +x axis.
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn from_angle(angle: f32) -> Vec2 {
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn clamp_axes(&self, min: f32, max: f32) -> Vec2 {
        Vec2::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Wraps an angle into (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    }
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Rotates `current` toward `target` by at most `max_delta` radians, always
/// taking the shorter way around the circle.
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= max_delta {
        wrap_angle(target)
    } else {
        wrap_angle(current + max_delta.copysign(diff))
    }
}
