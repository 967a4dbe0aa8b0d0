use crate::stats::StatBlock;
use crate::vec::{rotate_towards, Vec2};
use crate::{ARENA_HALF_EXTENT, MOVE_INPUT_THRESHOLD};

/// Outcome of one movement integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moved {
    pub pos: Vec2,
    pub facing: f32,
    pub moving: bool,
}

/// True when the input vector is past the deadzone. The same predicate
/// feeds state-machine transitions on the controlling side.
pub fn is_moving(input: Vec2) -> bool {
    input.length() >= MOVE_INPUT_THRESHOLD
}

/// Integrates one tick of rate-based movement from a held input vector.
/// Runs identically on the server (authoritative) and on the controlling
/// client (prediction), so both converge on the same position for the
/// same inputs.
pub fn step(pos: Vec2, facing: f32, input: Vec2, stats: &StatBlock, dt: f32) -> Moved {
    if !is_moving(input) {
        return Moved {
            pos,
            facing,
            moving: false,
        };
    }

    // Normalizing caps oversized vectors (diagonals, tampered packets) at
    // unit speed.
    let dir = input.normalized();

    let next = (pos + dir * (stats.move_speed * dt)).clamp_axes(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
    let heading = rotate_towards(facing, dir.angle(), stats.rotation_speed_rad() * dt);

    Moved {
        pos: next,
        facing: heading,
        moving: true,
    }
}
