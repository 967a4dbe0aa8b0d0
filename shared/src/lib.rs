pub mod fsm;
pub mod health;
pub mod movement;
pub mod protocol;
pub mod replication;
pub mod spatial;
pub mod stats;
pub mod tick;
pub mod vec;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PLAYERS: usize = 4;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Square arena centered on the origin; positions stay in
/// [-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT] on both axes.
pub const ARENA_HALF_EXTENT: f32 = 30.0;
pub const MOVE_INPUT_THRESHOLD: f32 = 0.1;

pub const ATTACK_DURATION: f32 = 0.5;
pub const MAX_QUERY_RESULTS: usize = 10;

pub const ENEMY_DETECTION_RANGE: f32 = 10.0;
pub const PATROL_RADIUS: f32 = 5.0;
pub const PATROL_WAIT_TIME: f32 = 2.0;

pub const RESPAWN_DELAY: f32 = 3.0;

pub use health::{DamageOutcome, Health};
pub use protocol::{
    now_millis, EntityId, EntitySnapshot, Faction, GameEvent, InputState, Packet,
};
pub use replication::{ControlRole, NotAuthorityError, SyncVar};
pub use stats::{Role, StatBlock};
pub use vec::Vec2;
