use serde::{Deserialize, Serialize};

/// Immutable per-archetype tuning data. Loaded once when an entity spawns
/// and never mutated; both sides read the same numbers so client-side
/// prediction and server-side validation agree.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct StatBlock {
    pub role: Role,
    pub max_health: i32,
    pub move_speed: f32,
    /// Degrees per second, matching how turn rates are usually tuned.
    pub rotation_speed: f32,
    pub attack_damage: i32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub healing_power: i32,
    /// Fraction of incoming damage absorbed, in [0, 1].
    pub damage_reduction: f32,
}

impl StatBlock {
    pub fn rotation_speed_rad(&self) -> f32 {
        self.rotation_speed.to_radians()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Tank,
    Healer,
    Dps,
    Grunt,
}

impl Role {
    pub fn stats(&self) -> StatBlock {
        match self {
            Role::Tank => StatBlock {
                role: Role::Tank,
                max_health: 150,
                move_speed: 4.5,
                rotation_speed: 720.0,
                attack_damage: 8,
                attack_range: 2.5,
                attack_cooldown: 1.0,
                healing_power: 0,
                damage_reduction: 0.3,
            },
            Role::Healer => StatBlock {
                role: Role::Healer,
                max_health: 80,
                move_speed: 5.0,
                rotation_speed: 720.0,
                attack_damage: 6,
                attack_range: 2.5,
                attack_cooldown: 1.0,
                healing_power: 15,
                damage_reduction: 0.0,
            },
            Role::Dps => StatBlock {
                role: Role::Dps,
                max_health: 100,
                move_speed: 5.0,
                rotation_speed: 720.0,
                attack_damage: 10,
                attack_range: 2.5,
                attack_cooldown: 1.0,
                healing_power: 0,
                damage_reduction: 0.0,
            },
            Role::Grunt => StatBlock {
                role: Role::Grunt,
                max_health: 40,
                move_speed: 3.0,
                rotation_speed: 720.0,
                attack_damage: 5,
                attack_range: 2.5,
                attack_cooldown: 1.5,
                healing_power: 0,
                damage_reduction: 0.0,
            },
        }
    }

    pub fn is_player(&self) -> bool {
        !matches!(self, Role::Grunt)
    }
}
