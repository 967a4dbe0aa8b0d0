use crate::stats::Role;
use crate::vec::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque identifier for a replicated entity. Valid from spawn to despawn;
/// the server never reuses an id within a session.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Players,
    Enemies,
}

impl Faction {
    pub fn opposing(&self) -> Faction {
        match self {
            Faction::Players => Faction::Enemies,
            Faction::Enemies => Faction::Players,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        role: Role,
    },
    Input {
        sequence: u32,
        timestamp: u64,
        move_x: f32,
        move_y: f32,
    },
    AttackRequest {
        sequence: u32,
        target: EntityId,
    },
    HealRequest {
        sequence: u32,
    },
    Disconnect,

    Connected {
        client_id: u32,
        entity_id: EntityId,
    },
    Snapshot {
        tick: u32,
        timestamp: u64,
        entities: Vec<EntitySnapshot>,
        events: Vec<GameEvent>,
    },
    Respawn {
        entity_id: EntityId,
    },
    Disconnected {
        reason: String,
    },
}

/// Per-entity replicated state carried by every snapshot. An entity absent
/// from a snapshot no longer exists on the server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub faction: Faction,
    pub role: Role,
    pub pos: Vec2,
    pub facing: f32,
    pub health: i32,
    /// Revision of the health value; observers ignore anything not newer
    /// than what they already hold.
    pub health_rev: u32,
    pub max_health: i32,
}

impl EntitySnapshot {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// One-shot notifications for presentation. Purely observational; gameplay
/// state never depends on them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum GameEvent {
    AttackSwung { attacker: EntityId, target: EntityId },
    Healed { target: EntityId, amount: i32 },
    Died { entity: EntityId },
}

/// Most recent movement input received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub sequence: u32,
    pub timestamp: u64,
    pub move_x: f32,
    pub move_y: f32,
}

impl InputState {
    pub fn move_vector(&self) -> Vec2 {
        Vec2::new(self.move_x, self.move_y)
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_opposing() {
        assert_eq!(Faction::Players.opposing(), Faction::Enemies);
        assert_eq!(Faction::Enemies.opposing(), Faction::Players);
    }

    #[test]
    fn test_entity_id_ordering() {
        let a = EntityId(3);
        let b = EntityId(7);
        assert!(a < b);
        assert_eq!(format!("{}", a), "3");
    }

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: 1,
            role: Role::Healer,
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::Connect {
                client_version,
                role,
            } => {
                assert_eq!(client_version, 1);
                assert_eq!(role, Role::Healer);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_input() {
        let packet = Packet::Input {
            sequence: 42,
            timestamp: 123456,
            move_x: 0.5,
            move_y: -1.0,
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::Input {
                sequence,
                timestamp,
                move_x,
                move_y,
            } => {
                assert_eq!(sequence, 42);
                assert_eq!(timestamp, 123456);
                assert_eq!(move_x, 0.5);
                assert_eq!(move_y, -1.0);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_attack_request() {
        let packet = Packet::AttackRequest {
            sequence: 9,
            target: EntityId(31),
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::AttackRequest { sequence, target } => {
                assert_eq!(sequence, 9);
                assert_eq!(target, EntityId(31));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_snapshot() {
        let entities = vec![
            EntitySnapshot {
                id: EntityId(1),
                faction: Faction::Players,
                role: Role::Tank,
                pos: Vec2::new(1.0, 2.0),
                facing: 0.5,
                health: 150,
                health_rev: 0,
                max_health: 150,
            },
            EntitySnapshot {
                id: EntityId(2),
                faction: Faction::Enemies,
                role: Role::Grunt,
                pos: Vec2::new(-3.0, 4.0),
                facing: -1.2,
                health: 25,
                health_rev: 4,
                max_health: 40,
            },
        ];
        let events = vec![GameEvent::Died { entity: EntityId(5) }];

        let packet = Packet::Snapshot {
            tick: 77,
            timestamp: 999,
            entities,
            events,
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::Snapshot {
                tick,
                timestamp,
                entities,
                events,
            } => {
                assert_eq!(tick, 77);
                assert_eq!(timestamp, 999);
                assert_eq!(entities.len(), 2);
                assert_eq!(entities[0].id, EntityId(1));
                assert!(entities[0].is_alive());
                assert_eq!(entities[1].health_rev, 4);
                assert_eq!(events, vec![GameEvent::Died { entity: EntityId(5) }]);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_input_state_move_vector() {
        let input = InputState {
            sequence: 1,
            timestamp: 2,
            move_x: 1.0,
            move_y: 0.0,
        };
        assert_eq!(input.move_vector(), Vec2::new(1.0, 0.0));
    }
}
