//! Connected-client registry: address bindings, input mailboxes and
//! timeout tracking

use log::{debug, info, warn};
use shared::{EntityId, InputState, Role};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Seconds of silence before a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client and the entity it controls.
///
/// The binding from address to entity is the server's only notion of "who
/// sent this": action requests never carry an initiator field, the entity
/// is always looked up from the sender's address.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub id: u32,
    pub addr: SocketAddr,
    pub entity: EntityId,
    pub role: Role,
    pub last_seen: Instant,
    /// Most recent movement input, held until the next tick consumes it.
    pub latest_input: InputState,
    /// Highest action-request sequence accepted so far. Requests at or
    /// below this watermark are duplicates and get dropped.
    pub last_proposal_seq: u32,
}

impl ConnectedClient {
    pub fn new(id: u32, addr: SocketAddr, entity: EntityId, role: Role) -> Self {
        Self {
            id,
            addr,
            entity,
            role,
            last_seen: Instant::now(),
            latest_input: InputState::default(),
            last_proposal_seq: 0,
        }
    }

    /// Stores a movement input if it is newer than what we already hold.
    /// UDP reorders freely, so an older sequence just gets dropped.
    pub fn record_input(&mut self, input: InputState) {
        self.last_seen = Instant::now();
        if input.sequence > self.latest_input.sequence || self.latest_input.sequence == 0 {
            self.latest_input = input;
        }
    }

    /// Returns true if this action sequence has not been seen before and
    /// advances the watermark. Retransmitted requests return false.
    pub fn accept_proposal(&mut self, sequence: u32) -> bool {
        self.last_seen = Instant::now();
        if sequence <= self.last_proposal_seq {
            debug!(
                "Client {} repeated action sequence {} (watermark {})",
                self.id, sequence, self.last_proposal_seq
            );
            return false;
        }
        self.last_proposal_seq = sequence;
        true
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_seen.elapsed() > CLIENT_TIMEOUT
    }
}

/// Tracks every connected client, keyed by client id.
pub struct ClientRegistry {
    clients: HashMap<u32, ConnectedClient>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new client, or returns None when the server is full.
    /// The spawn callback runs with the freshly allocated client id and
    /// produces the entity the client will control, so registration and
    /// spawn commit together.
    pub fn add_client<F>(&mut self, addr: SocketAddr, role: Role, spawn: F) -> Option<(u32, EntityId)>
    where
        F: FnOnce(u32) -> EntityId,
    {
        if self.clients.len() >= self.max_clients {
            warn!("Server full: rejecting connection from {}", addr);
            return None;
        }

        let id = self.next_client_id;
        self.next_client_id += 1;
        let entity = spawn(id);
        self.clients
            .insert(id, ConnectedClient::new(id, addr, entity, role));
        info!(
            "Client {} connected from {} as {:?} (entity {})",
            id, addr, role, entity
        );
        Some((id, entity))
    }

    pub fn remove_client(&mut self, id: u32) -> Option<ConnectedClient> {
        let removed = self.clients.remove(&id);
        if let Some(client) = &removed {
            info!("Client {} ({}) removed", id, client.addr);
        }
        removed
    }

    pub fn get(&self, id: u32) -> Option<&ConnectedClient> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ConnectedClient> {
        self.clients.get_mut(&id)
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.id)
    }

    /// Points an existing client at a different entity, used after a
    /// respawn replaces the old body.
    pub fn rebind_entity(&mut self, id: u32, entity: EntityId) {
        if let Some(client) = self.clients.get_mut(&id) {
            debug!("Client {} rebound to entity {}", id, entity);
            client.entity = entity;
        }
    }

    /// One input per client for the simulation to integrate this tick.
    pub fn latest_inputs(&self) -> Vec<(EntityId, InputState)> {
        self.clients
            .values()
            .map(|client| (client.entity, client.latest_input))
            .collect()
    }

    /// Ids and entities of every client that has gone silent.
    pub fn check_timeouts(&self) -> Vec<(u32, EntityId)> {
        self.clients
            .values()
            .filter(|client| client.is_timed_out())
            .map(|client| (client.id, client.entity))
            .collect()
    }

    /// Id and address of every client, for broadcast fan-out.
    pub fn client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .values()
            .map(|client| (client.id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn input(sequence: u32, move_x: f32) -> InputState {
        InputState {
            sequence,
            timestamp: sequence as u64,
            move_x,
            move_y: 0.0,
        }
    }

    fn join(registry: &mut ClientRegistry, port: u16, entity: u32, role: Role) -> Option<u32> {
        registry
            .add_client(addr(port), role, |_| EntityId(entity))
            .map(|(id, _)| id)
    }

    #[test]
    fn test_add_and_remove_client() {
        let mut registry = ClientRegistry::new(4);

        let id = join(&mut registry, 7001, 1, Role::Dps).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().entity, EntityId(1));

        let removed = registry.remove_client(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.is_empty());
        assert!(registry.remove_client(id).is_none());
    }

    #[test]
    fn test_spawn_callback_sees_allocated_id() {
        let mut registry = ClientRegistry::new(4);

        let mut seen = 0;
        let (id, entity) = registry
            .add_client(addr(7001), Role::Tank, |client_id| {
                seen = client_id;
                EntityId(client_id + 100)
            })
            .unwrap();
        assert_eq!(seen, id);
        assert_eq!(entity, EntityId(id + 100));
    }

    #[test]
    fn test_capacity_limit_skips_spawn() {
        let mut registry = ClientRegistry::new(2);

        assert!(join(&mut registry, 7001, 1, Role::Tank).is_some());
        assert!(join(&mut registry, 7002, 2, Role::Healer).is_some());

        let mut spawned = false;
        let refused = registry.add_client(addr(7003), Role::Dps, |_| {
            spawned = true;
            EntityId(3)
        });
        assert!(refused.is_none());
        assert!(!spawned);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_client_ids_are_unique_after_removal() {
        let mut registry = ClientRegistry::new(4);

        let first = join(&mut registry, 7001, 1, Role::Dps).unwrap();
        registry.remove_client(first);
        let second = join(&mut registry, 7001, 2, Role::Dps).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_find_by_addr() {
        let mut registry = ClientRegistry::new(4);
        let id = join(&mut registry, 7005, 3, Role::Tank).unwrap();

        assert_eq!(registry.find_by_addr(addr(7005)), Some(id));
        assert_eq!(registry.find_by_addr(addr(7006)), None);
    }

    #[test]
    fn test_newest_input_wins() {
        let mut registry = ClientRegistry::new(4);
        let id = join(&mut registry, 7001, 1, Role::Dps).unwrap();

        let client = registry.get_mut(id).unwrap();
        client.record_input(input(5, 1.0));
        client.record_input(input(3, -1.0));
        assert_eq!(client.latest_input.sequence, 5);
        assert_eq!(client.latest_input.move_x, 1.0);

        client.record_input(input(6, -0.5));
        assert_eq!(client.latest_input.sequence, 6);
    }

    #[test]
    fn test_proposal_watermark_rejects_duplicates() {
        let mut registry = ClientRegistry::new(4);
        let id = join(&mut registry, 7001, 1, Role::Dps).unwrap();

        let client = registry.get_mut(id).unwrap();
        assert!(client.accept_proposal(1));
        assert!(!client.accept_proposal(1));
        assert!(client.accept_proposal(2));
        assert!(!client.accept_proposal(1));
    }

    #[test]
    fn test_latest_inputs_cover_all_clients() {
        let mut registry = ClientRegistry::new(4);
        let a = join(&mut registry, 7001, 1, Role::Dps).unwrap();
        let b = join(&mut registry, 7002, 2, Role::Tank).unwrap();

        registry.get_mut(a).unwrap().record_input(input(1, 1.0));
        registry.get_mut(b).unwrap().record_input(input(4, -1.0));

        let mut inputs = registry.latest_inputs();
        inputs.sort_by_key(|(entity, _)| *entity);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].0, EntityId(1));
        assert_eq!(inputs[1].1.sequence, 4);
    }

    #[test]
    fn test_rebind_entity() {
        let mut registry = ClientRegistry::new(4);
        let id = join(&mut registry, 7001, 1, Role::Dps).unwrap();

        registry.rebind_entity(id, EntityId(9));
        assert_eq!(registry.get(id).unwrap().entity, EntityId(9));
    }

    #[test]
    fn test_client_addrs_pairs_ids_with_addresses() {
        let mut registry = ClientRegistry::new(4);
        let a = join(&mut registry, 7001, 1, Role::Dps).unwrap();
        let b = join(&mut registry, 7002, 2, Role::Tank).unwrap();

        let mut pairs = registry.client_addrs();
        pairs.sort_by_key(|(id, _)| *id);
        assert_eq!(pairs, vec![(a, addr(7001)), (b, addr(7002))]);
    }

    #[test]
    fn test_fresh_clients_are_not_timed_out() {
        let mut registry = ClientRegistry::new(4);
        join(&mut registry, 7001, 1, Role::Dps).unwrap();
        assert!(registry.check_timeouts().is_empty());
    }
}
