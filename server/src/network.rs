//! Server network layer handling UDP communications and game loop coordination

use crate::clients::ClientRegistry;
use crate::game::{Proposal, Simulation};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{now_millis, EntityId, InputState, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        entity: EntityId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating networking and the authoritative simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientRegistry>>,
    simulation: Simulation,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        simulation: Simulation,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientRegistry::new(max_clients))),
            simulation,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let clients_guard = clients.read().await;
                    clients_guard.check_timeouts()
                };

                for (client_id, entity) in timed_out {
                    if let Err(e) =
                        server_tx.send(ServerMessage::ClientTimeout { client_id, entity })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Processes incoming packets and updates simulation state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                role,
            } => {
                info!(
                    "Client connecting from {} as {:?} (version: {})",
                    addr, role, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Version mismatch from {}: got {}, need {}",
                        addr, client_version, PROTOCOL_VERSION
                    );
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                    return;
                }

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let removed = {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(existing_id)
                    };
                    if let Some(client) = removed {
                        self.simulation.handle_disconnect(client.id, client.entity);
                    }
                }

                // Try to add new client; the entity spawns only if the
                // registration goes through
                let added = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr, role, |client_id| {
                        self.simulation.spawn_player(client_id, role)
                    })
                };

                match added {
                    Some((client_id, entity_id)) => {
                        let response = Packet::Connected {
                            client_id,
                            entity_id,
                        };
                        self.send_packet(&response, addr).await;
                    }
                    None => {
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_packet(&response, addr).await;
                    }
                }
            }

            Packet::Input {
                sequence,
                timestamp,
                move_x,
                move_y,
            } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    if let Some(client) = clients.get_mut(client_id) {
                        client.record_input(InputState {
                            sequence,
                            timestamp,
                            move_x,
                            move_y,
                        });
                    }
                }
            }

            Packet::AttackRequest { sequence, target } => {
                if let Some(initiator) = self.accept_action(addr, sequence).await {
                    self.simulation
                        .queue_proposal(Proposal::Attack { initiator, target });
                }
            }

            Packet::HealRequest { sequence } => {
                if let Some(initiator) = self.accept_action(addr, sequence).await {
                    self.simulation.queue_proposal(Proposal::Heal { initiator });
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let removed = {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(client_id)
                    };
                    if let Some(client) = removed {
                        self.simulation.handle_disconnect(client.id, client.entity);
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Dedupes an action request and resolves the sender to its entity.
    /// The initiator is always the sender's own entity; a packet cannot
    /// act on anyone else's behalf.
    async fn accept_action(&self, addr: SocketAddr, sequence: u32) -> Option<EntityId> {
        let client_id = {
            let clients = self.clients.read().await;
            clients.find_by_addr(addr)
        }?;

        let mut clients = self.clients.write().await;
        let client = clients.get_mut(client_id)?;
        if client.accept_proposal(sequence) {
            Some(client.entity)
        } else {
            None
        }
    }

    /// Runs one fixed simulation step. Respawns go back as unicasts before
    /// the snapshot broadcast so the owning client rebinds first.
    async fn game_tick(&mut self, dt: f32) {
        let inputs = {
            let clients = self.clients.read().await;
            clients.latest_inputs()
        };

        let report = self.simulation.tick(dt, &inputs);

        for (client_id, entity) in report.respawned {
            let addr = {
                let mut clients = self.clients.write().await;
                clients.rebind_entity(client_id, entity);
                clients.get(client_id).map(|client| client.addr)
            };
            if let Some(addr) = addr {
                self.send_packet(&Packet::Respawn { entity_id: entity }, addr)
                    .await;
            }
        }

        self.broadcast_snapshot().await;
    }

    /// Broadcasts the full replicated state to all connected clients.
    /// Every tick carries everything; observers discard whatever is not
    /// newer than what they already hold.
    async fn broadcast_snapshot(&mut self) {
        // Drain even with nobody connected so events never pile up.
        let events = self.simulation.drain_events();

        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };

        if client_count == 0 {
            return;
        }

        let packet = Packet::Snapshot {
            tick: self.simulation.tick_count(),
            timestamp: now_millis(),
            entities: self.simulation.snapshot_entities(),
            events,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, entity }) => {
                            info!("Client {} timed out", client_id);
                            {
                                let mut clients = self.clients.write().await;
                                clients.remove_client(client_id);
                            }
                            self.simulation.handle_disconnect(client_id, entity);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.game_tick(dt).await;

                    // Periodic performance monitoring
                    if self.simulation.tick_count() % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            debug!("Tick {}: {} clients, {} entities ({} enemy minds), {:.1}Hz",
                                   self.simulation.tick_count(), client_count,
                                   self.simulation.world().len(),
                                   self.simulation.enemy_count(), 1.0 / dt);
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
