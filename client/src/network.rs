//! Non-blocking UDP client plumbing, polled once per frame

use bincode::{deserialize, serialize};
use log::{debug, info, warn};
use shared::{now_millis, EntityId, InputState, Packet, Role, PROTOCOL_VERSION};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// The server drops clients silent for this long; mirror the window
/// locally so the HUD can report a dead link instead of a frozen one.
const SERVER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// UDP half of the client. A graphics main loop and an async runtime do
/// not compose, so this wraps a non-blocking socket that the frame loop
/// drains at the top of every frame.
pub struct Connection {
    socket: UdpSocket,
    server_addr: SocketAddr,
    role: Role,
    status: ConnectionStatus,
    client_id: Option<u32>,
    next_action_sequence: u32,
    ping_ms: u64,
    last_server_contact: Instant,
}

impl Connection {
    pub fn new(server_addr: &str, role: Role) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let server_addr = server_addr.parse()?;

        let mut connection = Self {
            socket,
            server_addr,
            role,
            status: ConnectionStatus::Connecting,
            client_id: None,
            next_action_sequence: 1,
            ping_ms: 0,
            last_server_contact: Instant::now(),
        };
        connection.send_connect();
        Ok(connection)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    /// Snapshot-derived round trip estimate in milliseconds.
    pub fn ping_ms(&self) -> u64 {
        self.ping_ms
    }

    /// Drains every datagram that arrived since the last frame. Lifecycle
    /// packets update the connection's own bookkeeping on the way through;
    /// everything is handed to the caller in arrival order.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut buffer = [0u8; 2048];

        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, addr)) => {
                    if addr != self.server_addr {
                        warn!("Dropping datagram from unexpected address {}", addr);
                        continue;
                    }
                    match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) => {
                            self.observe(&packet);
                            packets.push(packet);
                        }
                        Err(e) => warn!("Failed to deserialize packet: {}", e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!("Server refused datagram; is it running?");
                    break;
                }
                Err(e) => {
                    warn!("Error receiving packet: {}", e);
                    break;
                }
            }
        }

        if self.status == ConnectionStatus::Connected
            && self.last_server_contact.elapsed() >= SERVER_TIMEOUT
        {
            warn!("No server traffic for {:?}, marking disconnected", SERVER_TIMEOUT);
            self.status = ConnectionStatus::Disconnected;
            self.client_id = None;
        }

        packets
    }

    fn observe(&mut self, packet: &Packet) {
        self.last_server_contact = Instant::now();
        match packet {
            Packet::Connected {
                client_id,
                entity_id,
            } => {
                info!("Connected! Client ID: {}, entity {}", client_id, entity_id);
                self.client_id = Some(*client_id);
                self.status = ConnectionStatus::Connected;
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
                self.client_id = None;
                self.status = ConnectionStatus::Disconnected;
            }
            Packet::Snapshot { timestamp, .. } => {
                if *timestamp > 0 {
                    self.ping_ms = now_millis().saturating_sub(*timestamp);
                }
            }
            _ => {}
        }
    }

    /// Latest-wins movement input; the server ignores stale sequences.
    pub fn send_input(&self, input: &InputState) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        self.send_packet(&Packet::Input {
            sequence: input.sequence,
            timestamp: input.timestamp,
            move_x: input.move_x,
            move_y: input.move_y,
        });
    }

    /// Proposes an attack on `target`. The packet never names the
    /// initiator; the server binds it to this connection's entity.
    pub fn send_attack(&mut self, target: EntityId) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        let sequence = self.next_action_sequence;
        self.next_action_sequence += 1;
        self.send_packet(&Packet::AttackRequest { sequence, target });
    }

    pub fn send_heal(&mut self) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        let sequence = self.next_action_sequence;
        self.next_action_sequence += 1;
        self.send_packet(&Packet::HealRequest { sequence });
    }

    pub fn send_disconnect(&self) {
        if self.status == ConnectionStatus::Connected {
            self.send_packet(&Packet::Disconnect);
        }
    }

    /// Tears down the current session and asks for a fresh one. Bound to
    /// the R key.
    pub fn reconnect(&mut self) {
        self.send_packet(&Packet::Disconnect);
        self.send_connect();
    }

    fn send_connect(&mut self) {
        info!("Connecting to {} as {:?}...", self.server_addr, self.role);
        self.status = ConnectionStatus::Connecting;
        self.client_id = None;
        self.last_server_contact = Instant::now();
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
            role: self.role,
        });
    }

    /// Fire-and-forget datagram. Send errors are logged and dropped; the
    /// protocol has no delivery guarantee to uphold.
    fn send_packet(&self, packet: &Packet) {
        match serialize(packet) {
            Ok(data) => {
                if let Err(e) = self.socket.send_to(&data, self.server_addr) {
                    warn!("Failed to send packet: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize packet: {}", e),
        }
    }
}
