use bincode::{deserialize, serialize};
use shared::{now_millis, EntityId, EntitySnapshot, Packet, Role, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;

// Headless smoke client: connects, wanders for ten seconds, swings at
// whatever hostile it drifts close to, then disconnects.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create local socket
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    // Server address
    let server_addr = "127.0.0.1:8080".parse::<SocketAddr>()?;

    // Prepare connection request
    let connect_packet = Packet::Connect {
        client_version: PROTOCOL_VERSION,
        role: Role::Dps,
    };
    let connect_data = serialize(&connect_packet)?;

    // Send connection request
    println!("Sending connection request to {}", server_addr);
    socket.send_to(&connect_data, server_addr).await?;

    // Buffer for receiving data
    let mut buf = [0u8; 2048];

    // Wait for response
    println!("Waiting for server response...");
    let (len, addr) = socket.recv_from(&mut buf).await?;
    println!("Received {} bytes from {}", len, addr);

    let packet = match deserialize::<Packet>(&buf[0..len]) {
        Ok(packet) => packet,
        Err(e) => {
            println!("Failed to deserialize response: {}", e);
            return Ok(());
        }
    };

    let mut my_entity = match packet {
        Packet::Connected {
            client_id,
            entity_id,
        } => {
            println!(
                "Connection accepted: client {} controlling entity {}",
                client_id, entity_id
            );
            entity_id
        }
        other => {
            println!("Expected Connected but got: {:?}", other);
            return Ok(());
        }
    };

    let mut input_sequence = 1u32;
    let mut action_sequence = 1u32;

    // Wander on a slow circle for 10 seconds, one input per second
    for i in 0..10 {
        let move_x = (i as f32 / 5.0).sin();
        let move_y = (i as f32 / 5.0).cos();

        let input_packet = Packet::Input {
            sequence: input_sequence,
            timestamp: now_millis(),
            move_x,
            move_y,
        };
        println!(
            "Sending input {} ({:.2}, {:.2})",
            input_sequence, move_x, move_y
        );
        input_sequence += 1;
        socket
            .send_to(&serialize(&input_packet)?, server_addr)
            .await?;

        // Read whatever snapshot is waiting
        match socket.recv_from(&mut buf).await {
            Ok((len, _)) => match deserialize::<Packet>(&buf[0..len]) {
                Ok(Packet::Snapshot {
                    tick,
                    entities,
                    events,
                    ..
                }) => {
                    println!(
                        "Snapshot tick {}: {} entities, {} events",
                        tick,
                        entities.len(),
                        events.len()
                    );

                    if let Some(target) = pick_target(&entities, my_entity) {
                        let attack = Packet::AttackRequest {
                            sequence: action_sequence,
                            target,
                        };
                        action_sequence += 1;
                        println!("  Attacking entity {}", target);
                        socket.send_to(&serialize(&attack)?, server_addr).await?;
                    }
                }
                Ok(Packet::Respawn { entity_id }) => {
                    println!("Respawned as entity {}", entity_id);
                    my_entity = entity_id;
                }
                Ok(other) => println!("Unexpected packet: {:?}", other),
                Err(e) => println!("Failed to deserialize snapshot: {}", e),
            },
            Err(e) => println!("Error receiving snapshot: {}", e),
        }

        // Wait a second between inputs
        sleep(Duration::from_secs(1)).await;
    }

    // Send disconnect when done
    println!("Sending disconnect request");
    socket
        .send_to(&serialize(&Packet::Disconnect)?, server_addr)
        .await?;

    println!("Test client finished");
    Ok(())
}

/// Nearest living hostile inside attack reach, if any.
fn pick_target(entities: &[EntitySnapshot], my_entity: EntityId) -> Option<EntityId> {
    let me = entities.iter().find(|e| e.id == my_entity)?;

    entities
        .iter()
        .filter(|e| e.faction != me.faction && e.is_alive())
        .map(|e| (e.id, me.pos.distance(e.pos)))
        .filter(|(_, d)| *d <= 2.5)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| id)
}
