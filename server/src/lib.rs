//! # Game Server Library
//!
//! This library provides the authoritative server implementation for the
//! networked arena game. It owns the canonical world state, validates every
//! action clients propose, drives the enemy state machines, and broadcasts
//! snapshots to keep all connected clients synchronized.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive version of the game. Movement, combat and
//! health all resolve here; clients only ever propose actions and conform
//! to the replicated state they receive back.
//!
//! ### Action Validation
//! Client combat requests are advisory. Before anything is applied the
//! server re-checks target liveness, faction opposition, attack range and
//! cooldown against its own state. A failed check is absorbed and logged;
//! the world does not change and no error travels back to the proposer.
//!
//! ### State Broadcasting
//! Every tick the server broadcasts a full snapshot of all entities plus
//! the one-shot events (swings, heals, deaths) produced since the last
//! broadcast. Replicated values carry revision numbers, so clients can
//! discard anything stale that UDP delivers late.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All packet handling and simulation stepping happens sequentially on one
//! loop. Network receive, send and timeout detection run as separate async
//! tasks that communicate with the loop through channels, so the game
//! logic itself never races.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets for low-latency communication. Snapshots are sent
//! unreliably every tick; losing one is harmless because the next carries
//! the complete state again.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! Entity storage and the simulation clock. Entities live in id order so
//! capped spatial queries and snapshots come out deterministic.
//!
//! ### Combat Module (`combat`)
//! Attack and heal validation: the full server-side check ladder, damage
//! scaling by the target's reduction stat, and cooldown bookkeeping with a
//! small tolerance for client-side timer skew.
//!
//! ### Enemy Module (`enemy`)
//! The patrol/chase/attack state machine for server-driven entities. Each
//! enemy owns one machine instance; transitions follow the nearest-target
//! distance every tick.
//!
//! ### Game Module (`game`)
//! The [`game::Simulation`] ties the pieces together: integrates player
//! inputs, runs the enemy minds, resolves queued proposals, schedules
//! respawns and accumulates the event stream for broadcast.
//!
//! ### Clients Module (`clients`)
//! Connection registry keyed by client id: address-to-entity bindings,
//! per-client input mailboxes, action sequence watermarks and timeout
//! tracking.
//!
//! ### Network Module (`network`)
//! UDP socket management, packet encode/decode, the connect handshake and
//! the fixed-rate tick loop that calls into the simulation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::Simulation;
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Six enemies, fixed AI seed, 60Hz tick, up to 4 players
//!     let simulation = Simulation::new(6, 42);
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(16),
//!         4,
//!         simulation,
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server uses an event-driven architecture with internal async tasks:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Processes the outgoing packet queue and broadcasts
//! - **Timeout Checker**: Flags clients that have gone silent
//! - **Main Game Loop**: Steps the simulation and broadcasts snapshots
//!
//! ## Security Considerations
//!
//! ### State Authority
//! Replicated values are single-writer: only the server ever produces new
//! revisions, and the write paths reject anything else structurally. A
//! modified client can propose nonsense but cannot change state.
//!
//! ### Initiator Binding
//! Action packets never name their initiator. The acting entity is always
//! resolved from the sender's address binding, so one client cannot act on
//! behalf of another's entity.

pub mod clients;
pub mod combat;
pub mod enemy;
pub mod game;
pub mod network;
pub mod world;
