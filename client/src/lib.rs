//! # Game Client Library
//!
//! This library provides the complete client-side implementation for the
//! networked arena game. It handles input capture, UDP communication with
//! the authoritative server, the locally controlled player, the replicated
//! view of everything else, and rendering.
//!
//! ## Architecture Overview
//!
//! The client never simulates the world. It predicts exactly one entity,
//! its own, and treats everything else as replicated observer state fed by
//! per-tick server snapshots:
//!
//! ### Local Control
//! The owned entity runs an Idle/Moving/Attacking state machine and
//! integrates held movement input through the same shared movement step
//! the server uses. Input answers on the current frame; the authoritative
//! position arriving a round trip later is blended in quietly, or snapped
//! to when the drift is too large to hide.
//!
//! ### Authoritative Replication
//! Every other entity is a `ViewEntity`: position and facing come straight
//! from the latest snapshot, health lives in an observer replica that only
//! accepts strictly newer revisions. Absence from a snapshot means the
//! entity no longer exists; nothing client-side ever writes replicated
//! state.
//!
//! ### Proposals, Not Actions
//! Attacks and heals are fire-and-forget requests. The client gates them
//! locally (cooldown, target in range) purely to keep pointless traffic
//! off the wire; the server re-validates everything and silently drops
//! what it rejects. Combat results only ever arrive as broadcast events.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The replicated world view:
//! - Snapshot intake with out-of-order datagram rejection
//! - Observer health replicas and despawn-by-absence
//! - Spatial queries matching the server's ranking rules
//! - Position-tagged event intake for presentation
//!
//! ### Player Module (`player`)
//! The locally controlled entity:
//! - Idle/Moving/Attacking state machine over the shared FSM
//! - Movement prediction and drift reconciliation
//! - Advisory cooldown gating for attack and heal proposals
//!
//! ### Input Module (`input`)
//! Keyboard sampling and packaging:
//! - Movement axes with sequence numbering and keep-alive resends
//! - Edge-detected action keys so held keys fire once
//!
//! ### Network Module (`network`)
//! Client-server communication:
//! - Non-blocking UDP socket drained once per frame
//! - Connection lifecycle (connect, reconnect, server timeout)
//! - Snapshot-derived ping estimation
//!
//! ### Camera Module (`camera`)
//! Smoothed follow camera and the world-to-screen transform.
//!
//! ### Rendering Module (`rendering`)
//! Immediate-mode drawing of the arena, entities, health bars, transient
//! combat FX and the connection HUD.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::WorldView;
//! use client::network::Connection;
//! use shared::{Packet, Role};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut connection = Connection::new("127.0.0.1:8080", Role::Dps)?;
//! let mut view = WorldView::new();
//!
//! // Once per frame: drain the socket and fold snapshots into the view.
//! for packet in connection.poll() {
//!     if let Packet::Snapshot { tick, entities, events, .. } = packet {
//!         view.apply_snapshot(tick, entities, events);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Philosophy
//!
//! ### Responsiveness First
//! The locally controlled entity reacts to input on the frame it happens.
//! Nothing the player does waits for a server round trip to show up on
//! screen.
//!
//! ### The Server Is Right
//! Whenever prediction and authority disagree, authority wins. Corrections
//! are spread over a few frames when they are small enough to hide and
//! applied instantly when they are not.
//!
//! ### Graceful Degradation
//! Packet loss costs smoothness, never correctness: snapshots are whole
//! states, so the next one to arrive repairs the view completely, and a
//! silent server flips the HUD to disconnected instead of freezing the
//! game.

pub mod camera;
pub mod game;
pub mod input;
pub mod network;
pub mod player;
pub mod rendering;
