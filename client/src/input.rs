//! Client input management with sequencing and change detection

use macroquad::prelude::*;
use shared::{now_millis, InputState};
use std::time::{Duration, Instant};

/// One-frame action presses, edge-detected so a held key does not
/// machine-gun requests at the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameActions {
    pub attack: bool,
    pub heal: bool,
    pub reconnect: bool,
}

/// Turns raw key state into sequenced movement inputs and one-shot
/// action presses.
pub struct InputManager {
    next_sequence: u32,
    current_input: InputState,
    last_input_sent: Instant,

    // Previous frame key states for edge detection
    prev_attack: bool,
    prev_heal: bool,
    prev_reconnect: bool,
}

/// Collapses an opposing key pair into one axis value. Both held cancel.
fn axis(negative: bool, positive: bool) -> f32 {
    (positive as i32 - negative as i32) as f32
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            current_input: InputState::default(),
            last_input_sent: Instant::now(),
            prev_attack: false,
            prev_heal: false,
            prev_reconnect: false,
        }
    }

    /// Samples the keyboard. Returns edge-detected action presses and,
    /// when the movement vector changed or the keep-alive interval ran
    /// out, a freshly sequenced input to put on the wire.
    pub fn update(&mut self) -> (FrameActions, Option<InputState>) {
        // Movement on WASD and arrows; screen-style axes, north is -y.
        let move_x = axis(
            is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        );
        let move_y = axis(
            is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
        );

        let attack = is_key_down(KeyCode::Space);
        let heal = is_key_down(KeyCode::H);
        let reconnect = is_key_down(KeyCode::R);

        let actions = FrameActions {
            attack: attack && !self.prev_attack,
            heal: heal && !self.prev_heal,
            reconnect: reconnect && !self.prev_reconnect,
        };
        self.prev_attack = attack;
        self.prev_heal = heal;
        self.prev_reconnect = reconnect;

        let input_changed =
            move_x != self.current_input.move_x || move_y != self.current_input.move_y;

        // Send on change or periodically for keep-alive (60Hz)
        let time_to_send = self.last_input_sent.elapsed() >= Duration::from_millis(16);
        let mut input_to_send = None;

        if input_changed || time_to_send {
            self.current_input = InputState {
                sequence: self.next_sequence,
                timestamp: now_millis(),
                move_x,
                move_y,
            };
            input_to_send = Some(self.current_input);
            self.next_sequence += 1;
            self.last_input_sent = Instant::now();
        }

        (actions, input_to_send)
    }

    /// The most recently packaged input state.
    pub fn current_input(&self) -> &InputState {
        &self.current_input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
