use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Behavior state for one entity. `K` is the key enum naming the states,
/// `C` is the component bundle the states read and steer.
///
/// `update` runs every tick and may request a transition by returning the
/// next key; the owning machine performs it. `fixed_update` runs on the
/// fixed-rate phase for physics-adjacent work and never transitions.
pub trait State<K, C> {
    fn enter(&mut self, _ctx: &mut C) {}

    fn update(&mut self, _ctx: &mut C, _dt: f32) -> Option<K> {
        None
    }

    fn fixed_update(&mut self, _ctx: &mut C, _dt: f32) {}

    fn exit(&mut self, _ctx: &mut C) {}
}

/// Generic per-entity state machine. Holds one state instance per key;
/// exactly one is active at a time. There is no active state until the
/// first `change_state` call, which fires the initial `enter`.
pub struct StateMachine<K, C> {
    states: HashMap<K, Box<dyn State<K, C> + Send>>,
    current: Option<K>,
}

impl<K, C> StateMachine<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            current: None,
        }
    }

    /// Registers the state instance for a key. Each machine owns its own
    /// instances; they are never shared between entities.
    pub fn register<S>(&mut self, key: K, state: S)
    where
        S: State<K, C> + Send + 'static,
    {
        self.states.insert(key, Box::new(state));
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Transitions to `next`: the old state's `exit` runs first, then the
    /// new state's `enter`, with nothing observable in between. A key with
    /// no registered state leaves the machine untouched.
    pub fn change_state(&mut self, next: K, ctx: &mut C) {
        if !self.states.contains_key(&next) {
            warn!("ignoring transition to unregistered state {:?}", next);
            return;
        }

        if let Some(current) = self.current {
            if let Some(state) = self.states.get_mut(&current) {
                state.exit(ctx);
                debug!("exiting state {:?}", current);
            }
        }

        self.current = Some(next);
        if let Some(state) = self.states.get_mut(&next) {
            state.enter(ctx);
            debug!("entering state {:?}", next);
        }
    }

    /// Runs the active state's per-tick logic, then applies any transition
    /// it requested. Does nothing while no state has been started.
    pub fn update(&mut self, ctx: &mut C, dt: f32) {
        let Some(current) = self.current else {
            return;
        };
        let requested = match self.states.get_mut(&current) {
            Some(state) => state.update(ctx, dt),
            None => None,
        };
        if let Some(next) = requested {
            self.change_state(next, ctx);
        }
    }

    pub fn fixed_update(&mut self, ctx: &mut C, dt: f32) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(state) = self.states.get_mut(&current) {
            state.fixed_update(ctx, dt);
        }
    }
}

impl<K, C> Default for StateMachine<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
