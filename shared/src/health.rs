use crate::replication::{NotAuthorityError, SyncVar};

/// Result of one damage application on the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    pub remaining: i32,
    /// Set on the one application that brought health to zero. Never set
    /// again for the same entity, no matter how much further damage lands.
    pub lethal: bool,
}

/// Replicated hit points. The value lives in [0, max]; the authority
/// mutates it through clamped damage/heal operations and observers follow
/// via sync. Death fires exactly once.
#[derive(Debug, Clone)]
pub struct Health {
    current: SyncVar<i32>,
    max: i32,
    death_signaled: bool,
}

impl Health {
    pub fn authority(max: i32) -> Self {
        Self {
            current: SyncVar::authority(max),
            max,
            death_signaled: false,
        }
    }

    /// Builds a replica from snapshot data.
    pub fn observer(current: i32, revision: u32, max: i32) -> Self {
        Self {
            current: SyncVar::observer(current, revision),
            max,
            death_signaled: current <= 0,
        }
    }

    pub fn current(&self) -> i32 {
        self.current.read()
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn revision(&self) -> u32 {
        self.current.revision()
    }

    pub fn is_alive(&self) -> bool {
        self.current.read() > 0
    }

    /// Subtracts `amount`, clamped at zero. Damage landing on an already
    /// dead entity changes nothing and is never lethal again.
    pub fn apply_damage(&mut self, amount: i32) -> Result<DamageOutcome, NotAuthorityError> {
        let before = self.current.read();
        let after = (before - amount).max(0);
        self.current.write(after)?;

        let lethal = after == 0 && !self.death_signaled;
        if lethal {
            self.death_signaled = true;
        }
        Ok(DamageOutcome {
            remaining: after,
            lethal,
        })
    }

    /// Adds `amount`, clamped at max. Healing the dead is a no-op; death
    /// is final for this entity.
    pub fn apply_heal(&mut self, amount: i32) -> Result<i32, NotAuthorityError> {
        if !self.is_alive() {
            return Ok(self.current.read());
        }
        let after = (self.current.read() + amount).min(self.max);
        self.current.write(after)?;
        Ok(after)
    }

    /// Observer-side update from a snapshot. Stale revisions are dropped.
    pub fn apply_sync(&mut self, value: i32, revision: u32) -> bool {
        self.current.apply_sync(value, revision)
    }
}
