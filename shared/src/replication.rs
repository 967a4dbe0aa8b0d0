use log::{debug, warn};
use std::fmt;
use thiserror::Error;

/// Which part a participant plays for a given entity. The role is fixed at
/// spawn time; it is a static property of the session topology, not
/// something that changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRole {
    /// The one participant allowed to mutate the entity's replicated state.
    Authority,
    /// The participant whose input drives the entity. Proposes actions,
    /// never writes replicated state directly.
    LocalController,
    /// Everyone else. Reads replicated state, originates nothing.
    RemoteObserver,
}

impl ControlRole {
    pub fn is_authority(&self) -> bool {
        matches!(self, ControlRole::Authority)
    }

    pub fn is_local_controller(&self) -> bool {
        matches!(self, ControlRole::LocalController)
    }
}

/// Rejected write on a replica that is not the authority. This is a
/// programming-contract violation by the caller, not a runtime race:
/// authority is assigned per entity at spawn and never moves.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("write rejected: {role:?} is not the authority")]
pub struct NotAuthorityError {
    pub role: ControlRole,
}

/// A replicated scalar with single-writer semantics.
///
/// The authority replica accepts writes and stamps each distinct value with
/// a monotonically increasing revision. Observer replicas apply incoming
/// (value, revision) pairs and take only strictly newer revisions, so a
/// reordered or redelivered sync can never roll the value back. There is no
/// compare-and-swap anywhere: with exactly one writer, last-write-wins is
/// total order.
#[derive(Debug, Clone)]
pub struct SyncVar<T> {
    value: T,
    revision: u32,
    role: ControlRole,
}

impl<T: Copy + PartialEq + fmt::Debug> SyncVar<T> {
    pub fn authority(initial: T) -> Self {
        Self {
            value: initial,
            revision: 0,
            role: ControlRole::Authority,
        }
    }

    /// Builds an observer replica from the first sync the participant saw.
    pub fn observer(value: T, revision: u32) -> Self {
        Self {
            value,
            revision,
            role: ControlRole::RemoteObserver,
        }
    }

    /// Valid on any participant.
    pub fn read(&self) -> T {
        self.value
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn role(&self) -> ControlRole {
        self.role
    }

    /// Mutates the value. Succeeds only on the authority replica; anywhere
    /// else the write is rejected locally without any network traffic.
    /// Writing the value already held is a no-op and does not advance the
    /// revision.
    pub fn write(&mut self, value: T) -> Result<(), NotAuthorityError> {
        if !self.role.is_authority() {
            warn!(
                "rejected write of {:?}: local role is {:?}",
                value, self.role
            );
            return Err(NotAuthorityError { role: self.role });
        }

        if value != self.value {
            self.value = value;
            self.revision += 1;
        }
        Ok(())
    }

    /// Applies a sync received from the authority. Returns true if the
    /// value was taken; anything not strictly newer than what the replica
    /// already holds is ignored.
    pub fn apply_sync(&mut self, value: T, revision: u32) -> bool {
        if self.role.is_authority() {
            warn!("authority replica ignoring inbound sync (rev {})", revision);
            return false;
        }

        if revision <= self.revision {
            debug!(
                "ignoring stale sync rev {} (holding rev {})",
                revision, self.revision
            );
            return false;
        }

        self.value = value;
        self.revision = revision;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_write_updates_value_and_revision() {
        let mut var = SyncVar::authority(100);
        assert_eq!(var.read(), 100);
        assert_eq!(var.revision(), 0);

        var.write(70).unwrap();
        assert_eq!(var.read(), 70);
        assert_eq!(var.revision(), 1);

        var.write(40).unwrap();
        assert_eq!(var.read(), 40);
        assert_eq!(var.revision(), 2);
    }

    #[test]
    fn test_write_of_identical_value_does_not_advance_revision() {
        let mut var = SyncVar::authority(50);
        var.write(50).unwrap();
        assert_eq!(var.revision(), 0);
    }

    #[test]
    fn test_non_authority_write_is_rejected_locally() {
        let mut var = SyncVar::observer(100, 3);
        let err = var.write(1).unwrap_err();
        assert_eq!(
            err,
            NotAuthorityError {
                role: ControlRole::RemoteObserver
            }
        );
        assert_eq!(var.read(), 100);
        assert_eq!(var.revision(), 3);
    }

    #[test]
    fn test_observer_takes_newer_revision() {
        let mut var = SyncVar::observer(100, 0);
        assert!(var.apply_sync(70, 1));
        assert_eq!(var.read(), 70);
        assert_eq!(var.revision(), 1);
    }

    #[test]
    fn test_observer_ignores_stale_and_duplicate_revisions() {
        let mut var = SyncVar::observer(40, 2);
        assert!(!var.apply_sync(70, 1));
        assert!(!var.apply_sync(70, 2));
        assert_eq!(var.read(), 40);
        assert_eq!(var.revision(), 2);

        // Reordered delivery: the newer value sticks even when the older
        // sync arrives afterwards.
        assert!(var.apply_sync(10, 4));
        assert!(!var.apply_sync(25, 3));
        assert_eq!(var.read(), 10);
    }

    #[test]
    fn test_authority_ignores_inbound_sync() {
        let mut var = SyncVar::authority(100);
        assert!(!var.apply_sync(1, 99));
        assert_eq!(var.read(), 100);
    }

    #[test]
    fn test_control_role_predicates() {
        assert!(ControlRole::Authority.is_authority());
        assert!(!ControlRole::LocalController.is_authority());
        assert!(ControlRole::LocalController.is_local_controller());
        assert!(!ControlRole::RemoteObserver.is_local_controller());
    }

    #[test]
    fn test_authority_propagates_to_observer_in_order() {
        let mut source = SyncVar::authority(100);
        let mut replica = SyncVar::observer(100, 0);

        for damage in [30, 30, 30] {
            let next = source.read() - damage;
            source.write(next).unwrap();
            assert!(replica.apply_sync(source.read(), source.revision()));
        }

        assert_eq!(replica.read(), 10);
        assert_eq!(replica.revision(), source.revision());
    }
}
