//! Authority-side validation and application of proposed combat actions

use crate::world::World;
use shared::EntityId;
use thiserror::Error;

/// One tick of client/server clock skew is tolerated before a proposal is
/// called an early repeat.
const COOLDOWN_SLACK: f32 = 0.95;

/// Why the authority refused a proposed action. Every variant is absorbed
/// locally: logged by the caller, no state change, nothing sent back to
/// the proposer.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CombatRejection {
    /// A replicated write was refused. Cannot happen while the server owns
    /// every entity it simulates; kept so the write path needs no panic.
    #[error("replicated write refused for entity {entity}")]
    AuthorityViolation { entity: EntityId },
    #[error("entity {0} no longer exists")]
    StaleReference(EntityId),
    #[error("target {target} is not hostile to {initiator}")]
    Untargetable {
        initiator: EntityId,
        target: EntityId,
    },
    #[error("target is {distance:.2} away, limit {limit:.2}")]
    OutOfRange { distance: f32, limit: f32 },
    #[error("action on cooldown for another {remaining:.2}s")]
    OnCooldown { remaining: f32 },
    #[error("entity {entity} has no {capability} capability")]
    MissingCapability {
        entity: EntityId,
        capability: &'static str,
    },
}

/// An accepted attack, after damage was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackReport {
    pub attacker: EntityId,
    pub target: EntityId,
    pub damage: i32,
    pub remaining: i32,
    pub lethal: bool,
}

/// An accepted self-heal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealReport {
    pub target: EntityId,
    pub amount: i32,
    pub healed_to: i32,
}

fn scaled_damage(base: i32, reduction: f32) -> i32 {
    (base as f32 * (1.0 - reduction)).round() as i32
}

fn check_cooldown(now: f64, last_action: f64, cooldown: f32) -> Result<(), CombatRejection> {
    let gate = (cooldown * COOLDOWN_SLACK) as f64;
    let elapsed = now - last_action;
    if elapsed < gate {
        return Err(CombatRejection::OnCooldown {
            remaining: (gate - elapsed) as f32,
        });
    }
    Ok(())
}

/// Re-validates and applies one attack using only authority-observed state.
/// The proposer's own distance and cooldown checks are advisory; nothing a
/// client reports is trusted here.
pub fn resolve_attack(
    world: &mut World,
    attacker: EntityId,
    target: EntityId,
) -> Result<AttackReport, CombatRejection> {
    let (attacker_pos, attacker_faction, stats, last_action) = {
        let a = world
            .get(attacker)
            .filter(|a| a.is_alive())
            .ok_or(CombatRejection::StaleReference(attacker))?;
        (a.pos, a.faction, a.stats, a.last_action_time)
    };

    check_cooldown(world.time(), last_action, stats.attack_cooldown)?;

    let (target_pos, target_faction, target_reduction) = {
        // A proposal can race the despawn of an entity that died earlier
        // in the same tick; both absent and dead targets drop here.
        let t = world
            .get(target)
            .filter(|t| t.is_alive())
            .ok_or(CombatRejection::StaleReference(target))?;
        (t.pos, t.faction, t.stats.damage_reduction)
    };

    if target_faction == attacker_faction {
        return Err(CombatRejection::Untargetable {
            initiator: attacker,
            target,
        });
    }

    let distance = attacker_pos.distance(target_pos);
    if distance > stats.attack_range {
        return Err(CombatRejection::OutOfRange {
            distance,
            limit: stats.attack_range,
        });
    }

    let damage = scaled_damage(stats.attack_damage, target_reduction);
    let outcome = {
        let t = world
            .get_mut(target)
            .ok_or(CombatRejection::StaleReference(target))?;
        t.health
            .apply_damage(damage)
            .map_err(|_| CombatRejection::AuthorityViolation { entity: target })?
    };

    // The cooldown is consumed only by an accepted attack.
    let now = world.time();
    if let Some(a) = world.get_mut(attacker) {
        a.last_action_time = now;
    }

    Ok(AttackReport {
        attacker,
        target,
        damage,
        remaining: outcome.remaining,
        lethal: outcome.lethal,
    })
}

/// Validates and applies a self-heal. Shares the action cooldown with
/// attacks, so a healer alternates rather than stacking both.
pub fn resolve_heal(world: &mut World, healer: EntityId) -> Result<HealReport, CombatRejection> {
    let (stats, last_action) = {
        let h = world
            .get(healer)
            .filter(|h| h.is_alive())
            .ok_or(CombatRejection::StaleReference(healer))?;
        (h.stats, h.last_action_time)
    };

    if stats.healing_power <= 0 {
        return Err(CombatRejection::MissingCapability {
            entity: healer,
            capability: "healing",
        });
    }

    check_cooldown(world.time(), last_action, stats.attack_cooldown)?;

    let healed_to = {
        let h = world
            .get_mut(healer)
            .ok_or(CombatRejection::StaleReference(healer))?;
        h.health
            .apply_heal(stats.healing_power)
            .map_err(|_| CombatRejection::AuthorityViolation { entity: healer })?
    };

    let now = world.time();
    if let Some(h) = world.get_mut(healer) {
        h.last_action_time = now;
    }

    Ok(HealReport {
        target: healer,
        amount: stats.healing_power,
        healed_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Faction, Role, Vec2};

    fn arena() -> (World, EntityId, EntityId) {
        let mut world = World::new();
        let player = world.spawn(Some(1), Faction::Players, Role::Dps, Vec2::ZERO);
        let enemy = world.spawn(None, Faction::Enemies, Role::Grunt, Vec2::new(2.0, 0.0));
        (world, player, enemy)
    }

    #[test]
    fn test_accepted_attack_applies_damage() {
        let (mut world, player, enemy) = arena();

        let report = resolve_attack(&mut world, player, enemy).unwrap();
        assert_eq!(report.damage, 10);
        assert_eq!(report.remaining, 30);
        assert!(!report.lethal);
        assert_eq!(world.get(enemy).unwrap().health.current(), 30);
    }

    #[test]
    fn test_out_of_range_attack_changes_nothing() {
        let (mut world, player, enemy) = arena();
        world.get_mut(enemy).unwrap().pos = Vec2::new(10.0, 0.0);

        let err = resolve_attack(&mut world, player, enemy).unwrap_err();
        assert!(matches!(err, CombatRejection::OutOfRange { .. }));
        assert_eq!(world.get(enemy).unwrap().health.current(), 40);
        // A rejected attack does not consume the cooldown either.
        assert_eq!(world.get(player).unwrap().last_action_time, f64::NEG_INFINITY);
    }

    #[test]
    fn test_stale_target_is_dropped() {
        let (mut world, player, enemy) = arena();
        world.despawn(enemy);

        let err = resolve_attack(&mut world, player, enemy).unwrap_err();
        assert_eq!(err, CombatRejection::StaleReference(enemy));
    }

    #[test]
    fn test_dead_attacker_is_stale() {
        let (mut world, player, enemy) = arena();
        world
            .get_mut(player)
            .unwrap()
            .health
            .apply_damage(1000)
            .unwrap();

        let err = resolve_attack(&mut world, player, enemy).unwrap_err();
        assert_eq!(err, CombatRejection::StaleReference(player));
    }

    #[test]
    fn test_same_faction_target_is_refused() {
        let mut world = World::new();
        let a = world.spawn(Some(1), Faction::Players, Role::Dps, Vec2::ZERO);
        let b = world.spawn(Some(2), Faction::Players, Role::Tank, Vec2::new(1.0, 0.0));

        let err = resolve_attack(&mut world, a, b).unwrap_err();
        assert!(matches!(err, CombatRejection::Untargetable { .. }));
        assert_eq!(world.get(b).unwrap().health.current(), 150);
    }

    #[test]
    fn test_cooldown_blocks_immediate_repeat() {
        let (mut world, player, enemy) = arena();
        world.advance(0.1);

        resolve_attack(&mut world, player, enemy).unwrap();
        let err = resolve_attack(&mut world, player, enemy).unwrap_err();
        assert!(matches!(err, CombatRejection::OnCooldown { .. }));

        // One grunt hit landed, not two.
        assert_eq!(world.get(enemy).unwrap().health.current(), 30);
    }

    #[test]
    fn test_cooldown_reopens_with_slack() {
        let (mut world, player, enemy) = arena();
        world.advance(0.1);
        resolve_attack(&mut world, player, enemy).unwrap();

        // 0.96s elapsed on a 1.0s cooldown: inside the one-tick slack.
        for _ in 0..96 {
            world.advance(0.01);
        }
        assert!(resolve_attack(&mut world, player, enemy).is_ok());
    }

    #[test]
    fn test_damage_reduction_scales_incoming_damage() {
        let mut world = World::new();
        let grunt = world.spawn(None, Faction::Enemies, Role::Grunt, Vec2::ZERO);
        let tank = world.spawn(Some(1), Faction::Players, Role::Tank, Vec2::new(1.0, 0.0));

        let report = resolve_attack(&mut world, grunt, tank).unwrap();
        // 5 base damage, 30% absorbed.
        assert_eq!(report.damage, 4);
        assert_eq!(world.get(tank).unwrap().health.current(), 146);
    }

    #[test]
    fn test_lethal_attack_reports_exactly_once() {
        let (mut world, player, enemy) = arena();
        world.get_mut(enemy).unwrap().health.apply_damage(35).unwrap();

        let report = resolve_attack(&mut world, player, enemy).unwrap();
        assert!(report.lethal);
        assert_eq!(report.remaining, 0);
    }

    #[test]
    fn test_heal_requires_healing_power() {
        let mut world = World::new();
        let dps = world.spawn(Some(1), Faction::Players, Role::Dps, Vec2::ZERO);

        let err = resolve_heal(&mut world, dps).unwrap_err();
        assert!(matches!(err, CombatRejection::MissingCapability { .. }));
    }

    #[test]
    fn test_heal_restores_and_clamps() {
        let mut world = World::new();
        let healer = world.spawn(Some(1), Faction::Players, Role::Healer, Vec2::ZERO);
        world
            .get_mut(healer)
            .unwrap()
            .health
            .apply_damage(20)
            .unwrap();

        let report = resolve_heal(&mut world, healer).unwrap();
        assert_eq!(report.amount, 15);
        assert_eq!(report.healed_to, 75);

        // Second heal is on the shared action cooldown.
        let err = resolve_heal(&mut world, healer).unwrap_err();
        assert!(matches!(err, CombatRejection::OnCooldown { .. }));
    }

    #[test]
    fn test_heal_shares_cooldown_with_attack() {
        let mut world = World::new();
        let healer = world.spawn(Some(1), Faction::Players, Role::Healer, Vec2::ZERO);
        let enemy = world.spawn(None, Faction::Enemies, Role::Grunt, Vec2::new(1.0, 0.0));
        world.advance(0.1);

        resolve_attack(&mut world, healer, enemy).unwrap();
        let err = resolve_heal(&mut world, healer).unwrap_err();
        assert!(matches!(err, CombatRejection::OnCooldown { .. }));
    }

    #[test]
    fn test_scaled_damage_rounding() {
        assert_eq!(scaled_damage(10, 0.0), 10);
        assert_eq!(scaled_damage(10, 0.3), 7);
        assert_eq!(scaled_damage(5, 0.3), 4);
        assert_eq!(scaled_damage(10, 1.0), 0);
    }
}
