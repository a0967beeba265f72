//! Clamped health with invulnerability.
//!
//! Health lives in `[0, max_health]`. The first time it reaches zero the
//! actor stops being alive, and nothing brings that flag back. Damage taken
//! while invulnerable changes nothing but still notifies the damage hook, so
//! concrete actors can consume the shield.
//!
//! Every operation fails with [`CapabilityError::MaxHealthUnset`] until
//! [`WithHealth::set_max_health`] has been called.

use crate::actor::Actor;
use crate::CapabilityError;

/// Outcome of a damage or heal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health after the call.
    pub current: u32,
    /// Whether health actually moved.
    pub changed: bool,
}

/// State backing [`WithHealth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    health: u32,
    max: Option<u32>,
    invulnerable: bool,
    alive: bool,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            health: 0,
            max: None,
            invulnerable: false,
            alive: true,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// An actor with hit points.
pub trait WithHealth: Actor {
    fn health_state(&self) -> &HealthState;
    fn health_state_mut(&mut self) -> &mut HealthState;

    fn on_taking_damage(&mut self, _host: &mut Self::Host, _change: HealthChange) {}

    fn on_healing(&mut self, _host: &mut Self::Host, _change: HealthChange) {}

    fn on_set_invulnerability(&mut self, _host: &mut Self::Host, _value: bool, _changed: bool) {}

    fn health(&self) -> u32 {
        self.health_state().health
    }

    fn max_health(&self) -> Option<u32> {
        self.health_state().max
    }

    fn is_invulnerable(&self) -> bool {
        self.health_state().invulnerable
    }

    fn is_alive(&self) -> bool {
        self.health_state().alive
    }

    /// Establish the maximum and refill to it.
    fn set_max_health(&mut self, max: u32) {
        let state = self.health_state_mut();
        state.max = Some(max);
        state.health = max;
        if max == 0 {
            state.alive = false;
        }
    }

    fn take_damage(&mut self, host: &mut Self::Host, amount: u32) -> Result<HealthChange, CapabilityError> {
        self.require_max_health()?;
        let state = self.health_state_mut();
        let change = if state.invulnerable {
            HealthChange {
                current: state.health,
                changed: false,
            }
        } else {
            let before = state.health;
            state.health = before.saturating_sub(amount);
            if state.health == 0 {
                state.alive = false;
            }
            HealthChange {
                current: state.health,
                changed: state.health != before,
            }
        };
        self.on_taking_damage(host, change);
        Ok(change)
    }

    fn heal(&mut self, host: &mut Self::Host, amount: u32) -> Result<HealthChange, CapabilityError> {
        let max = self.require_max_health()?;
        let state = self.health_state_mut();
        let before = state.health;
        state.health = before.saturating_add(amount).min(max);
        let change = HealthChange {
            current: state.health,
            changed: state.health != before,
        };
        self.on_healing(host, change);
        Ok(change)
    }

    fn set_invulnerability(&mut self, host: &mut Self::Host, value: bool) -> Result<(), CapabilityError> {
        self.require_max_health()?;
        let state = self.health_state_mut();
        let changed = state.invulnerable != value;
        state.invulnerable = value;
        self.on_set_invulnerability(host, value, changed);
        Ok(())
    }

    /// The established maximum, or the contract error naming this actor.
    fn require_max_health(&self) -> Result<u32, CapabilityError> {
        self.health_state()
            .max
            .ok_or(CapabilityError::MaxHealthUnset { actor: self.id() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorCore;
    use crate::host::{HeadlessHost, Host};

    struct Dummy {
        core: ActorCore<HeadlessHost>,
        health: HealthState,
        damage_log: Vec<HealthChange>,
        shield_log: Vec<(bool, bool)>,
    }

    impl Dummy {
        fn new(host: &mut HeadlessHost) -> Self {
            Self {
                core: ActorCore::new(host.enlist_actor()),
                health: HealthState::new(),
                damage_log: Vec::new(),
                shield_log: Vec::new(),
            }
        }
    }

    impl Actor for Dummy {
        type Host = HeadlessHost;

        fn core(&self) -> &ActorCore<HeadlessHost> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ActorCore<HeadlessHost> {
            &mut self.core
        }
    }

    impl WithHealth for Dummy {
        fn health_state(&self) -> &HealthState {
            &self.health
        }

        fn health_state_mut(&mut self) -> &mut HealthState {
            &mut self.health
        }

        fn on_taking_damage(&mut self, _host: &mut HeadlessHost, change: HealthChange) {
            self.damage_log.push(change);
        }

        fn on_set_invulnerability(&mut self, _host: &mut HeadlessHost, value: bool, changed: bool) {
            self.shield_log.push((value, changed));
        }
    }

    #[test]
    fn operations_fail_before_max_health() {
        let mut host = HeadlessHost::new(0);
        let mut dummy = Dummy::new(&mut host);
        let id = dummy.id();
        assert!(matches!(
            dummy.take_damage(&mut host, 1),
            Err(CapabilityError::MaxHealthUnset { actor }) if actor == id
        ));
        assert!(dummy.heal(&mut host, 1).is_err());
        assert!(dummy.set_invulnerability(&mut host, true).is_err());
        assert!(dummy.damage_log.is_empty());
    }

    #[test]
    fn damage_clamps_and_kills_once() {
        let mut host = HeadlessHost::new(0);
        let mut dummy = Dummy::new(&mut host);
        dummy.set_max_health(4);
        assert_eq!(dummy.health(), 4);

        let change = dummy.take_damage(&mut host, 10).unwrap();
        assert_eq!(change, HealthChange { current: 0, changed: true });
        assert!(!dummy.is_alive());

        let change = dummy.take_damage(&mut host, 1).unwrap();
        assert!(!change.changed);

        dummy.heal(&mut host, 2).unwrap();
        assert_eq!(dummy.health(), 2);
        assert!(!dummy.is_alive(), "alive never comes back");
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut host = HeadlessHost::new(0);
        let mut dummy = Dummy::new(&mut host);
        dummy.set_max_health(4);
        let change = dummy.heal(&mut host, 3).unwrap();
        assert_eq!(change, HealthChange { current: 4, changed: false });
        dummy.take_damage(&mut host, 1).unwrap();
        let change = dummy.heal(&mut host, 3).unwrap();
        assert_eq!(change, HealthChange { current: 4, changed: true });
    }

    #[test]
    fn invulnerable_damage_notifies_without_change() {
        let mut host = HeadlessHost::new(0);
        let mut dummy = Dummy::new(&mut host);
        dummy.set_max_health(4);
        dummy.set_invulnerability(&mut host, true).unwrap();
        dummy.set_invulnerability(&mut host, true).unwrap();
        let change = dummy.take_damage(&mut host, 3).unwrap();
        assert_eq!(change, HealthChange { current: 4, changed: false });
        assert_eq!(dummy.damage_log, vec![change]);
        assert_eq!(dummy.shield_log, vec![(true, true), (true, false)]);
    }
}
