//! Death and resurrection.

use crate::actor::Actor;

/// State backing [`Mortal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MortalState {
    dead: bool,
    immortal: bool,
}

impl MortalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_immortal(&self) -> bool {
        self.immortal
    }
}

/// An actor that can die and be brought back.
pub trait Mortal: Actor {
    fn mortal(&self) -> &MortalState;
    fn mortal_mut(&mut self) -> &mut MortalState;

    fn on_death(&mut self, _host: &mut Self::Host) {}

    fn on_resurrect(&mut self, _host: &mut Self::Host) {}

    fn on_set_immortality(&mut self, _host: &mut Self::Host, _value: bool, _changed: bool) {}

    fn is_dead(&self) -> bool {
        self.mortal().dead
    }

    fn is_immortal(&self) -> bool {
        self.mortal().immortal
    }

    /// Kill the actor. Does nothing (and returns `false`) when it is already
    /// dead or immortal; otherwise the death hook fires exactly once.
    fn die(&mut self, host: &mut Self::Host) -> bool {
        let state = self.mortal();
        if state.dead || state.immortal {
            return false;
        }
        self.mortal_mut().dead = true;
        self.on_death(host);
        true
    }

    /// Bring a dead actor back. Returns `false` if it was not dead.
    fn resurrect(&mut self, host: &mut Self::Host) -> bool {
        if !self.mortal().dead {
            return false;
        }
        self.mortal_mut().dead = false;
        self.on_resurrect(host);
        true
    }

    fn set_immortality(&mut self, host: &mut Self::Host, value: bool) {
        let changed = self.mortal().immortal != value;
        self.mortal_mut().immortal = value;
        self.on_set_immortality(host, value, changed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::testing::Mote;

    #[test]
    fn die_fires_hook_once() {
        let mut host = HeadlessHost::new(3);
        let mut mote = Mote::new(&mut host);
        assert!(mote.die(&mut host));
        assert!(!mote.die(&mut host));
        assert!(mote.is_dead());
        assert_eq!(mote.deaths, 1);
    }

    #[test]
    fn immortal_cannot_die() {
        let mut host = HeadlessHost::new(3);
        let mut mote = Mote::new(&mut host);
        mote.set_immortality(&mut host, true);
        assert!(!mote.die(&mut host));
        assert!(!mote.is_dead());
        assert_eq!(mote.deaths, 0);
        mote.set_immortality(&mut host, false);
        assert!(mote.die(&mut host));
    }

    #[test]
    fn resurrect_only_from_dead() {
        let mut host = HeadlessHost::new(3);
        let mut mote = Mote::new(&mut host);
        assert!(!mote.resurrect(&mut host));
        mote.die(&mut host);
        assert!(mote.resurrect(&mut host));
        assert!(!mote.is_dead());
        assert_eq!(mote.resurrections, 1);
    }

    #[test]
    fn immortality_hook_reports_change() {
        let mut host = HeadlessHost::new(3);
        let mut mote = Mote::new(&mut host);
        mote.set_immortality(&mut host, true);
        mote.set_immortality(&mut host, true);
        mote.set_immortality(&mut host, false);
        assert_eq!(mote.immortality_changes, vec![(true, true), (true, false), (false, true)]);
    }
}
