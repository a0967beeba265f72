//! A minimal pooled actor for tests, benches and doc examples.
//!
//! [`Mote`] is poolable with a lifetime in milliseconds as its params: a
//! non-zero lifetime schedules an expiry timer on reset, and the mote
//! deactivates itself when that timer fires. Zero means "stay active until
//! deactivated from outside".

use std::time::Duration;

use crate::actor::{Actor, ActorCore, ActorResult, Frame};
use crate::capability::{Mortal, MortalState, Poolable, PoolableState};
use crate::host::{HeadlessHost, Host};
use crate::timer::TimerHandle;
use crate::ActorError;

#[derive(Debug)]
pub struct Mote {
    core: ActorCore<HeadlessHost>,
    poolable: PoolableState,
    mortal: MortalState,
    /// Lifetime of the current run, in milliseconds.
    pub lifetime_ms: u64,
    expiry: Option<TimerHandle>,
    /// When set, the next update fails.
    pub fail_on_update: bool,
    pub updates: u32,
    pub resets: u32,
    pub deaths: u32,
    pub resurrections: u32,
    pub pre_hooks: Vec<&'static str>,
    pub active_during_pre_hook: Option<bool>,
    pub immortality_changes: Vec<(bool, bool)>,
}

impl Mote {
    pub fn new(host: &mut HeadlessHost) -> Self {
        Self {
            core: ActorCore::inactive(host.enlist_actor()),
            poolable: PoolableState::new(),
            mortal: MortalState::new(),
            lifetime_ms: 0,
            expiry: None,
            fail_on_update: false,
            updates: 0,
            resets: 0,
            deaths: 0,
            resurrections: 0,
            pre_hooks: Vec::new(),
            active_during_pre_hook: None,
            immortality_changes: Vec::new(),
        }
    }

    fn cancel_expiry(&mut self, host: &mut HeadlessHost) {
        if let Some(handle) = self.expiry.take() {
            host.timers().cancel(handle);
        }
    }
}

impl Actor for Mote {
    type Host = HeadlessHost;

    fn core(&self) -> &ActorCore<HeadlessHost> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActorCore<HeadlessHost> {
        &mut self.core
    }

    fn on_update(&mut self, _host: &mut HeadlessHost, _frame: Frame) -> ActorResult {
        if self.fail_on_update {
            return Err(ActorError::Behavior(format!("mote {} failed on purpose", self.id())));
        }
        self.updates += 1;
        Ok(())
    }

    fn on_timer(&mut self, host: &mut HeadlessHost, handle: TimerHandle) -> Result<bool, ActorError> {
        if self.expiry != Some(handle) {
            return Ok(false);
        }
        self.expiry = None;
        self.deactivate(host);
        Ok(true)
    }

    fn on_destroy(&mut self, host: &mut HeadlessHost) {
        self.cancel_expiry(host);
    }
}

impl Poolable for Mote {
    type Params = u64;

    fn poolable(&self) -> &PoolableState {
        &self.poolable
    }

    fn poolable_mut(&mut self) -> &mut PoolableState {
        &mut self.poolable
    }

    fn reset(&mut self, params: Option<u64>, host: &mut HeadlessHost) {
        self.resets += 1;
        self.cancel_expiry(host);
        if let Some(lifetime) = params {
            self.lifetime_ms = lifetime;
        }
        self.resurrect(host);
        if self.lifetime_ms > 0 {
            self.expiry = Some(host.timers().schedule_once(Duration::from_millis(self.lifetime_ms)));
        }
    }

    fn pre_activate(&mut self, _host: &mut HeadlessHost) {
        self.pre_hooks.push("pre_activate");
        self.active_during_pre_hook = Some(self.poolable.is_active());
    }

    fn pre_deactivate(&mut self, host: &mut HeadlessHost) {
        self.pre_hooks.push("pre_deactivate");
        self.active_during_pre_hook = Some(self.poolable.is_active());
        self.cancel_expiry(host);
    }
}

impl Mortal for Mote {
    fn mortal(&self) -> &MortalState {
        &self.mortal
    }

    fn mortal_mut(&mut self) -> &mut MortalState {
        &mut self.mortal
    }

    fn on_death(&mut self, _host: &mut HeadlessHost) {
        self.deaths += 1;
    }

    fn on_resurrect(&mut self, _host: &mut HeadlessHost) {
        self.resurrections += 1;
    }

    fn on_set_immortality(&mut self, _host: &mut HeadlessHost, value: bool, changed: bool) {
        self.immortality_changes.push((value, changed));
    }
}
