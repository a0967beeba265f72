//! Reusable-instance capability.
//!
//! A poolable actor flips between *active* and *inactive* instead of being
//! created and destroyed. Both transitions are idempotent: a call that finds
//! the actor already in the requested state returns `false` and fires
//! nothing. Otherwise the pre-hook runs, the flag flips, and then the
//! per-actor callbacks fire in registration order.
//!
//! Pool membership is an opaque subscription stored in [`PoolableState`]. A
//! pool joins a member exactly once, at creation; from then on every
//! transition is journaled and the pool applies the journal to its own
//! bookkeeping. The actor never holds a reference to its pool.

use std::fmt;

use crate::actor::{Actor, ActorId};
use crate::events::CoreEvent;
use crate::host::Host;

/// Per-actor transition callback.
pub type TransitionCallback = Box<dyn FnMut(ActorId)>;

/// A journaled activation-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
}

// ---------------------------------------------------------------------------
// PoolableState
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Membership {
    slot: usize,
    journal: Vec<Transition>,
}

/// State backing [`Poolable`].
#[derive(Default)]
pub struct PoolableState {
    active: bool,
    on_activate: Vec<TransitionCallback>,
    on_deactivate: Vec<TransitionCallback>,
    membership: Option<Membership>,
}

impl PoolableState {
    /// Inactive, with no callbacks and no pool.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Subscribe to a pool at `slot`. Returns `false` (and changes nothing)
    /// if the actor already belongs to a pool.
    pub fn join_pool(&mut self, slot: usize) -> bool {
        if self.membership.is_some() {
            return false;
        }
        self.membership = Some(Membership {
            slot,
            journal: Vec::new(),
        });
        true
    }

    /// Slot of the owning pool, if any.
    pub fn pool_slot(&self) -> Option<usize> {
        self.membership.as_ref().map(|m| m.slot)
    }

    /// Take the transitions recorded since the last call.
    pub fn take_transitions(&mut self) -> Vec<Transition> {
        self.membership
            .as_mut()
            .map(|m| std::mem::take(&mut m.journal))
            .unwrap_or_default()
    }

    fn record(&mut self, transition: Transition) {
        if let Some(membership) = self.membership.as_mut() {
            membership.journal.push(transition);
        }
    }
}

impl fmt::Debug for PoolableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolableState")
            .field("active", &self.active)
            .field("on_activate", &self.on_activate.len())
            .field("on_deactivate", &self.on_deactivate.len())
            .field("membership", &self.membership)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Poolable
// ---------------------------------------------------------------------------

/// An actor that can be handed out, recycled and re-seeded by a pool.
pub trait Poolable: Actor {
    /// Parameters used to re-seed the actor on reuse.
    type Params: 'static;

    fn poolable(&self) -> &PoolableState;
    fn poolable_mut(&mut self) -> &mut PoolableState;

    /// Re-seed position, velocity and behavior fields from `params`.
    ///
    /// The default does nothing. Every concrete pooled actor is expected to
    /// override it; a pooled actor that keeps its previous run's state on
    /// reuse is a wiring bug.
    fn reset(&mut self, _params: Option<Self::Params>, _host: &mut Self::Host) {}

    fn pre_activate(&mut self, _host: &mut Self::Host) {}

    fn pre_deactivate(&mut self, _host: &mut Self::Host) {}

    fn is_active(&self) -> bool {
        self.poolable().is_active()
    }

    /// Activate the actor. Returns `false` if it was already active or has
    /// been destroyed.
    fn activate(&mut self, host: &mut Self::Host) -> bool {
        if self.poolable().active || self.is_destroyed() {
            return false;
        }
        self.pre_activate(host);
        let id = self.id();
        let state = self.poolable_mut();
        state.active = true;
        state.record(Transition::Activated);
        let core = self.core_mut();
        core.set_host_active(true);
        core.set_body_enabled(true);
        host.physics().set_body_enabled(id, true);
        for callback in self.poolable_mut().on_activate.iter_mut() {
            callback(id);
        }
        host.emit(CoreEvent::ActorActivated { actor: id });
        true
    }

    /// Deactivate the actor. Returns `false` if it was already inactive.
    fn deactivate(&mut self, host: &mut Self::Host) -> bool {
        if !self.poolable().active {
            return false;
        }
        self.pre_deactivate(host);
        let id = self.id();
        let state = self.poolable_mut();
        state.active = false;
        state.record(Transition::Deactivated);
        let destroyed = self.is_destroyed();
        let core = self.core_mut();
        core.set_host_active(false);
        core.set_body_enabled(false);
        if !destroyed {
            host.physics().set_body_enabled(id, false);
        }
        for callback in self.poolable_mut().on_deactivate.iter_mut() {
            callback(id);
        }
        host.emit(CoreEvent::ActorDeactivated { actor: id });
        true
    }

    fn on_activate(&mut self, callback: impl FnMut(ActorId) + 'static)
    where
        Self: Sized,
    {
        self.poolable_mut().on_activate.push(Box::new(callback));
    }

    fn on_deactivate(&mut self, callback: impl FnMut(ActorId) + 'static)
    where
        Self: Sized,
    {
        self.poolable_mut().on_deactivate.push(Box::new(callback));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
