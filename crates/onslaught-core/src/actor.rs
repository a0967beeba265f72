//! Actor identity and the lifecycle envelope shared by every spawnable object.
//!
//! Every actor is enlisted on an [`ActorRoster`] when it is built and
//! retired from it when [`safe_destroy`](Actor::safe_destroy) tears it down.
//! Ids are serial numbers that are never handed out twice, so a handle kept
//! past teardown names nothing rather than a newer actor.
//!
//! The [`Actor`] trait wraps a concrete game object in a lifecycle envelope:
//!
//! - per-frame `update`/`post_update` are gated behind the destroyed flag, the
//!   host "active" flag, the physics body flag, the update-active flag and the
//!   host game state;
//! - failures returned by the concrete hooks are logged and turn into a
//!   [`safe_destroy`](Actor::safe_destroy) of that one actor;
//! - teardown runs the registered cleanup actions exactly once.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::timer::TimerHandle;
use crate::ActorError;

/// Result type returned by every overridable actor hook.
pub type ActorResult = Result<(), ActorError>;

// ---------------------------------------------------------------------------
// ActorId / ActorRoster
// ---------------------------------------------------------------------------

/// Serial number of one actor, unique for the lifetime of its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    pub fn serial(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The actors a host has built and not yet torn down.
#[derive(Debug, Default)]
pub struct ActorRoster {
    next_serial: u64,
    live: BTreeSet<ActorId>,
}

impl ActorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enlist a newly built actor under the next serial.
    pub fn enlist(&mut self) -> ActorId {
        let id = ActorId(self.next_serial);
        self.next_serial += 1;
        self.live.insert(id);
        id
    }

    /// Strike a torn-down actor off. Returns `false` if `id` was never
    /// enlisted here or has already retired.
    pub fn retire(&mut self, id: ActorId) -> bool {
        self.live.remove(&id)
    }

    pub fn is_live(&self, id: ActorId) -> bool {
        self.live.contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Actors enlisted so far, retired ones included.
    pub fn enlisted_count(&self) -> u64 {
        self.next_serial
    }
}

// ---------------------------------------------------------------------------
// Frame / GameState
// ---------------------------------------------------------------------------

/// Timing of the frame being processed, as reported by the frame host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Game time at the start of this frame.
    pub time: Duration,
    /// Time elapsed since the previous frame.
    pub delta: Duration,
}

/// Host-level game state consulted by every actor each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Playing,
    Paused,
    GameOver,
}

// ---------------------------------------------------------------------------
// ActorCore
// ---------------------------------------------------------------------------

/// A teardown action run once when its actor is destroyed.
pub type CleanupAction<H> = Box<dyn FnOnce(&mut H)>;

/// Lifecycle flags and cleanup actions embedded in every concrete actor.
pub struct ActorCore<H> {
    id: ActorId,
    destroyed: bool,
    update_active: bool,
    host_active: bool,
    body_enabled: bool,
    cleanup: Vec<CleanupAction<H>>,
}

impl<H> ActorCore<H> {
    /// A live, host-active actor with an enabled body.
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            destroyed: false,
            update_active: true,
            host_active: true,
            body_enabled: true,
            cleanup: Vec::new(),
        }
    }

    /// A live actor that starts inactive with its body disabled, the way
    /// pooled members are created.
    pub fn inactive(id: ActorId) -> Self {
        Self {
            host_active: false,
            body_enabled: false,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_update_active(&self) -> bool {
        self.update_active
    }

    pub fn is_host_active(&self) -> bool {
        self.host_active
    }

    pub fn is_body_enabled(&self) -> bool {
        self.body_enabled
    }

    pub fn set_host_active(&mut self, active: bool) {
        self.host_active = active;
    }

    pub fn set_body_enabled(&mut self, enabled: bool) {
        self.body_enabled = enabled;
    }

    /// Mark destroyed and hand back the cleanup actions, or `None` if the
    /// actor was already destroyed.
    fn begin_destroy(&mut self) -> Option<Vec<CleanupAction<H>>> {
        if self.destroyed {
            return None;
        }
        self.destroyed = true;
        self.host_active = false;
        self.body_enabled = false;
        Some(std::mem::take(&mut self.cleanup))
    }
}

impl<H> fmt::Debug for ActorCore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCore")
            .field("id", &self.id)
            .field("destroyed", &self.destroyed)
            .field("update_active", &self.update_active)
            .field("host_active", &self.host_active)
            .field("body_enabled", &self.body_enabled)
            .field("cleanup_actions", &self.cleanup.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The lifecycle envelope over a concrete game object.
///
/// Implementors provide access to their [`ActorCore`] and override the
/// `on_*` hooks; the provided methods implement gating, error containment and
/// teardown and are what hosts, pools and spawners call.
pub trait Actor {
    /// The host collaborator bundle this actor runs against.
    type Host: Host;

    fn core(&self) -> &ActorCore<Self::Host>;
    fn core_mut(&mut self) -> &mut ActorCore<Self::Host>;

    /// Per-frame behavior.
    fn on_update(&mut self, _host: &mut Self::Host, _frame: Frame) -> ActorResult {
        Ok(())
    }

    /// Second per-frame pass, after physics.
    fn on_post_update(&mut self, _host: &mut Self::Host, _frame: Frame) -> ActorResult {
        Ok(())
    }

    /// A timer fired. Return `Ok(true)` if `handle` belonged to this actor.
    fn on_timer(&mut self, _host: &mut Self::Host, _handle: TimerHandle) -> Result<bool, ActorError> {
        Ok(false)
    }

    /// The physics host reported an overlap between this actor and `other`.
    fn on_overlap(&mut self, _host: &mut Self::Host, _other: ActorId) -> ActorResult {
        Ok(())
    }

    /// Teardown hook run by `safe_destroy` before the cleanup actions.
    fn on_destroy(&mut self, _host: &mut Self::Host) {}

    fn id(&self) -> ActorId {
        self.core().id()
    }

    fn is_destroyed(&self) -> bool {
        self.core().is_destroyed()
    }

    /// Whether the per-frame hooks would run right now.
    fn can_update(&self, host: &Self::Host) -> bool {
        let core = self.core();
        !core.is_destroyed()
            && core.is_host_active()
            && core.is_body_enabled()
            && core.is_update_active()
            && host.game_state() != GameState::Paused
    }

    fn update(&mut self, host: &mut Self::Host, frame: Frame) {
        if !self.can_update(host) {
            return;
        }
        let result = self.on_update(host, frame);
        self.contain(host, "update", result);
    }

    fn post_update(&mut self, host: &mut Self::Host, frame: Frame) {
        if !self.can_update(host) {
            return;
        }
        let result = self.on_post_update(host, frame);
        self.contain(host, "post_update", result);
    }

    /// Route a fired timer to this actor. Returns whether it was claimed.
    ///
    /// Timers reach actors regardless of the update gate; destroyed actors
    /// never claim anything.
    fn handle_timer(&mut self, host: &mut Self::Host, handle: TimerHandle) -> bool {
        if self.is_destroyed() {
            return false;
        }
        match self.on_timer(host, handle) {
            Ok(claimed) => claimed,
            Err(err) => {
                self.contain(host, "timer", Err(err));
                true
            }
        }
    }

    fn handle_overlap(&mut self, host: &mut Self::Host, other: ActorId) {
        if self.is_destroyed() || !self.core().is_body_enabled() {
            return;
        }
        let result = self.on_overlap(host, other);
        self.contain(host, "overlap", result);
    }

    /// Log a failed hook and tear the actor down.
    fn contain(&mut self, host: &mut Self::Host, hook: &'static str, result: ActorResult) {
        if let Err(err) = result {
            tracing::error!(actor = %self.id(), hook, error = %err, "actor hook failed, destroying actor");
            self.safe_destroy(host);
        }
    }

    fn pause_updates(&mut self) {
        self.core_mut().update_active = false;
    }

    fn resume_updates(&mut self) {
        self.core_mut().update_active = true;
    }

    /// Register an action to run once at destruction.
    fn add_cleanup(&mut self, action: impl FnOnce(&mut Self::Host) + 'static)
    where
        Self: Sized,
    {
        self.core_mut().cleanup.push(Box::new(action));
    }

    /// Idempotent teardown: runs the destroy hook and every cleanup action
    /// once in registration order, then disables and removes the body.
    fn safe_destroy(&mut self, host: &mut Self::Host) {
        let Some(actions) = self.core_mut().begin_destroy() else {
            return;
        };
        let id = self.id();
        self.on_destroy(host);
        for action in actions {
            action(host);
        }
        let physics = host.physics();
        physics.set_body_enabled(id, false);
        physics.remove_body(id);
        if !host.retire_actor(id) {
            tracing::warn!(actor = %id, "destroyed actor was not on the host's roster");
        }
        tracing::trace!(actor = %id, "actor destroyed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
