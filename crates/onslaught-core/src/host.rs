//! Collaborator contracts the core consumes from its host.
//!
//! The core never owns a clock, a random generator or a physics world. Every
//! operation that needs one receives the host as `&mut H` where `H: Host`,
//! and reaches the collaborators through it. [`HeadlessHost`] is a complete
//! minimal host used by tests, benches and tools that run the core without a
//! game around it.

use std::collections::BTreeMap;
use std::fmt;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorRoster, GameState};
use crate::events::{CoreEvent, EventBus};
use crate::timer::{TimerQueue, Timers};

// ---------------------------------------------------------------------------
// BodyShape / CollisionHandle
// ---------------------------------------------------------------------------

/// Collision shape assigned to an actor's physics body, with its offset from
/// the top-left corner of the actor's frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Rect {
        width: f32,
        height: f32,
        offset_x: f32,
        offset_y: f32,
    },
    Circle {
        radius: f32,
        offset_x: f32,
        offset_y: f32,
    },
}

/// Handle of one overlap registration held by the physics host.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollisionHandle(pub u64);

impl fmt::Debug for CollisionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollisionHandle({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// The physics collaborator: body shapes, body enablement and overlap
/// registrations. Overlap *detection* stays on the host side, which reports
/// each overlap back as `(registrant, other)`.
pub trait Physics {
    fn set_body_enabled(&mut self, actor: ActorId, enabled: bool);
    fn set_body_shape(&mut self, actor: ActorId, shape: BodyShape);
    /// Start reporting overlaps between `actor` and `target` to `actor`.
    fn add_overlap(&mut self, actor: ActorId, target: ActorId) -> CollisionHandle;
    fn remove_overlap(&mut self, handle: CollisionHandle);
    /// Drop the body and every overlap registration that mentions it.
    fn remove_body(&mut self, actor: ActorId);
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Collaborator bundle passed into every core operation.
pub trait Host {
    fn timers(&mut self) -> &mut dyn Timers;
    fn rng(&mut self) -> &mut dyn RngCore;
    fn physics(&mut self) -> &mut dyn Physics;
    fn game_state(&self) -> GameState;
    /// Id for an actor being built.
    fn enlist_actor(&mut self) -> ActorId;
    /// Called once by [`safe_destroy`](crate::actor::Actor::safe_destroy).
    /// Returns `false` for an id this host never enlisted or already retired.
    fn retire_actor(&mut self, id: ActorId) -> bool;
    fn emit(&mut self, event: CoreEvent);
}

// ---------------------------------------------------------------------------
// RecordingPhysics
// ---------------------------------------------------------------------------

/// Physics stand-in that records what the core asked of it.
#[derive(Debug, Default)]
pub struct RecordingPhysics {
    pub enabled: BTreeMap<ActorId, bool>,
    pub shapes: BTreeMap<ActorId, BodyShape>,
    pub overlaps: BTreeMap<CollisionHandle, (ActorId, ActorId)>,
    pub removed: Vec<ActorId>,
    next_handle: u64,
}

impl RecordingPhysics {
    /// Whether an overlap registration `actor -> target` exists.
    pub fn has_overlap(&self, actor: ActorId, target: ActorId) -> bool {
        self.overlaps.values().any(|&pair| pair == (actor, target))
    }

    pub fn is_enabled(&self, actor: ActorId) -> bool {
        self.enabled.get(&actor).copied().unwrap_or(false)
    }
}

impl Physics for RecordingPhysics {
    fn set_body_enabled(&mut self, actor: ActorId, enabled: bool) {
        self.enabled.insert(actor, enabled);
    }

    fn set_body_shape(&mut self, actor: ActorId, shape: BodyShape) {
        self.shapes.insert(actor, shape);
    }

    fn add_overlap(&mut self, actor: ActorId, target: ActorId) -> CollisionHandle {
        let handle = CollisionHandle(self.next_handle);
        self.next_handle += 1;
        self.overlaps.insert(handle, (actor, target));
        handle
    }

    fn remove_overlap(&mut self, handle: CollisionHandle) {
        self.overlaps.remove(&handle);
    }

    fn remove_body(&mut self, actor: ActorId) {
        self.enabled.remove(&actor);
        self.shapes.remove(&actor);
        self.overlaps.retain(|_, (a, b)| *a != actor && *b != actor);
        self.removed.push(actor);
    }
}

// ---------------------------------------------------------------------------
// HeadlessHost
// ---------------------------------------------------------------------------

/// Minimal host: a timer queue, a seeded PCG generator, recording physics and
/// a core event bus.
#[derive(Debug)]
pub struct HeadlessHost {
    timers: TimerQueue,
    rng: Pcg32,
    physics: RecordingPhysics,
    roster: ActorRoster,
    state: GameState,
    events: EventBus<CoreEvent>,
}

impl HeadlessHost {
    pub fn new(seed: u64) -> Self {
        Self {
            timers: TimerQueue::new(),
            rng: Pcg32::seed_from_u64(seed),
            physics: RecordingPhysics::default(),
            roster: ActorRoster::new(),
            state: GameState::Playing,
            events: EventBus::new(),
        }
    }

    /// Direct access to the concrete timer queue (advance, pause, pop).
    pub fn timer_queue(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub fn physics_log(&self) -> &RecordingPhysics {
        &self.physics
    }

    pub fn set_game_state(&mut self, state: GameState) {
        self.state = state;
    }

    pub fn is_actor_alive(&self, id: ActorId) -> bool {
        self.roster.is_live(id)
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.events.drain()
    }
}

impl Host for HeadlessHost {
    fn timers(&mut self) -> &mut dyn Timers {
        &mut self.timers
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn physics(&mut self) -> &mut dyn Physics {
        &mut self.physics
    }

    fn game_state(&self) -> GameState {
        self.state
    }

    fn enlist_actor(&mut self) -> ActorId {
        self.roster.enlist()
    }

    fn retire_actor(&mut self, id: ActorId) -> bool {
        self.roster.retire(id)
    }

    fn emit(&mut self, event: CoreEvent) {
        self.events.publish(event);
    }
}
