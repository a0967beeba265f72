//! Onslaught core -- entity lifecycle and spawn orchestration for wave-based
//! arcade games.
//!
//! The crate is layered leaf to root:
//!
//! 1. [`capability`] -- independently composable actor traits (poolable,
//!    mortal, health, collidable).
//! 2. [`actor`] -- the lifecycle envelope: gated per-frame hooks, error
//!    containment, one-shot teardown.
//! 3. [`pool`] -- fixed-capacity, extendable storage of one actor type.
//! 4. [`spawner`] -- decides when and how many pool members to activate.
//! 5. [`spawner_manager`] -- spawners keyed by actor kind with bulk control.
//! 6. [`wave`] -- a scripted scenario of stages reconfiguring spawners.
//! 7. [`wave_manager`] -- sequences waves with an inter-wave delay.
//!
//! Configuration flows down (wave manager to actor); events flow up (actor
//! deactivation to spawner retry, timers to stage transitions). Everything is
//! single-threaded and frame-driven: all waiting is a [`timer::TimerHandle`]
//! obtained from the host, and the host routes fired handles back down.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use onslaught_core::prelude::*;
//! use onslaught_core::testing::Mote;
//!
//! let mut host = HeadlessHost::new(42);
//! let mut timers_fired = 0;
//!
//! // Pre-allocate three inactive actors and spawn one every 100 ms.
//! let mut spawner: Spawner<Mote> = Spawner::new(
//!     "motes",
//!     Box::new(|host: &mut HeadlessHost| Mote::new(host)),
//!     Box::new(|_rng: &mut dyn rand::RngCore| 0),
//!     SpawnerConfig::every(Duration::from_millis(100), 3),
//!     &mut host,
//! );
//! spawner.start(&mut host);
//!
//! for _ in 0..10 {
//!     host.timer_queue().advance(Duration::from_millis(50));
//!     while let Some(handle) = host.timer_queue().next_due() {
//!         spawner.handle_timer(handle, &mut host);
//!         timers_fired += 1;
//!     }
//! }
//! assert_eq!(spawner.pool().active_count(), 3);
//! assert!(timers_fired >= 3);
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod capability;
pub mod events;
pub mod host;
pub mod pool;
pub mod spawner;
pub mod spawner_manager;
pub mod timer;
pub mod wave;
pub mod wave_manager;

#[doc(hidden)]
pub mod testing;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Programmer-contract violations raised by the capability traits.
///
/// These indicate a wiring bug and are not meant to be recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// A health operation ran before `set_max_health`.
    #[error("actor {actor} used a health operation before max health was set")]
    MaxHealthUnset { actor: actor::ActorId },

    /// A collision was registered before `setup_collider`.
    #[error("actor {actor} registered a collision before configuring its collider")]
    ColliderNotConfigured { actor: actor::ActorId },
}

/// Failures returned by actor hooks. The actor base logs them and destroys
/// the failing actor.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Concrete behavior found itself in a state it cannot continue from.
    #[error("{0}")]
    Behavior(String),
}

/// Errors produced by pool lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The id does not belong to this pool.
    #[error("actor {actor} is not a member of pool '{pool}'")]
    UnknownMember { pool: String, actor: actor::ActorId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::actor::{Actor, ActorCore, ActorId, ActorRoster, ActorResult, Frame, GameState};
    pub use crate::capability::{
        Collidable, ColliderState, HealthChange, HealthState, Mortal, MortalState, Poolable, PoolableState,
        WithHealth,
    };
    pub use crate::events::{CoreEvent, EventBus};
    pub use crate::host::{BodyShape, CollisionHandle, HeadlessHost, Host, Physics};
    pub use crate::pool::EntityPool;
    pub use crate::spawner::{DelayRange, ParamsCreator, Spawner, SpawnerConfig, SpawnerConfigPatch};
    pub use crate::spawner_manager::{SpawnKind, SpawnerManager};
    pub use crate::timer::{TimerHandle, TimerQueue, Timers};
    pub use crate::wave::{Deadline, InitialStage, ParamsFn, ParamsPatch, Stage, Wave, WaveConfig, WavePhase};
    pub use crate::wave_manager::WaveManager;
    pub use crate::{ActorError, CapabilityError, PoolError};
}
