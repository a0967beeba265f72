//! Onslaught game -- a headless rendition of the slime-wave arcade game built
//! on [`onslaught_core`].
//!
//! The crate supplies everything the core treats as an outside collaborator:
//!
//! - [`arena`] -- the [`Host`](onslaught_core::host::Host) implementation:
//!   timers, seeded randomness, minimal kinematic physics with overlap
//!   detection, the session event bus and a command queue for cross-actor
//!   effects.
//! - [`state`] -- the playing / paused / game-over state machine.
//! - [`frame`] -- the fixed-step frame loop.
//! - [`character`], [`slime`], [`bonus`] -- the concrete actors.
//! - [`waves`] -- the scripted slime waves.
//! - [`config`] -- session configuration with serde defaults.
//! - [`session`] -- wires all of the above into a playable [`GameSession`].
//!
//! # Example
//!
//! ```
//! use onslaught_game::prelude::*;
//!
//! let mut session = GameSession::new(SessionConfig::default())?;
//! session.start();
//! assert_eq!(session.run_frames(120), Outcome::InProgress);
//! # Ok::<(), onslaught_game::ConfigError>(())
//! ```

#![deny(unsafe_code)]

pub mod arena;
pub mod bonus;
pub mod character;
pub mod config;
pub mod frame;
pub mod session;
pub mod slime;
pub mod state;
pub mod waves;

use onslaught_core::events::CoreEvent;
use serde::{Deserialize, Serialize};

pub use session::{GameSession, Outcome};

use crate::slime::SlimeKind;

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// Everything a session publishes for scoring, UI and presentation layers.
///
/// Positions are arena coordinates in pixels, origin at the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An event raised by the spawn-orchestration core.
    Core(CoreEvent),
    /// The character destroyed a slime by dashing or attacking into it.
    SlimeKilled { kind: SlimeKind, x: f32, y: f32 },
    /// A slime left the arena through the bottom edge.
    SlimePassed { kind: SlimeKind, x: f32, y: f32 },
    /// The character dashed through a projectile.
    ProjectileCaught { x: f32, y: f32 },
    /// The character actually lost health.
    CharacterTookDamage { health: u32, x: f32, y: f32 },
    /// A slime wave finished and its spawners drained.
    WaveComplete { index: usize },
    /// Every slime wave finished.
    Victory,
    /// The character died and the game-over delay elapsed.
    GameOver,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while loading a [`SessionConfig`](config::SessionConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field parsed but holds a value the session cannot run with.
    #[error("invalid session config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arena::{Animation, Arena, ArenaCommand, ArenaPhysics, CharacterView, Vec2, WORLD};
    pub use crate::bonus::{Bonus, BonusKind, BonusParams};
    pub use crate::character::{Character, CharacterState, Direction};
    pub use crate::config::{BonusSpawnConfigs, SessionConfig};
    pub use crate::frame::{FrameConfig, FrameDiagnostics, FrameHandler, FrameLoop};
    pub use crate::session::{GameSession, Outcome};
    pub use crate::slime::{Aim, Heading, HidingZone, Slime, SlimeBehavior, SlimeKind, SlimeParams};
    pub use crate::state::GameStateManager;
    pub use crate::waves::slime_waves;
    pub use crate::{ConfigError, GameEvent};
}
