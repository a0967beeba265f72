//! Independently composable actor capabilities.
//!
//! Each capability is a trait over [`Actor`](crate::actor::Actor) plus a
//! private state struct the concrete actor embeds and exposes through two
//! accessor methods. The provided trait methods implement the contract; the
//! `on_*` / `pre_*` hooks are the override points for concrete behavior.
//!
//! ```text
//! struct Slime {
//!     core: ActorCore<Arena>,
//!     poolable: PoolableState,   -> impl Poolable
//!     mortal: MortalState,       -> impl Mortal
//!     collider: ColliderState<Slime>, -> impl Collidable
//! }
//! ```

pub mod collidable;
pub mod health;
pub mod mortal;
pub mod poolable;

pub use collidable::{Collidable, ColliderState, OverlapHandler};
pub use health::{HealthChange, HealthState, WithHealth};
pub use mortal::{Mortal, MortalState};
pub use poolable::{Poolable, PoolableState, Transition};
