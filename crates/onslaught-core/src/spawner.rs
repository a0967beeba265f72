//! Per-type spawn scheduling over one pool.
//!
//! A [`Spawner`] decides *when* and *how many* members of its pool to
//! activate. Its timer marks "time to spawn" and funnels into a single
//! spawn-attempt decision point; a pool member deactivating funnels into the
//! same point, so both paths pass the same `max_on_screen` check regardless
//! of interleaving.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle --start--> Running --stop--> Draining --(active == 0)--> Idle
//!                     ^                 |
//!                     +-----start-------+
//! ```
//!
//! Stopping cancels the timer and never force-deactivates anything: the stop
//! callbacks fire once the pool has drained naturally (immediately if nothing
//! is active).

use std::fmt;
use std::time::Duration;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, Frame};
use crate::capability::Poolable;
use crate::host::Host;
use crate::pool::{ActorFactory, EntityPool};
use crate::timer::TimerHandle;

/// Upper bound for `spawn_size`.
pub const MAX_SPAWN_SIZE: u32 = 10;

/// Rolls the params for one activated actor.
pub type ParamsCreator<P> = Box<dyn FnMut(&mut dyn RngCore) -> P>;

/// Callback fired once a stopped spawner has drained.
pub type StopCallback = Box<dyn FnOnce()>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Inclusive range of milliseconds a randomized delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl DelayRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// A range that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self { min: ms, max: ms }
    }

    /// Draw a delay. A reversed range is treated as its sorted form.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Duration {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Spawn policy for one actor type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Interval between spawn events.
    pub spawn_delay: DelayRange,
    /// Cap on simultaneously active actors.
    pub max_on_screen: usize,
    /// Delay used instead of `spawn_delay` for the very first spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_spawn_delay: Option<u64>,
    /// Actors attempted per spawn event; clamped to `[0, 10]`, default 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_size: Option<u32>,
    /// Discard attempts that cannot field the whole pack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_spawn_in_pack: Option<bool>,
}

impl SpawnerConfig {
    pub fn new(spawn_delay: DelayRange, max_on_screen: usize) -> Self {
        Self {
            spawn_delay,
            max_on_screen,
            first_spawn_delay: None,
            spawn_size: None,
            force_spawn_in_pack: None,
        }
    }

    /// Fixed interval of `every`, capped at `max_on_screen`.
    pub fn every(every: Duration, max_on_screen: usize) -> Self {
        Self::new(DelayRange::fixed(every.as_millis() as u64), max_on_screen)
    }

    pub fn with_first_spawn_delay(mut self, ms: u64) -> Self {
        self.first_spawn_delay = Some(ms);
        self
    }

    pub fn with_spawn_size(mut self, size: u32) -> Self {
        self.spawn_size = Some(size);
        self
    }

    pub fn with_pack(mut self, force: bool) -> Self {
        self.force_spawn_in_pack = Some(force);
        self
    }

    /// Effective pack size after clamping.
    pub fn effective_spawn_size(&self) -> usize {
        self.spawn_size.unwrap_or(1).min(MAX_SPAWN_SIZE) as usize
    }

    pub fn forces_pack(&self) -> bool {
        self.force_spawn_in_pack.unwrap_or(false)
    }
}

/// Partial [`SpawnerConfig`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_delay: Option<DelayRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_on_screen: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_spawn_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_spawn_in_pack: Option<bool>,
}

impl SpawnerConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<SpawnerConfig> for SpawnerConfigPatch {
    fn from(config: SpawnerConfig) -> Self {
        Self {
            spawn_delay: Some(config.spawn_delay),
            max_on_screen: Some(config.max_on_screen),
            first_spawn_delay: config.first_spawn_delay,
            spawn_size: config.spawn_size,
            force_spawn_in_pack: config.force_spawn_in_pack,
        }
    }
}

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Draining,
}

/// Spawn scheduler owning one pool.
pub struct Spawner<A: Poolable> {
    config: SpawnerConfig,
    pool: EntityPool<A>,
    params_creator: ParamsCreator<A::Params>,
    timer: Option<TimerHandle>,
    state: RunState,
    first_spawn: bool,
    time_to_spawn: bool,
    stop_callbacks: Vec<StopCallback>,
    spawned: u64,
}

impl<A: Poolable> Spawner<A> {
    /// Build a spawner with a fresh pool sized to `config.max_on_screen`.
    pub fn new(
        label: impl Into<String>,
        factory: ActorFactory<A>,
        params_creator: ParamsCreator<A::Params>,
        config: SpawnerConfig,
        host: &mut A::Host,
    ) -> Self {
        let pool = EntityPool::new(label, factory, config.max_on_screen, host);
        Self::with_pool(pool, params_creator, config)
    }

    /// Build a spawner over an existing pool.
    pub fn with_pool(pool: EntityPool<A>, params_creator: ParamsCreator<A::Params>, config: SpawnerConfig) -> Self {
        Self {
            config,
            pool,
            params_creator,
            timer: None,
            state: RunState::Idle,
            first_spawn: true,
            time_to_spawn: false,
            stop_callbacks: Vec::new(),
            spawned: 0,
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn pool(&self) -> &EntityPool<A> {
        &self.pool
    }

    /// Mutable pool access. Call [`Spawner::settle`] afterwards so
    /// deactivations made through it are observed.
    pub fn pool_mut(&mut self) -> &mut EntityPool<A> {
        &mut self.pool
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_draining(&self) -> bool {
        self.state == RunState::Draining
    }

    /// Whether a spawn timer is outstanding.
    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Total actors activated by this spawner.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Begin scheduling. Does nothing if already running; a draining
    /// spawner resumes and keeps its pending stop callbacks.
    pub fn start(&mut self, host: &mut A::Host) {
        if self.state == RunState::Running {
            return;
        }
        self.state = RunState::Running;
        self.first_spawn = true;
        self.time_to_spawn = false;
        self.schedule(host);
        tracing::debug!(pool = %self.pool.label(), "spawner started");
    }

    /// Stop scheduling and fire `on_stopped` once no actor is active.
    pub fn stop(&mut self, on_stopped: impl FnOnce() + 'static, host: &mut A::Host) {
        self.cancel_timer(host);
        self.time_to_spawn = false;
        match self.state {
            RunState::Idle => on_stopped(),
            RunState::Running | RunState::Draining => {
                self.stop_callbacks.push(Box::new(on_stopped));
                self.state = RunState::Draining;
                self.check_drained();
            }
        }
    }

    pub fn change_spawn_delay(&mut self, delay: DelayRange) {
        self.config.spawn_delay = delay;
    }

    pub fn change_first_spawn_delay(&mut self, ms: Option<u64>) {
        self.config.first_spawn_delay = ms;
    }

    /// Change the cap; the pool grows when the new cap exceeds its size.
    pub fn change_max_on_screen(&mut self, max_on_screen: usize, host: &mut A::Host) {
        let size = self.pool.len();
        if max_on_screen > size {
            self.pool.extend(max_on_screen - size, host);
        }
        let raised = max_on_screen > self.config.max_on_screen;
        self.config.max_on_screen = max_on_screen;
        if raised {
            self.attempt_spawn(host);
        }
    }

    pub fn change_spawn_size(&mut self, size: Option<u32>) {
        self.config.spawn_size = size;
    }

    pub fn change_force_spawn_in_pack(&mut self, force: Option<bool>) {
        self.config.force_spawn_in_pack = force;
    }

    pub fn change_params_creator(&mut self, creator: ParamsCreator<A::Params>) {
        self.params_creator = creator;
    }

    /// Apply every field present in `patch`.
    pub fn apply_config(&mut self, patch: &SpawnerConfigPatch, host: &mut A::Host) {
        if let Some(delay) = patch.spawn_delay {
            self.change_spawn_delay(delay);
        }
        if let Some(ms) = patch.first_spawn_delay {
            self.change_first_spawn_delay(Some(ms));
        }
        if let Some(size) = patch.spawn_size {
            self.change_spawn_size(Some(size));
        }
        if let Some(force) = patch.force_spawn_in_pack {
            self.change_force_spawn_in_pack(Some(force));
        }
        if let Some(max) = patch.max_on_screen {
            self.change_max_on_screen(max, host);
        }
    }

    /// Route a fired timer: the spawn timer, or a timer of a pool member.
    pub fn handle_timer(&mut self, handle: TimerHandle, host: &mut A::Host) -> bool {
        if self.timer == Some(handle) {
            self.timer = None;
            if self.state == RunState::Running {
                self.time_to_spawn = true;
                self.attempt_spawn(host);
            }
            return true;
        }
        let claimed = self.pool.handle_timer(handle, host);
        if claimed {
            self.settle(host);
        }
        claimed
    }

    pub fn handle_overlap(&mut self, actor: ActorId, other: ActorId, host: &mut A::Host) -> bool {
        let delivered = self.pool.handle_overlap(actor, other, host);
        if delivered {
            self.settle(host);
        }
        delivered
    }

    pub fn update(&mut self, host: &mut A::Host, frame: Frame) {
        self.pool.update(host, frame);
        self.settle(host);
    }

    pub fn post_update(&mut self, host: &mut A::Host, frame: Frame) {
        self.pool.post_update(host, frame);
        self.settle(host);
    }

    /// React to pool deactivations: retry spawning once per deactivation,
    /// then fire stop callbacks if the pool has drained.
    pub fn settle(&mut self, host: &mut A::Host) {
        let deactivations = self.pool.take_deactivations();
        for _ in 0..deactivations {
            self.attempt_spawn(host);
        }
        self.check_drained();
    }

    /// Cancel scheduling and safe-destroy every pool member. Pending stop
    /// callbacks are dropped unfired.
    pub fn destroy(&mut self, host: &mut A::Host) {
        self.cancel_timer(host);
        self.state = RunState::Idle;
        self.stop_callbacks.clear();
        self.pool.destroy(host);
        self.pool.take_deactivations();
    }

    /// The single spawn decision point.
    fn attempt_spawn(&mut self, host: &mut A::Host) {
        if self.state != RunState::Running || !self.time_to_spawn {
            return;
        }
        let active = self.pool.active_count();
        if active >= self.config.max_on_screen {
            tracing::trace!(pool = %self.pool.label(), active, "at capacity, spawn deferred");
            return;
        }
        let size = self.config.effective_spawn_size();
        let room = self.config.max_on_screen - active;
        let candidates = self.pool.get_many(size.min(room));
        if self.config.forces_pack() && candidates.len() < size {
            tracing::debug!(
                pool = %self.pool.label(),
                wanted = size,
                available = candidates.len(),
                "pack incomplete, spawn dropped"
            );
        } else {
            for id in candidates {
                let params = (self.params_creator)(host.rng());
                match self.pool.spawn(id, params, host) {
                    Ok(true) => self.spawned += 1,
                    Ok(false) => {}
                    Err(err) => tracing::warn!(error = %err, "spawn candidate vanished"),
                }
            }
        }
        self.time_to_spawn = false;
        self.schedule(host);
    }

    fn schedule(&mut self, host: &mut A::Host) {
        self.cancel_timer(host);
        let delay = match (self.first_spawn, self.config.first_spawn_delay) {
            (true, Some(ms)) => Duration::from_millis(ms),
            _ => self.config.spawn_delay.sample(host.rng()),
        };
        self.first_spawn = false;
        self.timer = Some(host.timers().schedule_once(delay));
    }

    fn cancel_timer(&mut self, host: &mut A::Host) {
        if let Some(handle) = self.timer.take() {
            host.timers().cancel(handle);
        }
    }

    fn check_drained(&mut self) {
        if self.state == RunState::Draining && self.pool.active_count() == 0 {
            self.state = RunState::Idle;
            tracing::debug!(pool = %self.pool.label(), "spawner drained");
            for callback in std::mem::take(&mut self.stop_callbacks) {
                callback();
            }
        }
    }
}

impl<A: Poolable> fmt::Debug for Spawner<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("state", &self.state)
            .field("timer", &self.timer)
            .field("time_to_spawn", &self.time_to_spawn)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
