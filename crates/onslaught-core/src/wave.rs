//! A scripted wave: an initial configuration followed by timed stages.
//!
//! # Phases
//!
//! ```text
//!  NotStarted --start--> InitialStage --deadline--> Stage(0) --> Stage(1) ...
//!                             |                        |
//!                             +----- complete ---------+--> Completing --(drained)--> Completed
//! ```
//!
//! Every deadline (stage durations and the wave's own hard stop) follows
//! the same convention, captured by [`Deadline`]: a positive duration arms a
//! timer, zero advances within the same synchronous step, and a negative
//! duration never fires on its own.
//!
//! The wave holds at most one outstanding stage timer and one hard-stop
//! timer. Completion stops the wave's spawners gracefully; the completion
//! callbacks fire once every targeted spawner has drained, which the owner
//! observes through [`Wave::settle`].

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::capability::Poolable;
use crate::host::Host;
use crate::spawner::{ParamsCreator, SpawnerConfig, SpawnerConfigPatch};
use crate::spawner_manager::{SpawnKind, SpawnerManager};
use crate::timer::TimerHandle;

/// Rolls a fresh params record.
pub type ParamsFn<P> = Rc<dyn Fn(&mut dyn RngCore) -> P>;

/// Overrides fields of a params record produced by the initial stage.
pub type ParamsPatch<P> = Rc<dyn Fn(&mut P, &mut dyn RngCore)>;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// When a stage or wave ends on its own.
///
/// Serialized as signed milliseconds: positive, zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Deadline {
    After(Duration),
    Immediately,
    Never,
}

impl Deadline {
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms > 0 => Deadline::After(Duration::from_millis(ms as u64)),
            0 => Deadline::Immediately,
            _ => Deadline::Never,
        }
    }
}

impl From<i64> for Deadline {
    fn from(ms: i64) -> Self {
        Deadline::from_millis(ms)
    }
}

impl From<Deadline> for i64 {
    fn from(deadline: Deadline) -> Self {
        match deadline {
            Deadline::After(d) => d.as_millis().min(i64::MAX as u128) as i64,
            Deadline::Immediately => 0,
            Deadline::Never => -1,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Params and spawner config for every kind the wave uses.
pub struct InitialStage<K, P> {
    pub params: HashMap<K, ParamsFn<P>>,
    pub configs: HashMap<K, SpawnerConfig>,
    pub duration: Deadline,
}

impl<K: SpawnKind, P> InitialStage<K, P> {
    pub fn new(duration: Deadline) -> Self {
        Self {
            params: HashMap::new(),
            configs: HashMap::new(),
            duration,
        }
    }

    pub fn with_kind(
        mut self,
        kind: K,
        params: impl Fn(&mut dyn RngCore) -> P + 'static,
        config: SpawnerConfig,
    ) -> Self {
        self.params.insert(kind, Rc::new(params));
        self.configs.insert(kind, config);
        self
    }
}

/// A timed patch over the initial stage.
pub struct Stage<K, P> {
    pub param_patches: HashMap<K, ParamsPatch<P>>,
    pub config_patches: HashMap<K, SpawnerConfigPatch>,
    pub duration: Deadline,
}

impl<K: SpawnKind, P> Stage<K, P> {
    pub fn new(duration: Deadline) -> Self {
        Self {
            param_patches: HashMap::new(),
            config_patches: HashMap::new(),
            duration,
        }
    }

    pub fn patch_params(mut self, kind: K, patch: impl Fn(&mut P, &mut dyn RngCore) + 'static) -> Self {
        self.param_patches.insert(kind, Rc::new(patch));
        self
    }

    pub fn patch_config(mut self, kind: K, patch: SpawnerConfigPatch) -> Self {
        self.config_patches.insert(kind, patch);
        self
    }
}

/// Full script of one wave.
pub struct WaveConfig<K, P> {
    pub kinds: Vec<K>,
    pub initial_stage: InitialStage<K, P>,
    pub stages: Vec<Stage<K, P>>,
    pub duration: Deadline,
}

impl<K: SpawnKind, P> WaveConfig<K, P> {
    pub fn new(kinds: Vec<K>, initial_stage: InitialStage<K, P>, duration: Deadline) -> Self {
        Self {
            kinds,
            initial_stage,
            stages: Vec::new(),
            duration,
        }
    }

    pub fn with_stage(mut self, stage: Stage<K, P>) -> Self {
        self.stages.push(stage);
        self
    }
}

impl<K: SpawnKind, P> fmt::Debug for WaveConfig<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveConfig")
            .field("kinds", &self.kinds)
            .field("stages", &self.stages.len())
            .field("duration", &self.duration)
            .finish()
    }
}

fn creator<P: 'static>(params: ParamsFn<P>) -> ParamsCreator<P> {
    Box::new(move |rng: &mut dyn RngCore| params(rng))
}

// ---------------------------------------------------------------------------
// Wave
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    NotStarted,
    InitialStage,
    Stage(usize),
    /// Spawners stopped, waiting for their populations to drain.
    Completing,
    Completed,
}

/// One wave running against a shared [`SpawnerManager`].
pub struct Wave<K: SpawnKind, P: 'static> {
    config: WaveConfig<K, P>,
    phase: WavePhase,
    stage_timer: Option<TimerHandle>,
    wave_timer: Option<TimerHandle>,
    drained: Option<Rc<Cell<bool>>>,
    on_complete: Vec<Box<dyn FnOnce()>>,
}

impl<K: SpawnKind, P: 'static> Wave<K, P> {
    pub fn new(config: WaveConfig<K, P>) -> Self {
        Self {
            config,
            phase: WavePhase::NotStarted,
            stage_timer: None,
            wave_timer: None,
            drained: None,
            on_complete: Vec::new(),
        }
    }

    pub fn config(&self) -> &WaveConfig<K, P> {
        &self.config
    }

    pub fn kinds(&self) -> &[K] {
        &self.config.kinds
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Index of the active stage, if a stage (not the initial one) runs.
    pub fn current_stage(&self) -> Option<usize> {
        match self.phase {
            WavePhase::Stage(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, WavePhase::InitialStage | WavePhase::Stage(_))
    }

    pub fn is_completed(&self) -> bool {
        self.phase == WavePhase::Completed
    }

    /// Register a callback fired once when the wave has completed and its
    /// spawners have drained.
    pub fn on_complete(&mut self, callback: impl FnOnce() + 'static) {
        self.on_complete.push(Box::new(callback));
    }

    /// Apply the initial stage, start this wave's spawners and arm the
    /// deadlines.
    pub fn start<A>(&mut self, manager: &mut SpawnerManager<K, A>, host: &mut A::Host)
    where
        A: Poolable<Params = P> + 'static,
        A::Host: 'static,
    {
        if self.phase != WavePhase::NotStarted {
            tracing::warn!(phase = ?self.phase, "wave already started");
            return;
        }
        self.phase = WavePhase::InitialStage;

        let initial = &self.config.initial_stage;
        let missing = self
            .config
            .kinds
            .iter()
            .copied()
            .find(|kind| !initial.params.contains_key(kind) || !initial.configs.contains_key(kind));
        if let Some(kind) = missing {
            tracing::warn!(kind = ?kind, "wave script has no initial params or config for kind, completing wave");
            self.complete(manager, host);
            return;
        }

        for &kind in &self.config.kinds {
            let (Some(params), Some(config)) = (initial.params.get(&kind), initial.configs.get(&kind)) else {
                continue;
            };
            if manager.is_registered(kind) {
                if let Some(spawner) = manager.spawner_mut(kind) {
                    spawner.change_params_creator(creator(Rc::clone(params)));
                    spawner.apply_config(&SpawnerConfigPatch::from(config.clone()), host);
                }
            } else {
                manager.register_types(
                    &[kind],
                    |_| creator(Rc::clone(params)),
                    |_| config.clone(),
                    false,
                    host,
                );
            }
        }
        manager.start(Some(&self.config.kinds), host);
        tracing::debug!(kinds = ?self.config.kinds, "wave started");

        self.enter_stage_deadline(self.config.initial_stage.duration, manager, host);
        if !self.is_running() {
            return;
        }
        match self.config.duration {
            Deadline::After(delay) => self.wave_timer = Some(host.timers().schedule_once(delay)),
            Deadline::Immediately => self.complete(manager, host),
            Deadline::Never => {}
        }
    }

    /// Stop the wave. Idempotent. Completion callbacks fire once the wave's
    /// spawners have drained.
    pub fn complete<A>(&mut self, manager: &mut SpawnerManager<K, A>, host: &mut A::Host)
    where
        A: Poolable<Params = P>,
    {
        if matches!(self.phase, WavePhase::Completing | WavePhase::Completed) {
            return;
        }
        self.cancel_timers(host);
        self.phase = WavePhase::Completing;

        let kinds: Vec<K> = self
            .config
            .kinds
            .iter()
            .copied()
            .filter(|kind| manager.is_registered(*kind))
            .collect();
        let drained = Rc::new(Cell::new(false));
        let flag = Rc::clone(&drained);
        manager.stop(move || flag.set(true), Some(&kinds), host);
        self.drained = Some(drained);
        self.settle();
    }

    /// Observe spawner drain. Returns whether the wave is completed.
    pub fn settle(&mut self) -> bool {
        if self.phase == WavePhase::Completing && self.drained.as_ref().is_some_and(|flag| flag.get()) {
            self.phase = WavePhase::Completed;
            self.drained = None;
            tracing::debug!("wave drained");
            for callback in std::mem::take(&mut self.on_complete) {
                callback();
            }
        }
        self.is_completed()
    }

    /// Route a fired timer. Returns whether it was one of the wave's.
    pub fn handle_timer<A>(&mut self, handle: TimerHandle, manager: &mut SpawnerManager<K, A>, host: &mut A::Host) -> bool
    where
        A: Poolable<Params = P>,
    {
        if self.stage_timer == Some(handle) {
            self.stage_timer = None;
            self.advance_stage(manager, host);
            true
        } else if self.wave_timer == Some(handle) {
            self.wave_timer = None;
            self.complete(manager, host);
            true
        } else {
            false
        }
    }

    /// Cancel outstanding timers. Spawners are left to their manager.
    pub fn destroy(&mut self, host: &mut impl Host) {
        self.cancel_timers(host);
    }

    fn enter_stage_deadline<A>(&mut self, deadline: Deadline, manager: &mut SpawnerManager<K, A>, host: &mut A::Host)
    where
        A: Poolable<Params = P>,
    {
        if let Some(handle) = self.stage_timer.take() {
            host.timers().cancel(handle);
        }
        match deadline {
            Deadline::After(delay) => self.stage_timer = Some(host.timers().schedule_once(delay)),
            Deadline::Immediately => self.advance_stage(manager, host),
            Deadline::Never => {}
        }
    }

    fn advance_stage<A>(&mut self, manager: &mut SpawnerManager<K, A>, host: &mut A::Host)
    where
        A: Poolable<Params = P>,
    {
        let next = match self.phase {
            WavePhase::InitialStage => 0,
            WavePhase::Stage(n) => n + 1,
            _ => return,
        };
        let Some(stage) = self.config.stages.get(next) else {
            self.complete(manager, host);
            return;
        };

        let initial = &self.config.initial_stage;
        let missing = self.config.kinds.iter().copied().find(|kind| !initial.params.contains_key(kind));
        if let Some(kind) = missing {
            tracing::warn!(kind = ?kind, stage = next, "no params for kind in stage, completing wave");
            self.complete(manager, host);
            return;
        }

        let changes: Vec<(K, ParamsCreator<P>, Option<SpawnerConfigPatch>)> = self
            .config
            .kinds
            .iter()
            .filter_map(|&kind| {
                let base = Rc::clone(initial.params.get(&kind)?);
                let merged: ParamsCreator<P> = match stage.param_patches.get(&kind) {
                    Some(patch) => {
                        let patch = Rc::clone(patch);
                        Box::new(move |rng: &mut dyn RngCore| {
                            let mut params = base(&mut *rng);
                            patch(&mut params, rng);
                            params
                        })
                    }
                    None => creator(base),
                };
                Some((kind, merged, stage.config_patches.get(&kind).cloned()))
            })
            .collect();
        let duration = stage.duration;

        self.phase = WavePhase::Stage(next);
        for (kind, merged, patch) in changes {
            if let Some(spawner) = manager.spawner_mut(kind) {
                spawner.change_params_creator(merged);
                if let Some(patch) = patch {
                    spawner.apply_config(&patch, host);
                }
            }
        }
        tracing::debug!(stage = next, "wave stage started");
        self.enter_stage_deadline(duration, manager, host);
    }

    fn cancel_timers(&mut self, host: &mut impl Host) {
        for handle in [self.stage_timer.take(), self.wave_timer.take()].into_iter().flatten() {
            host.timers().cancel(handle);
        }
    }
}

impl<K: SpawnKind, P: 'static> fmt::Debug for Wave<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wave")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("stage_timer", &self.stage_timer)
            .field("wave_timer", &self.wave_timer)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
