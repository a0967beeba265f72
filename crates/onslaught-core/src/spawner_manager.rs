//! Spawners keyed by actor kind, with bulk control.
//!
//! A [`SpawnerManager`] owns one [`Spawner`] per registered kind and keeps
//! registration order, so every fan-out (frames, timers, bulk mutators) is
//! deterministic. Bulk operations take `Option<&[K]>`: `None` targets every
//! registered kind, `Some(kinds)` only the listed ones. Unknown kinds in an
//! explicit subset are skipped with a warning.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::actor::{Actor, ActorId, Frame};
use crate::capability::Poolable;
use crate::spawner::{DelayRange, ParamsCreator, Spawner, SpawnerConfig, SpawnerConfigPatch};
use crate::timer::TimerHandle;

/// Tag identifying an actor kind.
pub trait SpawnKind: Copy + Eq + Hash + fmt::Debug + 'static {}

impl<T: Copy + Eq + Hash + fmt::Debug + 'static> SpawnKind for T {}

/// Builds an inactive actor of the given kind.
pub type KindFactory<K, A> = Rc<dyn Fn(K, &mut <A as Actor>::Host) -> A>;

/// Registry of per-kind spawners sharing one actor type.
pub struct SpawnerManager<K: SpawnKind, A: Poolable> {
    factory: KindFactory<K, A>,
    order: Vec<K>,
    spawners: HashMap<K, Spawner<A>>,
}

impl<K: SpawnKind, A: Poolable> SpawnerManager<K, A> {
    pub fn new(factory: impl Fn(K, &mut A::Host) -> A + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            order: Vec::new(),
            spawners: HashMap::new(),
        }
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> &[K] {
        &self.order
    }

    pub fn is_registered(&self, kind: K) -> bool {
        self.spawners.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn spawner(&self, kind: K) -> Option<&Spawner<A>> {
        self.spawners.get(&kind)
    }

    pub fn spawner_mut(&mut self, kind: K) -> Option<&mut Spawner<A>> {
        self.spawners.get_mut(&kind)
    }

    /// Active actors across the targeted spawners.
    pub fn active_count(&self, kinds: Option<&[K]>) -> usize {
        self.targets(kinds)
            .into_iter()
            .filter_map(|kind| self.spawners.get(&kind))
            .map(|spawner| spawner.pool().active_count())
            .sum()
    }

    /// Snapshot of every active actor, in registration then slot order.
    pub fn active_ids(&self) -> Vec<(K, ActorId)> {
        self.order
            .iter()
            .filter_map(|kind| self.spawners.get(kind).map(|s| (*kind, s)))
            .flat_map(|(kind, spawner)| spawner.pool().active_ids().into_iter().map(move |id| (kind, id)))
            .collect()
    }

    /// Create a spawner for each kind not yet registered. Already
    /// registered kinds are left untouched.
    pub fn register_types(
        &mut self,
        kinds: &[K],
        mut params_for: impl FnMut(K) -> ParamsCreator<A::Params>,
        mut config_for: impl FnMut(K) -> SpawnerConfig,
        immediate_start: bool,
        host: &mut A::Host,
    ) where
        A: 'static,
        A::Host: 'static,
    {
        for &kind in kinds {
            if self.spawners.contains_key(&kind) {
                continue;
            }
            let factory = Rc::clone(&self.factory);
            let mut spawner = Spawner::new(
                format!("{kind:?}"),
                Box::new(move |host: &mut A::Host| factory(kind, host)),
                params_for(kind),
                config_for(kind),
                host,
            );
            if immediate_start {
                spawner.start(host);
            }
            self.order.push(kind);
            self.spawners.insert(kind, spawner);
            tracing::debug!(kind = ?kind, "spawner registered");
        }
    }

    pub fn start(&mut self, kinds: Option<&[K]>, host: &mut A::Host) {
        for kind in self.targets(kinds) {
            if let Some(spawner) = self.spawners.get_mut(&kind) {
                spawner.start(host);
            }
        }
    }

    /// Stop the targeted spawners and fire `on_stopped` once all of them
    /// have drained.
    ///
    /// Without an explicit subset only spawners that are currently running
    /// (or already draining) are targeted. With no targets the callback
    /// fires immediately.
    pub fn stop(&mut self, on_stopped: impl FnOnce() + 'static, kinds: Option<&[K]>, host: &mut A::Host) {
        let targets: Vec<K> = match kinds {
            Some(_) => self.targets(kinds),
            None => self
                .order
                .iter()
                .copied()
                .filter(|kind| {
                    self.spawners
                        .get(kind)
                        .is_some_and(|s| s.is_running() || s.is_draining())
                })
                .collect(),
        };
        if targets.is_empty() {
            on_stopped();
            return;
        }

        let remaining = Rc::new(Cell::new(targets.len()));
        let callback: Rc<RefCell<Option<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Some(Box::new(on_stopped))));
        for kind in targets {
            let Some(spawner) = self.spawners.get_mut(&kind) else {
                continue;
            };
            let remaining = Rc::clone(&remaining);
            let callback = Rc::clone(&callback);
            spawner.stop(
                move || {
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let pending = callback.borrow_mut().take();
                        if let Some(done) = pending {
                            done();
                        }
                    }
                },
                host,
            );
        }
    }

    pub fn change_spawn_delay(&mut self, delay: DelayRange, kinds: Option<&[K]>) {
        self.each(kinds, |_, spawner| spawner.change_spawn_delay(delay));
    }

    pub fn change_first_spawn_delay(&mut self, ms: Option<u64>, kinds: Option<&[K]>) {
        self.each(kinds, |_, spawner| spawner.change_first_spawn_delay(ms));
    }

    pub fn change_max_on_screen(&mut self, max_on_screen: usize, kinds: Option<&[K]>, host: &mut A::Host) {
        self.each(kinds, |_, spawner| spawner.change_max_on_screen(max_on_screen, host));
    }

    pub fn change_spawn_size(&mut self, size: Option<u32>, kinds: Option<&[K]>) {
        self.each(kinds, |_, spawner| spawner.change_spawn_size(size));
    }

    /// Apply a per-kind partial config to each targeted spawner.
    pub fn apply_config(
        &mut self,
        mut patch_for: impl FnMut(K) -> SpawnerConfigPatch,
        kinds: Option<&[K]>,
        host: &mut A::Host,
    ) {
        self.each(kinds, |kind, spawner| spawner.apply_config(&patch_for(kind), host));
    }

    /// Swap the params creator of each targeted spawner.
    pub fn change_params_creator(
        &mut self,
        mut creator_for: impl FnMut(K) -> ParamsCreator<A::Params>,
        kinds: Option<&[K]>,
    ) {
        self.each(kinds, |kind, spawner| spawner.change_params_creator(creator_for(kind)));
    }

    /// Tear down and de-register the targeted spawners.
    pub fn destroy(&mut self, kinds: Option<&[K]>, host: &mut A::Host) {
        for kind in self.targets(kinds) {
            if let Some(mut spawner) = self.spawners.remove(&kind) {
                spawner.destroy(host);
                tracing::debug!(kind = ?kind, "spawner destroyed");
            }
            self.order.retain(|k| *k != kind);
        }
    }

    pub fn update(&mut self, host: &mut A::Host, frame: Frame) {
        self.each(None, |_, spawner| spawner.update(host, frame));
    }

    pub fn post_update(&mut self, host: &mut A::Host, frame: Frame) {
        self.each(None, |_, spawner| spawner.post_update(host, frame));
    }

    /// Offer a fired timer to each spawner until one claims it.
    pub fn handle_timer(&mut self, handle: TimerHandle, host: &mut A::Host) -> bool {
        for kind in &self.order {
            if let Some(spawner) = self.spawners.get_mut(kind) {
                if spawner.handle_timer(handle, host) {
                    return true;
                }
            }
        }
        false
    }

    /// Deliver an overlap to whichever spawner's pool owns `actor`.
    pub fn handle_overlap(&mut self, actor: ActorId, other: ActorId, host: &mut A::Host) -> bool {
        for kind in &self.order {
            if let Some(spawner) = self.spawners.get_mut(kind) {
                if spawner.handle_overlap(actor, other, host) {
                    return true;
                }
            }
        }
        false
    }

    /// Let every spawner observe deactivations made outside its own
    /// fan-out.
    pub fn settle(&mut self, host: &mut A::Host) {
        self.each(None, |_, spawner| spawner.settle(host));
    }

    /// Run `f` against an actor of any registered kind, then resync the
    /// owning spawner.
    pub fn with_actor<R>(&mut self, id: ActorId, host: &mut A::Host, f: impl FnOnce(&mut A, &mut A::Host) -> R) -> Option<R> {
        for kind in &self.order {
            let Some(spawner) = self.spawners.get_mut(kind) else {
                continue;
            };
            if !spawner.pool().contains(id) {
                continue;
            }
            let result = spawner.pool_mut().with_actor(id, |actor| f(actor, host)).ok();
            spawner.settle(host);
            return result;
        }
        None
    }

    fn targets(&self, kinds: Option<&[K]>) -> Vec<K> {
        match kinds {
            None => self.order.clone(),
            Some(kinds) => kinds
                .iter()
                .copied()
                .filter(|kind| {
                    let known = self.spawners.contains_key(kind);
                    if !known {
                        tracing::warn!(kind = ?kind, "no spawner registered for kind");
                    }
                    known
                })
                .collect(),
        }
    }

    fn each(&mut self, kinds: Option<&[K]>, mut f: impl FnMut(K, &mut Spawner<A>)) {
        for kind in self.targets(kinds) {
            if let Some(spawner) = self.spawners.get_mut(&kind) {
                f(kind, spawner);
            }
        }
    }
}

impl<K: SpawnKind, A: Poolable> fmt::Debug for SpawnerManager<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnerManager")
            .field("kinds", &self.order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
