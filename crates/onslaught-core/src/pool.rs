//! Fixed-capacity, extendable storage of one pooled actor type.
//!
//! An [`EntityPool`] owns its members in slots and addresses them by
//! [`ActorId`]. Members are created eagerly (at construction or on
//! [`extend`](EntityPool::extend)) and never implicitly afterwards. Each
//! member joins the pool exactly once, at creation, through its
//! [`PoolableState`](crate::capability::PoolableState) subscription; every
//! later activation or deactivation is journaled in the member and applied
//! here whenever the pool touches it ("resync").
//!
//! A member destroyed while pooled is *retired*: dropped from the active set
//! (which counts as a deactivation) and never handed out again.
//!
//! # Example
//!
//! ```
//! use onslaught_core::prelude::*;
//! use onslaught_core::testing::Mote;
//!
//! let mut host = HeadlessHost::new(1);
//! let mut pool: EntityPool<Mote> = EntityPool::new("motes", Box::new(Mote::new), 2, &mut host);
//!
//! let first = pool.get().unwrap();
//! pool.spawn(first, 0, &mut host).unwrap();
//! assert_eq!(pool.active_ids(), vec![first]);
//! assert_ne!(pool.get(), Some(first));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::actor::{Actor, ActorId, Frame};
use crate::capability::{Poolable, Transition};
use crate::timer::TimerHandle;
use crate::PoolError;

/// Builds a fresh, inactive pool member.
pub type ActorFactory<A> = Box<dyn FnMut(&mut <A as Actor>::Host) -> A>;

type Listener = Box<dyn FnMut(ActorId)>;

struct Slot<A> {
    actor: A,
    retired: bool,
}

// ---------------------------------------------------------------------------
// EntityPool
// ---------------------------------------------------------------------------

/// Pool of reusable actors of one type.
pub struct EntityPool<A: Poolable> {
    label: String,
    factory: ActorFactory<A>,
    slots: Vec<Slot<A>>,
    index: HashMap<ActorId, usize>,
    /// Slots of active members, in slot order.
    active: BTreeSet<usize>,
    on_activate: Vec<Listener>,
    on_deactivate: Vec<Listener>,
    /// Deactivations applied since the last `take_deactivations`.
    deactivations: usize,
}

impl<A: Poolable> EntityPool<A> {
    /// Create a pool and eagerly build `initial_size` inactive members.
    pub fn new(
        label: impl Into<String>,
        factory: ActorFactory<A>,
        initial_size: usize,
        host: &mut A::Host,
    ) -> Self {
        let mut pool = Self {
            label: label.into(),
            factory,
            slots: Vec::with_capacity(initial_size),
            index: HashMap::with_capacity(initial_size),
            active: BTreeSet::new(),
            on_activate: Vec::new(),
            on_deactivate: Vec::new(),
            deactivations: 0,
        };
        pool.extend(initial_size, host);
        pool
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of members, retired ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Members that could be handed out right now.
    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|slot| Self::is_available(slot)).count()
    }

    /// Pre-create `count` more inactive members.
    pub fn extend(&mut self, count: usize, host: &mut A::Host) {
        for _ in 0..count {
            let mut actor = (self.factory)(host);
            let slot = self.slots.len();
            actor.poolable_mut().join_pool(slot);
            if actor.is_active() {
                actor.deactivate(host);
            }
            actor.poolable_mut().take_transitions();
            self.index.insert(actor.id(), slot);
            self.slots.push(Slot { actor, retired: false });
        }
        if count > 0 {
            tracing::debug!(pool = %self.label, added = count, size = self.slots.len(), "pool extended");
        }
    }

    /// First inactive member in slot order.
    pub fn get(&self) -> Option<ActorId> {
        self.slots
            .iter()
            .find(|slot| Self::is_available(slot))
            .map(|slot| slot.actor.id())
    }

    /// Up to `n` inactive members in slot order. Never creates members.
    pub fn get_many(&self, n: usize) -> Vec<ActorId> {
        self.slots
            .iter()
            .filter(|slot| Self::is_available(slot))
            .take(n)
            .map(|slot| slot.actor.id())
            .collect()
    }

    /// Snapshot of the active members in slot order.
    pub fn active_ids(&self) -> Vec<ActorId> {
        self.active.iter().map(|&slot| self.slots[slot].actor.id()).collect()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&A> {
        self.index.get(&id).map(|&slot| &self.slots[slot].actor)
    }

    /// Every member in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.slots.iter().map(|slot| &slot.actor)
    }

    /// Run `f` against a member, then resync its membership.
    pub fn with_actor<R>(&mut self, id: ActorId, f: impl FnOnce(&mut A) -> R) -> Result<R, PoolError> {
        let slot = self.slot_of(id)?;
        let result = f(&mut self.slots[slot].actor);
        self.sync(slot);
        Ok(result)
    }

    /// Re-seed a member with `params` and activate it. Returns whether the
    /// member was activated.
    pub fn spawn(&mut self, id: ActorId, params: A::Params, host: &mut A::Host) -> Result<bool, PoolError> {
        self.with_actor(id, |actor| {
            actor.reset(Some(params), host);
            actor.activate(host)
        })
    }

    /// Register a listener fired whenever any member activates.
    pub fn on_activate(&mut self, listener: impl FnMut(ActorId) + 'static) {
        self.on_activate.push(Box::new(listener));
    }

    /// Register a listener fired whenever any member deactivates.
    pub fn on_deactivate(&mut self, listener: impl FnMut(ActorId) + 'static) {
        self.on_deactivate.push(Box::new(listener));
    }

    /// Number of deactivations since the previous call.
    pub fn take_deactivations(&mut self) -> usize {
        std::mem::take(&mut self.deactivations)
    }

    pub fn update(&mut self, host: &mut A::Host, frame: Frame) {
        for slot in 0..self.slots.len() {
            if self.slots[slot].retired {
                continue;
            }
            self.slots[slot].actor.update(host, frame);
            self.sync(slot);
        }
    }

    pub fn post_update(&mut self, host: &mut A::Host, frame: Frame) {
        for slot in 0..self.slots.len() {
            if self.slots[slot].retired {
                continue;
            }
            self.slots[slot].actor.post_update(host, frame);
            self.sync(slot);
        }
    }

    /// Offer a fired timer to each member until one claims it.
    pub fn handle_timer(&mut self, handle: TimerHandle, host: &mut A::Host) -> bool {
        for slot in 0..self.slots.len() {
            if self.slots[slot].actor.handle_timer(host, handle) {
                self.sync(slot);
                return true;
            }
        }
        false
    }

    /// Deliver an overlap reported for `actor`. Returns `false` if `actor`
    /// is not a member.
    pub fn handle_overlap(&mut self, actor: ActorId, other: ActorId, host: &mut A::Host) -> bool {
        match self.index.get(&actor) {
            Some(&slot) => {
                self.slots[slot].actor.handle_overlap(host, other);
                self.sync(slot);
                true
            }
            None => false,
        }
    }

    /// Safe-destroy every member.
    pub fn destroy(&mut self, host: &mut A::Host) {
        for slot in 0..self.slots.len() {
            self.slots[slot].actor.safe_destroy(host);
            self.sync(slot);
        }
    }

    fn is_available(slot: &Slot<A>) -> bool {
        !slot.retired && !slot.actor.is_active() && !slot.actor.is_destroyed()
    }

    fn slot_of(&self, id: ActorId) -> Result<usize, PoolError> {
        self.index.get(&id).copied().ok_or_else(|| PoolError::UnknownMember {
            pool: self.label.clone(),
            actor: id,
        })
    }

    /// Apply a member's journaled transitions to the pool's bookkeeping.
    fn sync(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        let id = entry.actor.id();
        for transition in entry.actor.poolable_mut().take_transitions() {
            match transition {
                Transition::Activated => {
                    if self.active.insert(slot) {
                        for listener in self.on_activate.iter_mut() {
                            listener(id);
                        }
                    }
                }
                Transition::Deactivated => {
                    if self.active.remove(&slot) {
                        self.deactivations += 1;
                        for listener in self.on_deactivate.iter_mut() {
                            listener(id);
                        }
                    }
                }
            }
        }
        if !entry.retired && entry.actor.is_destroyed() {
            entry.retired = true;
            if self.active.remove(&slot) {
                tracing::warn!(pool = %self.label, actor = %id, "active pool member was destroyed, retiring it");
                self.deactivations += 1;
                for listener in self.on_deactivate.iter_mut() {
                    listener(id);
                }
            } else {
                tracing::debug!(pool = %self.label, actor = %id, "pool member retired");
            }
        }
    }
}

impl<A: Poolable> fmt::Debug for EntityPool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("label", &self.label)
            .field("len", &self.slots.len())
            .field("active", &self.active.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::host::{HeadlessHost, Host};
    use crate::testing::Mote;

    fn mote_pool(size: usize, host: &mut HeadlessHost) -> EntityPool<Mote> {
        EntityPool::new("motes", Box::new(Mote::new), size, host)
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn members_start_inactive() {
        let mut host = HeadlessHost::new(0);
        let pool = mote_pool(4, &mut host);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.available_count(), 4);
        assert!(pool.iter().all(|m| m.poolable().pool_slot().is_some()));
    }

    #[test]
    fn extend_adds_inactive_members() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(1, &mut host);
        pool.extend(3, &mut host);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.get_many(10).len(), 4);
    }

    // -- get ----------------------------------------------------------------

    #[test]
    fn get_returns_first_inactive_in_order() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(3, &mut host);
        let ids: Vec<ActorId> = pool.iter().map(|m| m.id()).collect();
        assert_eq!(pool.get(), Some(ids[0]));

        pool.spawn(ids[0], 0, &mut host).unwrap();
        assert_eq!(pool.get(), Some(ids[1]));
        assert_eq!(pool.get_many(5), vec![ids[1], ids[2]]);

        pool.spawn(ids[1], 0, &mut host).unwrap();
        pool.spawn(ids[2], 0, &mut host).unwrap();
        assert_eq!(pool.get(), None);
        assert!(pool.get_many(2).is_empty());
        assert_eq!(pool.len(), 3, "get never grows the pool");
    }

    #[test]
    fn unknown_member_is_an_error() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(1, &mut host);
        let stranger = host.enlist_actor();
        let err = pool.spawn(stranger, 0, &mut host).unwrap_err();
        assert_eq!(
            err,
            PoolError::UnknownMember {
                pool: "motes".to_owned(),
                actor: stranger
            }
        );
    }

    // -- membership ---------------------------------------------------------

    #[test]
    fn listeners_fire_once_per_transition() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(2, &mut host);
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            pool.on_activate(move |id| log.borrow_mut().push(("on", id)));
        }
        {
            let log = Rc::clone(&log);
            pool.on_deactivate(move |id| log.borrow_mut().push(("off", id)));
        }
        let id = pool.get().unwrap();
        for _ in 0..3 {
            pool.spawn(id, 0, &mut host).unwrap();
            pool.with_actor(id, |m| m.activate(&mut host)).unwrap();
            pool.with_actor(id, |m| m.deactivate(&mut host)).unwrap();
        }
        assert_eq!(log.borrow().len(), 6);
        assert_eq!(pool.take_deactivations(), 3);
        assert_eq!(pool.take_deactivations(), 0);
    }

    #[test]
    fn self_deactivation_is_observed_on_timer() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(1, &mut host);
        let id = pool.get().unwrap();
        pool.spawn(id, 30, &mut host).unwrap();
        assert_eq!(pool.active_count(), 1);

        host.timer_queue().advance(Duration::from_millis(30));
        let handle = host.timer_queue().next_due().unwrap();
        assert!(pool.handle_timer(handle, &mut host));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.get(), Some(id));
    }

    #[test]
    fn destroyed_member_is_retired() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(2, &mut host);
        let ids = pool.get_many(2);
        pool.spawn(ids[0], 0, &mut host).unwrap();
        pool.with_actor(ids[0], |m| m.fail_on_update = true).unwrap();

        pool.update(&mut host, Frame::default());
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.take_deactivations(), 1);
        assert_eq!(pool.get_many(2), vec![ids[1]]);
    }

    #[test]
    fn destroy_tears_down_every_member() {
        let mut host = HeadlessHost::new(0);
        let mut pool = mote_pool(3, &mut host);
        let id = pool.get().unwrap();
        pool.spawn(id, 0, &mut host).unwrap();
        pool.destroy(&mut host);
        assert!(pool.iter().all(|m| m.is_destroyed()));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.get(), None);
    }
}
