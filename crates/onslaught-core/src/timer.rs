//! Cancellable one-shot timers on a pausable game clock.
//!
//! Every waiting state in the engine is expressed as a [`TimerHandle`]
//! obtained from a [`Timers`] collaborator. Components never receive a
//! callback from the timer facility; instead the host pops due handles from
//! its [`TimerQueue`] and routes each one to whichever component claims it.
//! This keeps every "delayed call" an explicit state-machine transition with
//! a single outstanding handle per state.
//!
//! # Firing rules
//!
//! - Timers fire in `(due time, scheduling order)` order.
//! - A timer scheduled while due timers are being dispatched fires no earlier
//!   than the next [`TimerQueue::advance`], even with a zero delay.
//! - A timer cancelled before it is popped never fires.
//! - While the queue is paused the clock does not move and nothing is due.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use onslaught_core::timer::{TimerQueue, Timers};
//!
//! let mut timers = TimerQueue::new();
//! let handle = timers.schedule_once(Duration::from_millis(50));
//!
//! timers.advance(Duration::from_millis(40));
//! assert_eq!(timers.next_due(), None);
//!
//! timers.advance(Duration::from_millis(10));
//! assert_eq!(timers.next_due(), Some(handle));
//! assert!(!timers.is_pending(handle));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TimerHandle
// ---------------------------------------------------------------------------

/// Opaque identifier of one scheduled timer. Handles are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerHandle({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// The timer collaborator consumed by actors, spawners and waves.
pub trait Timers {
    /// Schedule a one-shot timer that becomes due after `delay`.
    fn schedule_once(&mut self, delay: Duration) -> TimerHandle;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// cancelled before.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Whether `handle` is still waiting to fire.
    fn is_pending(&self, handle: TimerHandle) -> bool;

    /// Current game-clock time.
    fn now(&self) -> Duration;
}

// ---------------------------------------------------------------------------
// TimerQueue
// ---------------------------------------------------------------------------

/// Deterministic, pausable timer queue driven by the frame loop.
#[derive(Debug, Default)]
pub struct TimerQueue {
    /// Game-clock time; frozen while paused.
    now: Duration,
    /// Next handle value to hand out.
    next_id: u64,
    /// Pending timers ordered by due time, then scheduling order.
    queue: BTreeSet<(Duration, u64)>,
    /// Due time of every pending timer, keyed by handle.
    due: HashMap<u64, Duration>,
    /// Only timers with an id below this watermark may fire. Fixed by
    /// `advance` so timers scheduled during dispatch wait for the next frame.
    horizon: u64,
    paused: bool,
}

impl TimerQueue {
    /// Create an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`. Does nothing while paused.
    pub fn advance(&mut self, delta: Duration) {
        if self.paused {
            return;
        }
        self.now += delta;
        self.horizon = self.next_id;
    }

    /// Pop the next due timer, if any.
    ///
    /// Call repeatedly until it returns `None`; the handles come out in
    /// firing order and each one is no longer pending once returned.
    pub fn next_due(&mut self) -> Option<TimerHandle> {
        if self.paused {
            return None;
        }
        let entry = self
            .queue
            .iter()
            .take_while(|(due, _)| *due <= self.now)
            .find(|(_, id)| *id < self.horizon)
            .copied()?;
        self.queue.remove(&entry);
        self.due.remove(&entry.1);
        Some(TimerHandle(entry.1))
    }

    /// Freeze the clock and all outstanding timers.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unfreeze the clock.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the clock is frozen.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Remaining time until `handle` fires, if it is pending.
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.due
            .get(&handle.0)
            .map(|due| due.saturating_sub(self.now))
    }
}

impl Timers for TimerQueue {
    fn schedule_once(&mut self, delay: Duration) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.now + delay;
        self.queue.insert((due, id));
        self.due.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due.remove(&handle.0) {
            Some(due) => {
                self.queue.remove(&(due, handle.0));
                true
            }
            None => false,
        }
    }

    fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due.contains_key(&handle.0)
    }

    fn now(&self) -> Duration {
        self.now
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
