//! Session-scoped event bus.
//!
//! The engine never talks to a global emitter. Each game session constructs
//! an [`EventBus`] and hands it to whatever publishes or consumes events; the
//! bus is dropped together with the session. Events are delivered in
//! publication order when the owner drains the queue.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

// ---------------------------------------------------------------------------
// CoreEvent
// ---------------------------------------------------------------------------

/// Events the spawn-orchestration core exposes to outer layers (scoring, UI,
/// presentation). The core itself never consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreEvent {
    /// A pooled actor became active.
    ActorActivated { actor: ActorId },
    /// A pooled actor became inactive.
    ActorDeactivated { actor: ActorId },
    /// The wave at `index` finished and its spawners drained.
    WaveCompleted { index: usize },
    /// The last wave finished.
    AllWavesCompleted,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// FIFO event queue owned by a single session.
#[derive(Debug, Clone)]
pub struct EventBus<E> {
    queue: VecDeque<E>,
    published: u64,
}

impl<E> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            published: 0,
        }
    }

    /// Queue an event for the next drain.
    pub fn publish(&mut self, event: E) {
        self.published += 1;
        self.queue.push_back(event);
    }

    /// Take every queued event in publication order.
    pub fn drain(&mut self) -> Vec<E> {
        self.queue.drain(..).collect()
    }

    /// Events waiting to be drained.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of events ever published on this bus.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
