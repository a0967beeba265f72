//! Fixed-timestep frame loop.
//!
//! The [`FrameLoop`] drives a [`FrameHandler`] forward one frame at a time.
//! Each frame:
//!
//! 1. The handler's timer queue advances by the fixed step.
//! 2. Every due timer is popped and handed to the handler, one at a time, in
//!    firing order. Timers scheduled during this phase wait for the next
//!    frame.
//! 3. The handler's update phase runs, then its post-update phase.
//! 4. The frame counter advances and diagnostics are recorded.
//!
//! With a fixed step, a seeded generator and FIFO timer dispatch the loop is
//! fully deterministic: same config + same seed + same inputs = same frames.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use onslaught_core::actor::Frame;
//! use onslaught_core::timer::{TimerHandle, TimerQueue, Timers};
//! use onslaught_game::frame::{FrameConfig, FrameHandler, FrameLoop};
//!
//! #[derive(Default)]
//! struct Counter {
//!     timers: TimerQueue,
//!     fired: u32,
//!     updates: u32,
//! }
//!
//! impl FrameHandler for Counter {
//!     fn timer_queue(&mut self) -> &mut TimerQueue {
//!         &mut self.timers
//!     }
//!     fn on_timer(&mut self, _handle: TimerHandle) {
//!         self.fired += 1;
//!     }
//!     fn update(&mut self, _frame: Frame) {
//!         self.updates += 1;
//!     }
//! }
//!
//! let mut counter = Counter::default();
//! counter.timers.schedule_once(Duration::from_millis(40));
//! let mut frames = FrameLoop::new(FrameConfig { fixed_dt_ms: 16 });
//! frames.run_frames(&mut counter, 3);
//!
//! assert_eq!(frames.frame_count(), 3);
//! assert_eq!(counter.updates, 3);
//! assert_eq!(counter.fired, 1);
//! ```

use std::time::{Duration, Instant};

use onslaught_core::actor::Frame;
use onslaught_core::timer::{TimerHandle, TimerQueue, Timers};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Fixed step in milliseconds per frame. Must be positive.
    pub fixed_dt_ms: u64,
}

impl Default for FrameConfig {
    /// Defaults to 16 ms per frame, roughly 60 Hz.
    fn default() -> Self {
        Self { fixed_dt_ms: 16 }
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Timers dispatched during the frame.
    pub timers_fired: usize,
    /// Wall-clock time spent dispatching timers.
    pub timer_time: Duration,
    /// Wall-clock time spent in the update phase.
    pub update_time: Duration,
    /// Wall-clock time spent in the post-update phase.
    pub post_update_time: Duration,
    /// Total wall-clock time for the frame.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameHandler
// ---------------------------------------------------------------------------

/// Whatever the loop drives: owns the timer queue and reacts to each phase.
pub trait FrameHandler {
    /// The queue the loop advances and drains.
    fn timer_queue(&mut self) -> &mut TimerQueue;

    /// A timer became due.
    fn on_timer(&mut self, handle: TimerHandle);

    fn update(&mut self, _frame: Frame) {}

    fn post_update(&mut self, _frame: Frame) {}
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// The deterministic fixed-timestep frame loop.
#[derive(Debug)]
pub struct FrameLoop {
    config: FrameConfig,
    fixed_dt: Duration,
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    /// Create a loop with the frame counter at zero.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt_ms` is zero.
    pub fn new(config: FrameConfig) -> Self {
        assert!(
            config.fixed_dt_ms > 0,
            "fixed_dt_ms must be positive, got {}",
            config.fixed_dt_ms
        );
        Self {
            config,
            fixed_dt: Duration::from_millis(config.fixed_dt_ms),
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    /// Execute one frame against `handler`. Returns the number of timers
    /// dispatched.
    pub fn step(&mut self, handler: &mut dyn FrameHandler) -> usize {
        let frame_start = Instant::now();

        // Phase 1: move the clock, then dispatch what became due.
        let timers = handler.timer_queue();
        timers.advance(self.fixed_dt);
        let frame = Frame {
            time: timers.now(),
            delta: self.fixed_dt,
        };
        let mut timers_fired = 0;
        while let Some(handle) = handler.timer_queue().next_due() {
            handler.on_timer(handle);
            timers_fired += 1;
        }
        let timer_time = frame_start.elapsed();

        // Phase 2: per-frame behavior.
        let update_start = Instant::now();
        handler.update(frame);
        let update_time = update_start.elapsed();

        let post_start = Instant::now();
        handler.post_update(frame);
        let post_update_time = post_start.elapsed();

        // Phase 3: advance the counter.
        self.frame_counter += 1;
        self.last_diagnostics = FrameDiagnostics {
            timers_fired,
            timer_time,
            update_time,
            post_update_time,
            total_time: frame_start.elapsed(),
        };
        timers_fired
    }

    /// Run `count` frames. Returns the total number of timers dispatched.
    pub fn run_frames(&mut self, handler: &mut dyn FrameHandler, count: u64) -> u64 {
        let mut total = 0u64;
        for _ in 0..count {
            total += self.step(handler) as u64;
        }
        total
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Frames run times the fixed step. Keeps counting while the game clock
    /// is paused.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.config.fixed_dt_ms.saturating_mul(self.frame_counter))
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn config(&self) -> FrameConfig {
        self.config
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        timers: TimerQueue,
        log: Vec<String>,
        chain: Option<TimerHandle>,
    }

    impl FrameHandler for Recorder {
        fn timer_queue(&mut self) -> &mut TimerQueue {
            &mut self.timers
        }

        fn on_timer(&mut self, handle: TimerHandle) {
            self.log.push(format!("timer {}", handle.to_raw()));
            if self.chain.is_none() {
                self.chain = Some(self.timers.schedule_once(Duration::ZERO));
            }
        }

        fn update(&mut self, frame: Frame) {
            self.log.push(format!("update {}", frame.time.as_millis()));
        }

        fn post_update(&mut self, frame: Frame) {
            self.log.push(format!("post {}", frame.time.as_millis()));
        }
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn new_loop_starts_at_zero() {
        let frames = FrameLoop::new(FrameConfig::default());
        assert_eq!(frames.frame_count(), 0);
        assert_eq!(frames.elapsed(), Duration::ZERO);
        assert_eq!(frames.fixed_dt(), Duration::from_millis(16));
    }

    #[test]
    #[should_panic(expected = "fixed_dt_ms must be positive")]
    fn zero_step_panics() {
        let _frames = FrameLoop::new(FrameConfig { fixed_dt_ms: 0 });
    }

    // -- phases -------------------------------------------------------------

    #[test]
    fn phases_run_in_order() {
        let mut recorder = Recorder::default();
        recorder.timers.schedule_once(Duration::from_millis(10));
        let mut frames = FrameLoop::new(FrameConfig { fixed_dt_ms: 10 });

        assert_eq!(frames.step(&mut recorder), 1);
        assert_eq!(recorder.log, vec!["timer 0", "update 10", "post 10"]);
        assert_eq!(frames.last_diagnostics().timers_fired, 1);
    }

    #[test]
    fn timers_scheduled_during_dispatch_wait_a_frame() {
        let mut recorder = Recorder::default();
        recorder.timers.schedule_once(Duration::ZERO);
        let mut frames = FrameLoop::new(FrameConfig { fixed_dt_ms: 16 });

        assert_eq!(frames.step(&mut recorder), 1);
        assert_eq!(frames.step(&mut recorder), 1);
        assert_eq!(recorder.log[3], "timer 1");
    }

    #[test]
    fn run_frames_accumulates() {
        let mut recorder = Recorder::default();
        let mut frames = FrameLoop::new(FrameConfig { fixed_dt_ms: 20 });
        assert_eq!(frames.run_frames(&mut recorder, 5), 0);
        assert_eq!(frames.frame_count(), 5);
        assert_eq!(frames.elapsed(), Duration::from_millis(100));
        assert_eq!(recorder.log.len(), 10);
    }
}
