//! Sequencing of waves with an inter-wave delay.
//!
//! The [`WaveManager`] owns the shared [`SpawnerManager`] and an ordered list
//! of [`Wave`]s. It runs one wave at a time; after each wave completes it
//! reports the wave index, then either starts the next wave (synchronously
//! when the delay is zero, otherwise after one timer) or reports that every
//! wave is done.
//!
//! Progress is observed by polling: every fan-out call ends with a
//! settle pass that promotes drained waves and walks the sequence forward as
//! far as it can go within the current step.

use std::fmt;
use std::time::Duration;

use crate::actor::{ActorId, Frame};
use crate::capability::Poolable;
use crate::events::CoreEvent;
use crate::host::Host;
use crate::spawner_manager::{SpawnKind, SpawnerManager};
use crate::timer::TimerHandle;
use crate::wave::Wave;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running(usize),
    BetweenWaves(usize),
    Finished,
}

/// Runs a list of waves in order.
pub struct WaveManager<K: SpawnKind, A: Poolable> {
    spawners: SpawnerManager<K, A>,
    waves: Vec<Wave<K, A::Params>>,
    wave_change_delay: Duration,
    phase: Phase,
    change_timer: Option<TimerHandle>,
    on_wave_complete: Vec<Box<dyn FnMut(usize)>>,
    on_all_waves_complete: Vec<Box<dyn FnMut()>>,
}

impl<K: SpawnKind, A: Poolable + 'static> WaveManager<K, A>
where
    A::Host: 'static,
{
    pub fn new(spawners: SpawnerManager<K, A>, waves: Vec<Wave<K, A::Params>>, wave_change_delay: Duration) -> Self {
        Self {
            spawners,
            waves,
            wave_change_delay,
            phase: Phase::Idle,
            change_timer: None,
            on_wave_complete: Vec::new(),
            on_all_waves_complete: Vec::new(),
        }
    }

    pub fn spawners(&self) -> &SpawnerManager<K, A> {
        &self.spawners
    }

    pub fn spawners_mut(&mut self) -> &mut SpawnerManager<K, A> {
        &mut self.spawners
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    pub fn wave(&self, index: usize) -> Option<&Wave<K, A::Params>> {
        self.waves.get(index)
    }

    pub fn wave_change_delay(&self) -> Duration {
        self.wave_change_delay
    }

    /// Index of the running wave, or of the next wave while between waves.
    pub fn current_wave(&self) -> Option<usize> {
        match self.phase {
            Phase::Running(i) | Phase::BetweenWaves(i) => Some(i),
            Phase::Idle | Phase::Finished => None,
        }
    }

    pub fn is_between_waves(&self) -> bool {
        matches!(self.phase, Phase::BetweenWaves(_))
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn on_wave_complete(&mut self, callback: impl FnMut(usize) + 'static) {
        self.on_wave_complete.push(Box::new(callback));
    }

    pub fn on_all_waves_complete(&mut self, callback: impl FnMut() + 'static) {
        self.on_all_waves_complete.push(Box::new(callback));
    }

    /// Start the first wave. Warns and does nothing without waves.
    pub fn start(&mut self, host: &mut A::Host) {
        if self.waves.is_empty() {
            tracing::warn!("wave manager has no waves, nothing to start");
            return;
        }
        if self.phase != Phase::Idle {
            return;
        }
        self.begin_wave(0, host);
        self.settle(host);
    }

    /// Complete the running wave from outside, for waves that never end on
    /// their own.
    pub fn complete_current_wave(&mut self, host: &mut A::Host) {
        if let Phase::Running(i) = self.phase {
            self.waves[i].complete(&mut self.spawners, host);
            self.settle(host);
        }
    }

    pub fn update(&mut self, host: &mut A::Host, frame: Frame) {
        self.spawners.update(host, frame);
        self.settle(host);
    }

    pub fn post_update(&mut self, host: &mut A::Host, frame: Frame) {
        self.spawners.post_update(host, frame);
        self.settle(host);
    }

    /// Route a fired timer to the sequencer, the running wave or the
    /// spawners, in that order.
    pub fn handle_timer(&mut self, handle: TimerHandle, host: &mut A::Host) -> bool {
        if self.change_timer == Some(handle) {
            self.change_timer = None;
            if let Phase::BetweenWaves(next) = self.phase {
                self.begin_wave(next, host);
            }
            self.settle(host);
            return true;
        }
        if let Phase::Running(i) = self.phase {
            if self.waves[i].handle_timer(handle, &mut self.spawners, host) {
                self.settle(host);
                return true;
            }
        }
        let claimed = self.spawners.handle_timer(handle, host);
        if claimed {
            self.settle(host);
        }
        claimed
    }

    pub fn handle_overlap(&mut self, actor: ActorId, other: ActorId, host: &mut A::Host) -> bool {
        let delivered = self.spawners.handle_overlap(actor, other, host);
        if delivered {
            self.settle(host);
        }
        delivered
    }

    /// Run `f` against any spawned actor, then settle.
    pub fn with_actor<R>(&mut self, id: ActorId, host: &mut A::Host, f: impl FnOnce(&mut A, &mut A::Host) -> R) -> Option<R> {
        let result = self.spawners.with_actor(id, host, f);
        self.settle(host);
        result
    }

    /// Walk the sequence forward as far as the current state allows.
    pub fn settle(&mut self, host: &mut A::Host) {
        while let Phase::Running(i) = self.phase {
            if !self.waves[i].settle() {
                break;
            }
            self.waves[i].destroy(host);
            tracing::info!(wave = i, "wave complete");
            for callback in self.on_wave_complete.iter_mut() {
                callback(i);
            }
            host.emit(CoreEvent::WaveCompleted { index: i });

            let next = i + 1;
            if next >= self.waves.len() {
                self.finish(host);
            } else if self.wave_change_delay.is_zero() {
                self.begin_wave(next, host);
            } else {
                self.phase = Phase::BetweenWaves(next);
                self.change_timer = Some(host.timers().schedule_once(self.wave_change_delay));
            }
        }
    }

    /// Cancel every timer and tear down all spawners.
    pub fn destroy(&mut self, host: &mut A::Host) {
        if let Some(handle) = self.change_timer.take() {
            host.timers().cancel(handle);
        }
        for wave in &mut self.waves {
            wave.destroy(host);
        }
        self.spawners.destroy(None, host);
    }

    fn begin_wave(&mut self, index: usize, host: &mut A::Host) {
        self.phase = Phase::Running(index);
        tracing::info!(wave = index, "wave starting");
        self.waves[index].start(&mut self.spawners, host);
    }

    fn finish(&mut self, host: &mut A::Host) {
        self.phase = Phase::Finished;
        if let Some(handle) = self.change_timer.take() {
            host.timers().cancel(handle);
        }
        tracing::info!(waves = self.waves.len(), "all waves complete");
        for callback in self.on_all_waves_complete.iter_mut() {
            callback();
        }
        host.emit(CoreEvent::AllWavesCompleted);
    }
}

impl<K: SpawnKind, A: Poolable> fmt::Debug for WaveManager<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveManager")
            .field("waves", &self.waves.len())
            .field("phase", &self.phase)
            .field("wave_change_delay", &self.wave_change_delay)
            .field("spawners", &self.spawners)
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

    use super::*;
    use crate::host::HeadlessHost;
    use crate::spawner::{DelayRange, SpawnerConfig};
    use crate::testing::Mote;
    use crate::wave::{Deadline, InitialStage, WaveConfig};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Walker,
        Flyer,
    }

    fn wave(kind: Kind, lifetime: u64, duration: Deadline) -> Wave<Kind, u64> {
        let initial = InitialStage::new(Deadline::Never).with_kind(
            kind,
            move |_| lifetime,
            SpawnerConfig::new(DelayRange::fixed(100), 2),
        );
        Wave::new(WaveConfig::new(vec![kind], initial, duration))
    }

    fn manager(waves: Vec<Wave<Kind, u64>>, delay: Duration) -> WaveManager<Kind, Mote> {
        let spawners: SpawnerManager<Kind, Mote> = SpawnerManager::new(|_kind, host: &mut HeadlessHost| Mote::new(host));
        WaveManager::new(spawners, waves, delay)
    }

    fn pump(m: &mut WaveManager<Kind, Mote>, host: &mut HeadlessHost, ms: u64) {
        host.timer_queue().advance(Duration::from_millis(ms));
        while let Some(handle) = host.timer_queue().next_due() {
            m.handle_timer(handle, host);
        }
    }

    fn record(m: &mut WaveManager<Kind, Mote>) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let waves = Rc::clone(&log);
        m.on_wave_complete(move |i| waves.borrow_mut().push(format!("wave {i}")));
        let all = Rc::clone(&log);
        m.on_all_waves_complete(move || all.borrow_mut().push("all".to_owned()));
        log
    }

    #[test]
    fn empty_manager_does_nothing() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(Vec::new(), Duration::ZERO);
        let log = record(&mut m);
        m.start(&mut host);
        assert!(log.borrow().is_empty());
        assert_eq!(m.current_wave(), None);
    }

    #[test]
    fn zero_duration_wave_chains_synchronously() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(
            vec![wave(Kind::Walker, 0, Deadline::Immediately), wave(Kind::Flyer, 0, Deadline::Never)],
            Duration::ZERO,
        );
        let log = record(&mut m);
        m.start(&mut host);

        assert_eq!(*log.borrow(), vec!["wave 0".to_owned()]);
        assert_eq!(m.current_wave(), Some(1));
        assert!(m.spawners().spawner(Kind::Flyer).unwrap().is_running());
        assert!(!m.spawners().spawner(Kind::Walker).unwrap().is_running());
        assert_eq!(host.drain_events(), vec![CoreEvent::WaveCompleted { index: 0 }]);
    }

    #[test]
    fn inter_wave_delay_uses_a_timer() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(
            vec![
                wave(Kind::Walker, 0, Deadline::After(Duration::from_millis(50))),
                wave(Kind::Flyer, 0, Deadline::Immediately),
            ],
            Duration::from_millis(300),
        );
        let log = record(&mut m);
        m.start(&mut host);
        pump(&mut m, &mut host, 50);
        assert_eq!(*log.borrow(), vec!["wave 0".to_owned()]);
        assert!(m.is_between_waves());

        pump(&mut m, &mut host, 299);
        assert!(m.is_between_waves());
        pump(&mut m, &mut host, 1);
        assert!(m.is_finished());
        assert_eq!(*log.borrow(), vec!["wave 0".to_owned(), "wave 1".to_owned(), "all".to_owned()]);
    }

    #[test]
    fn wave_completion_waits_for_population() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(
            vec![wave(Kind::Walker, 250, Deadline::After(Duration::from_millis(150)))],
            Duration::ZERO,
        );
        let log = record(&mut m);
        m.start(&mut host);

        // Spawn at 100, hard stop at 150, the walker expires at 350.
        pump(&mut m, &mut host, 100);
        pump(&mut m, &mut host, 50);
        assert!(log.borrow().is_empty());
        assert_eq!(m.spawners().active_count(None), 1);

        pump(&mut m, &mut host, 200);
        assert_eq!(*log.borrow(), vec!["wave 0".to_owned(), "all".to_owned()]);
        let events = host.drain_events();
        assert_eq!(events.last(), Some(&CoreEvent::AllWavesCompleted));
    }

    #[test]
    fn never_ending_wave_completes_externally() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(vec![wave(Kind::Walker, 0, Deadline::Never)], Duration::ZERO);
        let log = record(&mut m);
        m.start(&mut host);
        pump(&mut m, &mut host, 1000);
        assert!(log.borrow().is_empty());

        m.complete_current_wave(&mut host);
        assert!(!m.is_finished(), "spawned walkers are still on screen");
        for (_, id) in m.spawners().active_ids() {
            m.with_actor(id, &mut host, |mote, host| mote.deactivate(host));
        }
        assert!(m.is_finished());
    }

    #[test]
    fn destroy_cancels_everything() {
        let mut host = HeadlessHost::new(0);
        let mut m = manager(
            vec![wave(Kind::Walker, 0, Deadline::After(Duration::from_millis(500)))],
            Duration::ZERO,
        );
        m.start(&mut host);
        pump(&mut m, &mut host, 100);
        m.destroy(&mut host);
        assert_eq!(host.timer_queue().pending_count(), 0);
        assert!(m.spawners().is_empty());
    }
}
