//! End-to-end scenarios driven through the public API with a headless host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use onslaught_core::prelude::*;
use onslaught_core::testing::Mote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    X,
    Y,
}

fn pump_spawner(spawner: &mut Spawner<Mote>, host: &mut HeadlessHost, ms: u64) -> usize {
    host.timer_queue().advance(Duration::from_millis(ms));
    let mut fired = 0;
    while let Some(handle) = host.timer_queue().next_due() {
        spawner.handle_timer(handle, host);
        fired += 1;
    }
    fired
}

fn pump_waves(manager: &mut WaveManager<Kind, Mote>, host: &mut HeadlessHost, ms: u64) {
    host.timer_queue().advance(Duration::from_millis(ms));
    while let Some(handle) = host.timer_queue().next_due() {
        manager.handle_timer(handle, host);
    }
    manager.update(host, Frame::default());
    manager.post_update(host, Frame::default());
}

fn wave_of(kind: Kind, lifetime: u64, duration: Deadline) -> Wave<Kind, u64> {
    let initial = InitialStage::new(Deadline::Never).with_kind(
        kind,
        move |_| lifetime,
        SpawnerConfig::new(DelayRange::fixed(100), 2),
    );
    Wave::new(WaveConfig::new(vec![kind], initial, duration))
}

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

#[test]
fn capped_spawner_resumes_after_deactivation() {
    let mut host = HeadlessHost::new(1);
    let pool: EntityPool<Mote> = EntityPool::new("x", Box::new(Mote::new), 5, &mut host);
    let config = SpawnerConfig::new(DelayRange::new(0, 0), 2).with_spawn_size(1);
    let mut spawner = Spawner::with_pool(pool, Box::new(|_| 0), config);
    spawner.start(&mut host);

    assert_eq!(pump_spawner(&mut spawner, &mut host, 1), 1);
    assert_eq!(pump_spawner(&mut spawner, &mut host, 1), 1);
    assert_eq!(spawner.pool().active_count(), 2);

    assert_eq!(pump_spawner(&mut spawner, &mut host, 1), 1);
    assert_eq!(spawner.pool().active_count(), 2);

    let id = spawner.pool().active_ids()[1];
    spawner.pool_mut().with_actor(id, |m| m.deactivate(&mut host)).unwrap();
    spawner.settle(&mut host);
    assert_eq!(spawner.pool().active_count(), 2);
    assert_eq!(spawner.pool().len(), 5);
}

#[test]
fn stop_drain_is_order_independent() {
    let orders: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for order in orders {
        let mut host = HeadlessHost::new(0);
        let config = SpawnerConfig::new(DelayRange::fixed(0), 3).with_spawn_size(3);
        let mut spawner: Spawner<Mote> = Spawner::new("x", Box::new(Mote::new), Box::new(|_| 0), config, &mut host);
        spawner.start(&mut host);
        pump_spawner(&mut spawner, &mut host, 16);
        let ids = spawner.pool().active_ids();
        assert_eq!(ids.len(), 3);

        let stopped = Rc::new(Cell::new(0));
        let counter = Rc::clone(&stopped);
        spawner.stop(move || counter.set(counter.get() + 1), &mut host);
        for (step, &i) in order.iter().enumerate() {
            assert_eq!(stopped.get(), 0, "order {order:?} fired after {step} deactivations");
            spawner.pool_mut().with_actor(ids[i], |m| m.deactivate(&mut host)).unwrap();
            spawner.settle(&mut host);
        }
        assert_eq!(stopped.get(), 1, "order {order:?}");
    }
}

#[test]
fn failing_actor_is_retired_without_stopping_the_frame() {
    let mut host = HeadlessHost::new(0);
    let config = SpawnerConfig::new(DelayRange::fixed(0), 2).with_spawn_size(2);
    let mut spawner: Spawner<Mote> = Spawner::new("x", Box::new(Mote::new), Box::new(|_| 0), config, &mut host);
    spawner.start(&mut host);
    pump_spawner(&mut spawner, &mut host, 16);
    let ids = spawner.pool().active_ids();
    spawner.pool_mut().with_actor(ids[0], |m| m.fail_on_update = true).unwrap();

    spawner.update(&mut host, Frame::default());
    let survivor = spawner.pool().actor(ids[1]).unwrap();
    assert_eq!(survivor.updates, 1);
    assert!(spawner.pool().actor(ids[0]).unwrap().is_destroyed());
    assert!(!host.is_actor_alive(ids[0]));
    assert_eq!(spawner.pool().active_count(), 1);
}

#[test]
fn paused_game_state_gates_updates() {
    let mut host = HeadlessHost::new(0);
    let config = SpawnerConfig::new(DelayRange::fixed(0), 1);
    let mut spawner: Spawner<Mote> = Spawner::new("x", Box::new(Mote::new), Box::new(|_| 0), config, &mut host);
    spawner.start(&mut host);
    pump_spawner(&mut spawner, &mut host, 16);
    let id = spawner.pool().active_ids()[0];

    host.set_game_state(GameState::Paused);
    host.timer_queue().pause();
    spawner.update(&mut host, Frame::default());
    assert_eq!(pump_spawner(&mut spawner, &mut host, 1000), 0);
    assert_eq!(spawner.pool().actor(id).unwrap().updates, 0);

    host.set_game_state(GameState::Playing);
    host.timer_queue().resume();
    spawner.update(&mut host, Frame::default());
    assert_eq!(spawner.pool().actor(id).unwrap().updates, 1);
}

// ---------------------------------------------------------------------------
// Waves
// ---------------------------------------------------------------------------

#[test]
fn zero_duration_first_wave_hands_over_without_a_tick() {
    let mut host = HeadlessHost::new(0);
    let spawners: SpawnerManager<Kind, Mote> = SpawnerManager::new(|_kind, host: &mut HeadlessHost| Mote::new(host));
    let mut manager = WaveManager::new(
        spawners,
        vec![wave_of(Kind::X, 0, Deadline::Immediately), wave_of(Kind::Y, 0, Deadline::Never)],
        Duration::ZERO,
    );
    let completed = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&completed);
    manager.on_wave_complete(move |i| log.borrow_mut().push(i));

    manager.start(&mut host);
    assert_eq!(*completed.borrow(), vec![0]);
    assert_eq!(manager.current_wave(), Some(1));
    assert_eq!(manager.wave(1).map(|w| w.phase()), Some(WavePhase::InitialStage));
    assert_eq!(host.timer_queue().now(), Duration::ZERO);
}

#[test]
fn stage_duration_policy() {
    let mut host = HeadlessHost::new(0);
    let mut spawners: SpawnerManager<Kind, Mote> =
        SpawnerManager::new(|_kind, host: &mut HeadlessHost| Mote::new(host));
    let initial = InitialStage::new(Deadline::Immediately).with_kind(
        Kind::X,
        |_| 0,
        SpawnerConfig::new(DelayRange::fixed(100), 4),
    );
    let config = WaveConfig::new(vec![Kind::X], initial, Deadline::Never)
        .with_stage(Stage::new(Deadline::Immediately))
        .with_stage(Stage::new(Deadline::Never).patch_config(
            Kind::X,
            SpawnerConfigPatch {
                max_on_screen: Some(1),
                ..Default::default()
            },
        ))
        .with_stage(Stage::new(Deadline::Immediately));
    let mut wave = Wave::new(config);
    let before = host.timer_queue().pending_count();
    wave.start(&mut spawners, &mut host);

    // Two synchronous transitions, then parked on the never-ending stage.
    assert_eq!(wave.current_stage(), Some(1));
    assert_eq!(host.timer_queue().pending_count(), before + 1, "only the spawn timer");
    assert_eq!(spawners.spawner(Kind::X).unwrap().config().max_on_screen, 1);

    for _ in 0..50 {
        host.timer_queue().advance(Duration::from_secs(10));
        while let Some(handle) = host.timer_queue().next_due() {
            if !wave.handle_timer(handle, &mut spawners, &mut host) {
                spawners.handle_timer(handle, &mut host);
            }
        }
    }
    assert_eq!(wave.current_stage(), Some(1));
    assert_eq!(spawners.active_count(None), 1);
}

#[test]
fn full_run_emits_core_events_in_order() {
    let mut host = HeadlessHost::new(9);
    let spawners: SpawnerManager<Kind, Mote> = SpawnerManager::new(|_kind, host: &mut HeadlessHost| Mote::new(host));
    let initial = InitialStage::new(Deadline::Never).with_kind(
        Kind::X,
        |_| 150,
        SpawnerConfig::new(DelayRange::new(50, 80), 3),
    );
    let first = Wave::new(WaveConfig::new(
        vec![Kind::X],
        initial,
        Deadline::After(Duration::from_millis(400)),
    ));
    let mut manager = WaveManager::new(
        spawners,
        vec![first, wave_of(Kind::Y, 120, Deadline::After(Duration::from_millis(300)))],
        Duration::from_millis(200),
    );
    let finished = Rc::new(Cell::new(false));
    let flag = Rc::clone(&finished);
    manager.on_all_waves_complete(move || flag.set(true));
    manager.start(&mut host);

    for _ in 0..200 {
        pump_waves(&mut manager, &mut host, 16);
        if finished.get() {
            break;
        }
    }
    assert!(finished.get());
    assert!(manager.is_finished());

    let milestones: Vec<CoreEvent> = host
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::WaveCompleted { .. } | CoreEvent::AllWavesCompleted))
        .collect();
    assert_eq!(
        milestones,
        vec![
            CoreEvent::WaveCompleted { index: 0 },
            CoreEvent::WaveCompleted { index: 1 },
            CoreEvent::AllWavesCompleted,
        ]
    );
}
