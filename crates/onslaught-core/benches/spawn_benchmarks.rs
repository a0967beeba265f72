//! Spawn pipeline benchmarks.
//!
//! Measures the per-frame cost of the core against a headless host:
//!
//! - pool lookup (`get_many`) over mostly-active pools,
//! - a spawner churning through short-lived actors at its cap,
//! - a wave manager fanning frames and timers out over several kinds.
//!
//! Run with: `cargo bench --bench spawn_benchmarks`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use onslaught_core::prelude::*;
use onslaught_core::testing::Mote;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    A,
    B,
    C,
    D,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pump_spawner(spawner: &mut Spawner<Mote>, host: &mut HeadlessHost) {
    host.timer_queue().advance(FRAME);
    while let Some(handle) = host.timer_queue().next_due() {
        spawner.handle_timer(handle, host);
    }
    let frame = Frame {
        time: host.timer_queue().now(),
        delta: FRAME,
    };
    spawner.update(host, frame);
}

fn wave_manager(host: &mut HeadlessHost, cap: usize) -> WaveManager<Kind, Mote> {
    let kinds = vec![Kind::A, Kind::B, Kind::C, Kind::D];
    let mut initial = InitialStage::new(Deadline::Never);
    for &kind in &kinds {
        initial = initial.with_kind(kind, |_| 48, SpawnerConfig::new(DelayRange::new(0, 32), cap));
    }
    let wave = Wave::new(WaveConfig::new(kinds, initial, Deadline::Never));
    let spawners: SpawnerManager<Kind, Mote> = SpawnerManager::new(|_kind, host: &mut HeadlessHost| Mote::new(host));
    let mut manager = WaveManager::new(spawners, vec![wave], Duration::ZERO);
    manager.start(host);
    manager
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_pool_get_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_get_many");
    for size in [16usize, 128, 1024] {
        let mut host = HeadlessHost::new(0);
        let mut pool: EntityPool<Mote> = EntityPool::new("bench", Box::new(Mote::new), size, &mut host);
        for id in pool.get_many(size * 9 / 10) {
            let spawned = pool.spawn(id, 0, &mut host);
            assert!(matches!(spawned, Ok(true)), "filling the pool failed: {spawned:?}");
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(pool.get_many(black_box(8))));
        });
    }
    group.finish();
}

fn bench_spawner_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawner_churn");
    for cap in [8usize, 64, 256] {
        let mut host = HeadlessHost::new(1);
        let config = SpawnerConfig::new(DelayRange::new(0, 4), cap).with_spawn_size(4);
        let mut spawner: Spawner<Mote> =
            Spawner::new("bench", Box::new(Mote::new), Box::new(|_| 40), config, &mut host);
        spawner.start(&mut host);
        for _ in 0..32 {
            pump_spawner(&mut spawner, &mut host);
        }
        group.bench_with_input(BenchmarkId::from_parameter(cap), &cap, |b, _| {
            b.iter(|| pump_spawner(&mut spawner, &mut host));
        });
    }
    group.finish();
}

fn bench_wave_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("wave_frame");
    for cap in [4usize, 32, 128] {
        let mut host = HeadlessHost::new(2);
        let mut manager = wave_manager(&mut host, cap);
        group.bench_with_input(BenchmarkId::from_parameter(cap), &cap, |b, _| {
            b.iter(|| {
                host.timer_queue().advance(FRAME);
                while let Some(handle) = host.timer_queue().next_due() {
                    manager.handle_timer(handle, &mut host);
                }
                let frame = Frame {
                    time: host.timer_queue().now(),
                    delta: FRAME,
                };
                manager.update(&mut host, frame);
                manager.post_update(&mut host, frame);
                host.drain_events().len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pool_get_many, bench_spawner_churn, bench_wave_frame);
criterion_main!(benches);
