//! Full sessions driven through the public API.

use onslaught_core::prelude::*;
use onslaught_game::character::{START_X, START_Y};
use onslaught_game::prelude::*;

fn config() -> SessionConfig {
    SessionConfig {
        seed: 42,
        ..SessionConfig::default()
    }
}

/// A single wave that spawns one slime from `params` and ends its initial
/// stage after 100 ms.
fn one_slime_wave(kind: SlimeKind, params: SlimeParams) -> Vec<Wave<SlimeKind, SlimeParams>> {
    let initial = InitialStage::new(Deadline::from_millis(100)).with_kind(
        kind,
        move |_rng: &mut dyn rand::RngCore| params.clone(),
        SpawnerConfig::new(DelayRange::fixed(60_000), 1).with_first_spawn_delay(0),
    );
    vec![Wave::new(WaveConfig::new(vec![kind], initial, Deadline::Never))]
}

fn far_lane(behavior: SlimeBehavior, speed: f32) -> SlimeParams {
    SlimeParams {
        x: WORLD.band_center(0),
        y: WORLD.spawn_start_y,
        speed,
        behavior,
    }
}

/// Step until `done` holds, up to `frames` frames.
fn run_until(session: &mut GameSession, frames: u64, done: impl Fn(&GameSession) -> bool) -> bool {
    for _ in 0..frames {
        if done(session) {
            return true;
        }
        session.step();
    }
    done(session)
}

// -- lifecycle ---------------------------------------------------------------

#[test]
fn fresh_session_waits_for_start() {
    let mut session = GameSession::new(config()).unwrap();
    assert_eq!(session.outcome(), Outcome::InProgress);
    assert_eq!(session.arena().position(session.character().id()), Vec2::new(START_X, START_Y));
    assert_eq!(session.character().health(), 4);
    assert_eq!(session.waves().current_wave(), None);

    session.run_frames(30);
    assert_eq!(session.waves().spawners().active_count(None), 0);
}

#[test]
fn start_runs_the_first_wave() {
    let mut session = GameSession::new(config()).unwrap();
    session.start();
    session.start();
    session.run_frames(5);

    assert_eq!(session.waves().current_wave(), Some(0));
    assert!(session.waves().spawners().active_count(Some(&[SlimeKind::Jumping])) >= 1);
    assert!(session
        .drain_events()
        .iter()
        .any(|event| matches!(event, GameEvent::Core(CoreEvent::ActorActivated { .. }))));
}

#[test]
fn invalid_config_is_rejected() {
    let result = GameSession::new(SessionConfig {
        frame_ms: 0,
        ..config()
    });
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

// -- pause -------------------------------------------------------------------

#[test]
fn pause_freezes_the_game_clock() {
    let mut session = GameSession::new(config()).unwrap();
    session.start();
    session.run_frames(30);

    {
        let (character, arena) = session.character_mut();
        assert!(character.walk(arena, Direction::Left));
    }
    assert!(session.pause());
    assert_eq!(session.character().state(), CharacterState::Idle);

    let frozen = session.arena().now();
    let character_at = session.arena().position(session.character().id());
    session.run_frames(60);
    assert_eq!(session.arena().now(), frozen);
    assert_eq!(session.arena().position(session.character().id()), character_at);
    assert_eq!(session.frame_loop().frame_count(), 90);

    assert!(session.resume());
    assert!(!session.resume());
    session.run_frames(10);
    assert!(session.arena().now() > frozen);
}

// -- outcomes ----------------------------------------------------------------

#[test]
fn clearing_every_wave_is_a_victory() {
    let params = far_lane(
        SlimeBehavior::Duplicant {
            heading: Heading::Down,
            duration_ms: None,
        },
        300.0,
    );
    let mut session = GameSession::with_waves(config(), one_slime_wave(SlimeKind::Duplicant, params)).unwrap();
    session.start();

    assert_eq!(session.run_frames(1000), Outcome::Victory);
    let events = session.drain_events();
    assert!(events.contains(&GameEvent::WaveComplete { index: 0 }));
    assert!(events.contains(&GameEvent::Victory));
    assert!(events
        .iter()
        .any(|event| matches!(event, GameEvent::SlimePassed { kind: SlimeKind::Duplicant, .. })));
    for kind in BonusKind::ALL {
        let spawner = session.bonuses().spawner(kind).unwrap();
        assert!(!spawner.is_running());
    }
}

#[test]
fn character_death_ends_the_game() {
    let mut session = GameSession::new(config()).unwrap();
    session.start();
    {
        let (character, arena) = session.character_mut();
        character.take_damage(arena, 4).unwrap();
    }
    assert!(session.character().is_dead());

    assert_eq!(session.run_frames(300), Outcome::Defeat);
    assert_eq!(session.arena().game_state(), GameState::GameOver);
    let events = session.drain_events();
    assert_eq!(events.last(), Some(&GameEvent::GameOver));

    // Game over freezes the clock and cannot be paused.
    let frozen = session.arena().now();
    for _ in 0..20 {
        session.step();
    }
    assert_eq!(session.arena().now(), frozen);
    assert!(!session.pause());
}

// -- sub-actors ----------------------------------------------------------------

#[test]
fn shooting_slime_fires_from_the_projectile_pool() {
    let params = far_lane(SlimeBehavior::Shooting { shoot_delay_ms: 200 }, 60.0);
    let mut session = GameSession::with_waves(config(), one_slime_wave(SlimeKind::Shooting, params)).unwrap();
    session.start();

    assert!(run_until(&mut session, 300, |s| s.projectiles().active_count() == 1));
    assert_eq!(session.stray_count(), 0);
}

#[test]
fn duplicating_slime_splits_into_the_duplicant_pool() {
    let params = far_lane(
        SlimeBehavior::Duplicating {
            duplication_delay_ms: 200,
        },
        150.0,
    );
    let mut session = GameSession::with_waves(config(), one_slime_wave(SlimeKind::Duplicating, params)).unwrap();
    session.start();

    assert!(run_until(&mut session, 300, |s| s.duplicants().active_count() == 2));
    assert_eq!(session.waves().spawners().active_count(Some(&[SlimeKind::Duplicating])), 0);
}

#[test]
fn exhausted_duplicant_pool_spawns_strays() {
    let params = far_lane(
        SlimeBehavior::Duplicating {
            duplication_delay_ms: 200,
        },
        150.0,
    );
    let config = SessionConfig {
        duplicant_pool_size: 1,
        ..config()
    };
    let mut session = GameSession::with_waves(config, one_slime_wave(SlimeKind::Duplicating, params)).unwrap();
    session.start();

    assert!(run_until(&mut session, 300, |s| s.duplicants().active_count() == 1
        && s.stray_count() == 1));
}
