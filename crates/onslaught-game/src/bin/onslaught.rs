//! Headless runner.
//!
//! Runs one session without input until it is decided or the frame cap is
//! reached, then prints the outcome, a tally of published events and a
//! digest of the event log. Two runs with the same config print the same
//! digest.
//!
//! Usage: `onslaught [config.json]`. Set `RUST_LOG` for engine logs.

use std::collections::BTreeMap;

use anyhow::Context;
use onslaught_game::prelude::*;

/// Ten minutes of game time at the default frame step.
const FRAME_CAP: u64 = 37_500;

fn event_name(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::Core(_) => "core",
        GameEvent::SlimeKilled { .. } => "slime_killed",
        GameEvent::SlimePassed { .. } => "slime_passed",
        GameEvent::ProjectileCaught { .. } => "projectile_caught",
        GameEvent::CharacterTookDamage { .. } => "character_took_damage",
        GameEvent::WaveComplete { .. } => "wave_complete",
        GameEvent::Victory => "victory",
        GameEvent::GameOver => "game_over",
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_path(&path).with_context(|| format!("loading {path}"))?,
        None => SessionConfig::default(),
    };
    let seed = config.seed;
    let mut session = GameSession::new(config)?;
    session.start();

    let mut hasher = blake3::Hasher::new();
    let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut outcome = session.outcome();
    let mut frames = 0;
    while frames < FRAME_CAP && outcome == Outcome::InProgress {
        session.step();
        frames += 1;
        outcome = session.outcome();
        for event in session.drain_events() {
            *tally.entry(event_name(&event)).or_default() += 1;
            hasher.update(&serde_json::to_vec(&event)?);
        }
    }
    session.destroy();

    println!("seed:    {seed}");
    println!("outcome: {outcome:?} after {frames} frames");
    for (name, count) in &tally {
        println!("  {name:<22} {count}");
    }
    println!("digest:  {}", hasher.finalize().to_hex());
    Ok(())
}
