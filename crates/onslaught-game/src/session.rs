//! A playable game session.
//!
//! [`GameSession`] wires the arena, the character, the slime waves, the bonus
//! spawners and the auxiliary projectile and duplicant pools together and
//! drives them with a [`FrameLoop`].
//!
//! Every dispatch phase (a fired timer, the update pass, the post-update
//! pass) ends the same way: queued [`ArenaCommand`]s are applied, the
//! character snapshot is refreshed, and wave, victory and game-over
//! bookkeeping runs. Actors therefore never touch each other directly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use onslaught_core::prelude::*;
use rand::RngCore;

use crate::arena::{Arena, ArenaCommand};
use crate::bonus::{Bonus, BonusKind, BonusParams};
use crate::character::{Character, CharacterState};
use crate::config::SessionConfig;
use crate::frame::{FrameHandler, FrameLoop};
use crate::slime::{Slime, SlimeKind, SlimeParams};
use crate::waves::slime_waves;
use crate::{ConfigError, GameEvent};

/// How a session ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    /// Every slime wave completed.
    Victory,
    /// The character died.
    Defeat,
}

// ---------------------------------------------------------------------------
// Battle
// ---------------------------------------------------------------------------

/// Everything the frame loop drives.
struct Battle {
    arena: Arena,
    character: Character,
    waves: WaveManager<SlimeKind, Slime>,
    bonuses: SpawnerManager<BonusKind, Bonus>,
    projectiles: EntityPool<Slime>,
    duplicants: EntityPool<Slime>,
    /// Unpooled sub-actors spawned while their pool was exhausted.
    strays: Vec<Slime>,
    game_over_delay: Duration,
    game_over_timer: Option<TimerHandle>,
    completed_waves: Rc<RefCell<Vec<usize>>>,
    all_waves_completed: Rc<Cell<bool>>,
    outcome: Outcome,
}

impl Battle {
    fn start(&mut self) {
        self.bonuses.start(None, &mut self.arena);
        self.waves.start(&mut self.arena);
        self.finish_phase();
    }

    /// Apply queued commands and run the end-of-phase bookkeeping.
    fn finish_phase(&mut self) {
        loop {
            let commands = self.arena.take_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                self.apply(command);
            }
        }
        self.character.refresh_view(&mut self.arena);
        self.retire_strays();

        for index in self.completed_waves.borrow_mut().drain(..) {
            self.arena.publish(GameEvent::WaveComplete { index });
        }
        if self.outcome != Outcome::InProgress {
            return;
        }
        if self.character.is_dead() {
            if self.game_over_timer.is_none() {
                tracing::debug!(delay_ms = self.game_over_delay.as_millis() as u64, "game over scheduled");
                self.game_over_timer = Some(self.arena.timers().schedule_once(self.game_over_delay));
            }
        } else if self.all_waves_completed.get() {
            self.bonuses.stop(|| {}, None, &mut self.arena);
            self.arena.publish(GameEvent::Victory);
            self.outcome = Outcome::Victory;
            tracing::info!("all slime waves cleared");
        }
    }

    fn apply(&mut self, command: ArenaCommand) {
        let arena = &mut self.arena;
        let result = match command {
            ArenaCommand::DamageCharacter(amount) => self.character.take_damage(arena, amount).map(|_| ()),
            ArenaCommand::HealCharacter(amount) => self.character.heal(arena, amount).map(|_| ()),
            ArenaCommand::ShieldCharacter => self.character.set_invulnerability(arena, true),
            ArenaCommand::SpawnProjectile(params) => {
                spawn_sub_actor(&mut self.projectiles, &mut self.strays, params, arena);
                Ok(())
            }
            ArenaCommand::SpawnDuplicants(all) => {
                for params in all {
                    spawn_sub_actor(&mut self.duplicants, &mut self.strays, params, arena);
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "failed to apply arena command");
        }
    }

    /// Strays are discarded once they deactivate.
    fn retire_strays(&mut self) {
        let arena = &mut self.arena;
        self.strays.retain_mut(|stray| {
            if stray.is_active() && !stray.is_destroyed() {
                return true;
            }
            stray.safe_destroy(arena);
            false
        });
    }

    fn route_overlap(&mut self, actor: ActorId, other: ActorId) {
        let arena = &mut self.arena;
        if actor == self.character.id() {
            self.character.handle_overlap(arena, other);
            return;
        }
        if self.waves.handle_overlap(actor, other, arena)
            || self.bonuses.handle_overlap(actor, other, arena)
            || self.projectiles.handle_overlap(actor, other, arena)
            || self.duplicants.handle_overlap(actor, other, arena)
        {
            return;
        }
        if let Some(stray) = self.strays.iter_mut().find(|stray| stray.id() == actor) {
            stray.handle_overlap(arena, other);
        }
    }

    fn game_over(&mut self) {
        self.arena.change_state(GameState::GameOver);
        self.arena.publish(GameEvent::GameOver);
        self.outcome = Outcome::Defeat;
        tracing::info!("game over");
    }

    fn destroy(&mut self) {
        let arena = &mut self.arena;
        if let Some(handle) = self.game_over_timer.take() {
            arena.timers().cancel(handle);
        }
        self.waves.destroy(arena);
        self.bonuses.destroy(None, arena);
        self.projectiles.destroy(arena);
        self.duplicants.destroy(arena);
        for stray in &mut self.strays {
            stray.safe_destroy(arena);
        }
        self.strays.clear();
        self.character.safe_destroy(arena);
    }
}

/// Take a member from `pool`, or build a stray when the pool is exhausted.
fn spawn_sub_actor(pool: &mut EntityPool<Slime>, strays: &mut Vec<Slime>, params: SlimeParams, arena: &mut Arena) {
    if let Some(id) = pool.get() {
        if let Err(err) = pool.spawn(id, params, arena) {
            tracing::error!(pool = pool.label(), error = %err, "failed to spawn pooled slime");
        }
        return;
    }
    let kind = params.behavior.kind();
    tracing::warn!(pool = pool.label(), ?kind, "pool exhausted, spawning an unpooled slime");
    let mut stray = Slime::new(kind, arena);
    stray.reset(Some(params), arena);
    if stray.activate(arena) {
        strays.push(stray);
    } else {
        stray.safe_destroy(arena);
    }
}

impl FrameHandler for Battle {
    fn timer_queue(&mut self) -> &mut TimerQueue {
        self.arena.timer_queue()
    }

    fn on_timer(&mut self, handle: TimerHandle) {
        if self.game_over_timer == Some(handle) {
            self.game_over_timer = None;
            self.game_over();
            return;
        }
        let arena = &mut self.arena;
        let claimed = self.character.handle_timer(arena, handle)
            || self.waves.handle_timer(handle, arena)
            || self.bonuses.handle_timer(handle, arena)
            || self.projectiles.handle_timer(handle, arena)
            || self.duplicants.handle_timer(handle, arena)
            || self.strays.iter_mut().any(|stray| stray.handle_timer(arena, handle));
        if !claimed {
            tracing::trace!(timer = handle.to_raw(), "timer claimed by nobody");
        }
        self.finish_phase();
    }

    fn update(&mut self, frame: Frame) {
        if self.arena.game_state() != GameState::Playing {
            return;
        }
        let arena = &mut self.arena;
        self.waves.update(arena, frame);
        self.bonuses.update(arena, frame);
        self.projectiles.update(arena, frame);
        self.duplicants.update(arena, frame);
        for stray in &mut self.strays {
            stray.update(arena, frame);
        }
        self.character.update(arena, frame);

        let overlaps = self.arena.bodies_mut().step(frame.delta);
        for (actor, other) in overlaps {
            self.route_overlap(actor, other);
        }
        self.finish_phase();
    }

    fn post_update(&mut self, frame: Frame) {
        if self.arena.game_state() != GameState::Playing {
            return;
        }
        let arena = &mut self.arena;
        self.waves.post_update(arena, frame);
        self.bonuses.post_update(arena, frame);
        self.projectiles.post_update(arena, frame);
        self.duplicants.post_update(arena, frame);
        for stray in &mut self.strays {
            stray.post_update(arena, frame);
        }
        self.character.post_update(arena, frame);
        self.finish_phase();
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One run of the game from the first wave to victory or defeat.
pub struct GameSession {
    frames: FrameLoop,
    battle: Battle,
    started: bool,
}

impl GameSession {
    /// A session running the standard slime waves.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_waves(config, slime_waves())
    }

    /// A session running a custom wave script.
    pub fn with_waves(config: SessionConfig, waves: Vec<Wave<SlimeKind, SlimeParams>>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut arena = Arena::new(config.seed);

        // Slimes and bonuses read the character snapshot when built.
        let character = Character::new(&mut arena, config.character_max_health);

        let slimes = SpawnerManager::new(|kind, arena: &mut Arena| Slime::new(kind, arena));
        let mut waves = WaveManager::new(slimes, waves, Duration::from_millis(config.wave_change_delay_ms));
        let completed_waves = Rc::new(RefCell::new(Vec::new()));
        let all_waves_completed = Rc::new(Cell::new(false));
        {
            let completed = Rc::clone(&completed_waves);
            waves.on_wave_complete(move |index| completed.borrow_mut().push(index));
            let done = Rc::clone(&all_waves_completed);
            waves.on_all_waves_complete(move || done.set(true));
        }

        let mut bonuses = SpawnerManager::new(|kind, arena: &mut Arena| Bonus::new(kind, arena));
        let bonus_configs = config.bonuses.clone();
        bonuses.register_types(
            &BonusKind::ALL,
            |_| -> ParamsCreator<BonusParams> { Box::new(|rng: &mut dyn RngCore| BonusParams::roll(rng)) },
            |kind| match kind {
                BonusKind::Heal => bonus_configs.heal.clone(),
                BonusKind::Defense => bonus_configs.defense.clone(),
            },
            false,
            &mut arena,
        );

        let projectiles = EntityPool::new(
            "projectiles",
            Box::new(|arena: &mut Arena| Slime::new(SlimeKind::Projectile, arena)),
            config.projectile_pool_size,
            &mut arena,
        );
        let duplicants = EntityPool::new(
            "duplicants",
            Box::new(|arena: &mut Arena| Slime::new(SlimeKind::Duplicant, arena)),
            config.duplicant_pool_size,
            &mut arena,
        );

        Ok(Self {
            frames: FrameLoop::new(config.frame_config()),
            battle: Battle {
                arena,
                character,
                waves,
                bonuses,
                projectiles,
                duplicants,
                strays: Vec::new(),
                game_over_delay: Duration::from_millis(config.game_over_delay_ms),
                game_over_timer: None,
                completed_waves,
                all_waves_completed,
                outcome: Outcome::InProgress,
            },
            started: false,
        })
    }

    /// Start the bonus spawners and the first wave. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        tracing::info!(waves = self.battle.waves.wave_count(), "session started");
        self.battle.start();
    }

    /// Run one frame. Returns the number of timers dispatched.
    pub fn step(&mut self) -> usize {
        self.frames.step(&mut self.battle)
    }

    /// Run up to `count` frames, stopping early once the outcome is decided.
    pub fn run_frames(&mut self, count: u64) -> Outcome {
        for _ in 0..count {
            if self.battle.outcome != Outcome::InProgress {
                break;
            }
            self.step();
        }
        self.battle.outcome
    }

    /// Freeze the game. A walking character stops first.
    pub fn pause(&mut self) -> bool {
        let battle = &mut self.battle;
        if battle.character.state() == CharacterState::Walk {
            battle.character.idle(&mut battle.arena);
        }
        battle.arena.change_state(GameState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        if self.battle.arena.game_state() != GameState::Paused {
            return false;
        }
        self.battle.arena.change_state(GameState::Playing)
    }

    /// Tear every actor down and cancel every timer.
    pub fn destroy(&mut self) {
        self.battle.destroy();
    }

    // -- accessors ----------------------------------------------------------

    pub fn outcome(&self) -> Outcome {
        self.battle.outcome
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.battle.arena.drain_events()
    }

    pub fn arena(&self) -> &Arena {
        &self.battle.arena
    }

    pub fn character(&self) -> &Character {
        &self.battle.character
    }

    /// The character with the arena it acts in, for driving input.
    /// Queued effects are applied on the next dispatch phase.
    pub fn character_mut(&mut self) -> (&mut Character, &mut Arena) {
        (&mut self.battle.character, &mut self.battle.arena)
    }

    pub fn waves(&self) -> &WaveManager<SlimeKind, Slime> {
        &self.battle.waves
    }

    pub fn bonuses(&self) -> &SpawnerManager<BonusKind, Bonus> {
        &self.battle.bonuses
    }

    pub fn projectiles(&self) -> &EntityPool<Slime> {
        &self.battle.projectiles
    }

    pub fn duplicants(&self) -> &EntityPool<Slime> {
        &self.battle.duplicants
    }

    pub fn stray_count(&self) -> usize {
        self.battle.strays.len()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frames
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
