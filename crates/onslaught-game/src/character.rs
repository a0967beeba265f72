//! The player character.
//!
//! The character walks along the bottom of the arena, dashes sideways and
//! attacks by leaping up and back down. It is not pooled: one lives for the
//! whole session. Slimes and bonuses never touch it directly; they queue
//! [`ArenaCommand`](crate::arena::ArenaCommand)s that the session applies
//! through the health capability, and they read its state through the
//! [`CharacterView`] kept in the arena.

use std::time::Duration;

use onslaught_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::arena::{Animation, Arena, CharacterView, Vec2, WORLD};
use crate::GameEvent;

const FRAME_WIDTH: f32 = 90.0;
const FRAME_HEIGHT: f32 = 48.0;
const SCALE: f32 = 2.0;
const BODY_WIDTH: f32 = 27.0;
const BODY_HEIGHT: f32 = 30.0;

pub const START_X: f32 = WORLD.width / 2.0;
pub const START_Y: f32 = WORLD.height - BODY_HEIGHT * SCALE / 2.0 - WORLD.padding;

const WALK_SPEED: f32 = 250.0;
const DASH_SPEED: f32 = 400.0;
const ATTACK_SPEED: f32 = 500.0;
const DASH_DISTANCE: f32 = 127.0;
/// How far an attack carries the character up the arena.
pub const ATTACK_DISTANCE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    Idle,
    Walk,
    Dash,
    Attack,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackPhase {
    Rising,
    Falling,
}

fn travel_time(distance: f32) -> Duration {
    Duration::from_millis((distance / DASH_SPEED * 1000.0) as u64)
}

#[derive(Debug)]
pub struct Character {
    core: ActorCore<Arena>,
    mortal: MortalState,
    health: HealthState,
    collider: ColliderState<Character>,
    state: CharacterState,
    facing: Direction,
    input_enabled: bool,
    dash_timer: Option<TimerHandle>,
    attack_timer: Option<(AttackPhase, TimerHandle)>,
}

impl Character {
    /// Place the character at its start position with full health.
    pub fn new(arena: &mut Arena, max_health: u32) -> Self {
        let id = arena.enlist_actor();
        let body = arena.bodies_mut().insert_body(id, (FRAME_WIDTH, FRAME_HEIGHT), SCALE);
        body.position = Vec2::new(START_X, START_Y);
        body.collide_world_bounds = true;
        body.enabled = true;

        let mut character = Self {
            core: ActorCore::new(id),
            mortal: MortalState::new(),
            health: HealthState::new(),
            collider: ColliderState::new(),
            state: CharacterState::Idle,
            facing: Direction::Right,
            input_enabled: true,
            dash_timer: None,
            attack_timer: None,
        };
        character.setup_collider(arena, BODY_WIDTH, BODY_HEIGHT, false, false);
        character.set_max_health(max_health);
        character.idle(arena);
        character
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Whether walk, dash and attack requests are accepted.
    pub fn accepts_input(&self) -> bool {
        self.input_enabled && !self.is_dead()
    }

    pub fn view(&self, arena: &Arena) -> CharacterView {
        CharacterView {
            id: self.id(),
            state: self.state,
            dead: self.is_dead(),
            position: arena.position(self.id()),
        }
    }

    /// Publish the current snapshot for slimes and bonuses to read.
    pub fn refresh_view(&self, arena: &mut Arena) {
        let view = self.view(arena);
        arena.set_character_view(view);
    }

    // -- moves --------------------------------------------------------------

    pub fn walk(&mut self, arena: &mut Arena, direction: Direction) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.facing = direction;
        arena
            .bodies_mut()
            .set_velocity(self.id(), Vec2::new(direction.sign() * WALK_SPEED, 0.0));
        if self.state != CharacterState::Walk {
            arena.show_animation(self.id(), Animation::CharacterWalk);
        }
        self.enter(arena, CharacterState::Walk);
        true
    }

    /// Dash sideways; input stays locked until the dash ends.
    pub fn dash(&mut self, arena: &mut Arena, direction: Direction) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.input_enabled = false;
        self.facing = direction;
        arena.show_animation(self.id(), Animation::CharacterDash);
        arena
            .bodies_mut()
            .set_velocity(self.id(), Vec2::new(direction.sign() * DASH_SPEED, 0.0));
        self.cancel_dash(arena);
        self.dash_timer = Some(arena.timers().schedule_once(travel_time(DASH_DISTANCE)));
        self.enter(arena, CharacterState::Dash);
        true
    }

    /// Leap up and fall back to the start line; input stays locked until
    /// the character lands.
    pub fn attack(&mut self, arena: &mut Arena) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.input_enabled = false;
        arena.show_animation(self.id(), Animation::CharacterAttack);
        arena.bodies_mut().set_velocity(self.id(), Vec2::new(0.0, -ATTACK_SPEED));
        self.cancel_attack(arena);
        let handle = arena.timers().schedule_once(travel_time(ATTACK_DISTANCE));
        self.attack_timer = Some((AttackPhase::Rising, handle));
        self.enter(arena, CharacterState::Attack);
        true
    }

    /// Stand still and accept input again.
    pub fn idle(&mut self, arena: &mut Arena) {
        if self.is_dead() {
            return;
        }
        self.input_enabled = true;
        arena.show_animation(self.id(), Animation::CharacterIdle);
        arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
        self.enter(arena, CharacterState::Idle);
    }

    fn enter(&mut self, arena: &mut Arena, state: CharacterState) {
        if self.state != state {
            tracing::trace!(from = ?self.state, to = ?state, "character state changed");
        }
        self.state = state;
        self.refresh_view(arena);
    }

    fn cancel_dash(&mut self, arena: &mut Arena) {
        if let Some(handle) = self.dash_timer.take() {
            arena.timers().cancel(handle);
        }
    }

    fn cancel_attack(&mut self, arena: &mut Arena) {
        if let Some((_, handle)) = self.attack_timer.take() {
            arena.timers().cancel(handle);
        }
    }
}

impl Actor for Character {
    type Host = Arena;

    fn core(&self) -> &ActorCore<Arena> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActorCore<Arena> {
        &mut self.core
    }

    fn on_post_update(&mut self, arena: &mut Arena, _frame: Frame) -> ActorResult {
        self.refresh_view(arena);
        Ok(())
    }

    fn on_timer(&mut self, arena: &mut Arena, handle: TimerHandle) -> Result<bool, ActorError> {
        if self.dash_timer == Some(handle) {
            self.dash_timer = None;
            self.idle(arena);
            return Ok(true);
        }
        match self.attack_timer {
            Some((AttackPhase::Rising, pending)) if pending == handle => {
                arena.bodies_mut().set_velocity_y(self.id(), ATTACK_SPEED);
                let handle = arena.timers().schedule_once(travel_time(ATTACK_DISTANCE));
                self.attack_timer = Some((AttackPhase::Falling, handle));
                Ok(true)
            }
            Some((AttackPhase::Falling, pending)) if pending == handle => {
                self.attack_timer = None;
                let x = arena.position(self.id()).x;
                arena.bodies_mut().set_position(self.id(), Vec2::new(x, START_Y));
                self.idle(arena);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn on_destroy(&mut self, arena: &mut Arena) {
        self.cancel_dash(arena);
        self.cancel_attack(arena);
        self.destroy_all_collisions(arena);
    }
}

impl Mortal for Character {
    fn mortal(&self) -> &MortalState {
        &self.mortal
    }

    fn mortal_mut(&mut self) -> &mut MortalState {
        &mut self.mortal
    }

    fn on_death(&mut self, arena: &mut Arena) {
        arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
        self.input_enabled = false;
        self.cancel_dash(arena);
        self.cancel_attack(arena);
        arena.show_animation(self.id(), Animation::CharacterDie);
        tracing::info!("character died");
        self.enter(arena, CharacterState::Dead);
    }
}

impl WithHealth for Character {
    fn health_state(&self) -> &HealthState {
        &self.health
    }

    fn health_state_mut(&mut self) -> &mut HealthState {
        &mut self.health
    }

    fn on_taking_damage(&mut self, arena: &mut Arena, change: HealthChange) {
        if self.is_invulnerable() {
            if let Err(err) = self.set_invulnerability(arena, false) {
                tracing::error!(error = %err, "failed to drop the character's shield");
            }
            return;
        }
        if !change.changed {
            return;
        }
        let Vec2 { x, y } = arena.position(self.id());
        arena.publish(GameEvent::CharacterTookDamage {
            health: change.current,
            x,
            y,
        });
        if !self.is_alive() && !self.is_dead() {
            self.die(arena);
        }
    }

    fn on_healing(&mut self, _arena: &mut Arena, change: HealthChange) {
        if change.changed {
            tracing::debug!(health = change.current, "character healed");
        }
    }

    fn on_set_invulnerability(&mut self, _arena: &mut Arena, value: bool, changed: bool) {
        if changed {
            tracing::debug!(shielded = value, "character shield changed");
        }
    }
}

impl Collidable for Character {
    fn collider(&self) -> &ColliderState<Self> {
        &self.collider
    }

    fn collider_mut(&mut self) -> &mut ColliderState<Self> {
        &mut self.collider
    }

    fn frame_size(&self) -> (f32, f32) {
        (FRAME_WIDTH, FRAME_HEIGHT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
