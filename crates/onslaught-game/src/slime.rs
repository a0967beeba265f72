//! Slimes: the pooled enemies of every wave.
//!
//! One [`Slime`] type covers every kind. The kind picks the body shape, the
//! character states the slime can hurt, and the behavior script run while it
//! is *acting* (from activation until death or deactivation):
//!
//! | kind        | script                                                         |
//! |-------------|----------------------------------------------------------------|
//! | Jumping     | hops down every `jump_delay_ms`, vertical drag between hops     |
//! | Shooting    | walks down, stops after `shoot_delay_ms`, fires a projectile    |
//! | Projectile  | flies straight down or towards the character                  |
//! | Hiding      | inside its zone becomes immortal and intangible, then re-emerges |
//! | Hitting     | walks down to its attack line, stops and strikes once          |
//! | Duplicating | immortal; after `duplication_delay_ms` splits into two duplicants |
//! | Duplicant   | drifts sideways for a while, then walks down                  |
//! | SideMoving  | alternates walking down with sideways steps, turns at the walls |
//!
//! Every slime dies on contact with the character. It damages the character
//! once if the character is in a vulnerable state; otherwise the contact
//! counts as a kill (or a caught projectile). A striking hitting slime is
//! immortal and hurts the character in any state.

use std::time::Duration;

use onslaught_core::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::{Animation, Arena, ArenaCommand, Edges, Vec2, WORLD};
use crate::character::{CharacterState, ATTACK_DISTANCE, START_Y};
use crate::GameEvent;

/// Display frame shared by every slime sprite.
pub const FRAME_WIDTH: f32 = 80.0;
pub const FRAME_HEIGHT: f32 = 48.0;
pub const SCALE: f32 = 2.0;

const BODY_WIDTH: f32 = 26.0;
const BODY_HEIGHT: f32 = 22.0;
const PROJECTILE_BODY_SIZE: f32 = 9.0;
const DUPLICANT_BODY_SIZE: f32 = 20.0;
/// Extra downward collider offset for sprites drawn high in their frame.
const SPRITE_OFFSET_Y: f32 = 12.0;
/// Horizontal distance of each duplicant from its parent, unscaled.
const DUPLICANT_OFFSET_X: f32 = 13.0;
/// Vertical deceleration of a jumping slime between hops.
const JUMP_DRAG: f32 = 300.0;
/// Sheet frame at which a shooting slime releases its projectile.
const RELEASE_FRAME: u32 = 10;
/// Collider of a hitting slime while its blow is out, unscaled.
const STRIKE_BODY_WIDTH: f32 = 80.0;
const STRIKE_BODY_HEIGHT: f32 = 24.0;
/// The hit animation plays forward, holds on its last frame, then plays
/// back. The blow is out from `STRIKE_FRAME` on the way forward until
/// `RECOVER_FRAME` on the way back.
const STRIKE_FRAME: u32 = 8;
const HIT_LAST_FRAME: u32 = 11;
const RECOVER_FRAME: u32 = 6;
const HIT_HOLD: Duration = Duration::from_millis(100);
/// A side-moving slime closer than this to a wall only steps away from it.
const SIDE_STEP_PADDING: f32 = 50.0;

// ---------------------------------------------------------------------------
// Kinds and params
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlimeKind {
    Jumping,
    Shooting,
    Projectile,
    Hiding,
    Hitting,
    Duplicating,
    Duplicant,
    SideMoving,
}

impl SlimeKind {
    pub const ALL: [SlimeKind; 8] = [
        SlimeKind::Jumping,
        SlimeKind::Shooting,
        SlimeKind::Projectile,
        SlimeKind::Hiding,
        SlimeKind::Hitting,
        SlimeKind::Duplicating,
        SlimeKind::Duplicant,
        SlimeKind::SideMoving,
    ];

    /// Character states in which contact hurts the character.
    fn vulnerable_states(self) -> &'static [CharacterState] {
        match self {
            SlimeKind::Projectile => &[CharacterState::Idle, CharacterState::Walk, CharacterState::Attack],
            SlimeKind::Duplicating => &[],
            _ => &[CharacterState::Walk, CharacterState::Idle],
        }
    }

    fn death_animation(self) -> Option<Animation> {
        match self {
            SlimeKind::Jumping => Some(Animation::JumpingDie),
            SlimeKind::Shooting => Some(Animation::ShootingDie),
            SlimeKind::Hiding => Some(Animation::HidingDie),
            SlimeKind::Hitting => Some(Animation::HittingDie),
            SlimeKind::SideMoving => Some(Animation::SideMovingDie),
            SlimeKind::Projectile | SlimeKind::Duplicating | SlimeKind::Duplicant => None,
        }
    }
}

/// How a projectile picks its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aim {
    Forward,
    AtCharacter,
}

/// Initial drift of a duplicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    Down,
    Left,
    Right,
}

/// Vertical band in which a hiding slime goes under cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HidingZone {
    pub min_y: f32,
    pub max_y: f32,
}

/// Kind-specific spawn parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlimeBehavior {
    Jumping {
        jump_delay_ms: u64,
    },
    Shooting {
        shoot_delay_ms: u64,
    },
    /// `None` picks an aim at random on every activation.
    Projectile {
        aim: Option<Aim>,
    },
    Hiding {
        zone: HidingZone,
        speed_during_hiding: f32,
    },
    /// Stops to strike once its frame centre passes `attack_y_threshold`.
    Hitting {
        attack_y_threshold: f32,
    },
    Duplicating {
        duplication_delay_ms: u64,
    },
    /// Without a duration a sideways duplicant drifts until it hits a wall.
    Duplicant {
        heading: Heading,
        duration_ms: Option<u64>,
    },
    /// Walks down for a `side_step_delay`, then sideways for a
    /// `side_step_duration`, and again.
    SideMoving {
        side_step_delay: DelayRange,
        side_step_duration: DelayRange,
    },
}

impl SlimeBehavior {
    pub fn kind(&self) -> SlimeKind {
        match self {
            SlimeBehavior::Jumping { .. } => SlimeKind::Jumping,
            SlimeBehavior::Shooting { .. } => SlimeKind::Shooting,
            SlimeBehavior::Projectile { .. } => SlimeKind::Projectile,
            SlimeBehavior::Hiding { .. } => SlimeKind::Hiding,
            SlimeBehavior::Hitting { .. } => SlimeKind::Hitting,
            SlimeBehavior::Duplicating { .. } => SlimeKind::Duplicating,
            SlimeBehavior::Duplicant { .. } => SlimeKind::Duplicant,
            SlimeBehavior::SideMoving { .. } => SlimeKind::SideMoving,
        }
    }

    pub fn default_for(kind: SlimeKind) -> Self {
        match kind {
            SlimeKind::Jumping => SlimeBehavior::Jumping { jump_delay_ms: 1200 },
            SlimeKind::Shooting => SlimeBehavior::Shooting { shoot_delay_ms: 1000 },
            SlimeKind::Projectile => SlimeBehavior::Projectile { aim: None },
            SlimeKind::Hiding => SlimeBehavior::Hiding {
                zone: HidingZone {
                    min_y: WORLD.height / 4.0,
                    max_y: WORLD.height * 6.0 / 9.0,
                },
                speed_during_hiding: 120.0,
            },
            SlimeKind::Hitting => SlimeBehavior::Hitting {
                attack_y_threshold: START_Y - ATTACK_DISTANCE,
            },
            SlimeKind::Duplicating => SlimeBehavior::Duplicating {
                duplication_delay_ms: 1500,
            },
            SlimeKind::Duplicant => SlimeBehavior::Duplicant {
                heading: Heading::Down,
                duration_ms: None,
            },
            SlimeKind::SideMoving => SlimeBehavior::SideMoving {
                side_step_delay: DelayRange::new(1500, 2000),
                side_step_duration: DelayRange::new(500, 1000),
            },
        }
    }
}

/// Params a slime is re-seeded with on every spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimeParams {
    pub x: f32,
    pub y: f32,
    /// Movement speed in pixels per second.
    pub speed: f32,
    pub behavior: SlimeBehavior,
}

impl SlimeParams {
    /// Params at the spawn line with the kind's default behavior.
    pub fn new(kind: SlimeKind, x: f32, speed: f32) -> Self {
        Self {
            x,
            y: WORLD.spawn_start_y,
            speed,
            behavior: SlimeBehavior::default_for(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Slime
// ---------------------------------------------------------------------------

/// What the pending action timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Jump,
    Shoot,
    ReleaseProjectile,
    Duplicate,
    TurnDown,
    SideStep,
    Strike,
    Recover,
}

#[derive(Debug)]
pub struct Slime {
    core: ActorCore<Arena>,
    poolable: PoolableState,
    mortal: MortalState,
    collider: ColliderState<Slime>,
    kind: SlimeKind,
    params: SlimeParams,
    dealt_damage: bool,
    acting: bool,
    hiding: bool,
    /// A hitting slime strikes once per activation.
    attacked: bool,
    striking: bool,
    action: Option<(Action, TimerHandle)>,
    /// Completion timer of the one-shot animation being played.
    animation: Option<(Animation, TimerHandle)>,
}

impl Slime {
    /// Build an inactive slime of `kind` and register its contact with the
    /// character.
    pub fn new(kind: SlimeKind, arena: &mut Arena) -> Self {
        let id = arena.enlist_actor();
        let body = arena.bodies_mut().insert_body(id, (FRAME_WIDTH, FRAME_HEIGHT), SCALE);
        body.collide_world_bounds = kind != SlimeKind::Projectile;
        if kind == SlimeKind::Jumping {
            body.drag_y = JUMP_DRAG;
        }

        let mut slime = Self {
            core: ActorCore::inactive(id),
            poolable: PoolableState::new(),
            mortal: MortalState::new(),
            collider: ColliderState::new(),
            kind,
            params: SlimeParams::new(kind, 0.0, 0.0),
            dealt_damage: false,
            acting: false,
            hiding: false,
            attacked: false,
            striking: false,
            action: None,
            animation: None,
        };

        let mut shape = match kind {
            SlimeKind::Projectile => {
                slime.setup_collider(arena, PROJECTILE_BODY_SIZE, PROJECTILE_BODY_SIZE, true, false)
            }
            SlimeKind::Duplicant => slime.setup_collider(arena, DUPLICANT_BODY_SIZE, DUPLICANT_BODY_SIZE, false, true),
            SlimeKind::Duplicating | SlimeKind::Hitting | SlimeKind::SideMoving => {
                slime.setup_collider(arena, BODY_WIDTH, BODY_HEIGHT, false, true)
            }
            _ => slime.setup_collider(arena, BODY_WIDTH, BODY_HEIGHT, false, false),
        };
        if matches!(kind, SlimeKind::Jumping | SlimeKind::Hiding) {
            if let BodyShape::Rect { offset_y, .. } = &mut shape {
                *offset_y += SPRITE_OFFSET_Y;
            }
            arena.physics().set_body_shape(id, shape);
        }

        match arena.character() {
            Some(character) => {
                let registered = slime.add_collision(arena, character.id, |slime: &mut Slime, arena: &mut Arena, _| {
                    slime.touch_character(arena);
                    Ok(())
                });
                if let Err(err) = registered {
                    tracing::error!(slime = %id, error = %err, "failed to register character contact");
                }
            }
            None => tracing::warn!(slime = %id, ?kind, "no character in the arena, slime will never touch it"),
        }

        if kind == SlimeKind::Duplicating {
            slime.set_immortality(arena, true);
            slime.disable_collisions();
        }
        slime
    }

    pub fn kind(&self) -> SlimeKind {
        self.kind
    }

    pub fn params(&self) -> &SlimeParams {
        &self.params
    }

    pub fn is_acting(&self) -> bool {
        self.acting
    }

    pub fn is_hiding(&self) -> bool {
        self.hiding
    }

    pub fn has_dealt_damage(&self) -> bool {
        self.dealt_damage
    }

    pub fn is_striking(&self) -> bool {
        self.striking
    }

    /// Character states in which contact hurts the character right now.
    fn vulnerable_states(&self) -> &'static [CharacterState] {
        if self.striking {
            &[
                CharacterState::Idle,
                CharacterState::Walk,
                CharacterState::Attack,
                CharacterState::Dash,
            ]
        } else {
            self.kind.vulnerable_states()
        }
    }

    // -- contact ------------------------------------------------------------

    fn touch_character(&mut self, arena: &mut Arena) {
        let Some(character) = arena.character() else {
            return;
        };
        if self.is_dead() || !self.is_active() || character.dead {
            return;
        }

        if self.vulnerable_states().contains(&character.state) && !self.dealt_damage {
            self.dealt_damage = true;
            arena.command(ArenaCommand::DamageCharacter(1));
        } else {
            let Vec2 { x, y } = arena.position(self.id());
            match self.kind {
                SlimeKind::Projectile => {
                    if character.state == CharacterState::Dash {
                        arena.publish(GameEvent::ProjectileCaught { x, y });
                    }
                }
                kind => {
                    if matches!(character.state, CharacterState::Dash | CharacterState::Attack) {
                        arena.publish(GameEvent::SlimeKilled { kind, x, y });
                    }
                }
            }
        }
        self.die(arena);
    }

    // -- acting -------------------------------------------------------------

    fn start_acting(&mut self, arena: &mut Arena) {
        if self.acting {
            return;
        }
        self.acting = true;
        let id = self.id();
        let speed = self.params.speed;

        match self.params.behavior.clone() {
            SlimeBehavior::Jumping { .. } => self.jump(arena),
            SlimeBehavior::Shooting { shoot_delay_ms } => {
                self.play(arena, Animation::ShootingMoveDown);
                arena.bodies_mut().set_velocity_y(id, speed);
                self.schedule(arena, Action::Shoot, Duration::from_millis(shoot_delay_ms));
            }
            SlimeBehavior::Projectile { aim } => {
                arena.bodies_mut().set_velocity(id, Vec2::new(0.0, speed));
                self.play(arena, Animation::ProjectileFly);
                let aim = aim.unwrap_or_else(|| {
                    if arena.rng().gen_bool(0.5) {
                        Aim::Forward
                    } else {
                        Aim::AtCharacter
                    }
                });
                if let (Aim::AtCharacter, Some(character)) = (aim, arena.character()) {
                    let angle = arena.position(id).angle_to(character.position);
                    arena.bodies_mut().set_velocity(id, Vec2::from_angle(angle, speed));
                }
            }
            SlimeBehavior::Hiding { .. } | SlimeBehavior::Hitting { .. } | SlimeBehavior::SideMoving { .. } => {
                self.move_down(arena)
            }
            SlimeBehavior::Duplicating { duplication_delay_ms } => {
                self.play(arena, Animation::DuplicatingMoveDown);
                arena.bodies_mut().set_velocity_y(id, speed);
                self.schedule(arena, Action::Duplicate, Duration::from_millis(duplication_delay_ms));
            }
            SlimeBehavior::Duplicant { heading, duration_ms } => match heading {
                Heading::Down => self.move_down(arena),
                Heading::Left | Heading::Right => {
                    let vx = if heading == Heading::Left { -speed } else { speed };
                    arena.bodies_mut().set_velocity(id, Vec2::new(vx, 0.0));
                    self.play(arena, Animation::DuplicantMoveSideways);
                    if let Some(ms) = duration_ms {
                        self.schedule(arena, Action::TurnDown, Duration::from_millis(ms));
                    }
                }
            },
        }
    }

    /// Cancel every pending timer and stop moving.
    fn stop_acting(&mut self, arena: &mut Arena) {
        if !self.acting {
            return;
        }
        self.acting = false;
        self.cancel_action(arena);
        self.cancel_animation(arena);
        arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
    }

    fn perform(&mut self, action: Action, arena: &mut Arena) {
        let id = self.id();
        match action {
            Action::Jump => self.jump(arena),
            Action::Shoot => {
                arena.bodies_mut().set_velocity(id, Vec2::ZERO);
                self.play(arena, Animation::ShootingShoot);
                self.schedule(
                    arena,
                    Action::ReleaseProjectile,
                    Animation::ShootingShoot.time_to_frame(RELEASE_FRAME),
                );
            }
            Action::ReleaseProjectile => {
                let Vec2 { x, y } = arena.position(id);
                let speed = self.params.speed + arena.rng().gen_range(30..=60) as f32;
                arena.command(ArenaCommand::SpawnProjectile(SlimeParams {
                    x,
                    y,
                    speed,
                    behavior: SlimeBehavior::Projectile { aim: None },
                }));
            }
            Action::Duplicate => {
                arena.bodies_mut().set_velocity(id, Vec2::ZERO);
                self.play(arena, Animation::DuplicatingDuplicate);
            }
            Action::TurnDown => self.move_down(arena),
            Action::SideStep => self.side_step(arena),
            Action::Strike => {
                self.set_striking(arena, true);
                let hit = Animation::HittingHit;
                let last = hit.time_to_frame(HIT_LAST_FRAME);
                let back = last - hit.time_to_frame(RECOVER_FRAME);
                self.schedule(arena, Action::Recover, last - hit.time_to_frame(STRIKE_FRAME) + HIT_HOLD + back);
            }
            Action::Recover => {
                self.set_striking(arena, false);
                self.schedule(arena, Action::TurnDown, Animation::HittingHit.time_to_frame(RECOVER_FRAME));
            }
        }
    }

    fn on_animation_complete(&mut self, animation: Animation, arena: &mut Arena) {
        match animation {
            Animation::JumpingMoveDown => self.play(arena, Animation::JumpingIdle),
            Animation::ShootingShoot => {
                self.die(arena);
            }
            Animation::HidingHide | Animation::HidingUnhide => self.move_down(arena),
            Animation::DuplicatingDuplicate => {
                let duplicants = self.duplicant_params(arena);
                arena.command(ArenaCommand::SpawnDuplicants(duplicants));
                self.deactivate(arena);
            }
            Animation::JumpingDie
            | Animation::ShootingDie
            | Animation::HidingDie
            | Animation::HittingDie
            | Animation::SideMovingDie
            | Animation::DuplicantLeftDie
            | Animation::DuplicantRightDie => {
                self.deactivate(arena);
            }
            _ => {}
        }
    }

    fn jump(&mut self, arena: &mut Arena) {
        let SlimeBehavior::Jumping { jump_delay_ms } = self.params.behavior else {
            return;
        };
        arena.bodies_mut().set_velocity_y(self.id(), self.params.speed);
        self.play(arena, Animation::JumpingMoveDown);
        self.schedule(arena, Action::Jump, Duration::from_millis(jump_delay_ms));
    }

    /// Walk straight down at the speed and with the look of the current
    /// state.
    fn move_down(&mut self, arena: &mut Arena) {
        let (speed, animation) = match self.params.behavior {
            SlimeBehavior::Hiding {
                speed_during_hiding, ..
            } if self.hiding => (speed_during_hiding, Animation::HidingMoveDownHidden),
            SlimeBehavior::Hiding { .. } => (self.params.speed, Animation::HidingMoveDown),
            SlimeBehavior::Hitting { .. } => (self.params.speed, Animation::HittingMoveDown),
            SlimeBehavior::SideMoving { .. } => (self.params.speed, Animation::SideMovingMoveDown),
            SlimeBehavior::Duplicant {
                heading: Heading::Right,
                ..
            } => (self.params.speed, Animation::DuplicantRightMoveDown),
            SlimeBehavior::Duplicant { .. } => (self.params.speed, Animation::DuplicantLeftMoveDown),
            _ => (self.params.speed, Animation::DuplicatingMoveDown),
        };
        self.cancel_action(arena);
        arena.bodies_mut().set_velocity(self.id(), Vec2::new(0.0, speed));
        self.play(arena, animation);
        if let SlimeBehavior::SideMoving { side_step_delay, .. } = self.params.behavior {
            let delay = side_step_delay.sample(arena.rng());
            self.schedule(arena, Action::SideStep, delay);
        }
    }

    /// Step sideways, away from a near wall or else either way, then turn
    /// back down after a `side_step_duration`.
    fn side_step(&mut self, arena: &mut Arena) {
        let SlimeBehavior::SideMoving { side_step_duration, .. } = self.params.behavior else {
            return;
        };
        let id = self.id();
        let x = arena.position(id).x;
        let right = match (x >= SIDE_STEP_PADDING, x <= WORLD.width - SIDE_STEP_PADDING) {
            (false, true) => true,
            (true, false) => false,
            _ => arena.rng().gen_bool(0.5),
        };
        let speed = self.params.speed;
        arena.bodies_mut().set_velocity(id, Vec2::new(if right { speed } else { -speed }, 0.0));
        self.play(arena, Animation::SideMovingMoveSideways);
        let duration = side_step_duration.sample(arena.rng());
        self.schedule(arena, Action::TurnDown, duration);
    }

    fn update_hitting(&mut self, arena: &mut Arena) {
        let SlimeBehavior::Hitting { attack_y_threshold } = self.params.behavior else {
            return;
        };
        if !self.acting || self.attacked || self.is_dead() {
            return;
        }
        let id = self.id();
        if arena.position(id).y <= attack_y_threshold + FRAME_HEIGHT / 2.0 {
            return;
        }
        self.attacked = true;
        arena.bodies_mut().set_velocity(id, Vec2::ZERO);
        // The hit's phases run on action timers, not on its completion.
        self.cancel_animation(arena);
        arena.show_animation(id, Animation::HittingHit);
        self.schedule(arena, Action::Strike, Animation::HittingHit.time_to_frame(STRIKE_FRAME));
    }

    /// Swap between the wide, immortal striking body and the normal one.
    fn set_striking(&mut self, arena: &mut Arena, striking: bool) {
        self.striking = striking;
        let (width, height) = if striking {
            (STRIKE_BODY_WIDTH, STRIKE_BODY_HEIGHT)
        } else {
            (BODY_WIDTH, BODY_HEIGHT)
        };
        self.setup_collider(arena, width, height, false, true);
        self.set_immortality(arena, striking);
        if let Some(body) = arena.bodies_mut().body_mut(self.id()) {
            body.collide_world_bounds = !striking;
        }
    }

    fn update_hiding(&mut self, arena: &mut Arena) {
        let SlimeBehavior::Hiding { zone, .. } = self.params.behavior else {
            return;
        };
        if !self.acting {
            return;
        }
        let half_height = FRAME_HEIGHT / 2.0;
        let y = arena.position(self.id()).y;
        let in_zone = y > zone.min_y + half_height && y < zone.max_y + half_height;

        if !self.hiding && in_zone {
            self.hiding = true;
            arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
            self.play(arena, Animation::HidingHide);
            self.set_immortality(arena, true);
            self.disable_collisions();
        } else if self.hiding && y > zone.max_y + half_height {
            self.hiding = false;
            arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
            self.set_immortality(arena, false);
            self.enable_collisions();
            self.play(arena, Animation::HidingUnhide);
        }
    }

    fn duplicant_params(&self, arena: &mut Arena) -> Vec<SlimeParams> {
        let Vec2 { x, y } = arena.position(self.id());
        [(Heading::Left, -1.0), (Heading::Right, 1.0)]
            .into_iter()
            .map(|(heading, side)| {
                let duration = arena.rng().gen_range(500..=800);
                let slowdown = arena.rng().gen_range(-80..=-30) as f32;
                SlimeParams {
                    x: x + side * DUPLICANT_OFFSET_X * SCALE,
                    y,
                    speed: self.params.speed + slowdown,
                    behavior: SlimeBehavior::Duplicant {
                        heading,
                        duration_ms: Some(duration),
                    },
                }
            })
            .collect()
    }

    // -- timers -------------------------------------------------------------

    fn play(&mut self, arena: &mut Arena, animation: Animation) {
        self.cancel_animation(arena);
        self.animation = arena.play_animation(self.id(), animation).map(|handle| (animation, handle));
    }

    fn schedule(&mut self, arena: &mut Arena, action: Action, delay: Duration) {
        self.cancel_action(arena);
        self.action = Some((action, arena.timers().schedule_once(delay)));
    }

    fn cancel_action(&mut self, arena: &mut Arena) {
        if let Some((_, handle)) = self.action.take() {
            arena.timers().cancel(handle);
        }
    }

    fn cancel_animation(&mut self, arena: &mut Arena) {
        if let Some((_, handle)) = self.animation.take() {
            arena.timers().cancel(handle);
        }
    }
}

impl Actor for Slime {
    type Host = Arena;

    fn core(&self) -> &ActorCore<Arena> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActorCore<Arena> {
        &mut self.core
    }

    fn on_update(&mut self, arena: &mut Arena, _frame: Frame) -> ActorResult {
        let id = self.id();
        if self.kind == SlimeKind::Projectile {
            if arena.is_out_of_bounds(id, Edges::BOTTOM_AND_SIDES) {
                self.deactivate(arena);
            }
            return Ok(());
        }

        if arena.is_out_of_bounds(id, Edges::BOTTOM) {
            let x = arena.position(id).x;
            arena.publish(GameEvent::SlimePassed {
                kind: self.kind,
                x,
                y: WORLD.height - FRAME_HEIGHT,
            });
            self.deactivate(arena);
            return Ok(());
        }

        match self.kind {
            SlimeKind::Hiding => self.update_hiding(arena),
            SlimeKind::Hitting => self.update_hitting(arena),
            SlimeKind::Duplicant | SlimeKind::SideMoving if self.acting && !self.is_dead() && arena.bodies().is_blocked_sideways(id) => {
                self.move_down(arena);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_timer(&mut self, arena: &mut Arena, handle: TimerHandle) -> Result<bool, ActorError> {
        if let Some((action, pending)) = self.action {
            if pending == handle {
                self.action = None;
                self.perform(action, arena);
                return Ok(true);
            }
        }
        if let Some((animation, pending)) = self.animation {
            if pending == handle {
                self.animation = None;
                self.on_animation_complete(animation, arena);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn on_overlap(&mut self, arena: &mut Arena, other: ActorId) -> ActorResult {
        self.dispatch_overlap(arena, other)
    }

    fn on_destroy(&mut self, arena: &mut Arena) {
        self.stop_acting(arena);
        self.cancel_animation(arena);
        self.destroy_all_collisions(arena);
        arena.stop_animation(self.id());
    }
}

impl Poolable for Slime {
    type Params = SlimeParams;

    fn poolable(&self) -> &PoolableState {
        &self.poolable
    }

    fn poolable_mut(&mut self) -> &mut PoolableState {
        &mut self.poolable
    }

    fn reset(&mut self, params: Option<SlimeParams>, arena: &mut Arena) {
        self.cancel_action(arena);
        self.cancel_animation(arena);
        if let Some(params) = params {
            if params.behavior.kind() == self.kind {
                self.params = params;
            } else {
                tracing::warn!(
                    slime = %self.id(),
                    kind = ?self.kind,
                    got = ?params.behavior.kind(),
                    "behavior does not match slime kind, keeping the previous one"
                );
                self.params.x = params.x;
                self.params.y = params.y;
                self.params.speed = params.speed;
            }
        }
        self.dealt_damage = false;
        if self.kind == SlimeKind::Hiding {
            self.hiding = false;
            self.set_immortality(arena, false);
            self.enable_collisions();
        }
        if self.kind == SlimeKind::Hitting {
            self.attacked = false;
            if self.striking {
                self.set_striking(arena, false);
            }
        }
        self.resurrect(arena);

        let id = self.id();
        arena.bodies_mut().set_position(id, Vec2::new(self.params.x, self.params.y));
        arena.bodies_mut().set_velocity(id, Vec2::ZERO);
    }

    fn pre_activate(&mut self, arena: &mut Arena) {
        self.start_acting(arena);
    }

    fn pre_deactivate(&mut self, arena: &mut Arena) {
        self.stop_acting(arena);
        self.cancel_animation(arena);
        arena.stop_animation(self.id());
    }
}

impl Mortal for Slime {
    fn mortal(&self) -> &MortalState {
        &self.mortal
    }

    fn mortal_mut(&mut self) -> &mut MortalState {
        &mut self.mortal
    }

    fn on_death(&mut self, arena: &mut Arena) {
        self.stop_acting(arena);
        let animation = match (self.kind, &self.params.behavior) {
            (
                SlimeKind::Duplicant,
                SlimeBehavior::Duplicant {
                    heading: Heading::Right,
                    ..
                },
            ) => Some(Animation::DuplicantRightDie),
            (SlimeKind::Duplicant, _) => Some(Animation::DuplicantLeftDie),
            (kind, _) => kind.death_animation(),
        };
        match animation {
            Some(animation) => self.play(arena, animation),
            None => {
                self.deactivate(arena);
            }
        }
    }
}

impl Collidable for Slime {
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
