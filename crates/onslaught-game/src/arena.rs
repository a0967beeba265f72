//! The arena: the game's [`Host`] implementation.
//!
//! An [`Arena`] bundles every collaborator the actors and the core reach
//! through the host:
//!
//! - a [`TimerQueue`] whose clock follows the [`GameStateManager`],
//! - a seeded [`Pcg64`] generator,
//! - [`ArenaPhysics`], a minimal kinematic world: bodies with a position,
//!   a velocity, optional vertical drag and a rectangular or circular shape,
//!   integrated once per frame and tested for the registered overlaps,
//! - the session [`EventBus`] of [`GameEvent`]s,
//! - a FIFO of [`ArenaCommand`]s for effects that cross actor boundaries
//!   (hurting the character, spawning projectiles). Actors queue them and
//!   the session applies them between dispatch phases,
//! - a [`CharacterView`] snapshot actors read instead of holding the
//!   character,
//! - an animation stand-in: [`Arena::play_animation`] records what an actor
//!   shows and schedules a timer for when a one-shot animation would end.
//!
//! Coordinates are pixels with the origin at the top-left corner of the
//! arena and `y` growing downwards. A body's position is the centre of its
//! actor's display frame.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use onslaught_core::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::character::CharacterState;
use crate::slime::SlimeParams;
use crate::state::GameStateManager;
use crate::GameEvent;

// ---------------------------------------------------------------------------
// World geometry
// ---------------------------------------------------------------------------

/// Fixed arena geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
    /// Gap kept between the character and the bottom edge.
    pub padding: f32,
    /// Number of vertical lanes spawns are aligned to.
    pub band_count: u32,
    /// Spawn height, just above the visible area.
    pub spawn_start_y: f32,
}

/// The arena every session plays in.
pub const WORLD: WorldBounds = WorldBounds {
    width: 318.0,
    height: 500.0,
    padding: 20.0,
    band_count: 5,
    spawn_start_y: -40.0,
};

impl WorldBounds {
    pub fn band_width(&self) -> f32 {
        self.width / self.band_count as f32
    }

    /// Horizontal centre of spawn lane `band`.
    pub fn band_center(&self, band: u32) -> f32 {
        band as f32 * self.band_width() + self.band_width() / 2.0
    }
}

/// Which arena edges [`Arena::is_out_of_bounds`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Edges {
    pub const BOTTOM: Edges = Edges {
        left: false,
        right: false,
        top: false,
        bottom: true,
    };

    pub const BOTTOM_AND_SIDES: Edges = Edges {
        left: true,
        right: true,
        top: false,
        bottom: true,
    };
}

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// 2D vector in arena pixels (or pixels per second for velocities).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Angle of the vector from `self` to `target`, in radians.
    pub fn angle_to(self, target: Vec2) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    pub fn from_angle(angle: f32, length: f32) -> Self {
        Self::new(angle.cos() * length, angle.sin() * length)
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// One kinematic body owned by [`ArenaPhysics`].
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Centre of the display frame.
    pub position: Vec2,
    pub velocity: Vec2,
    /// Unscaled display frame size; shape offsets are relative to its
    /// top-left corner.
    pub frame: (f32, f32),
    /// Display scale applied to the frame and the shape.
    pub scale: f32,
    pub shape: Option<BodyShape>,
    pub enabled: bool,
    /// Vertical deceleration in pixels per second squared.
    pub drag_y: f32,
    /// Keep the body inside the left and right arena edges.
    pub collide_world_bounds: bool,
    pub blocked_left: bool,
    pub blocked_right: bool,
}

impl Body {
    pub fn new(frame: (f32, f32), scale: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            frame,
            scale,
            shape: None,
            enabled: false,
            drag_y: 0.0,
            collide_world_bounds: false,
            blocked_left: false,
            blocked_right: false,
        }
    }

    /// World-space extent of the shape, if one is set.
    fn extent(&self) -> Option<Extent> {
        let origin_x = self.position.x - self.frame.0 * self.scale / 2.0;
        let origin_y = self.position.y - self.frame.1 * self.scale / 2.0;
        match self.shape? {
            BodyShape::Rect {
                width,
                height,
                offset_x,
                offset_y,
            } => {
                let left = origin_x + offset_x * self.scale;
                let top = origin_y + offset_y * self.scale;
                Some(Extent::Rect {
                    left,
                    top,
                    right: left + width * self.scale,
                    bottom: top + height * self.scale,
                })
            }
            BodyShape::Circle {
                radius,
                offset_x,
                offset_y,
            } => Some(Extent::Circle {
                cx: origin_x + (offset_x + radius) * self.scale,
                cy: origin_y + (offset_y + radius) * self.scale,
                r: radius * self.scale,
            }),
        }
    }

    fn horizontal_span(&self) -> Option<(f32, f32)> {
        match self.extent()? {
            Extent::Rect { left, right, .. } => Some((left, right)),
            Extent::Circle { cx, r, .. } => Some((cx - r, cx + r)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Extent {
    Rect { left: f32, top: f32, right: f32, bottom: f32 },
    Circle { cx: f32, cy: f32, r: f32 },
}

impl Extent {
    fn intersects(self, other: Extent) -> bool {
        match (self, other) {
            (
                Extent::Rect { left, top, right, bottom },
                Extent::Rect {
                    left: l2,
                    top: t2,
                    right: r2,
                    bottom: b2,
                },
            ) => left < r2 && right > l2 && top < b2 && bottom > t2,
            (Extent::Circle { cx, cy, r }, Extent::Circle { cx: x2, cy: y2, r: r2 }) => {
                let (dx, dy) = (cx - x2, cy - y2);
                dx * dx + dy * dy < (r + r2) * (r + r2)
            }
            (Extent::Circle { cx, cy, r }, Extent::Rect { left, top, right, bottom })
            | (Extent::Rect { left, top, right, bottom }, Extent::Circle { cx, cy, r }) => {
                let dx = cx - cx.clamp(left, right);
                let dy = cy - cy.clamp(top, bottom);
                dx * dx + dy * dy < r * r
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ArenaPhysics
// ---------------------------------------------------------------------------

/// Minimal kinematic physics: integration, side walls and overlap tests.
#[derive(Debug, Default)]
pub struct ArenaPhysics {
    bodies: BTreeMap<ActorId, Body>,
    overlaps: BTreeMap<CollisionHandle, (ActorId, ActorId)>,
    next_handle: u64,
}

impl ArenaPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a disabled body for `actor`.
    pub fn insert_body(&mut self, actor: ActorId, frame: (f32, f32), scale: f32) -> &mut Body {
        let body = self.bodies.entry(actor).or_insert_with(|| Body::new(frame, scale));
        *body = Body::new(frame, scale);
        body
    }

    pub fn body(&self, actor: ActorId) -> Option<&Body> {
        self.bodies.get(&actor)
    }

    pub fn body_mut(&mut self, actor: ActorId) -> Option<&mut Body> {
        self.bodies.get_mut(&actor)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn overlap_count(&self) -> usize {
        self.overlaps.len()
    }

    /// Position of `actor`, or the origin if it has no body.
    pub fn position(&self, actor: ActorId) -> Vec2 {
        self.bodies.get(&actor).map(|b| b.position).unwrap_or_default()
    }

    pub fn velocity(&self, actor: ActorId) -> Vec2 {
        self.bodies.get(&actor).map(|b| b.velocity).unwrap_or_default()
    }

    pub fn set_position(&mut self, actor: ActorId, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&actor) {
            body.position = position;
        }
    }

    pub fn set_velocity(&mut self, actor: ActorId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&actor) {
            body.velocity = velocity;
        }
    }

    pub fn set_velocity_x(&mut self, actor: ActorId, vx: f32) {
        if let Some(body) = self.bodies.get_mut(&actor) {
            body.velocity.x = vx;
        }
    }

    pub fn set_velocity_y(&mut self, actor: ActorId, vy: f32) {
        if let Some(body) = self.bodies.get_mut(&actor) {
            body.velocity.y = vy;
        }
    }

    /// Whether a side wall stopped `actor` during the last step.
    pub fn is_blocked_sideways(&self, actor: ActorId) -> bool {
        self.bodies
            .get(&actor)
            .map(|b| b.blocked_left || b.blocked_right)
            .unwrap_or(false)
    }

    /// Integrate every enabled body over `dt`, then report the registered
    /// overlaps as `(registrant, other)` pairs in registration order.
    pub fn step(&mut self, dt: Duration) -> Vec<(ActorId, ActorId)> {
        let secs = dt.as_secs_f32();
        for body in self.bodies.values_mut() {
            body.blocked_left = false;
            body.blocked_right = false;
            if !body.enabled {
                continue;
            }
            body.position.x += body.velocity.x * secs;
            body.position.y += body.velocity.y * secs;
            if body.drag_y > 0.0 && body.velocity.y != 0.0 {
                let slowed = (body.velocity.y.abs() - body.drag_y * secs).max(0.0);
                body.velocity.y = slowed.copysign(body.velocity.y);
            }
            if body.collide_world_bounds {
                Self::clamp_to_walls(body);
            }
        }

        self.overlaps
            .values()
            .filter(|(a, b)| self.touching(*a, *b))
            .copied()
            .collect()
    }

    fn clamp_to_walls(body: &mut Body) {
        let Some((left, right)) = body.horizontal_span() else {
            return;
        };
        if left < 0.0 {
            body.position.x -= left;
            body.velocity.x = 0.0;
            body.blocked_left = true;
        } else if right > WORLD.width {
            body.position.x -= right - WORLD.width;
            body.velocity.x = 0.0;
            body.blocked_right = true;
        }
    }

    fn touching(&self, a: ActorId, b: ActorId) -> bool {
        let extent = |id: ActorId| {
            self.bodies
                .get(&id)
                .filter(|body| body.enabled)
                .and_then(Body::extent)
        };
        match (extent(a), extent(b)) {
            (Some(ea), Some(eb)) => ea.intersects(eb),
            _ => false,
        }
    }
}

impl Physics for ArenaPhysics {
    fn set_body_enabled(&mut self, actor: ActorId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&actor) {
            body.enabled = enabled;
        }
    }

    fn set_body_shape(&mut self, actor: ActorId, shape: BodyShape) {
        self.bodies
            .entry(actor)
            .or_insert_with(|| Body::new((0.0, 0.0), 1.0))
            .shape = Some(shape);
    }

    fn add_overlap(&mut self, actor: ActorId, target: ActorId) -> CollisionHandle {
        let handle = CollisionHandle(self.next_handle);
        self.next_handle += 1;
        self.overlaps.insert(handle, (actor, target));
        handle
    }

    fn remove_overlap(&mut self, handle: CollisionHandle) {
        self.overlaps.remove(&handle);
    }

    fn remove_body(&mut self, actor: ActorId) {
        self.bodies.remove(&actor);
        self.overlaps.retain(|_, (a, b)| *a != actor && *b != actor);
    }
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// Every animation an actor can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    JumpingMoveDown,
    JumpingIdle,
    JumpingDie,
    ShootingMoveDown,
    ShootingShoot,
    ShootingDie,
    ProjectileFly,
    HidingMoveDown,
    HidingMoveDownHidden,
    HidingHide,
    HidingUnhide,
    HidingDie,
    HittingMoveDown,
    HittingHit,
    HittingDie,
    DuplicatingMoveDown,
    DuplicatingDuplicate,
    DuplicantMoveSideways,
    DuplicantRightMoveDown,
    DuplicantLeftMoveDown,
    DuplicantRightDie,
    DuplicantLeftDie,
    SideMovingMoveDown,
    SideMovingMoveSideways,
    SideMovingDie,
    HeartSpin,
    StarSpin,
    CharacterIdle,
    CharacterWalk,
    CharacterDash,
    CharacterAttack,
    CharacterDie,
}

impl Animation {
    /// `(frames, frames per second, loops)` from the sprite sheets.
    fn sheet(self) -> (u32, u32, bool) {
        use Animation::*;
        match self {
            JumpingMoveDown => (8, 10, false),
            JumpingIdle => (16, 10, true),
            JumpingDie => (5, 10, false),
            ShootingMoveDown => (4, 10, true),
            ShootingShoot => (16, 10, false),
            ShootingDie => (5, 10, false),
            ProjectileFly => (8, 15, true),
            HidingMoveDown | HidingMoveDownHidden => (4, 10, true),
            HidingHide | HidingUnhide => (13, 20, false),
            HidingDie => (4, 10, false),
            HittingMoveDown => (4, 10, true),
            HittingHit => (12, 15, false),
            HittingDie => (5, 10, false),
            DuplicatingMoveDown => (4, 10, true),
            DuplicatingDuplicate => (9, 10, false),
            DuplicantMoveSideways | DuplicantRightMoveDown | DuplicantLeftMoveDown => (4, 10, true),
            DuplicantRightDie | DuplicantLeftDie => (4, 10, false),
            SideMovingMoveDown | SideMovingMoveSideways => (4, 10, true),
            SideMovingDie => (4, 10, false),
            HeartSpin | StarSpin => (8, 10, true),
            CharacterIdle => (8, 10, true),
            CharacterWalk => (4, 15, true),
            CharacterDash => (3, 20, false),
            CharacterAttack => (5, 15, false),
            CharacterDie => (6, 10, false),
        }
    }

    /// Playback time of a one-shot animation; `None` for looping ones.
    pub fn duration(self) -> Option<Duration> {
        let (frames, fps, looping) = self.sheet();
        (!looping).then(|| Duration::from_millis(u64::from(frames) * 1000 / u64::from(fps)))
    }

    /// Time until the sheet reaches frame `frame` (zero-based).
    pub fn time_to_frame(self, frame: u32) -> Duration {
        let (_, fps, _) = self.sheet();
        Duration::from_millis(u64::from(frame) * 1000 / u64::from(fps))
    }
}

// ---------------------------------------------------------------------------
// Commands and views
// ---------------------------------------------------------------------------

/// An effect an actor requests on something it does not own.
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaCommand {
    DamageCharacter(u32),
    HealCharacter(u32),
    ShieldCharacter,
    SpawnProjectile(SlimeParams),
    SpawnDuplicants(Vec<SlimeParams>),
}

/// Snapshot of the character refreshed by the session after every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterView {
    pub id: ActorId,
    pub state: CharacterState,
    pub dead: bool,
    pub position: Vec2,
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// The host every game actor runs against.
#[derive(Debug)]
pub struct Arena {
    timers: TimerQueue,
    rng: Pcg64,
    physics: ArenaPhysics,
    roster: ActorRoster,
    state: GameStateManager,
    events: EventBus<GameEvent>,
    commands: VecDeque<ArenaCommand>,
    character: Option<CharacterView>,
    animations: BTreeMap<ActorId, Animation>,
}

impl Arena {
    pub fn new(seed: u64) -> Self {
        Self {
            timers: TimerQueue::new(),
            rng: Pcg64::seed_from_u64(seed),
            physics: ArenaPhysics::new(),
            roster: ActorRoster::new(),
            state: GameStateManager::new(),
            events: EventBus::new(),
            commands: VecDeque::new(),
            character: None,
            animations: BTreeMap::new(),
        }
    }

    pub fn timer_queue(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// The concrete physics world.
    pub fn bodies(&self) -> &ArenaPhysics {
        &self.physics
    }

    pub fn bodies_mut(&mut self) -> &mut ArenaPhysics {
        &mut self.physics
    }

    pub fn position(&self, actor: ActorId) -> Vec2 {
        self.physics.position(actor)
    }

    pub fn is_actor_alive(&self, actor: ActorId) -> bool {
        self.roster.is_live(actor)
    }

    /// Switch the game state, freezing or unfreezing the clock with it.
    pub fn change_state(&mut self, state: GameState) -> bool {
        self.state.change_state(state, &mut self.timers)
    }

    // -- events and commands ------------------------------------------------

    pub fn publish(&mut self, event: GameEvent) {
        self.events.publish(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn events_published(&self) -> u64 {
        self.events.published()
    }

    /// Queue an effect for the session to apply after the current phase.
    pub fn command(&mut self, command: ArenaCommand) {
        self.commands.push_back(command);
    }

    pub fn take_commands(&mut self) -> Vec<ArenaCommand> {
        self.commands.drain(..).collect()
    }

    pub fn character(&self) -> Option<CharacterView> {
        self.character
    }

    pub fn set_character_view(&mut self, view: CharacterView) {
        self.character = Some(view);
    }

    // -- animation ----------------------------------------------------------

    /// Show `animation` on `actor`. Returns the timer that fires when a
    /// one-shot animation completes; looping animations never complete.
    pub fn play_animation(&mut self, actor: ActorId, animation: Animation) -> Option<TimerHandle> {
        self.animations.insert(actor, animation);
        animation.duration().map(|d| self.timers.schedule_once(d))
    }

    /// Show `animation` on `actor` without tracking its completion.
    pub fn show_animation(&mut self, actor: ActorId, animation: Animation) {
        self.animations.insert(actor, animation);
    }

    pub fn stop_animation(&mut self, actor: ActorId) {
        self.animations.remove(&actor);
    }

    /// What `actor` currently shows.
    pub fn animation(&self, actor: ActorId) -> Option<Animation> {
        self.animations.get(&actor).copied()
    }

    /// Whether `actor`'s frame has fully left the arena across one of
    /// `edges`.
    pub fn is_out_of_bounds(&self, actor: ActorId, edges: Edges) -> bool {
        let Some(body) = self.physics.body(actor) else {
            return false;
        };
        let (half_w, half_h) = (body.frame.0 / 2.0, body.frame.1 / 2.0);
        let Vec2 { x, y } = body.position;
        (edges.left && x < -half_w)
            || (edges.right && x > WORLD.width + half_w)
            || (edges.top && y < -half_h)
            || (edges.bottom && y > WORLD.height + half_h)
    }
}

impl Host for Arena {
    fn timers(&mut self) -> &mut dyn Timers {
        &mut self.timers
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn physics(&mut self) -> &mut dyn Physics {
        &mut self.physics
    }

    fn game_state(&self) -> GameState {
        self.state.state()
    }

    fn enlist_actor(&mut self) -> ActorId {
        self.roster.enlist()
    }

    fn retire_actor(&mut self, id: ActorId) -> bool {
        self.animations.remove(&id);
        self.roster.retire(id)
    }

    fn emit(&mut self, event: CoreEvent) {
        self.events.publish(GameEvent::Core(event));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(physics: &mut ArenaPhysics, arena: &mut Arena, x: f32, y: f32, shape: BodyShape) -> ActorId {
        let id = arena.enlist_actor();
        let body = physics.insert_body(id, (10.0, 10.0), 1.0);
        body.position = Vec2::new(x, y);
        body.shape = Some(shape);
        body.enabled = true;
        id
    }

    fn square() -> BodyShape {
        BodyShape::Rect {
            width: 10.0,
            height: 10.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    // -- geometry -----------------------------------------------------------

    #[test]
    fn band_centers() {
        let width = WORLD.band_width();
        assert!((width - 63.6).abs() < 1e-3);
        assert!((WORLD.band_center(0) - 31.8).abs() < 1e-3);
        assert!((WORLD.band_center(4) - 286.2).abs() < 1e-3);
    }

    #[test]
    fn scaled_rect_extent() {
        let mut body = Body::new((80.0, 48.0), 2.0);
        body.position = Vec2::new(100.0, 100.0);
        body.shape = Some(BodyShape::Rect {
            width: 26.0,
            height: 22.0,
            offset_x: 27.0,
            offset_y: 13.0,
        });
        let Some(Extent::Rect { left, top, right, bottom }) = body.extent() else {
            panic!("expected a rect");
        };
        assert_eq!((left, top, right, bottom), (74.0, 78.0, 126.0, 122.0));
    }

    // -- integration --------------------------------------------------------

    #[test]
    fn step_moves_enabled_bodies_only() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let moving = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        let parked = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        physics.set_velocity(moving, Vec2::new(0.0, 100.0));
        physics.set_velocity(parked, Vec2::new(0.0, 100.0));
        physics.set_body_enabled(parked, false);

        physics.step(Duration::from_millis(500));
        assert_eq!(physics.position(moving), Vec2::new(50.0, 100.0));
        assert_eq!(physics.position(parked), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn drag_slows_to_rest() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let id = body_at(&mut physics, &mut arena, 50.0, 0.0, square());
        physics.set_velocity(id, Vec2::new(0.0, 300.0));
        if let Some(body) = physics.body_mut(id) {
            body.drag_y = 300.0;
        }
        physics.step(Duration::from_millis(500));
        assert_eq!(physics.velocity(id).y, 150.0);
        physics.step(Duration::from_secs(2));
        assert_eq!(physics.velocity(id).y, 0.0);
    }

    #[test]
    fn side_walls_block() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let id = body_at(&mut physics, &mut arena, 300.0, 50.0, square());
        if let Some(body) = physics.body_mut(id) {
            body.collide_world_bounds = true;
        }
        physics.set_velocity(id, Vec2::new(100.0, 0.0));
        physics.step(Duration::from_millis(500));
        assert!(physics.is_blocked_sideways(id));
        assert_eq!(physics.position(id).x, WORLD.width - 5.0);
        assert_eq!(physics.velocity(id).x, 0.0);
    }

    // -- overlaps -----------------------------------------------------------

    #[test]
    fn overlaps_report_registrant_first() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let a = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        let b = body_at(&mut physics, &mut arena, 55.0, 55.0, square());
        let far = body_at(&mut physics, &mut arena, 200.0, 200.0, square());
        physics.add_overlap(b, a);
        physics.add_overlap(a, far);
        assert_eq!(physics.step(Duration::ZERO), vec![(b, a)]);

        physics.set_body_enabled(a, false);
        assert!(physics.step(Duration::ZERO).is_empty());
    }

    #[test]
    fn circle_against_rect() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let rect = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        let circle = BodyShape::Circle {
            radius: 3.0,
            offset_x: 2.0,
            offset_y: 2.0,
        };
        let near = body_at(&mut physics, &mut arena, 57.0, 50.0, circle);
        let far = body_at(&mut physics, &mut arena, 62.0, 50.0, circle);
        physics.add_overlap(near, rect);
        physics.add_overlap(far, rect);
        assert_eq!(physics.step(Duration::ZERO), vec![(near, rect)]);
    }

    #[test]
    fn removing_a_body_drops_its_overlaps() {
        let mut arena = Arena::new(0);
        let mut physics = ArenaPhysics::new();
        let a = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        let b = body_at(&mut physics, &mut arena, 50.0, 50.0, square());
        physics.add_overlap(a, b);
        physics.remove_body(b);
        assert_eq!(physics.overlap_count(), 0);
        assert_eq!(physics.body_count(), 1);
    }

    // -- arena --------------------------------------------------------------

    #[test]
    fn one_shot_animations_schedule_completion() {
        let mut arena = Arena::new(0);
        let id = arena.enlist_actor();
        assert_eq!(arena.play_animation(id, Animation::ProjectileFly), None);
        let done = arena.play_animation(id, Animation::JumpingDie);
        assert!(done.is_some());
        assert_eq!(arena.animation(id), Some(Animation::JumpingDie));
        assert_eq!(Animation::JumpingDie.duration(), Some(Duration::from_millis(500)));
        assert_eq!(Animation::ShootingShoot.time_to_frame(10), Duration::from_millis(1000));

        arena.timer_queue().advance(Duration::from_millis(500));
        assert_eq!(arena.timer_queue().next_due(), done);
    }

    #[test]
    fn core_events_are_wrapped() {
        let mut arena = Arena::new(0);
        arena.emit(CoreEvent::AllWavesCompleted);
        arena.publish(GameEvent::Victory);
        assert_eq!(
            arena.drain_events(),
            vec![GameEvent::Core(CoreEvent::AllWavesCompleted), GameEvent::Victory]
        );
    }

    #[test]
    fn state_changes_freeze_timers() {
        let mut arena = Arena::new(0);
        assert!(arena.change_state(GameState::Paused));
        assert_eq!(arena.game_state(), GameState::Paused);
        assert!(arena.timer_queue().is_paused());
        assert!(arena.change_state(GameState::Playing));
        assert!(!arena.timer_queue().is_paused());
    }

    #[test]
    fn out_of_bounds_uses_frame_half_size() {
        let mut arena = Arena::new(0);
        let id = arena.enlist_actor();
        arena.bodies_mut().insert_body(id, (80.0, 48.0), 2.0);
        arena.bodies_mut().set_position(id, Vec2::new(100.0, WORLD.height + 24.0));
        assert!(!arena.is_out_of_bounds(id, Edges::BOTTOM));
        arena.bodies_mut().set_position(id, Vec2::new(100.0, WORLD.height + 25.0));
        assert!(arena.is_out_of_bounds(id, Edges::BOTTOM));
        arena.bodies_mut().set_position(id, Vec2::new(-41.0, 0.0));
        assert!(!arena.is_out_of_bounds(id, Edges::BOTTOM));
        assert!(arena.is_out_of_bounds(id, Edges::BOTTOM_AND_SIDES));
    }
}
