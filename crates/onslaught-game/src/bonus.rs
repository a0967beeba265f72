//! Falling pick-ups: hearts heal the character, stars shield it.

use onslaught_core::prelude::*;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::arena::{Animation, Arena, ArenaCommand, Edges, Vec2, WORLD};

const FRAME_WIDTH: f32 = 80.0;
const FRAME_HEIGHT: f32 = 48.0;
const SCALE: f32 = 2.0;
const BODY_SIZE: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    Heal,
    Defense,
}

impl BonusKind {
    pub const ALL: [BonusKind; 2] = [BonusKind::Heal, BonusKind::Defense];

    fn animation(self) -> Animation {
        match self {
            BonusKind::Heal => Animation::HeartSpin,
            BonusKind::Defense => Animation::StarSpin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusParams {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

impl BonusParams {
    /// A random lane at the spawn line, falling at 100 to 150 px/s.
    pub fn roll(rng: &mut dyn RngCore) -> Self {
        Self {
            x: WORLD.band_center(rng.gen_range(0..WORLD.band_count)),
            y: WORLD.spawn_start_y,
            speed: rng.gen_range(100..=150) as f32,
        }
    }
}

#[derive(Debug)]
pub struct Bonus {
    core: ActorCore<Arena>,
    poolable: PoolableState,
    collider: ColliderState<Bonus>,
    kind: BonusKind,
    params: BonusParams,
}

impl Bonus {
    pub fn new(kind: BonusKind, arena: &mut Arena) -> Self {
        let id = arena.enlist_actor();
        arena.bodies_mut().insert_body(id, (FRAME_WIDTH, FRAME_HEIGHT), SCALE);
        let mut bonus = Self {
            core: ActorCore::inactive(id),
            poolable: PoolableState::new(),
            collider: ColliderState::new(),
            kind,
            params: BonusParams {
                x: 0.0,
                y: WORLD.spawn_start_y,
                speed: 0.0,
            },
        };
        bonus.setup_collider(arena, BODY_SIZE, BODY_SIZE, false, false);
        if let Some(character) = arena.character() {
            let registered = bonus.add_collision(arena, character.id, |bonus: &mut Bonus, arena: &mut Arena, _| {
                bonus.collect(arena);
                Ok(())
            });
            if let Err(err) = registered {
                tracing::error!(bonus = %id, error = %err, "failed to register character contact");
            }
        } else {
            tracing::warn!(bonus = %id, ?kind, "no character in the arena, bonus can never be collected");
        }
        bonus
    }

    pub fn kind(&self) -> BonusKind {
        self.kind
    }

    pub fn params(&self) -> BonusParams {
        self.params
    }

    fn collect(&mut self, arena: &mut Arena) {
        if !self.is_active() || arena.character().map_or(true, |view| view.dead) {
            return;
        }
        match self.kind {
            BonusKind::Heal => arena.command(ArenaCommand::HealCharacter(1)),
            BonusKind::Defense => arena.command(ArenaCommand::ShieldCharacter),
        }
        tracing::debug!(kind = ?self.kind, "bonus collected");
        self.deactivate(arena);
    }
}

impl Actor for Bonus {
    type Host = Arena;

    fn core(&self) -> &ActorCore<Arena> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActorCore<Arena> {
        &mut self.core
    }

    fn on_update(&mut self, arena: &mut Arena, _frame: Frame) -> ActorResult {
        if arena.is_out_of_bounds(self.id(), Edges::BOTTOM) {
            self.deactivate(arena);
        }
        Ok(())
    }

    fn on_overlap(&mut self, arena: &mut Arena, other: ActorId) -> ActorResult {
        self.dispatch_overlap(arena, other)
    }

    fn on_destroy(&mut self, arena: &mut Arena) {
        self.destroy_all_collisions(arena);
        arena.stop_animation(self.id());
    }
}

impl Poolable for Bonus {
    type Params = BonusParams;

    fn poolable(&self) -> &PoolableState {
        &self.poolable
    }

    fn poolable_mut(&mut self) -> &mut PoolableState {
        &mut self.poolable
    }

    fn reset(&mut self, params: Option<BonusParams>, _arena: &mut Arena) {
        if let Some(params) = params {
            self.params = params;
        }
    }

    fn pre_activate(&mut self, arena: &mut Arena) {
        self.enable_collisions();
        let id = self.id();
        let BonusParams { x, y, speed } = self.params;
        arena.bodies_mut().set_position(id, Vec2::new(x, y));
        arena.bodies_mut().set_velocity(id, Vec2::new(0.0, speed));
        arena.show_animation(id, self.kind.animation());
    }

    fn pre_deactivate(&mut self, arena: &mut Arena) {
        arena.stop_animation(self.id());
        arena.bodies_mut().set_velocity(self.id(), Vec2::ZERO);
        self.disable_collisions();
    }
}

impl Collidable for Bonus {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::CharacterView;
    use crate::character::CharacterState;

    fn arena_with_character(dead: bool) -> (Arena, ActorId) {
        let mut arena = Arena::new(5);
        let id = arena.enlist_actor();
        arena.set_character_view(CharacterView {
            id,
            state: if dead { CharacterState::Dead } else { CharacterState::Idle },
            dead,
            position: Vec2::new(159.0, 450.0),
        });
        (arena, id)
    }

    fn spawn(arena: &mut Arena, kind: BonusKind) -> Bonus {
        let mut bonus = Bonus::new(kind, arena);
        let params = BonusParams {
            x: 100.0,
            y: 0.0,
            speed: 120.0,
        };
        bonus.reset(Some(params), arena);
        bonus.activate(arena);
        bonus
    }

    #[test]
    fn rolled_params_sit_in_a_lane() {
        let mut arena = Arena::new(3);
        for _ in 0..32 {
            let params = BonusParams::roll(arena.rng());
            assert!((100.0..=150.0).contains(&params.speed));
            assert_eq!(params.y, WORLD.spawn_start_y);
            assert!((0..WORLD.band_count).any(|band| WORLD.band_center(band) == params.x));
        }
    }

    #[test]
    fn activation_starts_the_fall() {
        let (mut arena, _) = arena_with_character(false);
        let bonus = spawn(&mut arena, BonusKind::Heal);
        assert_eq!(arena.position(bonus.id()), Vec2::new(100.0, 0.0));
        assert_eq!(arena.bodies().velocity(bonus.id()), Vec2::new(0.0, 120.0));
        assert_eq!(arena.animation(bonus.id()), Some(Animation::HeartSpin));
    }

    #[test]
    fn heart_heals_and_star_shields() {
        let (mut arena, character) = arena_with_character(false);
        let mut heart = spawn(&mut arena, BonusKind::Heal);
        let mut star = spawn(&mut arena, BonusKind::Defense);

        heart.handle_overlap(&mut arena, character);
        star.handle_overlap(&mut arena, character);
        assert_eq!(
            arena.take_commands(),
            vec![ArenaCommand::HealCharacter(1), ArenaCommand::ShieldCharacter]
        );
        assert!(!heart.is_active());
        assert!(!star.is_active());
        assert!(!star.collisions_enabled());
    }

    #[test]
    fn dead_character_collects_nothing() {
        let (mut arena, character) = arena_with_character(true);
        let mut heart = spawn(&mut arena, BonusKind::Heal);
        heart.handle_overlap(&mut arena, character);
        assert!(arena.take_commands().is_empty());
        assert!(heart.is_active());
    }

    #[test]
    fn falls_out_of_the_arena() {
        let (mut arena, _) = arena_with_character(false);
        let mut star = spawn(&mut arena, BonusKind::Defense);
        arena.bodies_mut().set_position(star.id(), Vec2::new(100.0, WORLD.height + 30.0));
        star.update(&mut arena, Frame::default());
        assert!(!star.is_active());
        assert_eq!(arena.bodies().velocity(star.id()), Vec2::ZERO);
    }
}
