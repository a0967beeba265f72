//! The scripted slime waves.
//!
//! Five waves, each ended by its stages rather than a hard deadline:
//!
//! | wave | kinds                                                        | initial stage | stages                       |
//! |------|--------------------------------------------------------------|---------------|------------------------------|
//! | 0    | jumping, duplicant                                           | 20 s          | 20 s of jumping pairs        |
//! | 1    | duplicating, hitting, side-moving                            | 30 s          | none                         |
//! | 2    | duplicant, shooting                                          | 30 s          | 30 s of duplicant formations |
//! | 3    | projectile, hiding, jumping, side-moving                     | 30 s          | 20 s of forward volleys      |
//! | 4    | duplicating, hiding, hitting, jumping, shooting, side-moving | 40 s          | none                         |
//!
//! Kinds reappear across waves on the same spawner, so every initial
//! config spells out its pack settings instead of inheriting whatever a
//! previous wave's stage left behind.
//!
//! Horizontal positions snap to the centres of the arena's spawn lanes.
//! Several kinds use small stateful generators to lay lanes out in
//! patterns; each call to [`slime_waves`] gets fresh generators.

use std::cell::RefCell;

use onslaught_core::prelude::*;
use rand::{Rng, RngCore};

use crate::arena::WORLD;
use crate::character::{ATTACK_DISTANCE, START_Y};
use crate::slime::{Aim, Heading, HidingZone, SlimeBehavior, SlimeKind, SlimeParams};

/// Lane order of the duplicant formation in wave 2; `None` is either lane
/// 1 or lane 3.
const FORMATION: [Option<u32>; 8] = [Some(0), Some(4), Some(1), Some(3), Some(2), None, Some(1), Some(3)];

/// Projectile volley lanes in wave 3: even lanes, then odd lanes.
const VOLLEY: [u32; 5] = [0, 2, 4, 1, 3];

// ---------------------------------------------------------------------------
// Lane generators
// ---------------------------------------------------------------------------

/// Picks random lanes, never repeating one within a pack.
#[derive(Debug)]
pub struct LanePicker {
    pack_size: usize,
    picked: usize,
    recent: Vec<u32>,
}

impl LanePicker {
    /// A pack can hold at most one fewer lane than the arena has.
    pub fn new(pack_size: usize) -> Self {
        Self {
            pack_size: pack_size.clamp(1, WORLD.band_count as usize - 1),
            picked: 0,
            recent: Vec::new(),
        }
    }

    pub fn next_lane(&mut self, rng: &mut dyn RngCore) -> u32 {
        self.picked += 1;
        if self.picked > self.pack_size {
            self.picked = 1;
            self.recent.clear();
        }
        let free: Vec<u32> = (0..WORLD.band_count).filter(|lane| !self.recent.contains(lane)).collect();
        let lane = free[rng.gen_range(0..free.len())];
        self.recent.push(lane);
        lane
    }
}

/// Walks the lanes back and forth: 1, 2, 3, 4, 3, 2, 1, 0, 1, ...
#[derive(Debug, Default)]
pub struct Zigzag {
    lane: u32,
    descending: bool,
}

impl Zigzag {
    pub fn next_lane(&mut self) -> u32 {
        let last = WORLD.band_count - 1;
        if self.descending {
            self.lane -= 1;
            if self.lane == 0 {
                self.descending = false;
            }
        } else {
            self.lane += 1;
            if self.lane >= last {
                self.lane = last;
                self.descending = true;
            }
        }
        self.lane
    }
}

/// Cycles through a fixed lane table.
#[derive(Debug, Default)]
struct Cycle {
    step: usize,
}

impl Cycle {
    fn next<T: Copy>(&mut self, table: &[T]) -> T {
        let value = table[self.step % table.len()];
        self.step = (self.step + 1) % table.len();
        value
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

fn random_lane(rng: &mut dyn RngCore) -> f32 {
    WORLD.band_center(rng.gen_range(0..WORLD.band_count))
}

fn base_params(behavior: SlimeBehavior, rng: &mut dyn RngCore) -> SlimeParams {
    SlimeParams {
        x: random_lane(rng),
        y: WORLD.spawn_start_y,
        speed: rng.gen_range(120..=170) as f32,
        behavior,
    }
}

fn jumping(rng: &mut dyn RngCore) -> SlimeParams {
    let jump_delay_ms = rng.gen_range(1200..=1500);
    SlimeParams {
        speed: rng.gen_range(230..=270) as f32,
        ..base_params(SlimeBehavior::Jumping { jump_delay_ms }, rng)
    }
}

fn shooting(rng: &mut dyn RngCore) -> SlimeParams {
    let shoot_delay_ms = rng.gen_range(1000..=1500);
    base_params(SlimeBehavior::Shooting { shoot_delay_ms }, rng)
}

fn hiding(rng: &mut dyn RngCore) -> SlimeParams {
    let behavior = SlimeBehavior::Hiding {
        zone: HidingZone {
            min_y: WORLD.height / 4.0,
            max_y: WORLD.height * 6.0 / 9.0,
        },
        speed_during_hiding: rng.gen_range(110..=140) as f32,
    };
    base_params(behavior, rng)
}

fn duplicating(rng: &mut dyn RngCore) -> SlimeParams {
    let duplication_delay_ms = rng.gen_range(1500..=2000);
    SlimeParams {
        x: WORLD.band_center(rng.gen_range(1..=3)),
        ..base_params(SlimeBehavior::Duplicating { duplication_delay_ms }, rng)
    }
}

/// Hitting slimes strike from up to 40 pixels short of the character's
/// attack reach.
fn hitting(rng: &mut dyn RngCore) -> SlimeParams {
    let attack_y_threshold = START_Y - ATTACK_DISTANCE + rng.gen_range(0..=40) as f32;
    base_params(SlimeBehavior::Hitting { attack_y_threshold }, rng)
}

fn side_moving(rng: &mut dyn RngCore) -> SlimeParams {
    let behavior = SlimeBehavior::SideMoving {
        side_step_delay: DelayRange::new(1500, 2000),
        side_step_duration: DelayRange::new(500, 1000),
    };
    base_params(behavior, rng)
}

/// A duplicant that either walks straight down or starts by stepping right.
fn duplicant_behavior(rng: &mut dyn RngCore) -> SlimeBehavior {
    let heading = if rng.gen_bool(0.5) { Heading::Down } else { Heading::Right };
    SlimeBehavior::Duplicant {
        heading,
        duration_ms: Some(0),
    }
}

/// A single-spawn config; see the module docs.
fn single(min: u64, max: u64, max_on_screen: usize) -> SpawnerConfig {
    SpawnerConfig::new(DelayRange::new(min, max), max_on_screen)
        .with_spawn_size(1)
        .with_pack(false)
}

// ---------------------------------------------------------------------------
// Waves
// ---------------------------------------------------------------------------

/// Build the full slime wave script.
pub fn slime_waves() -> Vec<Wave<SlimeKind, SlimeParams>> {
    vec![
        Wave::new(wave_0()),
        Wave::new(wave_1()),
        Wave::new(wave_2()),
        Wave::new(wave_3()),
        Wave::new(wave_4()),
    ]
}

fn wave_0() -> WaveConfig<SlimeKind, SlimeParams> {
    use SlimeKind::*;

    let initial = InitialStage::new(Deadline::from_millis(20_000))
        .with_kind(Jumping, jumping, single(1000, 2000, 5).with_first_spawn_delay(0))
        .with_kind(
            Duplicant,
            |rng: &mut dyn RngCore| base_params(duplicant_behavior(rng), rng),
            single(800, 2000, 5).with_first_spawn_delay(10_000),
        );

    let pairs = RefCell::new(LanePicker::new(2));
    let jumping_pairs = Stage::new(Deadline::from_millis(20_000))
        .patch_config(
            Jumping,
            SpawnerConfigPatch {
                spawn_delay: Some(DelayRange::new(1500, 2500)),
                max_on_screen: Some(10),
                spawn_size: Some(2),
                force_spawn_in_pack: Some(true),
                ..Default::default()
            },
        )
        .patch_params(Jumping, move |params: &mut SlimeParams, rng: &mut dyn RngCore| {
            params.x = WORLD.band_center(pairs.borrow_mut().next_lane(rng));
        });

    WaveConfig::new(vec![Jumping, Duplicant], initial, Deadline::Never).with_stage(jumping_pairs)
}

fn wave_1() -> WaveConfig<SlimeKind, SlimeParams> {
    use SlimeKind::*;

    let initial = InitialStage::new(Deadline::from_millis(30_000))
        .with_kind(Duplicating, duplicating, single(3000, 4000, 5).with_first_spawn_delay(10_000))
        .with_kind(Hitting, hitting, single(3000, 4000, 3).with_first_spawn_delay(15_000))
        .with_kind(SideMoving, side_moving, single(1000, 1500, 6).with_first_spawn_delay(0));

    WaveConfig::new(vec![Duplicating, Hitting, SideMoving], initial, Deadline::Never)
}

fn wave_2() -> WaveConfig<SlimeKind, SlimeParams> {
    use SlimeKind::*;

    let zigzag = RefCell::new(Zigzag::default());
    let quartets = RefCell::new(LanePicker::new(4));
    let initial = InitialStage::new(Deadline::from_millis(30_000))
        .with_kind(
            Duplicant,
            move |rng: &mut dyn RngCore| SlimeParams {
                x: WORLD.band_center(zigzag.borrow_mut().next_lane()),
                y: WORLD.spawn_start_y,
                speed: 130.0,
                behavior: duplicant_behavior(rng),
            },
            single(1000, 1000, 5).with_first_spawn_delay(0),
        )
        .with_kind(
            Shooting,
            move |rng: &mut dyn RngCore| SlimeParams {
                x: WORLD.band_center(quartets.borrow_mut().next_lane(rng)),
                ..shooting(rng)
            },
            single(800, 1000, 5).with_first_spawn_delay(1500),
        );

    let formation = RefCell::new(Cycle::default());
    let formations = Stage::new(Deadline::from_millis(30_000))
        .patch_config(
            Duplicant,
            SpawnerConfigPatch {
                spawn_delay: Some(DelayRange::new(1200, 1500)),
                max_on_screen: Some(7),
                spawn_size: Some(2),
                force_spawn_in_pack: Some(true),
                ..Default::default()
            },
        )
        .patch_params(Duplicant, move |params: &mut SlimeParams, rng: &mut dyn RngCore| {
            let lane = formation
                .borrow_mut()
                .next(&FORMATION)
                .unwrap_or_else(|| if rng.gen_bool(0.5) { 1 } else { 3 });
            params.x = WORLD.band_center(lane);
        });

    WaveConfig::new(vec![Duplicant, Shooting], initial, Deadline::Never).with_stage(formations)
}

fn wave_3() -> WaveConfig<SlimeKind, SlimeParams> {
    use SlimeKind::*;

    let initial = InitialStage::new(Deadline::from_millis(30_000))
        .with_kind(
            Projectile,
            |rng: &mut dyn RngCore| SlimeParams {
                speed: rng.gen_range(150..=200) as f32,
                ..base_params(SlimeBehavior::Projectile { aim: None }, rng)
            },
            single(1500, 2200, 5).with_first_spawn_delay(0),
        )
        .with_kind(Hiding, hiding, single(1800, 2400, 3).with_first_spawn_delay(0))
        .with_kind(Jumping, jumping, single(2200, 2800, 4).with_first_spawn_delay(10_000))
        .with_kind(SideMoving, side_moving, single(1800, 2400, 4).with_first_spawn_delay(5000));

    let volley = RefCell::new(Cycle::default());
    let volleys = Stage::new(Deadline::from_millis(20_000))
        .patch_config(
            Projectile,
            SpawnerConfigPatch {
                spawn_delay: Some(DelayRange::new(1500, 2500)),
                max_on_screen: Some(6),
                spawn_size: Some(3),
                force_spawn_in_pack: Some(true),
                ..Default::default()
            },
        )
        .patch_params(Projectile, move |params: &mut SlimeParams, _rng: &mut dyn RngCore| {
            params.x = WORLD.band_center(volley.borrow_mut().next(&VOLLEY));
            params.behavior = SlimeBehavior::Projectile { aim: Some(Aim::Forward) };
        });

    WaveConfig::new(vec![Projectile, Hiding, Jumping, SideMoving], initial, Deadline::Never).with_stage(volleys)
}

fn wave_4() -> WaveConfig<SlimeKind, SlimeParams> {
    use SlimeKind::*;

    let initial = InitialStage::new(Deadline::from_millis(40_000))
        .with_kind(Duplicating, duplicating, single(2500, 3500, 2).with_first_spawn_delay(0))
        .with_kind(Jumping, jumping, single(2500, 3500, 2).with_first_spawn_delay(5000))
        .with_kind(SideMoving, side_moving, single(2500, 3500, 2).with_first_spawn_delay(7500))
        .with_kind(Hitting, hitting, single(2500, 3500, 2).with_first_spawn_delay(10_000))
        .with_kind(Shooting, shooting, single(1500, 2000, 2).with_first_spawn_delay(15_000))
        .with_kind(Hiding, hiding, single(2500, 3500, 2).with_first_spawn_delay(17_500));

    WaveConfig::new(
        vec![Duplicating, Hiding, Hitting, Jumping, Shooting, SideMoving],
        initial,
        Deadline::Never,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;

    fn lane_of(x: f32) -> u32 {
        (0..WORLD.band_count)
            .find(|lane| WORLD.band_center(*lane) == x)
            .unwrap_or_else(|| panic!("{x} is not a lane centre"))
    }

    // -- generators ---------------------------------------------------------

    #[test]
    fn lane_picker_never_repeats_within_a_pack() {
        let mut rng = Pcg64::seed_from_u64(1);
        let mut picker = LanePicker::new(4);
        for _ in 0..25 {
            let mut pack: Vec<u32> = (0..4).map(|_| picker.next_lane(&mut rng)).collect();
            pack.sort_unstable();
            pack.dedup();
            assert_eq!(pack.len(), 4);
        }
    }

    #[test]
    fn lane_picker_clamps_oversized_packs() {
        let mut rng = Pcg64::seed_from_u64(2);
        let mut picker = LanePicker::new(9);
        for _ in 0..50 {
            assert!(picker.next_lane(&mut rng) < WORLD.band_count);
        }
    }

    #[test]
    fn zigzag_bounces_between_edges() {
        let mut zigzag = Zigzag::default();
        let lanes: Vec<u32> = (0..10).map(|_| zigzag.next_lane()).collect();
        assert_eq!(lanes, vec![1, 2, 3, 4, 3, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn volley_cycle_stays_on_the_board() {
        let mut cycle = Cycle::default();
        let lanes: Vec<u32> = (0..7).map(|_| cycle.next(&VOLLEY)).collect();
        assert_eq!(lanes, vec![0, 2, 4, 1, 3, 0, 2]);
    }

    // -- script -------------------------------------------------------------

    #[test]
    fn script_shape() {
        let waves = slime_waves();
        let kinds: Vec<&[SlimeKind]> = waves.iter().map(|wave| wave.kinds()).collect();
        assert_eq!(
            kinds,
            vec![
                &[SlimeKind::Jumping, SlimeKind::Duplicant][..],
                &[SlimeKind::Duplicating, SlimeKind::Hitting, SlimeKind::SideMoving][..],
                &[SlimeKind::Duplicant, SlimeKind::Shooting][..],
                &[
                    SlimeKind::Projectile,
                    SlimeKind::Hiding,
                    SlimeKind::Jumping,
                    SlimeKind::SideMoving
                ][..],
                &[
                    SlimeKind::Duplicating,
                    SlimeKind::Hiding,
                    SlimeKind::Hitting,
                    SlimeKind::Jumping,
                    SlimeKind::Shooting,
                    SlimeKind::SideMoving
                ][..],
            ]
        );
        for wave in &waves {
            assert_eq!(wave.config().duration, Deadline::Never);
        }
    }

    #[test]
    fn initial_params_match_their_kind() {
        let mut rng = Pcg64::seed_from_u64(3);
        for wave in slime_waves() {
            let initial = &wave.config().initial_stage;
            for &kind in wave.kinds() {
                let roll = initial.params.get(&kind).expect("every kind has params");
                for _ in 0..20 {
                    let params = roll(&mut rng);
                    assert_eq!(params.behavior.kind(), kind);
                    assert_eq!(params.y, WORLD.spawn_start_y);
                    lane_of(params.x);
                }
                assert!(initial.configs.contains_key(&kind));
            }
        }
    }

    #[test]
    fn hitting_slimes_strike_short_of_the_character() {
        let mut rng = Pcg64::seed_from_u64(5);
        for _ in 0..50 {
            let SlimeBehavior::Hitting { attack_y_threshold } = hitting(&mut rng).behavior else {
                panic!("expected hitting behavior");
            };
            let reach = START_Y - ATTACK_DISTANCE;
            assert!((reach..=reach + 40.0).contains(&attack_y_threshold));
        }
    }

    #[test]
    fn duplicating_slimes_stay_off_the_edges() {
        let mut rng = Pcg64::seed_from_u64(4);
        for _ in 0..50 {
            let lane = lane_of(duplicating(&mut rng).x);
            assert!((1..=3).contains(&lane));
        }
    }
}
