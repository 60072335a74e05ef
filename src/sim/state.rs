//! Game state and core simulation types
//!
//! Everything a game needs to be replayed from its seed lives here.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::achievements::AchievementTracker;
use super::block::{BlockId, Tier};
use super::broadphase::SpatialGrid;
use super::geometry::Boundary;
use super::gravity::{Direction8, GravityController};
use super::merge::MergeRecord;
use super::metrics::{PressureMeter, Snapshot};
use super::physics::PhysicsParams;
use super::registry::BlockRegistry;
use crate::consts::*;
use crate::draw::build_instances;
use crate::error::SimError;
use crate::polar_to_cartesian;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Created, waiting for the first new game
    New,
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Win tier reached; physics frozen until the player continues or restarts
    Won,
    /// Run ended
    GameOver,
}

/// Things that happened during a tick or an input
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Won { score: u64 },
    GameOver { score: u64 },
    /// First time this game a block of `tier` was created
    Achievement { tier: Tier },
    Merged(MergeRecord),
}

/// When new blocks enter the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnPolicy {
    /// One block per accepted fling or nudge
    OnFling,
    /// One block every `every_ticks` ticks (tilt control has no flings)
    Periodic { every_ticks: u32 },
    /// Only `new_game` spawns
    Manual,
}

/// Every tunable of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub boundary: Boundary,
    pub physics: PhysicsParams,
    pub gravity_strength: f32,
    pub gravity_smoothing: f32,
    pub max_blocks: usize,
    pub starting_blocks: usize,
    /// Tier rank that wins the game
    pub win_tier: u8,
    pub pressure_window: usize,
    pub pressure_limit: f32,
    pub deadlock_ticks: u32,
    pub spawn_policy: SpawnPolicy,
    pub spawn_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::default(),
            physics: PhysicsParams::default(),
            gravity_strength: GRAVITY_STRENGTH,
            gravity_smoothing: GRAVITY_SMOOTHING,
            max_blocks: MAX_BLOCKS,
            starting_blocks: STARTING_BLOCKS,
            win_tier: WIN_TIER,
            pressure_window: PRESSURE_WINDOW,
            pressure_limit: PRESSURE_LIMIT,
            deadlock_ticks: DEADLOCK_TICKS,
            spawn_policy: SpawnPolicy::OnFling,
            spawn_speed: SPAWN_SPEED,
        }
    }
}

impl SimConfig {
    /// Replace values the simulation cannot run with.
    ///
    /// The field must fit a spawned block, there must be room for at least one
    /// block, and the win tier must be reachable by a merge.
    pub fn sanitized(mut self) -> Self {
        self.boundary = match self.boundary {
            Boundary::Square { size } => Boundary::Square {
                size: at_least(size, MIN_FIELD_SIZE, WORLD_SIZE),
            },
            Boundary::Circle { radius } => Boundary::Circle {
                radius: at_least(radius, MIN_FIELD_SIZE / 2.0, WORLD_SIZE / 2.0),
            },
        };
        self.max_blocks = self.max_blocks.max(1);
        self.win_tier = self.win_tier.clamp(2, MAX_TIER);
        self.pressure_window = self.pressure_window.max(1);
        self.spawn_speed = at_least(self.spawn_speed, 0.0, SPAWN_SPEED);
        self
    }
}

fn at_least(value: f32, min: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(min)
    } else {
        fallback
    }
}

/// Complete game state (deterministic for a seed and input sequence)
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: SimConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    /// Games started with this state, mixed into each game's RNG seed
    pub games_played: u64,
    pub phase: GamePhase,
    pub score: u64,
    /// Best of the stored high score and this game's score
    pub high_score: u64,
    pub highest_tier: Option<Tier>,
    /// Continued after a win; no further win fires
    pub extended: bool,
    /// Simulation tick counter (per game)
    pub time_ticks: u64,
    pub registry: BlockRegistry,
    pub gravity: GravityController,
    pub pressure: PressureMeter,
    pub achievements: AchievementTracker,
    /// Consecutive ticks the board has been full with nothing to merge
    pub deadlock_ticks: u32,
    pub(crate) grid: SpatialGrid,
}

impl GameState {
    /// Create a state in the `New` phase with an empty field
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let requested = config.clone();
        let config = config.sanitized();
        if config != requested {
            log::warn!("unusable simulation settings adjusted: {config:?}");
        }
        Self {
            rng: Pcg32::seed_from_u64(seed),
            seed,
            games_played: 0,
            phase: GamePhase::New,
            score: 0,
            high_score: 0,
            highest_tier: None,
            extended: false,
            time_ticks: 0,
            registry: BlockRegistry::new(config.max_blocks),
            gravity: GravityController::new(config.gravity_strength, config.gravity_smoothing),
            pressure: PressureMeter::new(config.pressure_window, config.pressure_limit),
            achievements: AchievementTracker::new(),
            deadlock_ticks: 0,
            grid: SpatialGrid::new(),
            config,
        }
    }

    /// Hard reset into a fresh game with randomly placed starting blocks.
    /// Legal from every phase.
    pub fn new_game(&mut self) {
        self.reset();
        for _ in 0..self.config.starting_blocks {
            if let Err(err) = self.spawn_random() {
                log::warn!("starting block not placed: {err}");
                break;
            }
        }
        log::info!(
            "new game #{} ({} blocks)",
            self.games_played,
            self.registry.len()
        );
    }

    /// Hard reset into a fresh game with an exact block layout
    pub fn new_game_with(&mut self, layout: &[(Tier, Vec2, Vec2)]) -> Result<(), SimError> {
        self.reset();
        for &(tier, pos, vel) in layout {
            self.spawn_block(tier, pos, vel)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.games_played += 1;
        self.rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.games_played));
        self.phase = GamePhase::Playing;
        self.score = 0;
        self.highest_tier = None;
        self.extended = false;
        self.time_ticks = 0;
        self.registry.clear();
        self.gravity.reset();
        self.pressure.reset();
        self.achievements.reset();
        self.deadlock_ticks = 0;
    }

    /// Place a block and note its tier without unlocking it
    pub fn spawn_block(&mut self, tier: Tier, pos: Vec2, vel: Vec2) -> Result<BlockId, SimError> {
        let id = self.registry.spawn(tier, pos, vel)?;
        self.achievements.seed(tier);
        self.highest_tier = self.highest_tier.max(Some(tier));
        Ok(id)
    }

    /// Spawn a tier 1 or 2 block at the least crowded of a few random spots
    pub fn spawn_random(&mut self) -> Result<BlockId, SimError> {
        if self.registry.is_full() {
            return Err(SimError::CapacityExceeded {
                capacity: self.registry.capacity(),
            });
        }
        let rank = if self.rng.random_bool(0.5) { 1 } else { 2 };
        let tier = Tier::new(rank).unwrap_or(Tier::MIN);
        let radius = tier.radius();

        let mut best = self.random_position(radius);
        let mut best_overlap = self.overlap_at(best, radius);
        for _ in 1..SPAWN_ATTEMPTS {
            if best_overlap <= 0.0 {
                break;
            }
            let candidate = self.random_position(radius);
            let overlap = self.overlap_at(candidate, radius);
            if overlap < best_overlap {
                best = candidate;
                best_overlap = overlap;
            }
        }

        let speed = self.config.spawn_speed * self.rng.random::<f32>().sqrt();
        let angle = self.rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
        let vel = polar_to_cartesian(speed, angle);

        self.spawn_block(tier, best, vel)
    }

    /// Uniform random center that keeps a block of `radius` inside the boundary
    fn random_position(&mut self, radius: f32) -> Vec2 {
        match self.config.boundary {
            Boundary::Square { size } => {
                let lo = radius.min(size / 2.0);
                let hi = (size - radius).max(lo);
                Vec2::new(
                    self.rng.random_range(lo..=hi),
                    self.rng.random_range(lo..=hi),
                )
            }
            Boundary::Circle { radius: arena } => {
                let reach = (arena - radius).max(0.0);
                let r = reach * self.rng.random::<f32>().sqrt();
                let theta = self.rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
                self.config.boundary.center() + polar_to_cartesian(r, theta)
            }
        }
    }

    /// Deepest overlap a new block at `pos` would have with existing blocks
    fn overlap_at(&self, pos: Vec2, radius: f32) -> f32 {
        self.registry
            .iter()
            .map(|b| b.radius() + radius - b.pos.distance(pos))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Playing → Paused. Returns whether the phase changed.
    pub fn pause_game(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.phase = GamePhase::Paused;
        log::info!("game paused at tick {}", self.time_ticks);
        true
    }

    /// Paused → Playing. Does not leave Won or GameOver.
    pub fn unpause(&mut self) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        self.phase = GamePhase::Playing;
        log::info!("game resumed at tick {}", self.time_ticks);
        true
    }

    /// Won → Playing in extended mode
    pub fn continue_playing(&mut self) -> bool {
        if self.phase != GamePhase::Won {
            return false;
        }
        self.phase = GamePhase::Playing;
        self.extended = true;
        log::info!("continuing past the win with score {}", self.score);
        true
    }

    /// Point gravity along a fling. Spawns a block under the fling policy.
    pub fn fling(&mut self, dx: f32, dy: f32) -> Result<(), SimError> {
        if self.phase != GamePhase::Playing {
            return Ok(());
        }
        self.gravity.fling(dx, dy)?;
        self.spawn_for_fling();
        Ok(())
    }

    pub fn nudge(&mut self, direction: Direction8) -> Result<(), SimError> {
        if self.phase != GamePhase::Playing {
            return Ok(());
        }
        self.gravity.nudge(direction)?;
        self.spawn_for_fling();
        Ok(())
    }

    /// Continuous tilt sample; never spawns
    pub fn tilt(&mut self, angle: f32) -> Result<(), SimError> {
        if self.phase != GamePhase::Playing {
            return Ok(());
        }
        self.gravity.tilt(angle)
    }

    /// A tap anywhere resumes a paused game
    pub fn tap(&mut self, _x: f32, _y: f32) -> bool {
        self.unpause()
    }

    fn spawn_for_fling(&mut self) {
        if self.config.spawn_policy != SpawnPolicy::OnFling {
            return;
        }
        if let Err(err) = self.spawn_random() {
            log::debug!("fling spawn skipped: {err}");
        }
    }

    /// Immutable copy of the UI-facing state. Drawable blocks only when `with_blocks`.
    pub fn snapshot(&self, with_blocks: bool) -> Snapshot {
        Snapshot {
            tick: self.time_ticks,
            phase: self.phase,
            score: self.score,
            high_score: self.high_score.max(self.score),
            grav_angle: self.gravity.angle(),
            pressure: self.pressure.percent(),
            block_count: self.registry.len(),
            blocks: if with_blocks {
                build_instances(self.registry.iter())
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_waits_for_new_game() {
        let state = GameState::new(SimConfig::default(), 7);
        assert_eq!(state.phase, GamePhase::New);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_new_game_spawns_starting_blocks() {
        let mut state = GameState::new(SimConfig::default(), 7);
        state.new_game();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.registry.len(), STARTING_BLOCKS);
        for b in state.registry.iter() {
            assert!(b.tier.rank() <= 2);
            assert!(b.vel.length() <= SPAWN_SPEED + 1e-3);
            assert!(state.config.boundary.contains(b.pos, b.radius()));
        }
    }

    #[test]
    fn test_new_game_resets_progress() {
        let mut state = GameState::new(SimConfig::default(), 7);
        state.new_game();
        state.score = 500;
        state.extended = true;
        state.gravity.fling(1.0, 0.0).unwrap();
        state.phase = GamePhase::GameOver;

        state.new_game();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.score, 0);
        assert!(!state.extended);
        assert_eq!(state.gravity.target(), Vec2::ZERO);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = GameState::new(SimConfig::default(), 42);
        let mut b = GameState::new(SimConfig::default(), 42);
        a.new_game();
        b.new_game();
        let pa: Vec<_> = a.registry.iter().map(|b| (b.tier, b.pos)).collect();
        let pb: Vec<_> = b.registry.iter().map(|b| (b.tier, b.pos)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_pause_transitions() {
        let mut state = GameState::new(SimConfig::default(), 1);
        assert!(!state.pause_game(), "nothing to pause before a game");
        state.new_game();
        assert!(state.pause_game());
        assert!(!state.pause_game());
        assert!(state.tap(10.0, 10.0));
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_unpause_does_not_leave_won() {
        let mut state = GameState::new(SimConfig::default(), 1);
        state.new_game();
        state.phase = GamePhase::Won;
        assert!(!state.unpause());
        assert!(state.continue_playing());
        assert!(state.extended);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_fling_spawns_under_default_policy() {
        let mut state = GameState::new(SimConfig::default(), 3);
        state.new_game();
        let before = state.registry.len();
        state.fling(0.0, 1.0).unwrap();
        assert_eq!(state.registry.len(), before + 1);

        assert!(state.fling(0.0, 0.0).is_err());
        assert_eq!(state.registry.len(), before + 1, "rejected flings do not spawn");
    }

    #[test]
    fn test_tilt_never_spawns() {
        let mut state = GameState::new(SimConfig::default(), 3);
        state.new_game();
        state.tilt(1.0).unwrap();
        assert_eq!(state.registry.len(), STARTING_BLOCKS);
    }

    #[test]
    fn test_input_ignored_outside_play() {
        let mut state = GameState::new(SimConfig::default(), 3);
        state.new_game();
        state.pause_game();
        state.fling(1.0, 0.0).unwrap();
        assert_eq!(state.gravity.target(), Vec2::ZERO);
        assert_eq!(state.registry.len(), STARTING_BLOCKS);
    }

    #[test]
    fn test_spawn_random_at_capacity() {
        let config = SimConfig {
            max_blocks: 2,
            ..SimConfig::default()
        };
        let mut state = GameState::new(config, 3);
        state.new_game();
        assert_eq!(
            state.spawn_random(),
            Err(SimError::CapacityExceeded { capacity: 2 })
        );
    }

    #[test]
    fn test_circle_boundary_spawns_inside() {
        let config = SimConfig {
            boundary: Boundary::Circle { radius: 200.0 },
            spawn_policy: SpawnPolicy::Manual,
            ..SimConfig::default()
        };
        let mut state = GameState::new(config, 11);
        state.new_game();
        for _ in 0..10 {
            state.spawn_random().unwrap();
        }
        for b in state.registry.iter() {
            assert!(state.config.boundary.contains(b.pos, b.radius() - 1e-3));
        }
    }

    #[test]
    fn test_tiny_field_is_widened() {
        let config = SimConfig {
            boundary: Boundary::Square { size: 30.0 },
            max_blocks: 0,
            win_tier: 0,
            ..SimConfig::default()
        };
        let mut state = GameState::new(config, 4);
        assert_eq!(
            state.config.boundary,
            Boundary::Square {
                size: MIN_FIELD_SIZE
            }
        );
        assert_eq!(state.config.max_blocks, 1);
        assert_eq!(state.config.win_tier, 2);

        state.new_game();
        assert_eq!(state.registry.len(), 1);
        let block = state.registry.iter().next().unwrap();
        assert!(state.config.boundary.contains(block.pos, block.radius()));
    }

    #[test]
    fn test_exact_fit_field_spawns() {
        let config = SimConfig {
            boundary: Boundary::Square {
                size: MIN_FIELD_SIZE,
            },
            ..SimConfig::default()
        };
        let mut state = GameState::new(config.clone(), 8);
        assert_eq!(state.config, config, "usable settings are kept");
        for _ in 0..20 {
            state.new_game();
            assert!(state.registry.iter().all(|b| b.is_finite()));
        }
    }

    #[test]
    fn test_non_finite_field_falls_back() {
        let config = SimConfig {
            boundary: Boundary::Circle { radius: f32::NAN },
            ..SimConfig::default()
        };
        let state = GameState::new(config, 8);
        assert_eq!(
            state.config.boundary,
            Boundary::Circle {
                radius: WORLD_SIZE / 2.0
            }
        );
    }

    #[test]
    fn test_snapshot_blocks_follow_surface() {
        let mut state = GameState::new(SimConfig::default(), 5);
        state.new_game();
        assert!(state.snapshot(false).blocks.is_empty());
        let snap = state.snapshot(true);
        assert_eq!(snap.blocks.len(), snap.block_count);
    }
}
