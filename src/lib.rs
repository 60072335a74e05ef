//! Gravity 2050 - a 2048-style merge puzzle driven by real physics
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, merges, game state)
//! - `session`: Single-threaded driver around the simulation (inputs, events, snapshots)
//! - `engine`: Host-facing engine with lifecycle gates and a simulation thread
//! - `draw`: Drawable per-block data for a host renderer
//! - `persistence`: Storage backends for preferences and high scores

pub mod draw;
pub mod engine;
pub mod error;
pub mod highscores;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use engine::{Engine, EngineEvent, SurfaceInfo, UiData};
pub use error::{SimError, StorageError};
pub use highscores::HighScores;
pub use session::Session;
pub use settings::{Settings, Theme};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per wake to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Side length of the square play field (world units)
    pub const WORLD_SIZE: f32 = 512.0;
    /// Smallest accepted field extent; a spawned tier 2 block must fit
    pub const MIN_FIELD_SIZE: f32 = 40.0;

    /// Free-fall gravitational acceleration (world units/s²)
    pub const GRAVITY_STRENGTH: f32 = 200.0;
    /// Fraction of the remaining gap to the target gravity closed per tick
    pub const GRAVITY_SMOOTHING: f32 = 0.2;

    /// Coefficient of restitution between blocks
    pub const BLOCK_RESTITUTION: f32 = 0.5;
    /// Fraction of normal velocity kept when bouncing off a wall
    pub const WALL_RESTITUTION: f32 = 0.9;
    /// Velocity safety ceiling (world units/s)
    pub const MAX_SPEED: f32 = 2000.0;
    /// Most separation passes per tick (the solver stops early once separated)
    pub const SOLVER_ITERATIONS: u32 = 64;
    /// Allowed residual overlap after a tick
    pub const OVERLAP_EPSILON: f32 = 1.0;

    /// Radius per tier step
    pub const RADIUS_PER_TIER: f32 = 10.0;
    /// Highest representable tier (2^30)
    pub const MAX_TIER: u8 = 30;
    /// Tier that wins the game (2^11 = 2048)
    pub const WIN_TIER: u8 = 11;

    /// Block cap
    pub const MAX_BLOCKS: usize = 64;
    /// Blocks spawned by a new game
    pub const STARTING_BLOCKS: usize = 2;
    /// Spawn velocity is drawn from a disc of this radius
    pub const SPAWN_SPEED: f32 = 10.0;
    /// Random positions tried per spawn
    pub const SPAWN_ATTEMPTS: u32 = 8;

    /// Ticks of compression history used for pressure
    pub const PRESSURE_WINDOW: usize = 100;
    /// Median pressure sample (covered share of the field plus jam) that loses the game
    pub const PRESSURE_LIMIT: f32 = 0.75;
    /// Ticks a full, merge-less registry is tolerated before game over (3 s)
    pub const DEADLOCK_TICKS: u32 = 180;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
