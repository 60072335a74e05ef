//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by block id)
//! - No threading or platform dependencies

pub mod achievements;
pub mod block;
pub mod broadphase;
pub mod geometry;
pub mod gravity;
pub mod merge;
pub mod metrics;
pub mod physics;
pub mod registry;
pub mod state;
pub mod tick;

pub use achievements::AchievementTracker;
pub use block::{Block, BlockId, Tier};
pub use broadphase::SpatialGrid;
pub use geometry::{Boundary, Contact, circle_contact};
pub use gravity::{Direction8, GravityController};
pub use merge::{MergeRecord, merge_all, merge_pair};
pub use metrics::{PressureMeter, Snapshot};
pub use physics::{ContactReport, PhysicsParams, max_overlap};
pub use registry::BlockRegistry;
pub use state::{GameEvent, GamePhase, GameState, SimConfig, SpawnPolicy};
pub use tick::{TickInput, apply_input, tick};
