//! Pressure metric and the published snapshot
//!
//! Pressure samples how crowded the field is each tick: the share of the
//! boundary area covered by blocks, plus the contact depth of that tick
//! (block-block compression, wall penetration and any overlap the solver
//! could not separate) per block. The displayed value is the median of the
//! last [`PRESSURE_WINDOW`] samples, so single violent ticks do not spike it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::state::GamePhase;
use crate::consts::{PRESSURE_LIMIT, PRESSURE_WINDOW, RADIUS_PER_TIER};
use crate::draw::BallInstance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureMeter {
    samples: VecDeque<f32>,
    window: usize,
    limit: f32,
    median: f32,
}

impl PressureMeter {
    pub fn new(window: usize, limit: f32) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::from(vec![0.0; window]),
            window,
            limit,
            median: 0.0,
        }
    }

    /// Build one tick's sample from the solver outputs.
    /// `contact_depth` is measured in world units and scaled by [`RADIUS_PER_TIER`].
    pub fn sample(block_area: f32, field_area: f32, contact_depth: f32, blocks: usize) -> f32 {
        let fill = if field_area > 0.0 {
            block_area / field_area
        } else {
            0.0
        };
        let contact = if blocks > 0 {
            contact_depth / blocks as f32 / RADIUS_PER_TIER
        } else {
            0.0
        };
        fill + contact
    }

    /// Push a sample and refresh the median
    pub fn record(&mut self, sample: f32) {
        let sample = if sample.is_finite() { sample.max(0.0) } else { 0.0 };
        self.samples.push_back(sample);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }

        let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        self.median = sorted[sorted.len() / 2];
    }

    pub fn median(&self) -> f32 {
        self.median
    }

    /// Pressure as a 0..=100 gauge reading
    pub fn percent(&self) -> u32 {
        if self.limit <= 0.0 {
            return 0;
        }
        (self.median / self.limit * 100.0).round().clamp(0.0, 100.0) as u32
    }

    /// The field is too crowded to keep playing
    pub fn is_critical(&self) -> bool {
        self.median >= self.limit
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.samples.resize(self.window, 0.0);
        self.median = 0.0;
    }
}

impl Default for PressureMeter {
    fn default() -> Self {
        Self::new(PRESSURE_WINDOW, PRESSURE_LIMIT)
    }
}

/// Immutable copy of everything the presentation layer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub phase: GamePhase,
    pub score: u64,
    pub high_score: u64,
    /// Angle of the applied gravity, radians in [-π, π)
    pub grav_angle: f32,
    /// 0..=100
    pub pressure: u32,
    pub block_count: usize,
    /// Drawable blocks; empty while no surface is attached
    pub blocks: Vec<BallInstance>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            phase: GamePhase::New,
            score: 0,
            high_score: 0,
            grav_angle: 0.0,
            pressure: 0,
            block_count: 0,
            blocks: Vec::new(),
        }
    }
}
