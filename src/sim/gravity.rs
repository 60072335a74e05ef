//! Gravity controller
//!
//! Flings, D-pad nudges and tilt samples only set a target direction; the
//! gravity actually applied eases toward it once per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::normalize_angle;

/// Eight-way directional nudge (keyboard / D-pad)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction8 {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction8 {
    /// Equivalent fling vector (screen space, y down)
    pub fn as_vector(self) -> Vec2 {
        match self {
            Direction8::Up => Vec2::new(0.0, -1.0),
            Direction8::Down => Vec2::new(0.0, 1.0),
            Direction8::Left => Vec2::new(-1.0, 0.0),
            Direction8::Right => Vec2::new(1.0, 0.0),
            Direction8::UpLeft => Vec2::new(-1.0, -1.0),
            Direction8::UpRight => Vec2::new(1.0, -1.0),
            Direction8::DownLeft => Vec2::new(-1.0, 1.0),
            Direction8::DownRight => Vec2::new(1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityController {
    /// Magnitude of the applied gravity
    strength: f32,
    /// Fraction of the remaining gap closed per tick (0, 1]
    smoothing: f32,
    target: Vec2,
    current: Vec2,
}

impl GravityController {
    pub fn new(strength: f32, smoothing: f32) -> Self {
        Self {
            strength,
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
            target: Vec2::ZERO,
            current: Vec2::ZERO,
        }
    }

    /// Point gravity along a fling gesture
    pub fn fling(&mut self, dx: f32, dy: f32) -> Result<(), SimError> {
        let dir = Vec2::new(dx, dy);
        if !dir.is_finite() {
            return Err(SimError::InvalidInput("non-finite fling"));
        }
        let dir = dir
            .try_normalize()
            .ok_or(SimError::InvalidInput("zero-length fling"))?;
        self.target = dir * self.strength;
        Ok(())
    }

    pub fn nudge(&mut self, direction: Direction8) -> Result<(), SimError> {
        let v = direction.as_vector();
        self.fling(v.x, v.y)
    }

    /// Continuous sensor angle (radians, screen space)
    pub fn tilt(&mut self, angle: f32) -> Result<(), SimError> {
        if !angle.is_finite() {
            return Err(SimError::InvalidInput("non-finite tilt"));
        }
        self.target = Vec2::from_angle(angle) * self.strength;
        Ok(())
    }

    /// Ease the applied gravity toward the target (once per tick)
    pub fn step(&mut self) {
        self.current += (self.target - self.current) * self.smoothing;
        if (self.target - self.current).length_squared() < 1.0e-6 {
            self.current = self.target;
        }
    }

    /// Applied gravity vector
    #[inline]
    pub fn current(&self) -> Vec2 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Angle of the applied gravity in [-π, π); zero when there is no gravity
    pub fn angle(&self) -> f32 {
        if self.current == Vec2::ZERO {
            return 0.0;
        }
        normalize_angle(self.current.y.atan2(self.current.x))
    }

    /// Drop to zero gravity (new game)
    pub fn reset(&mut self) {
        self.target = Vec2::ZERO;
        self.current = Vec2::ZERO;
    }
}
