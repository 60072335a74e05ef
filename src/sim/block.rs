//! Block entity and the tier laws
//!
//! A block's radius and mass depend only on its tier, so they are derived
//! on demand instead of stored.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_TIER, RADIUS_PER_TIER};

/// Stable block identity (monotonic within a game, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Rank in the power-of-two value sequence (tier 1 = 2, tier 11 = 2048)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tier(u8);

impl Tier {
    pub const MIN: Tier = Tier(1);
    pub const MAX: Tier = Tier(MAX_TIER);

    /// Build a tier, rejecting ranks outside `1..=MAX_TIER`
    pub fn new(rank: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&rank).then_some(Self(rank))
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.0
    }

    /// Face value shown on the block
    #[inline]
    pub fn value(self) -> u64 {
        1u64 << self.0
    }

    /// Tier produced by merging two blocks of this tier
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    #[inline]
    pub fn radius(self) -> f32 {
        self.0 as f32 * RADIUS_PER_TIER
    }

    /// Mass of a solid sphere of `radius` at unit density
    #[inline]
    pub fn mass(self) -> f32 {
        4.0 / 3.0 * std::f32::consts::PI * self.radius().powi(3)
    }
}

/// A numbered ball in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub tier: Tier,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Block {
    pub fn new(id: BlockId, tier: Tier, pos: Vec2, vel: Vec2) -> Self {
        Self { id, tier, pos, vel }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.tier.radius()
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.tier.mass()
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.tier.value()
    }

    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass()
    }

    /// True when position and velocity are usable numbers
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_bounds() {
        assert!(Tier::new(0).is_none());
        assert!(Tier::new(MAX_TIER + 1).is_none());
        assert_eq!(Tier::new(11).map(Tier::value), Some(2048));
        assert!(Tier::MAX.next().is_none());
    }

    #[test]
    fn test_radius_and_mass_grow_with_tier() {
        let small = Tier::new(1).unwrap();
        let big = small.next().unwrap();
        assert_eq!(small.radius(), 10.0);
        assert_eq!(big.radius(), 20.0);
        assert!(big.mass() > small.mass());
    }

    #[test]
    fn test_merge_conserves_value() {
        for rank in 1..MAX_TIER {
            let t = Tier::new(rank).unwrap();
            assert_eq!(t.value() * 2, t.next().unwrap().value());
        }
    }
}
