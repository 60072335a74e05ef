//! Per-game achievement tracking: each tier unlocks once

use serde::{Deserialize, Serialize};

use super::block::Tier;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementTracker {
    reached: u64,
}

impl AchievementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tier without unlocking it (blocks present at spawn)
    pub fn seed(&mut self, tier: Tier) {
        self.reached |= Self::bit(tier);
    }

    /// Mark a tier as reached. True only the first time in this game.
    pub fn reach(&mut self, tier: Tier) -> bool {
        let bit = Self::bit(tier);
        let fresh = self.reached & bit == 0;
        self.reached |= bit;
        fresh
    }

    pub fn has_reached(&self, tier: Tier) -> bool {
        self.reached & Self::bit(tier) != 0
    }

    pub fn reset(&mut self) {
        self.reached = 0;
    }

    fn bit(tier: Tier) -> u64 {
        1u64 << tier.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_tier_fires_once() {
        let mut t = AchievementTracker::new();
        let four = Tier::new(4).unwrap();
        assert!(t.reach(four));
        assert!(!t.reach(four));
        assert!(t.has_reached(four));

        t.reset();
        assert!(t.reach(four), "a new game starts fresh");
    }

    #[test]
    fn test_seeded_tiers_stay_silent() {
        let mut t = AchievementTracker::new();
        let two = Tier::new(2).unwrap();
        t.seed(two);
        assert!(!t.reach(two));
    }
}
