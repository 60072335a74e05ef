//! Merge resolver
//!
//! Two touching blocks of tier `t` become one block of tier `t + 1` at their
//! midpoint. The pair's momentum carries over to the new block, so a heavy
//! merge moving fast slows down instead of gaining energy.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::block::{BlockId, Tier};
use super::registry::BlockRegistry;

/// Outcome of a single merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub consumed: [BlockId; 2],
    pub created: BlockId,
    pub tier: Tier,
    pub pos: Vec2,
}

impl MergeRecord {
    /// Points awarded for this merge (face value of the new block)
    pub fn points(&self) -> u64 {
        self.tier.value()
    }
}

/// Merge one queued pair.
///
/// Returns `None` when either block is already gone or the tiers no longer
/// match; the pair is then simply dropped.
pub fn merge_pair(registry: &mut BlockRegistry, a: BlockId, b: BlockId) -> Option<MergeRecord> {
    let (tier, next) = {
        let first = registry.get(a)?;
        let second = registry.get(b)?;
        if first.tier != second.tier {
            return None;
        }
        (first.tier, first.tier.next()?)
    };

    let first = registry.remove(a)?;
    let second = registry.remove(b)?;
    debug_assert_eq!(first.tier, tier);

    let pos = (first.pos + second.pos) / 2.0;
    let vel = (first.momentum() + second.momentum()) / next.mass();

    // Two blocks just left, so the spawn cannot hit the cap
    let created = registry.spawn(next, pos, vel).ok()?;
    log::trace!("merged {:?}+{:?} -> {:?} (tier {})", a, b, created, next.rank());

    Some(MergeRecord {
        consumed: [a, b],
        created,
        tier: next,
        pos,
    })
}

/// Merge every queued pair in order
pub fn merge_all(registry: &mut BlockRegistry, pairs: &[(BlockId, BlockId)]) -> Vec<MergeRecord> {
    pairs
        .iter()
        .filter_map(|&(a, b)| merge_pair(registry, a, b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(rank: u8) -> Tier {
        Tier::new(rank).unwrap()
    }

    #[test]
    fn test_merge_replaces_pair_with_next_tier() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(3), Vec2::new(100.0, 100.0), Vec2::new(10.0, 0.0)).unwrap();
        let b = reg.spawn(tier(3), Vec2::new(140.0, 100.0), Vec2::new(-10.0, 0.0)).unwrap();
        let total = reg.total_value();

        let record = merge_pair(&mut reg, a, b).unwrap();
        assert_eq!(record.tier, tier(4));
        assert_eq!(record.points(), 16);
        assert_eq!(record.pos, Vec2::new(120.0, 100.0));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.total_value(), total);
        // Opposite momenta cancel
        assert!(reg.get(record.created).unwrap().vel.length() < 1e-3);
    }

    #[test]
    fn test_merge_conserves_momentum() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::ZERO, Vec2::new(30.0, 0.0)).unwrap();
        let b = reg.spawn(tier(1), Vec2::new(15.0, 0.0), Vec2::new(0.0, 30.0)).unwrap();
        let p = reg.get(a).unwrap().momentum() + reg.get(b).unwrap().momentum();

        let record = merge_pair(&mut reg, a, b).unwrap();
        let merged = reg.get(record.created).unwrap();
        assert!((merged.momentum() - p).length() / p.length() < 1e-4);
    }

    #[test]
    fn test_stale_pair_is_dropped() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::ZERO, Vec2::ZERO).unwrap();
        let b = reg.spawn(tier(1), Vec2::ZERO, Vec2::ZERO).unwrap();
        reg.remove(b);
        assert!(merge_pair(&mut reg, a, b).is_none());
        assert_eq!(reg.len(), 1, "surviving block is untouched");
    }

    #[test]
    fn test_mismatched_tiers_do_not_merge() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::ZERO, Vec2::ZERO).unwrap();
        let b = reg.spawn(tier(2), Vec2::ZERO, Vec2::ZERO).unwrap();
        assert!(merge_pair(&mut reg, a, b).is_none());
        assert_eq!(reg.len(), 2);
    }
}
