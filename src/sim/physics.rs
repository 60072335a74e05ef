//! Physics stepper
//!
//! One tick is split into phases so the merge resolver can run between
//! contact detection and the final separation passes:
//!
//! 1. [`integrate`]: gravity, speed ceiling, semi-implicit Euler
//! 2. [`confine_all`]: wall bounce
//! 3. [`resolve_contacts`]: impulses for unequal pairs, merge queue for equal ones
//! 4. (merges)
//! 5. [`relax`]: positional separation until no pair overlaps
//! 6. [`check_finite`]: divergence guard

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::block::{Block, BlockId};
use super::broadphase::SpatialGrid;
use super::geometry::{Boundary, circle_contact};
use super::registry::BlockRegistry;
use crate::consts::*;
use crate::error::SimError;

/// Overlap below this is treated as resolved. Equal tiers this close count as touching.
pub const SEPARATION_TOLERANCE: f32 = 1.0e-3;

/// Tunable physical constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParams {
    /// Block-block restitution
    pub restitution: f32,
    /// Fraction of normal speed kept on wall bounces
    pub wall_restitution: f32,
    /// Velocity ceiling applied every tick
    pub max_speed: f32,
    /// Most separation passes per tick
    pub solver_iterations: u32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            restitution: BLOCK_RESTITUTION,
            wall_restitution: WALL_RESTITUTION,
            max_speed: MAX_SPEED,
            solver_iterations: SOLVER_ITERATIONS,
        }
    }
}

/// What the contact phase found
#[derive(Debug, Clone, Default)]
pub struct ContactReport {
    /// Equal-tier pairs to merge, in detection order. No id appears twice.
    pub merge_pairs: Vec<(BlockId, BlockId)>,
    /// Summed penetration of non-merging contacts
    pub compression: f32,
}

/// Apply gravity and move every block
pub fn integrate(registry: &mut BlockRegistry, gravity: Vec2, max_speed: f32, dt: f32) {
    for block in registry.iter_mut() {
        block.vel += gravity * dt;
        block.vel = block.vel.clamp_length_max(max_speed);
        block.pos += block.vel * dt;
    }
}

/// Bounce blocks off the boundary. Returns the summed wall penetration.
pub fn confine_all(registry: &mut BlockRegistry, boundary: &Boundary, restitution: f32) -> f32 {
    let mut depth = 0.0;
    for block in registry.iter_mut() {
        let radius = block.radius();
        depth += boundary.confine(&mut block.pos, &mut block.vel, radius, restitution);
    }
    depth
}

/// Detect contacts, exchange momentum for unequal pairs and queue equal pairs.
///
/// A block is claimed by at most one merge per tick; further equal-tier
/// contacts involving it wait for the next tick.
pub fn resolve_contacts(
    registry: &mut BlockRegistry,
    grid: &mut SpatialGrid,
    restitution: f32,
) -> ContactReport {
    let mut report = ContactReport::default();
    let blocks = registry.as_mut_slice();
    grid.rebuild(blocks.iter().map(|b| (b.pos, b.radius())));

    let mut claimed = vec![false; blocks.len()];

    for (i, j) in grid.candidate_pairs() {
        let (a, b) = pair_mut(blocks, i, j);

        if a.tier == b.tier && a.tier.next().is_some() {
            let reach = a.radius() + b.radius() + SEPARATION_TOLERANCE;
            if (a.pos - b.pos).length_squared() <= reach * reach {
                if !claimed[i] && !claimed[j] {
                    claimed[i] = true;
                    claimed[j] = true;
                    report.merge_pairs.push((a.id, b.id));
                }
                continue;
            }
        }

        let contact = circle_contact(a.pos, a.radius(), b.pos, b.radius());
        if !contact.hit {
            continue;
        }
        report.compression += contact.penetration;

        let n = contact.normal;
        let closing = n.dot(a.vel - b.vel);
        if closing < 0.0 {
            let (ma, mb) = (a.mass(), b.mass());
            let impulse = -(1.0 + restitution) * closing / (1.0 / ma + 1.0 / mb);
            a.vel += n * (impulse / ma);
            b.vel -= n * (impulse / mb);
        }
    }

    report
}

/// Push overlapping blocks apart until no pair overlaps.
///
/// Gauss-Seidel over the contact pairs: each overlapping pair is separated
/// fully, split by inverse mass, and both blocks are clamped to the boundary
/// right away. Whatever a clamp takes from a block pinned against a wall is
/// handed to its partner. Passes repeat until the deepest overlap found in a
/// pass is below tolerance or `iterations` passes have run.
///
/// Returns the deepest overlap seen in the last pass.
pub fn relax(
    registry: &mut BlockRegistry,
    grid: &mut SpatialGrid,
    boundary: &Boundary,
    iterations: u32,
) -> f32 {
    let blocks = registry.as_mut_slice();
    let mut worst = 0.0f32;

    // Merged blocks grow and may reach past a wall
    for block in blocks.iter_mut() {
        let radius = block.radius();
        boundary.clamp_position(&mut block.pos, radius);
    }

    for _ in 0..iterations.max(1) {
        grid.rebuild(blocks.iter().map(|b| (b.pos, b.radius())));
        worst = 0.0;

        for (i, j) in grid.candidate_pairs() {
            let (a, b) = pair_mut(blocks, i, j);
            let contact = circle_contact(a.pos, a.radius(), b.pos, b.radius());
            if !contact.hit {
                continue;
            }
            worst = worst.max(contact.penetration);
            separate(a, b, contact.normal, contact.penetration, boundary);
        }

        if worst < SEPARATION_TOLERANCE {
            break;
        }
    }

    worst
}

/// Move `a` along `normal` and `b` against it until they just touch
fn separate(a: &mut Block, b: &mut Block, normal: Vec2, depth: f32, boundary: &Boundary) {
    let (wa, wb) = (1.0 / a.mass(), 1.0 / b.mass());
    let share_a = wa / (wa + wb);

    let short_a = shift(a, normal * (depth * share_a), boundary);
    let short_b = shift(b, -normal * (depth * (1.0 - share_a) + short_a), boundary);
    if short_b > 0.0 {
        shift(a, normal * short_b, boundary);
    }
}

/// Move a block by `delta`, clamped to the boundary.
/// Returns how much of the move along `delta` the wall refused.
fn shift(block: &mut Block, delta: Vec2, boundary: &Boundary) -> f32 {
    let wanted = delta.length();
    if wanted <= 0.0 {
        return 0.0;
    }
    let radius = block.radius();
    let start = block.pos;
    block.pos += delta;
    boundary.clamp_position(&mut block.pos, radius);
    let moved = (block.pos - start).dot(delta) / wanted;
    (wanted - moved).max(0.0)
}

/// Fail on the first block whose state stopped being finite
pub fn check_finite(registry: &BlockRegistry) -> Result<(), SimError> {
    match registry.iter().find(|b| !b.is_finite()) {
        Some(block) => Err(SimError::NumericalFault { id: block.id }),
        None => Ok(()),
    }
}

/// Deepest overlap between any two blocks (diagnostics and tests)
pub fn max_overlap(registry: &BlockRegistry) -> f32 {
    let blocks: Vec<&Block> = registry.iter().collect();
    let mut worst = 0.0f32;
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            let overlap = a.radius() + b.radius() - (a.pos - b.pos).length();
            worst = worst.max(overlap);
        }
    }
    worst
}

fn pair_mut(blocks: &mut [Block], i: usize, j: usize) -> (&mut Block, &mut Block) {
    debug_assert!(i < j);
    let (head, tail) = blocks.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::block::Tier;

    fn tier(rank: u8) -> Tier {
        Tier::new(rank).unwrap()
    }

    #[test]
    fn test_integrate_is_semi_implicit() {
        let mut reg = BlockRegistry::new(4);
        let id = reg.spawn(tier(1), Vec2::new(100.0, 100.0), Vec2::ZERO).unwrap();
        integrate(&mut reg, Vec2::new(0.0, 60.0), MAX_SPEED, 1.0 / 60.0);
        let b = reg.get(id).unwrap();
        assert!((b.vel.y - 1.0).abs() < 1e-5);
        // Position uses the updated velocity
        assert!((b.pos.y - (100.0 + 1.0 / 60.0)).abs() < 1e-4);
    }

    #[test]
    fn test_speed_ceiling() {
        let mut reg = BlockRegistry::new(4);
        let id = reg.spawn(tier(1), Vec2::splat(256.0), Vec2::new(1.0e9, 0.0)).unwrap();
        integrate(&mut reg, Vec2::ZERO, 500.0, SIM_DT);
        assert!(reg.get(id).unwrap().vel.length() <= 500.0 + 1e-3);
    }

    #[test]
    fn test_unequal_contact_exchanges_momentum() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0)).unwrap();
        let b = reg.spawn(tier(2), Vec2::new(128.0, 100.0), Vec2::ZERO).unwrap();
        let before = reg.get(a).unwrap().momentum() + reg.get(b).unwrap().momentum();

        let mut grid = SpatialGrid::new();
        let report = resolve_contacts(&mut reg, &mut grid, 0.5);
        assert!(report.merge_pairs.is_empty());
        assert!((report.compression - 2.0).abs() < 1e-3);

        let after = reg.get(a).unwrap().momentum() + reg.get(b).unwrap().momentum();
        assert!((after - before).length() / before.length() < 1e-4);
        assert!(reg.get(b).unwrap().vel.x > 0.0);
    }

    #[test]
    fn test_equal_tiers_are_queued_not_bounced() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::new(100.0, 100.0), Vec2::new(5.0, 0.0)).unwrap();
        let b = reg.spawn(tier(1), Vec2::new(115.0, 100.0), Vec2::ZERO).unwrap();

        let mut grid = SpatialGrid::new();
        let report = resolve_contacts(&mut reg, &mut grid, 0.5);
        assert_eq!(report.merge_pairs, vec![(a, b)]);
        assert_eq!(reg.get(a).unwrap().vel, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_block_merges_once_per_tick() {
        let mut reg = BlockRegistry::new(4);
        reg.spawn(tier(1), Vec2::new(100.0, 100.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(1), Vec2::new(119.0, 100.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(1), Vec2::new(138.0, 100.0), Vec2::ZERO).unwrap();

        let mut grid = SpatialGrid::new();
        let report = resolve_contacts(&mut reg, &mut grid, 0.5);
        assert_eq!(report.merge_pairs.len(), 1);
    }

    #[test]
    fn test_relax_removes_overlap() {
        let mut reg = BlockRegistry::new(8);
        reg.spawn(tier(1), Vec2::new(200.0, 200.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(2), Vec2::new(210.0, 205.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(3), Vec2::new(220.0, 190.0), Vec2::ZERO).unwrap();

        let boundary = Boundary::default();
        let mut grid = SpatialGrid::new();
        relax(&mut reg, &mut grid, &boundary, 32);
        assert!(max_overlap(&reg) < OVERLAP_EPSILON);
        for b in reg.iter() {
            assert!(boundary.contains(b.pos, b.radius() - 1e-3));
        }
    }

    #[test]
    fn test_touching_equal_tiers_merge_but_gaps_do_not() {
        let mut reg = BlockRegistry::new(4);
        let a = reg.spawn(tier(1), Vec2::new(100.0, 100.0), Vec2::ZERO).unwrap();
        let b = reg.spawn(tier(1), Vec2::new(120.0, 100.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(1), Vec2::new(300.0, 100.0), Vec2::ZERO).unwrap();
        reg.spawn(tier(1), Vec2::new(320.5, 100.0), Vec2::ZERO).unwrap();

        let mut grid = SpatialGrid::new();
        let report = resolve_contacts(&mut reg, &mut grid, 0.5);
        assert_eq!(report.merge_pairs, vec![(a, b)]);
    }

    #[test]
    fn test_block_against_wall_pushes_partner() {
        let mut reg = BlockRegistry::new(4);
        let small = reg.spawn(tier(1), Vec2::new(256.0, 502.0), Vec2::ZERO).unwrap();
        let big = reg.spawn(tier(3), Vec2::new(256.0, 470.0), Vec2::ZERO).unwrap();

        let mut grid = SpatialGrid::new();
        relax(&mut reg, &mut grid, &Boundary::default(), SOLVER_ITERATIONS);

        assert_eq!(reg.get(small).unwrap().pos, Vec2::new(256.0, 502.0));
        assert!((reg.get(big).unwrap().pos.y - 462.0).abs() < 1e-3);
        assert!(max_overlap(&reg) < 1e-2);
    }

    #[test]
    fn test_relax_settles_pile_in_corner() {
        let mut reg = BlockRegistry::new(32);
        for i in 0..24u8 {
            let rank = 1 + i % 3;
            let offset = Vec2::new((i % 6) as f32 * 12.0, (i / 6) as f32 * 12.0);
            reg.spawn(tier(rank), Vec2::new(440.0, 440.0) + offset, Vec2::ZERO)
                .unwrap();
        }

        let boundary = Boundary::default();
        let mut grid = SpatialGrid::new();
        for _ in 0..10 {
            relax(&mut reg, &mut grid, &boundary, SOLVER_ITERATIONS);
        }
        assert!(max_overlap(&reg) < OVERLAP_EPSILON, "{}", max_overlap(&reg));
        for b in reg.iter() {
            assert!(boundary.contains(b.pos, b.radius() - 1e-3));
        }
    }

    #[test]
    fn test_check_finite_flags_nan() {
        let mut reg = BlockRegistry::new(4);
        let id = reg.spawn(tier(1), Vec2::new(f32::NAN, 0.0), Vec2::ZERO).unwrap();
        assert_eq!(check_finite(&reg), Err(SimError::NumericalFault { id }));
    }
}
