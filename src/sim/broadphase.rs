//! Uniform-grid broad phase
//!
//! Cells are at least one block diameter wide, so any two touching blocks
//! sit in the same or adjacent cells and only those need a narrow-phase test.

use std::collections::HashMap;

use glam::Vec2;

const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, Default)]
pub struct SpatialGrid {
    cell: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    keys: Vec<(i32, i32)>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket `(position, radius)` entries; indices refer to the input order
    pub fn rebuild(&mut self, entries: impl Iterator<Item = (Vec2, f32)>) {
        self.cells.clear();
        self.keys.clear();

        let entries: Vec<(Vec2, f32)> = entries.collect();
        let max_radius = entries.iter().map(|&(_, r)| r).fold(0.0f32, f32::max);
        self.cell = (2.0 * max_radius).max(1.0);

        for (idx, &(pos, _)) in entries.iter().enumerate() {
            let key = self.key_for(pos);
            self.cells.entry(key).or_default().push(idx);
            self.keys.push(key);
        }
    }

    /// Candidate pairs `(i, j)` with `i < j`, sorted for a stable solve order
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, &(cx, cy)) in self.keys.iter().enumerate() {
            for (ox, oy) in NEIGHBOR_OFFSETS {
                let Some(bucket) = self.cells.get(&(cx + ox, cy + oy)) else {
                    continue;
                };
                pairs.extend(bucket.iter().filter(|&&j| j > i).map(|&j| (i, j)));
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn key_for(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell).floor() as i32,
            (pos.y / self.cell).floor() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_far_apart_blocks_are_not_paired() {
        let mut grid = SpatialGrid::new();
        grid.rebuild(
            [
                (Vec2::new(10.0, 10.0), 10.0),
                (Vec2::new(25.0, 10.0), 10.0),
                (Vec2::new(400.0, 400.0), 10.0),
            ]
            .into_iter(),
        );
        assert_eq!(grid.candidate_pairs(), vec![(0, 1)]);
    }

    #[test]
    fn test_every_touching_pair_is_found() {
        let entries: Vec<(Vec2, f32)> = (0..20)
            .map(|i| (Vec2::new(i as f32 * 15.0, (i % 3) as f32 * 15.0), 10.0))
            .collect();
        let mut grid = SpatialGrid::new();
        grid.rebuild(entries.iter().copied());
        let pairs = grid.candidate_pairs();

        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (pa, ra) = entries[i];
                let (pb, rb) = entries[j];
                if (pa - pb).length() < ra + rb {
                    assert!(pairs.contains(&(i, j)), "missing pair {i},{j}");
                }
            }
        }
    }
}
