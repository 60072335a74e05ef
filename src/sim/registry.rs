//! Block registry
//!
//! Sole owner of block storage. Everything else refers to blocks by id.
//! Blocks are kept sorted by id, which is also creation order, so iteration
//! is stable across ticks.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::block::{Block, BlockId, Tier};
use crate::error::SimError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    capacity: usize,
    next_id: u32,
}

impl BlockRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Insert a new block, failing when the cap is reached
    pub fn spawn(&mut self, tier: Tier, pos: Vec2, vel: Vec2) -> Result<BlockId, SimError> {
        if self.is_full() {
            return Err(SimError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let id = BlockId(self.next_id);
        self.next_id += 1;
        // ids are monotonic, so pushing keeps the vec sorted
        self.blocks.push(Block::new(id, tier, pos, vel));
        Ok(id)
    }

    /// Remove a block. Unknown ids are a no-op.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.index_of(id)?;
        Some(self.blocks.remove(idx))
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.index_of(id).map(|i| &self.blocks[i])
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.index_of(id).map(move |i| &mut self.blocks[i])
    }

    /// Blocks in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> + '_ {
        self.blocks.iter_mut()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    /// Drop every block. Ids keep counting up.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// True when at least two live blocks share a tier (a merge is still possible)
    pub fn has_equal_tiers(&self) -> bool {
        let mut seen = 0u64;
        for block in &self.blocks {
            let bit = 1u64 << block.tier.rank();
            if seen & bit != 0 {
                return true;
            }
            seen |= bit;
        }
        false
    }

    /// Sum of face values of all live blocks
    pub fn total_value(&self) -> u64 {
        self.blocks.iter().map(Block::value).sum()
    }

    /// Highest tier currently on the board
    pub fn max_tier(&self) -> Option<Tier> {
        self.blocks.iter().map(|b| b.tier).max()
    }

    fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.binary_search_by_key(&id, |b| b.id).ok()
    }
}
