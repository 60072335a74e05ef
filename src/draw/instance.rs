//! Per-block instance data

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::palette::{DEFAULT_PALETTE, color_index, color_to_rgba, text_is_dark};
use crate::sim::Block;

/// One drawable ball, laid out for direct upload to an instance buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BallInstance {
    pub position: [f32; 2],
    pub radius: f32,
    /// Tier rank (face value is `1 << tier`)
    pub tier: u32,
    pub color: [f32; 4],
    /// 1 when the label should be drawn black, 0 for white
    pub text_dark: u32,
    pub _pad: [u32; 3],
}

impl BallInstance {
    pub fn from_block(block: &Block, palette: &[u32]) -> Self {
        let rank = block.tier.rank();
        let color = if palette.is_empty() {
            [1.0; 4]
        } else {
            color_to_rgba(palette[color_index(rank, palette.len())])
        };
        Self {
            position: block.pos.to_array(),
            radius: block.radius(),
            tier: rank as u32,
            color,
            text_dark: text_is_dark(color) as u32,
            _pad: [0; 3],
        }
    }

    /// Number printed on the ball
    pub fn label(&self) -> u64 {
        1u64 << self.tier
    }
}

/// Instances for every block, in registry order
pub fn build_instances<'a>(blocks: impl Iterator<Item = &'a Block>) -> Vec<BallInstance> {
    blocks
        .map(|b| BallInstance::from_block(b, &DEFAULT_PALETTE))
        .collect()
}
