//! Block colors
//!
//! Tiers walk the palette forward then backward (1, 2, .., n, n-1, .., 2, 1, 2, ..)
//! so neighbouring tiers never share a color no matter how long the game runs.

/// Default ball colors, 0xAARRGGBB
pub const DEFAULT_PALETTE: [u32; 10] = [
    0xFFEEE4DA, 0xFFEDE0C8, 0xFFF2B179, 0xFFF59563, 0xFFF67C5F, 0xFFF65E3B, 0xFFEDCF72,
    0xFFEDCC61, 0xFFEDC850, 0xFF3C3A32,
];

/// Palette slot for a tier rank (1-based) with `num_colors` entries
pub fn color_index(rank: u8, num_colors: usize) -> usize {
    if num_colors <= 1 {
        return 0;
    }
    let period = 2 * num_colors - 2;
    let index = (rank.max(1) as usize - 1) % period;
    if index >= num_colors {
        period - index
    } else {
        index
    }
}

/// Convert 0xAARRGGBB to [r, g, b, a] in 0..=1
pub fn color_to_rgba(color: u32) -> [f32; 4] {
    let channel = |shift: u32| ((color >> shift) & 0xFF) as f32 / 255.0;
    [channel(16), channel(8), channel(0), channel(24)]
}

/// Whether black text reads better than white on `rgba` (WCAG relative luminance)
pub fn text_is_dark(rgba: [f32; 4]) -> bool {
    let linear = |c: f32| {
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let luminance =
        0.2126 * linear(rgba[0]) + 0.7152 * linear(rgba[1]) + 0.0722 * linear(rgba[2]);
    luminance > 0.0525f32.sqrt() - 0.05
}
