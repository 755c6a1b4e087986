//! Level planning: chain length and per-level dimensions.

/// Dimensions of one level in a mip chain. Level 0 is the full-resolution
/// base; level `i` is `max(1, base >> i)` per axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MipLevelDescriptor {
    pub level: u32,
    pub width: u32,
    pub height: u32,
}

impl MipLevelDescriptor {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Number of levels in a full chain: `floor(log2(max(w, h))) + 1`, i.e. the
/// chain ends at a level whose larger dimension is 1.
pub fn full_chain_length(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1);
    32 - max_dim.leading_zeros()
}

/// Plan the chain for a `width` x `height` source. `requested == 0` derives
/// the full chain; otherwise exactly `requested` levels are produced.
///
/// Dimensions shrink by right-shift truncation per axis, floored at 1, so a
/// non-power-of-two source shrinks asymmetrically (300x100 -> 150x50 -> 75x25).
pub fn plan_levels(width: u32, height: u32, requested: u32) -> Vec<MipLevelDescriptor> {
    let count = if requested > 0 {
        requested
    } else {
        full_chain_length(width, height)
    };
    (0..count)
        .map(|level| MipLevelDescriptor {
            level,
            width: (width >> level).max(1),
            height: (height >> level).max(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_chain_length_formula() {
        assert_eq!(full_chain_length(1, 1), 1);
        assert_eq!(full_chain_length(2, 2), 2);
        assert_eq!(full_chain_length(256, 256), 9);
        assert_eq!(full_chain_length(512, 512), 10);
        assert_eq!(full_chain_length(511, 511), 9);
        // The larger axis drives the length.
        assert_eq!(full_chain_length(300, 100), 9);
        assert_eq!(full_chain_length(1, 1024), 11);
    }

    #[test]
    fn auto_chain_ends_at_one() {
        for &(w, h) in &[(256, 256), (300, 100), (1, 1), (640, 480), (7, 1023)] {
            let levels = plan_levels(w, h, 0);
            let last = levels.last().unwrap();
            assert_eq!(last.width.max(last.height), 1, "source {}x{}", w, h);
        }
    }

    #[test]
    fn scenario_256_full_chain() {
        let levels = plan_levels(256, 256, 0);
        assert_eq!(levels.len(), 9);
        let widths: Vec<u32> = levels.iter().map(|l| l.width).collect();
        assert_eq!(widths, [256, 128, 64, 32, 16, 8, 4, 2, 1]);
        assert_eq!(levels[8].height, 1);
    }

    #[test]
    fn scenario_npot_capped_chain() {
        let levels = plan_levels(300, 100, 3);
        assert_eq!(levels.len(), 3);
        assert_eq!((levels[0].width, levels[0].height), (300, 100));
        assert_eq!((levels[1].width, levels[1].height), (150, 50));
        assert_eq!((levels[2].width, levels[2].height), (75, 25));
    }

    #[test]
    fn requested_count_is_exact() {
        // A cap larger than the full chain keeps emitting 1x1 levels.
        let levels = plan_levels(4, 4, 6);
        assert_eq!(levels.len(), 6);
        assert_eq!((levels[5].width, levels[5].height), (1, 1));
    }

    #[test]
    fn dimensions_follow_shift_truncation() {
        let levels = plan_levels(300, 100, 0);
        for desc in &levels {
            assert_eq!(desc.width, (300u32 >> desc.level).max(1));
            assert_eq!(desc.height, (100u32 >> desc.level).max(1));
        }
        // Non-increasing per axis.
        for pair in levels.windows(2) {
            assert!(pair[1].width <= pair[0].width);
            assert!(pair[1].height <= pair[0].height);
        }
    }
}
