//! Per-script boundary classes, one 2-bit value per code point
//!
//! The table is two-level: `code_point >> 10` picks a block of 1024 code
//! points, and each block packs four classes per byte. Blocks with no mapped
//! code point are never allocated and read as class 0.

use shapecache_core::{types::GlyphId, CharMap, Result};

const BLOCK_SHIFT: u32 = 10;
const BLOCK_BYTES: usize = 256;
const BMP_BLOCKS: usize = 0x40;
const UNICODE_BLOCKS: usize = 0x440;
const MAX_CODE_POINT: u32 = 0x10FFFF;

type Block = Box<[u8; BLOCK_BYTES]>;

/// Immutable boundary classification for one script variant
pub struct CutTable {
    blocks: Vec<Option<Block>>,
    bmp_only: bool,
}

impl CutTable {
    /// Classify every mapped code point through `classify`, which receives
    /// the mapped glyph and returns its class (only the low 2 bits are kept)
    pub fn build<F>(charmap: &dyn CharMap, classify: F) -> Result<Self>
    where
        F: Fn(GlyphId) -> u8,
    {
        let bmp_only = charmap.is_bmp_only();
        let block_count = if bmp_only { BMP_BLOCKS } else { UNICODE_BLOCKS };

        let mut blocks: Vec<Option<Block>> = Vec::new();
        blocks.try_reserve_exact(block_count)?;
        blocks.resize_with(block_count, || None);

        let mut populated = 0usize;
        for (code_point, glyph) in charmap.mappings() {
            let block = (code_point >> BLOCK_SHIFT) as usize;
            let Some(slot) = blocks.get_mut(block) else {
                continue;
            };
            let bytes = slot.get_or_insert_with(|| {
                populated += 1;
                Box::new([0u8; BLOCK_BYTES])
            });
            let class = classify(glyph) & 0x3;
            bytes[((code_point >> 2) & 0xFF) as usize] |= class << ((code_point & 0x3) * 2);
        }

        log::debug!(
            "Built cut table: {populated} of {block_count} blocks populated{}",
            if bmp_only { ", BMP only" } else { "" }
        );
        Ok(Self { blocks, bmp_only })
    }

    /// Boundary class of `code_point`, 0 when unmapped or out of range
    pub fn class(&self, code_point: u32) -> u8 {
        if code_point > MAX_CODE_POINT || (self.bmp_only && code_point > 0xFFFF) {
            return 0;
        }
        let Some(Some(bytes)) = self.blocks.get((code_point >> BLOCK_SHIFT) as usize) else {
            return 0;
        };
        (bytes[((code_point >> 2) & 0xFF) as usize] >> ((code_point & 0x3) * 2)) & 0x3
    }

    pub fn is_bmp_only(&self) -> bool {
        self.bmp_only
    }

    /// Number of allocated blocks
    pub fn populated_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }
}

impl std::fmt::Debug for CutTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutTable")
            .field("blocks", &self.blocks.len())
            .field("populated", &self.populated_blocks())
            .field("bmp_only", &self.bmp_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapecache_core::StaticCharMap;

    #[test]
    fn test_adjacent_code_points_keep_their_classes() {
        // four code points sharing one byte
        let map = StaticCharMap::identity(0x40..0x44);
        let table = CutTable::build(&map, |gid| (gid - 0x40) as u8).unwrap();
        assert_eq!(table.class(0x40), 0);
        assert_eq!(table.class(0x41), 1);
        assert_eq!(table.class(0x42), 2);
        assert_eq!(table.class(0x43), 3);
    }

    #[test]
    fn test_unmapped_and_out_of_range_read_zero() {
        let map = StaticCharMap::new([(0x20, 1)]);
        let table = CutTable::build(&map, |_| 3).unwrap();
        assert_eq!(table.class(0x20), 3);
        assert_eq!(table.class(0x21), 0);
        assert_eq!(table.class(0x4E00), 0);
        assert_eq!(table.class(0x1F600), 0);
        assert_eq!(table.class(0x110000), 0);
        assert!(table.is_bmp_only());
        assert_eq!(table.populated_blocks(), 1);
    }

    #[test]
    fn test_supplementary_planes_when_mapped() {
        let map = StaticCharMap::new([(0x20, 1), (0x1F600, 2), (0x10FFFF, 3)]);
        let table = CutTable::build(&map, |gid| gid as u8).unwrap();
        assert!(!table.is_bmp_only());
        assert_eq!(table.class(0x1F600), 2);
        assert_eq!(table.class(0x10FFFF), 3);
        assert_eq!(table.class(0x1F601), 0);
    }

    #[test]
    fn test_class_truncated_to_two_bits() {
        let map = StaticCharMap::new([(0x61, 1)]);
        let table = CutTable::build(&map, |_| 0xFE).unwrap();
        assert_eq!(table.class(0x61), 2);
    }
}
