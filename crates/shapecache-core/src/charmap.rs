//! Character maps: where code points meet glyph ids
//!
//! The cache reads a character map exactly once per script variant, to build
//! its boundary classification table. [`FontCharMap`] reads a real font;
//! [`StaticCharMap`] is a plain table for tools and tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use skrifa::{FontRef, MetadataProvider};

use crate::error::{FontError, Result};
use crate::traits::CharMap;
use crate::types::GlyphId;

/// The `cmap` of a font face, flattened into sorted pairs at load time
#[derive(Debug, Clone)]
pub struct FontCharMap {
    mappings: Vec<(u32, GlyphId)>,
    face_index: u32,
}

impl FontCharMap {
    /// Read the character map of face 0
    pub fn from_data(data: &[u8]) -> Result<Self> {
        Self::from_data_index(data, 0)
    }

    /// Read the character map of one face of a collection
    pub fn from_data_index(data: &[u8], face_index: u32) -> Result<Self> {
        let font = FontRef::from_index(data, face_index).map_err(|_| FontError::InvalidData)?;

        let mut mappings: Vec<(u32, GlyphId)> = font
            .charmap()
            .mappings()
            .map(|(code_point, glyph)| (code_point, glyph.to_u32()))
            .collect();
        if mappings.is_empty() {
            return Err(FontError::MissingCharMap.into());
        }
        mappings.sort_unstable_by_key(|(code_point, _)| *code_point);
        mappings.dedup_by_key(|(code_point, _)| *code_point);

        log::debug!(
            "Loaded character map with {} mappings from face {}",
            mappings.len(),
            face_index
        );
        Ok(Self {
            mappings,
            face_index,
        })
    }

    /// Read a font file from disk
    pub fn from_file(path: impl AsRef<Path>, face_index: u32) -> Result<Self> {
        let data = fs::read(path.as_ref())
            .map_err(|_| FontError::FileNotFound(path.as_ref().display().to_string()))?;
        Self::from_data_index(&data, face_index)
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl CharMap for FontCharMap {
    fn map(&self, code_point: u32) -> Option<GlyphId> {
        self.mappings
            .binary_search_by_key(&code_point, |(cp, _)| *cp)
            .ok()
            .map(|i| self.mappings[i].1)
    }

    fn mappings(&self) -> Box<dyn Iterator<Item = (u32, GlyphId)> + '_> {
        Box::new(self.mappings.iter().copied())
    }

    fn is_bmp_only(&self) -> bool {
        self.mappings.last().map_or(true, |(cp, _)| *cp <= 0xFFFF)
    }
}

/// An in-memory character map
#[derive(Debug, Clone, Default)]
pub struct StaticCharMap {
    map: BTreeMap<u32, GlyphId>,
}

impl StaticCharMap {
    pub fn new(pairs: impl IntoIterator<Item = (u32, GlyphId)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Map every code point in `range` to itself
    pub fn identity(range: std::ops::Range<u32>) -> Self {
        Self::new(range.map(|c| (c, c)))
    }

    pub fn insert(&mut self, code_point: u32, glyph: GlyphId) {
        self.map.insert(code_point, glyph);
    }
}

impl CharMap for StaticCharMap {
    fn map(&self, code_point: u32) -> Option<GlyphId> {
        self.map.get(&code_point).copied()
    }

    fn mappings(&self) -> Box<dyn Iterator<Item = (u32, GlyphId)> + '_> {
        Box::new(self.map.iter().map(|(cp, gid)| (*cp, *gid)))
    }

    fn is_bmp_only(&self) -> bool {
        self.map
            .last_key_value()
            .map_or(true, |(cp, _)| *cp <= 0xFFFF)
    }
}
