//! Everything cached for one script variant

use shapecache_core::{types::FeatureValues, CharMap, Result, ShapingEngine};

use crate::cut_table::CutTable;
use crate::feature_cache::FeatureCache;
use crate::hash_table::TableStats;

/// The feature caches of one script variant plus its cut table
///
/// Feature caches are created on first use and live as long as the set.
#[derive(Debug)]
pub struct ScriptCacheSet {
    caches: Vec<FeatureCache>,
    cuts: CutTable,
    capacity: usize,
}

impl ScriptCacheSet {
    /// Build the cut table from `charmap`, classifying glyphs with `engine`
    pub fn new(charmap: &dyn CharMap, engine: &dyn ShapingEngine, capacity: usize) -> Result<Self> {
        let cuts = CutTable::build(charmap, |glyph| engine.classify_for_cut(glyph))?;
        Ok(Self::with_cut_table(cuts, capacity))
    }

    pub fn with_cut_table(cuts: CutTable, capacity: usize) -> Self {
        Self {
            caches: Vec::new(),
            cuts,
            capacity,
        }
    }

    /// The feature cache for exactly `features`, created if this is the
    /// first time they are seen
    pub fn get_or_create(&mut self, features: &FeatureValues) -> Result<&mut FeatureCache> {
        let index = self.index_or_create(features)?;
        Ok(&mut self.caches[index])
    }

    /// [`Self::get_or_create`] alongside the cut table, borrowed together
    pub fn get_or_create_with_cuts(
        &mut self,
        features: &FeatureValues,
    ) -> (Result<&mut FeatureCache>, &CutTable) {
        match self.index_or_create(features) {
            Ok(index) => (Ok(&mut self.caches[index]), &self.cuts),
            Err(e) => (Err(e), &self.cuts),
        }
    }

    pub fn get(&self, features: &FeatureValues) -> Option<&FeatureCache> {
        self.caches.iter().find(|c| c.features() == features)
    }

    /// Boundary class of a code point for this script
    pub fn boundary_class(&self, code_point: u32) -> u8 {
        self.cuts.class(code_point)
    }

    pub fn cut_table(&self) -> &CutTable {
        &self.cuts
    }

    pub fn feature_cache_count(&self) -> usize {
        self.caches.len()
    }

    pub fn feature_caches(&self) -> &[FeatureCache] {
        &self.caches
    }

    pub fn stats(&self) -> TableStats {
        self.caches.iter().fold(TableStats::default(), |mut total, cache| {
            total.merge(&cache.stats());
            total
        })
    }

    fn index_or_create(&mut self, features: &FeatureValues) -> Result<usize> {
        if let Some(index) = self.caches.iter().position(|c| c.features() == features) {
            return Ok(index);
        }

        self.caches.try_reserve(1)?;
        let cache = FeatureCache::try_new(features.clone(), self.capacity)?;
        self.caches.push(cache);
        Ok(self.caches.len() - 1)
    }
}
