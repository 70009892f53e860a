//! One cache bucket per distinct set of feature settings

use shapecache_core::{
    types::{FeatureValues, GlyphId},
    Result, ShapingEngine,
};

use crate::entry::CacheEntry;
use crate::hash_table::{Insertion, LruHashTable, TableStats};

/// The entries shaped under one exact set of feature settings
pub struct FeatureCache {
    features: FeatureValues,
    table: LruHashTable<CacheEntry>,
}

impl FeatureCache {
    /// An empty bucket holding at most `capacity` slots
    pub fn try_new(features: FeatureValues, capacity: usize) -> Result<Self> {
        let table = LruHashTable::try_new(capacity)?;
        log::debug!(
            "New feature cache for {:?} with {} slots",
            features.values(),
            table.size()
        );
        Ok(Self { features, table })
    }

    pub fn features(&self) -> &FeatureValues {
        &self.features
    }

    pub fn table(&self) -> &LruHashTable<CacheEntry> {
        &self.table
    }

    /// Find the entry whose key equals `probe`'s and mark it most recent
    pub fn lookup(&mut self, probe: &CacheEntry) -> Option<&CacheEntry> {
        self.table.find(probe)
    }

    /// Store a populated entry, keeping the existing one if the key is taken
    pub fn insert(&mut self, entry: CacheEntry) -> Insertion<'_, CacheEntry> {
        self.table.insert(entry)
    }

    /// Whether `glyph` begins a contextual sequence under `engine`'s rules
    pub fn is_context_initial(&self, glyph: GlyphId, engine: &dyn ShapingEngine) -> bool {
        engine.is_context_initial(glyph)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }
}

impl std::fmt::Debug for FeatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureCache")
            .field("features", &self.features)
            .field("entries", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code_points: &[u32]) -> CacheEntry {
        CacheEntry::new(code_points).unwrap()
    }

    #[test]
    fn test_lookup_after_insert() {
        let mut cache = FeatureCache::try_new(FeatureValues::default(), 16).unwrap();
        assert!(cache.lookup(&entry(&[0x61])).is_none());

        assert!(!cache.insert(entry(&[0x61])).is_existing());
        assert!(cache.insert(entry(&[0x61])).is_existing());

        let found = cache.lookup(&entry(&[0x61])).unwrap();
        assert_eq!(found.key(), &[0x61]);
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_capacity_rounds_to_odd_table() {
        let cache = FeatureCache::try_new(FeatureValues::default(), 1000).unwrap();
        assert_eq!(cache.table().size(), 1001);
        assert_eq!(cache.table().full_threshold(), 800);
    }

    #[test]
    fn test_context_initial_follows_engine() {
        use shapecache_core::StaticCharMap;
        use shapecache_shape_basic::BasicEngine;

        let mut map = StaticCharMap::identity(0x20..0x7F);
        map.insert(0xFB01, 0xFB01);
        let engine = BasicEngine::new(&map);
        let cache = FeatureCache::try_new(FeatureValues::default(), 8).unwrap();

        assert!(cache.is_context_initial(0x66, &engine));
        assert!(!cache.is_context_initial(0x61, &engine));
        assert!(!cache.is_context_initial(0xFB01, &engine));
    }

    #[test]
    fn test_features_kept_verbatim() {
        let features: FeatureValues = [("smcp", 1)].into_iter().collect();
        let cache = FeatureCache::try_new(features.clone(), 8).unwrap();
        assert_eq!(cache.features(), &features);
        assert!(cache.is_empty());
    }
}
