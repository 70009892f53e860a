//! The top-level cache owner: one script cache set per script variant

use std::sync::Arc;

use parking_lot::Mutex;
use shapecache_core::{
    types::FeatureValues, CacheConfig, CacheError, CharMap, GlyphRun, Result, ShapingEngine,
};

use crate::feature_cache::FeatureCache;
use crate::hash_table::TableStats;
use crate::script_cache::ScriptCacheSet;
use crate::segmenter::{shape_uncached, SegmentStats, Segmenter};

/// A store shared between threads; every cache operation holds the lock
pub type SharedCacheStore = Arc<Mutex<CacheStore>>;

/// Shaping cache for one loaded font
///
/// The script count and per-bucket capacity are fixed at construction.
/// Not thread safe on its own; wrap it in a [`SharedCacheStore`] to share.
#[derive(Debug)]
pub struct CacheStore {
    scripts: Vec<ScriptCacheSet>,
    config: CacheConfig,
}

impl CacheStore {
    /// One script cache set per engine, cut tables built from `charmap`
    pub fn new(
        config: CacheConfig,
        charmap: &dyn CharMap,
        engines: &[&dyn ShapingEngine],
    ) -> Result<Self> {
        let mut scripts = Vec::new();
        scripts.try_reserve_exact(engines.len())?;
        for engine in engines {
            scripts.push(ScriptCacheSet::new(charmap, *engine, config.max_segments)?);
        }

        log::info!(
            "Shape cache ready: {} scripts, {} entries per bucket{}",
            scripts.len(),
            config.max_segments,
            if config.enabled { "" } else { " (disabled)" }
        );
        Ok(Self { scripts, config })
    }

    pub fn into_shared(self) -> SharedCacheStore {
        Arc::new(Mutex::new(self))
    }

    /// The feature cache for `features` under script `script`
    pub fn get_or_create(
        &mut self,
        script: usize,
        features: &FeatureValues,
    ) -> Result<&mut FeatureCache> {
        self.script_mut(script)?.get_or_create(features)
    }

    /// Boundary class of `code_point` for script `script`, 0 for an unknown script
    pub fn boundary_class(&self, code_point: u32, script: usize) -> u8 {
        self.scripts
            .get(script)
            .map_or(0, |set| set.boundary_class(code_point))
    }

    pub fn script(&self, script: usize) -> Option<&ScriptCacheSet> {
        self.scripts.get(script)
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    /// Entries per (script, features) bucket
    pub fn capacity(&self) -> usize {
        self.config.max_segments
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Table totals per script
    pub fn stats(&self) -> Vec<TableStats> {
        self.scripts.iter().map(ScriptCacheSet::stats).collect()
    }

    /// Shape `run` with `engine`, reusing and filling the cache for
    /// (`script`, `features`)
    ///
    /// When caching is disabled, or the bucket cannot be created, the run is
    /// shaped whole and the result is the same.
    pub fn shape(
        &mut self,
        script: usize,
        features: &FeatureValues,
        engine: &dyn ShapingEngine,
        run: &mut dyn GlyphRun,
    ) -> Result<SegmentStats> {
        if !self.config.enabled {
            return shape_uncached(engine, run);
        }

        let count = self.scripts.len();
        let policy = &self.config.policy;
        let set = self
            .scripts
            .get_mut(script)
            .ok_or(CacheError::ScriptOutOfRange {
                index: script,
                count,
            })?;
        let (cache, cuts) = set.get_or_create_with_cuts(features);
        match cache {
            Ok(cache) => Segmenter::new(policy)
                .with_cut_table(cuts)
                .shape(cache, engine, run),
            Err(e) => {
                log::warn!("No feature cache for script {script}, shaping uncached: {e}");
                shape_uncached(engine, run)
            },
        }
    }

    fn script_mut(&mut self, script: usize) -> Result<&mut ScriptCacheSet> {
        let count = self.scripts.len();
        self.scripts
            .get_mut(script)
            .ok_or(CacheError::ScriptOutOfRange {
                index: script,
                count,
            })
    }
}
