//! Shapecache: shape a word once, splice it everywhere after
//!
//! Shaping is expensive and text repeats itself. This crate caches the shaped
//! glyph graphs of short sub-runs (words, syllables) and splices them back
//! into later runs that contain the same code points.
//!
//! ## The pieces
//!
//! - [`LruHashTable`] - fixed-size, double-hashed, evicts least recently used
//! - [`CacheEntry`] - a code point key plus a self-contained glyph graph
//! - [`FeatureCache`] - one table per exact set of feature settings
//! - [`ScriptCacheSet`] - the feature caches and [`CutTable`] of one script
//! - [`CacheStore`] - one script cache set per script variant
//! - [`Segmenter`] - cuts a run and drives each sub-run through the cache
//!
//! ## Shaping through the cache
//!
//! ```rust,ignore
//! use shapecache::CacheStore;
//! use shapecache_core::{types::FeatureValues, ArenaRun, CacheConfig};
//!
//! let mut store = CacheStore::new(CacheConfig::from_env(), &charmap, &[&engine])?;
//! let mut run = ArenaRun::from_text("the cat sat on the mat", &charmap, 0);
//! let stats = store.shape(0, &FeatureValues::default(), &engine, &mut run)?;
//! run.finalise();
//! ```
//!
//! The second "the" above is spliced from the cache. The glyphs that come
//! out are the same ones shaping the whole run at once would produce.

pub mod cut_table;
pub mod entry;
pub mod feature_cache;
pub mod hash_table;
pub mod script_cache;
pub mod segmenter;
pub mod store;

pub use cut_table::CutTable;
pub use entry::{key_hashes, CacheEntry};
pub use feature_cache::FeatureCache;
pub use hash_table::{probe_sequence, HashElement, Insertion, LruHashTable, TableStats};
pub use script_cache::ScriptCacheSet;
pub use segmenter::{shape_uncached, SegmentStats, Segmenter};
pub use store::{CacheStore, SharedCacheStore};

#[cfg(test)]
mod proptests;
