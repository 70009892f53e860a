//! The segmentation driver: cut, look up, shape or splice
//!
//! A run arrives with one unshaped node per character. The driver walks the
//! characters, and at every cut point it either splices a cached graph over
//! the sub-run or shapes the sub-run in isolation and caches the result.
//! Either way the run ends up as if the whole thing had been shaped at once,
//! provided cuts only fall where the script has no context across them.

use serde::Serialize;
use shapecache_core::{
    types::{CharInfo, NodeId},
    CutDecision, CutPolicy, GlyphRun, Result, ShapingEngine,
};

use crate::cut_table::CutTable;
use crate::entry::CacheEntry;
use crate::feature_cache::FeatureCache;

/// What happened to the sub-runs of one shaping call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub segments: usize,
    pub hits: usize,
    pub misses: usize,
    /// Runs shaped whole, without segmentation
    pub uncached: usize,
    /// Misses whose result could not be cached
    pub cache_failures: usize,
}

impl SegmentStats {
    pub fn merge(&mut self, other: &SegmentStats) {
        self.segments += other.segments;
        self.hits += other.hits;
        self.misses += other.misses;
        self.uncached += other.uncached;
        self.cache_failures += other.cache_failures;
    }
}

enum Outcome {
    Hit,
    Miss { cached: bool },
}

/// Run every pass of `engine` over the whole run
pub fn shape_uncached(engine: &dyn ShapingEngine, run: &mut dyn GlyphRun) -> Result<SegmentStats> {
    engine.run_passes(run, 0, engine.pass_count())?;
    Ok(SegmentStats {
        uncached: 1,
        ..Default::default()
    })
}

/// Node ids of the run in sequence order
fn sequence(run: &dyn GlyphRun) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut cursor = run.first_node();
    while let Some(id) = cursor {
        ids.push(id);
        cursor = run.next_node(id);
    }
    ids
}

/// Node ids when the run still has exactly one node per character, in order
pub fn unshaped_nodes(run: &dyn GlyphRun) -> Option<Vec<NodeId>> {
    let ids = sequence(run);
    if ids.len() != run.char_count() || ids.is_empty() {
        return None;
    }
    let in_order = ids
        .iter()
        .enumerate()
        .all(|(i, id)| run.node(*id).is_some_and(|n| n.original == i as i32));
    in_order.then_some(ids)
}

/// Decides cut points and drives one run through a feature cache
pub struct Segmenter<'a> {
    policy: &'a CutPolicy,
    cuts: Option<&'a CutTable>,
}

impl<'a> Segmenter<'a> {
    pub fn new(policy: &'a CutPolicy) -> Self {
        Self { policy, cuts: None }
    }

    /// Consult `cuts` for unflagged characters, when the policy asks for it
    pub fn with_cut_table(mut self, cuts: &'a CutTable) -> Self {
        self.cuts = Some(cuts);
        self
    }

    /// How the policy treats one character
    pub fn decide(&self, info: CharInfo) -> CutDecision {
        let class = match self.cuts {
            Some(cuts) if self.policy.uses_cut_classes() => cuts.class(info.code_point),
            _ => 0,
        };
        self.policy.decide(info, class)
    }

    /// Exclusive end of every sub-run; the last is always the run length
    pub fn cut_points(&self, run: &dyn GlyphRun) -> Vec<usize> {
        let count = run.char_count();
        (0..count)
            .filter(|&i| {
                i + 1 == count || run.char_at(i).is_some_and(|info| self.decide(info).is_cut())
            })
            .map(|i| i + 1)
            .collect()
    }

    /// Shape `run` sub-run by sub-run through `cache`
    ///
    /// A run that is not one node per character is shaped whole. Failures
    /// to build or store an entry only cost the cache; engine and run
    /// failures are returned.
    pub fn shape(
        &self,
        cache: &mut FeatureCache,
        engine: &dyn ShapingEngine,
        run: &mut dyn GlyphRun,
    ) -> Result<SegmentStats> {
        if run.char_count() == 0 {
            return Ok(SegmentStats::default());
        }
        let Some(ids) = unshaped_nodes(run) else {
            log::debug!("Run is not one node per character, shaping uncached");
            return shape_uncached(engine, run);
        };

        let mut stats = SegmentStats::default();
        let mut start = 0;
        for end in self.cut_points(run) {
            let outcome = self.shape_segment(cache, engine, run, start, end, &ids)?;
            stats.segments += 1;
            match outcome {
                Outcome::Hit => stats.hits += 1,
                Outcome::Miss { cached } => {
                    stats.misses += 1;
                    if !cached {
                        stats.cache_failures += 1;
                    }
                },
            }
            start = end;
        }

        log::debug!(
            "Shaped {} chars in {} segments: {} hits, {} misses",
            run.char_count(),
            stats.segments,
            stats.hits,
            stats.misses
        );
        Ok(stats)
    }

    fn shape_segment(
        &self,
        cache: &mut FeatureCache,
        engine: &dyn ShapingEngine,
        run: &mut dyn GlyphRun,
        start: usize,
        end: usize,
        ids: &[NodeId],
    ) -> Result<Outcome> {
        let (first, last) = (ids[start], ids[end - 1]);

        let probe = match CacheEntry::from_run(run, start, end) {
            Ok(probe) => Some(probe),
            Err(e) => {
                log::warn!("Cannot build cache key for chars {start}..{end}: {e}");
                None
            },
        };

        if let Some(probe) = &probe {
            if let Some(entry) = cache.lookup(probe) {
                log::trace!("Cache hit for chars {start}..{end}");
                entry.splice_into(run, start, first, last)?;
                return Ok(Outcome::Hit);
            }
        }

        let state = run.set_scope(first, last, end - start)?;
        let shaped = engine.run_passes(run, 0, engine.pass_count());
        let populated = match (&shaped, probe) {
            (Ok(()), Some(mut entry)) => match entry.populate(run, start) {
                Ok(()) => Some(entry),
                Err(e) => {
                    log::warn!("Not caching chars {start}..{end}: {e}");
                    None
                },
            },
            _ => None,
        };
        run.restore_scope(state)?;
        shaped?;

        let cached = match populated {
            Some(entry) => {
                cache.insert(entry);
                true
            },
            None => false,
        };
        Ok(Outcome::Miss { cached })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapecache_core::{ArenaRun, StaticCharMap};

    fn run(text: &str) -> ArenaRun {
        ArenaRun::from_text(text, &StaticCharMap::identity(0x20..0x7F), 0)
    }

    #[test]
    fn test_cut_after_space_and_at_end() {
        let policy = CutPolicy::default();
        let segmenter = Segmenter::new(&policy);
        assert_eq!(segmenter.cut_points(&run("ab cd")), vec![3, 5]);
        assert_eq!(segmenter.cut_points(&run("abc")), vec![3]);
        assert_eq!(segmenter.cut_points(&run("a  b")), vec![2, 3, 4]);
    }

    #[test]
    fn test_flags_override_code_points() {
        let policy = CutPolicy::default();
        let segmenter = Segmenter::new(&policy);
        let chars = vec![
            CharInfo::new(0x61),
            CharInfo::with_flags(0x62, 2),
            CharInfo::with_flags(0x20, 1),
            CharInfo::new(0x63),
        ];
        let run = ArenaRun::new(chars, &StaticCharMap::identity(0x20..0x7F), 0);
        assert_eq!(segmenter.cut_points(&run), vec![2, 4]);
    }

    #[test]
    fn test_cut_table_only_when_policy_asks() {
        let map = StaticCharMap::identity(0x20..0x7F);
        let cuts = CutTable::build(&map, |gid| if gid == 0x2C { 2 } else { 0 }).unwrap();

        let default = CutPolicy::default();
        let plain = Segmenter::new(&default).with_cut_table(&cuts);
        assert_eq!(plain.cut_points(&run("a,b")), vec![3]);

        let classes = CutPolicy {
            min_cut_class: Some(2),
            ..Default::default()
        };
        let segmenter = Segmenter::new(&classes).with_cut_table(&cuts);
        assert_eq!(segmenter.decide(CharInfo::new(0x2C)), CutDecision::CutClass);
        assert_eq!(segmenter.cut_points(&run("a,b")), vec![2, 3]);
    }

    #[test]
    fn test_unshaped_nodes_detects_shaped_run() {
        let mut run = run("ab");
        assert_eq!(unshaped_nodes(&run).map(|ids| ids.len()), Some(2));
        let ids = run.node_ids();
        run.remove(ids[1]).unwrap();
        assert!(unshaped_nodes(&run).is_none());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = SegmentStats {
            segments: 2,
            hits: 1,
            misses: 1,
            ..Default::default()
        };
        total.merge(&SegmentStats {
            uncached: 1,
            ..Default::default()
        });
        assert_eq!((total.segments, total.uncached), (2, 1));
    }
}
