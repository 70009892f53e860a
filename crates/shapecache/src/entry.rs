//! Cache entries: a code point key bound to a self-contained glyph graph
//!
//! An entry is built in two steps. [`CacheEntry::new`] or
//! [`CacheEntry::from_run`] capture only the key, which is enough to probe
//! the table and cheap to throw away. [`CacheEntry::populate`] then snapshots
//! the shaped sub-run, and only entries that were genuine misses get that far.

use std::collections::HashMap;

use shapecache_core::{
    error::RunError,
    types::{GlyphGraph, NodeId},
    CacheError, GlyphRun, Result,
};

use crate::hash_table::HashElement;

/// The two probe hashes of a code point sequence, reduced modulo `size`
///
/// The first accumulator shifts and folds the top bit back in, the second is
/// FNV-style multiply-xor; the pair is cheap over short keys and the two
/// values are weakly correlated, which the probe step needs.
pub fn key_hashes(code_points: &[u32], size: u16) -> (u16, u16) {
    let mut nh: u32 = 16_777_551;
    let mut nh1: u32 = 2_166_136_261;
    for &cp in code_points {
        nh = ((nh << 7) | (nh >> 31)) ^ cp;
        nh1 = nh1.wrapping_mul(16_777_619) ^ cp;
    }
    let size = size.max(1) as u32;
    ((nh % size) as u16, (nh1 % size) as u16)
}

/// One cached sub-run
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: Vec<u32>,
    graph: Option<GlyphGraph>,
}

impl CacheEntry {
    /// A key-only entry for `code_points`
    pub fn new(code_points: &[u32]) -> Result<Self> {
        let mut key = Vec::new();
        key.try_reserve_exact(code_points.len())?;
        key.extend_from_slice(code_points);
        Ok(Self { key, graph: None })
    }

    /// A key-only entry for characters `start..end` of `run`
    pub fn from_run(run: &dyn GlyphRun, start: usize, end: usize) -> Result<Self> {
        let len = run.char_count();
        if start > end || end > len {
            return Err(CacheError::InvalidRange { start, end, len });
        }

        let mut key = Vec::new();
        key.try_reserve_exact(end - start)?;
        for index in start..end {
            let info = run.char_at(index).ok_or(RunError::CharOutOfRange(index))?;
            key.push(info.code_point);
        }
        Ok(Self { key, graph: None })
    }

    pub fn key(&self) -> &[u32] {
        &self.key
    }

    pub fn is_populated(&self) -> bool {
        self.graph.is_some()
    }

    pub fn graph(&self) -> Option<&GlyphGraph> {
        self.graph.as_ref()
    }

    pub fn glyph_len(&self) -> usize {
        self.graph.as_ref().map_or(0, GlyphGraph::len)
    }

    /// Snapshot the run's active scope, which must hold the shaped sub-run
    /// starting at character `char_offset`
    ///
    /// Nodes are copied in sequence order. Sequence links become neighbours
    /// in the copy, attachment links are remapped to copy indices and
    /// character indices are made relative to the sub-run. An attachment that
    /// leaves the scope fails with [`CacheError::ForeignReference`] and
    /// leaves the entry unpopulated.
    pub fn populate(&mut self, run: &dyn GlyphRun, char_offset: usize) -> Result<()> {
        let mut order: Vec<NodeId> = Vec::new();
        order.try_reserve_exact(run.node_count())?;
        let mut cursor = run.first_node();
        while let Some(id) = cursor {
            order.push(id);
            cursor = run.next_node(id);
        }
        if order.is_empty() {
            return Err(CacheError::EmptyEntry);
        }

        let mut index: HashMap<NodeId, u32> = HashMap::new();
        index.try_reserve(order.len())?;
        for (i, id) in order.iter().enumerate() {
            index.insert(*id, i as u32);
        }

        let attrs_per_node = run.attrs_per_node();
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(order.len())?;
        let mut attrs = Vec::new();
        attrs.try_reserve_exact(order.len() * attrs_per_node)?;

        let last = order.len() - 1;
        for (i, id) in order.iter().enumerate() {
            let source = run.node(*id).ok_or(RunError::InvalidNode(*id))?;
            let attachments = [source.attached_to, source.first_child, source.next_sibling];
            if let Some(target) = attachments
                .into_iter()
                .flatten()
                .find(|target| !index.contains_key(target))
            {
                return Err(CacheError::ForeignReference { node: *id, target });
            }

            let mut node = source.clone();
            node.remap_relations(|target| index.get(&target).map(|&i| NodeId::new(i)));
            node.prev = (i > 0).then(|| NodeId::new(i as u32 - 1));
            node.next = (i < last).then(|| NodeId::new(i as u32 + 1));
            node.offset_chars(-(char_offset as i32));
            nodes.push(node);

            let source_attrs = run.node_attrs(*id);
            let start = attrs.len();
            attrs.extend(source_attrs.iter().take(attrs_per_node));
            attrs.resize(start + attrs_per_node, 0);
        }

        let graph = GlyphGraph::from_parts(nodes, attrs, attrs_per_node)?;
        log::trace!(
            "Cached {:?} as glyphs {:?}",
            self.key,
            graph.glyph_ids().collect::<Vec<_>>()
        );
        self.graph = Some(graph);
        Ok(())
    }

    /// Replace nodes `first..=last` of `run`, which start at character
    /// `char_start`, with a copy of this entry's graph
    pub fn splice_into(
        &self,
        run: &mut dyn GlyphRun,
        char_start: usize,
        first: NodeId,
        last: NodeId,
    ) -> Result<()> {
        let graph = self.graph.as_ref().ok_or(CacheError::EmptyEntry)?;
        run.splice(char_start, self.key.len(), first, last, graph)?;
        Ok(())
    }
}

impl HashElement for CacheEntry {
    fn key_eq(&self, other: &Self) -> bool {
        // slice equality compares lengths before elements
        self.key == other.key
    }

    fn hash_pair(&self, size: u16) -> (u16, u16) {
        key_hashes(&self.key, size)
    }
}
