//! An arena-backed live run
//!
//! [`ArenaRun`] is the reference [`GlyphRun`]: nodes live in a `Vec`, removed
//! nodes leave a hole, and every relation is a [`NodeId`] into that `Vec`.
//! User attributes sit in a parallel block, `attrs_per_node` slots per node.

use std::collections::HashMap;

use crate::error::RunError;
use crate::traits::{CharMap, GlyphRun, ScopeState};
use crate::types::{CharInfo, GlyphGraph, GlyphId, GlyphNode, NodeId, Point, ShapedGlyph};

/// A mutable run of glyph nodes over a fixed character sequence
#[derive(Debug, Clone)]
pub struct ArenaRun {
    chars: Vec<CharInfo>,
    nodes: Vec<Option<GlyphNode>>,
    attrs: Vec<i16>,
    attrs_per_node: usize,
    first: Option<NodeId>,
    last: Option<NodeId>,
    /// Characters covered by the active scope
    scope_chars: usize,
}

impl ArenaRun {
    /// One node per character, glyphs taken from the character map
    ///
    /// Unmapped characters get glyph 0 (.notdef).
    pub fn new(chars: Vec<CharInfo>, charmap: &dyn CharMap, attrs_per_node: usize) -> Self {
        let mut run = Self {
            nodes: Vec::with_capacity(chars.len()),
            attrs: Vec::with_capacity(chars.len() * attrs_per_node),
            attrs_per_node,
            first: None,
            last: None,
            scope_chars: chars.len(),
            chars: Vec::new(),
        };

        let mut prev: Option<NodeId> = None;
        for (index, info) in chars.iter().enumerate() {
            let glyph = charmap.map(info.code_point).unwrap_or(0);
            let mut node = GlyphNode::new(glyph, index as i32);
            node.prev = prev;
            let id = run.alloc(node);
            if let Some(p) = prev.and_then(|p| run.slot_mut(p)) {
                p.next = Some(id);
            }
            if run.first.is_none() {
                run.first = Some(id);
            }
            run.last = Some(id);
            prev = Some(id);
        }

        run.chars = chars;
        run
    }

    /// Convenience constructor from text with no per-character flags
    pub fn from_text(text: &str, charmap: &dyn CharMap, attrs_per_node: usize) -> Self {
        let chars = text.chars().map(|c| CharInfo::new(c as u32)).collect();
        Self::new(chars, charmap, attrs_per_node)
    }

    /// Code points of characters `start..end`
    pub fn code_points(&self, start: usize, end: usize) -> Option<Vec<u32>> {
        self.chars
            .get(start..end)
            .map(|chars| chars.iter().map(|c| c.code_point).collect())
    }

    /// Node ids in sequence order, within the active scope
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cursor = self.first;
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next_node(id);
        }
        ids
    }

    pub fn glyph_ids(&self) -> Vec<GlyphId> {
        self.node_ids()
            .into_iter()
            .filter_map(|id| self.node(id).map(|n| n.glyph))
            .collect()
    }

    /// Resolve absolute origins once shaping is complete
    ///
    /// Unattached glyphs sit on a pen that advances left to right; attached
    /// glyphs sit at their parent's origin plus their attachment offset.
    pub fn finalise(&mut self) {
        let ids = self.node_ids();
        let mut pen = 0.0f32;
        for &id in &ids {
            if let Some(node) = self.slot_mut(id) {
                if node.attached_to.is_none() {
                    node.origin = Point::new(pen, 0.0);
                    pen += node.advance.x;
                }
            }
        }

        for &id in &ids {
            let mut offset = Point::ZERO;
            let mut cursor = id;
            let mut depth = 0;
            while let Some(node) = self.node(cursor) {
                match node.attached_to {
                    Some(parent) if depth < self.nodes.len() => {
                        offset.x += node.attach_offset.x;
                        offset.y += node.attach_offset.y;
                        cursor = parent;
                        depth += 1;
                    },
                    _ => break,
                }
            }
            if depth == 0 {
                continue;
            }
            let base = self.node(cursor).map(|n| n.origin).unwrap_or(Point::ZERO);
            if let Some(node) = self.slot_mut(id) {
                node.origin = Point::new(base.x + offset.x, base.y + offset.y);
            }
        }
    }

    /// The run's glyphs as callers see them
    pub fn shaped_glyphs(&self) -> Vec<ShapedGlyph> {
        let ids = self.node_ids();
        let position: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        ids.iter()
            .filter_map(|id| self.node(*id))
            .map(|node| ShapedGlyph {
                glyph: node.glyph,
                x: node.origin.x,
                y: node.origin.y,
                advance: node.advance.x,
                original: node.original,
                attached_to: node.attached_to.and_then(|p| position.get(&p).copied()),
            })
            .collect()
    }

    fn alloc(&mut self, node: GlyphNode) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.attrs
            .extend(std::iter::repeat(0).take(self.attrs_per_node));
        id
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut GlyphNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn require(&self, id: NodeId) -> Result<&GlyphNode, RunError> {
        self.node(id).ok_or(RunError::InvalidNode(id))
    }

    /// Ids of `first..=last`, failing if the chain is broken
    fn chain(&self, first: NodeId, last: NodeId) -> Result<Vec<NodeId>, RunError> {
        let mut ids = Vec::new();
        let mut cursor = Some(first);
        while let Some(id) = cursor {
            self.require(id)?;
            ids.push(id);
            if id == last {
                return Ok(ids);
            }
            cursor = self.next_node(id);
        }
        Err(RunError::BrokenChain { first, last })
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.attached_to) else {
            return;
        };
        let sibling = self.node(child).and_then(|n| n.next_sibling);

        if self.node(parent).and_then(|n| n.first_child) == Some(child) {
            if let Some(p) = self.slot_mut(parent) {
                p.first_child = sibling;
            }
        } else {
            let mut cursor = self.node(parent).and_then(|n| n.first_child);
            while let Some(id) = cursor {
                let next = self.node(id).and_then(|n| n.next_sibling);
                if next == Some(child) {
                    if let Some(n) = self.slot_mut(id) {
                        n.next_sibling = sibling;
                    }
                    break;
                }
                cursor = next;
            }
        }

        if let Some(c) = self.slot_mut(child) {
            c.attached_to = None;
            c.next_sibling = None;
        }
    }
}

impl GlyphRun for ArenaRun {
    fn char_count(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, index: usize) -> Option<CharInfo> {
        self.chars.get(index).copied()
    }

    fn first_node(&self) -> Option<NodeId> {
        self.first
    }

    fn last_node(&self) -> Option<NodeId> {
        self.last
    }

    fn node(&self, id: NodeId) -> Option<&GlyphNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GlyphNode> {
        self.slot_mut(id)
    }

    fn node_count(&self) -> usize {
        self.node_ids().len()
    }

    fn attrs_per_node(&self) -> usize {
        self.attrs_per_node
    }

    fn node_attrs(&self, id: NodeId) -> &[i16] {
        let start = id.index() * self.attrs_per_node;
        self.attrs
            .get(start..start + self.attrs_per_node)
            .unwrap_or(&[])
    }

    fn node_attrs_mut(&mut self, id: NodeId) -> Option<&mut [i16]> {
        self.node(id)?;
        let start = id.index() * self.attrs_per_node;
        self.attrs.get_mut(start..start + self.attrs_per_node)
    }

    fn set_scope(
        &mut self,
        first: NodeId,
        last: NodeId,
        char_len: usize,
    ) -> Result<ScopeState, RunError> {
        self.chain(first, last)?;
        let state = ScopeState {
            outer_first: self.first,
            outer_last: self.last,
            before: self.require(first)?.prev,
            after: self.require(last)?.next,
            outer_chars: self.scope_chars,
        };

        if let Some(n) = self.slot_mut(first) {
            n.prev = None;
        }
        if let Some(n) = self.slot_mut(last) {
            n.next = None;
        }
        self.first = Some(first);
        self.last = Some(last);
        self.scope_chars = char_len;
        Ok(state)
    }

    fn restore_scope(&mut self, state: ScopeState) -> Result<(), RunError> {
        for id in [state.before, state.after].into_iter().flatten() {
            if self.node(id).is_none() {
                return Err(RunError::ScopeMismatch);
            }
        }

        let (head, tail) = (self.first, self.last);
        if let Some(b) = state.before {
            if let Some(n) = self.slot_mut(b) {
                n.next = head.or(state.after);
            }
        }
        if let Some(h) = head {
            if let Some(n) = self.slot_mut(h) {
                n.prev = state.before;
            }
        }
        if let Some(a) = state.after {
            if let Some(n) = self.slot_mut(a) {
                n.prev = tail.or(state.before);
            }
        }
        if let Some(t) = tail {
            if let Some(n) = self.slot_mut(t) {
                n.next = state.after;
            }
        }

        self.first = if state.before.is_some() {
            state.outer_first
        } else {
            head.or(state.after)
        };
        self.last = if state.after.is_some() {
            state.outer_last
        } else {
            tail.or(state.before)
        };
        self.scope_chars = state.outer_chars;
        Ok(())
    }

    fn splice(
        &mut self,
        char_start: usize,
        char_len: usize,
        first: NodeId,
        last: NodeId,
        replacement: &GlyphGraph,
    ) -> Result<(), RunError> {
        if char_start + char_len > self.chars.len() {
            return Err(RunError::CharOutOfRange(char_start + char_len));
        }
        if replacement.is_empty() {
            return Err(RunError::EmptyReplacement);
        }
        let old = self.chain(first, last)?;
        let before = self.require(first)?.prev;
        let after = self.require(last)?.next;

        let base = self.nodes.len() as u32;
        let count = replacement.len();
        self.nodes.reserve(count);
        for (index, source) in replacement.nodes().iter().enumerate() {
            let mut node = source.clone();
            node.remap_relations(|local| Some(NodeId::new(base + local.index() as u32)));
            node.offset_chars(char_start as i32);
            if index == 0 {
                node.prev = before;
            }
            if index + 1 == count {
                node.next = after;
            }
            let id = self.alloc(node);
            let keep = self.attrs_per_node.min(replacement.attrs_per_node());
            let start = id.index() * self.attrs_per_node;
            self.attrs[start..start + keep].copy_from_slice(&replacement.attrs(index)[..keep]);
        }

        let new_first = NodeId::new(base);
        let new_last = NodeId::new(base + count as u32 - 1);
        match before.and_then(|b| self.slot_mut(b)) {
            Some(n) => n.next = Some(new_first),
            None => self.first = Some(new_first),
        }
        match after.and_then(|a| self.slot_mut(a)) {
            Some(n) => n.prev = Some(new_last),
            None => self.last = Some(new_last),
        }

        for id in old {
            self.nodes[id.index()] = None;
        }
        Ok(())
    }

    fn insert_after(&mut self, after: NodeId, mut node: GlyphNode) -> Result<NodeId, RunError> {
        let next = self.require(after)?.next;
        node.prev = Some(after);
        node.next = next;
        node.attached_to = None;
        node.first_child = None;
        node.next_sibling = None;
        let id = self.alloc(node);

        if let Some(n) = self.slot_mut(after) {
            n.next = Some(id);
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(n) => n.prev = Some(id),
            None => self.last = Some(id),
        }
        Ok(id)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), RunError> {
        let (prev, next) = {
            let node = self.require(id)?;
            (node.prev, node.next)
        };

        self.detach(id);
        let mut child = self.node(id).and_then(|n| n.first_child);
        while let Some(c) = child {
            child = self.node(c).and_then(|n| n.next_sibling);
            if let Some(n) = self.slot_mut(c) {
                n.attached_to = None;
                n.next_sibling = None;
            }
        }

        match prev.and_then(|p| self.slot_mut(p)) {
            Some(n) => n.next = next,
            None => self.first = next,
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.last = prev,
        }
        self.nodes[id.index()] = None;
        Ok(())
    }

    fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), RunError> {
        self.require(child)?;
        self.require(parent)?;
        if child == parent {
            return Err(RunError::InvalidNode(child));
        }
        self.detach(child);

        match self.node(parent).and_then(|n| n.first_child) {
            None => {
                if let Some(p) = self.slot_mut(parent) {
                    p.first_child = Some(child);
                }
            },
            Some(mut tail) => {
                while let Some(next) = self.node(tail).and_then(|n| n.next_sibling) {
                    tail = next;
                }
                if let Some(t) = self.slot_mut(tail) {
                    t.next_sibling = Some(child);
                }
            },
        }
        if let Some(c) = self.slot_mut(child) {
            c.attached_to = Some(parent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charmap::StaticCharMap;

    fn identity_map() -> StaticCharMap {
        StaticCharMap::new((0x20..0x7F).map(|c| (c, c)))
    }

    #[test]
    fn test_new_links_one_node_per_char() {
        let run = ArenaRun::from_text("abc", &identity_map(), 0);
        assert_eq!(run.node_count(), 3);
        assert_eq!(run.glyph_ids(), vec![0x61, 0x62, 0x63]);
        let ids = run.node_ids();
        assert_eq!(run.node(ids[1]).unwrap().prev, Some(ids[0]));
        assert_eq!(run.node(ids[1]).unwrap().next, Some(ids[2]));
    }

    #[test]
    fn test_scope_restricts_and_restores() {
        let mut run = ArenaRun::from_text("abcd", &identity_map(), 0);
        let ids = run.node_ids();
        let state = run.set_scope(ids[1], ids[2], 2).unwrap();
        assert_eq!(run.glyph_ids(), vec![0x62, 0x63]);

        // remove the scope's first node while scoped
        run.remove(ids[1]).unwrap();
        assert_eq!(run.glyph_ids(), vec![0x63]);

        run.restore_scope(state).unwrap();
        assert_eq!(run.glyph_ids(), vec![0x61, 0x63, 0x64]);
        assert_eq!(run.node(ids[2]).unwrap().prev, Some(ids[0]));
    }

    #[test]
    fn test_scope_at_run_start() {
        let mut run = ArenaRun::from_text("ab", &identity_map(), 0);
        let ids = run.node_ids();
        let state = run.set_scope(ids[0], ids[0], 1).unwrap();
        let added = run.insert_after(ids[0], GlyphNode::new(9, 0)).unwrap();
        assert_eq!(run.last_node(), Some(added));
        run.restore_scope(state).unwrap();
        assert_eq!(run.glyph_ids(), vec![0x61, 9, 0x62]);
        assert_eq!(run.last_node(), Some(ids[1]));
    }

    #[test]
    fn test_splice_replaces_range_and_shifts_chars() {
        let mut run = ArenaRun::from_text("xab", &identity_map(), 1);
        let ids = run.node_ids();

        let mut lig = GlyphNode::new(500, 0);
        lig.after = 1;
        lig.next = Some(NodeId::new(1));
        let mut mark = GlyphNode::new(600, 1);
        mark.prev = Some(NodeId::new(0));
        mark.attached_to = Some(NodeId::new(0));
        lig.first_child = Some(NodeId::new(1));
        let graph = GlyphGraph::from_parts(vec![lig, mark], vec![7, 8], 1).unwrap();

        run.splice(1, 2, ids[1], ids[2], &graph).unwrap();
        assert_eq!(run.glyph_ids(), vec![0x78, 500, 600]);

        let new_ids = run.node_ids();
        let lig = run.node(new_ids[1]).unwrap();
        assert_eq!((lig.original, lig.after), (1, 2));
        assert_eq!(lig.first_child, Some(new_ids[2]));
        assert_eq!(run.node(new_ids[2]).unwrap().attached_to, Some(new_ids[1]));
        assert_eq!(run.node_attrs(new_ids[2]), &[8]);
        assert_eq!(run.last_node(), Some(new_ids[2]));
        assert!(run.node(ids[1]).is_none());
    }

    #[test]
    fn test_splice_rejects_broken_chain() {
        let mut run = ArenaRun::from_text("ab", &identity_map(), 0);
        let ids = run.node_ids();
        let graph = GlyphGraph::from_parts(vec![GlyphNode::new(1, 0)], vec![], 0).unwrap();
        let err = run.splice(0, 1, ids[1], ids[0], &graph).unwrap_err();
        assert_eq!(
            err,
            RunError::BrokenChain {
                first: ids[1],
                last: ids[0]
            }
        );
    }

    #[test]
    fn test_attach_builds_sibling_chain() {
        let mut run = ArenaRun::from_text("abc", &identity_map(), 0);
        let ids = run.node_ids();
        run.attach(ids[1], ids[0]).unwrap();
        run.attach(ids[2], ids[0]).unwrap();
        assert_eq!(run.node(ids[0]).unwrap().first_child, Some(ids[1]));
        assert_eq!(run.node(ids[1]).unwrap().next_sibling, Some(ids[2]));

        run.remove(ids[1]).unwrap();
        assert_eq!(run.node(ids[0]).unwrap().first_child, Some(ids[2]));
    }

    #[test]
    fn test_finalise_places_attached_glyphs() {
        let mut run = ArenaRun::from_text("ab", &identity_map(), 0);
        let ids = run.node_ids();
        run.node_mut(ids[0]).unwrap().advance = Point::new(100.0, 0.0);
        run.attach(ids[1], ids[0]).unwrap();
        run.node_mut(ids[1]).unwrap().attach_offset = Point::new(10.0, 20.0);
        run.finalise();

        let glyphs = run.shaped_glyphs();
        assert_eq!((glyphs[1].x, glyphs[1].y), (10.0, 20.0));
        assert_eq!(glyphs[1].attached_to, Some(0));
    }
}
