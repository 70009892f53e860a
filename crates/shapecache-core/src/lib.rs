//! Shapecache Core: the shared vocabulary of the sub-segment shaping cache
//!
//! Shaping turns a run of code points into positioned, attached glyphs. The
//! cache in the `shapecache` crate stores self-contained snapshots of shaped
//! sub-runs; this crate holds everything the cache and its collaborators
//! agree on.
//!
//! ## What lives here
//!
//! - [`types`] - glyph nodes, arena ids, glyph graphs, feature settings
//! - [`traits`] - the collaborator seams: [`GlyphRun`], [`ShapingEngine`], [`CharMap`]
//! - [`run`] - [`ArenaRun`], an arena-backed live run with scoping and splicing
//! - [`config`] - [`CacheConfig`] and the boundary [`CutPolicy`]
//! - [`charmap`] - character maps backed by a real font or a static table
//! - [`error`] - the error types every crate in the workspace returns
//!
//! ## Arenas, not pointers
//!
//! Every glyph node lives in an arena and refers to its neighbours by
//! [`types::NodeId`]. A live run and a cached graph are two different
//! arenas; moving a graph between them is a value copy plus an index remap.

pub mod charmap;
pub mod config;
pub mod error;
pub mod run;
pub mod traits;

pub use charmap::{FontCharMap, StaticCharMap};
pub use config::{CacheConfig, CutDecision, CutPolicy};
pub use error::{CacheError, Result};
pub use run::ArenaRun;
pub use traits::{CharMap, GlyphRun, ScopeState, ShapingEngine};

/// The data structures shared by runs, engines and the cache
pub mod types {
    use serde::Serialize;

    use crate::error::RunError;

    /// Unique identifier for a glyph within a font
    pub type GlyphId = u32;

    /// Arena-local index of a glyph node
    ///
    /// Ids are only meaningful inside the arena that issued them: a live run
    /// and a cached graph each have their own numbering.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct NodeId(u32);

    impl NodeId {
        pub const fn new(index: u32) -> Self {
            Self(index)
        }

        pub const fn index(self) -> usize {
            self.0 as usize
        }
    }

    /// A 2D offset in font units
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Point {
        pub x: f32,
        pub y: f32,
    }

    impl Point {
        pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

        pub const fn new(x: f32, y: f32) -> Self {
            Self { x, y }
        }
    }

    /// One glyph in a run, plus its sequence and attachment relations
    ///
    /// `prev`/`next` thread every node of an arena into shaping order.
    /// `attached_to`, `first_child` and `next_sibling` layer an attachment
    /// forest on top: one parent per node, children chained through siblings.
    #[derive(Debug, Clone, PartialEq)]
    pub struct GlyphNode {
        pub glyph: GlyphId,
        /// Absolute position, filled in by final positioning
        pub origin: Point,
        pub advance: Point,
        /// Offset from the parent's origin when attached
        pub attach_offset: Point,
        /// Index of the character this glyph was produced from
        pub original: i32,
        /// Logical extent: first and last character this glyph covers
        pub before: i32,
        pub after: i32,
        pub prev: Option<NodeId>,
        pub next: Option<NodeId>,
        pub attached_to: Option<NodeId>,
        pub first_child: Option<NodeId>,
        pub next_sibling: Option<NodeId>,
    }

    impl GlyphNode {
        /// A detached node for character `original`
        pub fn new(glyph: GlyphId, original: i32) -> Self {
            Self {
                glyph,
                origin: Point::ZERO,
                advance: Point::ZERO,
                attach_offset: Point::ZERO,
                original,
                before: original,
                after: original,
                prev: None,
                next: None,
                attached_to: None,
                first_child: None,
                next_sibling: None,
            }
        }

        /// Shift every character index by `delta`
        pub fn offset_chars(&mut self, delta: i32) {
            self.original += delta;
            self.before += delta;
            self.after += delta;
        }

        /// Rewrite every relation through `map`
        pub fn remap_relations<F>(&mut self, mut map: F)
        where
            F: FnMut(NodeId) -> Option<NodeId>,
        {
            self.prev = self.prev.and_then(&mut map);
            self.next = self.next.and_then(&mut map);
            self.attached_to = self.attached_to.and_then(&mut map);
            self.first_child = self.first_child.and_then(&mut map);
            self.next_sibling = self.next_sibling.and_then(&mut map);
        }

        /// Relations that must stay inside the node's arena
        pub fn relations(&self) -> [Option<NodeId>; 5] {
            [
                self.prev,
                self.next,
                self.attached_to,
                self.first_child,
                self.next_sibling,
            ]
        }
    }

    /// One character of the input run
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharInfo {
        pub code_point: u32,
        /// Per-character boundary flag supplied by the caller
        pub flags: u8,
    }

    impl CharInfo {
        pub const fn new(code_point: u32) -> Self {
            Self {
                code_point,
                flags: 0,
            }
        }

        pub const fn with_flags(code_point: u32, flags: u8) -> Self {
            Self { code_point, flags }
        }
    }

    /// A self-contained glyph graph: node `0` starts the sequence and every
    /// relation is an index into `nodes`
    #[derive(Debug, Clone, PartialEq)]
    pub struct GlyphGraph {
        nodes: Vec<GlyphNode>,
        attrs: Vec<i16>,
        attrs_per_node: usize,
    }

    impl GlyphGraph {
        /// Assemble a graph, checking that it never points outside itself
        pub fn from_parts(
            nodes: Vec<GlyphNode>,
            attrs: Vec<i16>,
            attrs_per_node: usize,
        ) -> Result<Self, RunError> {
            if nodes.is_empty() {
                return Err(RunError::EmptyReplacement);
            }
            let len = nodes.len();
            for node in &nodes {
                let outside = node.relations().into_iter().flatten().find(|id| id.index() >= len);
                if let Some(id) = outside {
                    return Err(RunError::InvalidNode(id));
                }
            }
            if attrs.len() != len * attrs_per_node {
                return Err(RunError::InvalidNode(NodeId::new(len as u32)));
            }
            Ok(Self {
                nodes,
                attrs,
                attrs_per_node,
            })
        }

        pub fn len(&self) -> usize {
            self.nodes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.nodes.is_empty()
        }

        pub fn nodes(&self) -> &[GlyphNode] {
            &self.nodes
        }

        pub fn node(&self, id: NodeId) -> Option<&GlyphNode> {
            self.nodes.get(id.index())
        }

        pub fn attrs_per_node(&self) -> usize {
            self.attrs_per_node
        }

        /// User attributes of node `index`
        pub fn attrs(&self, index: usize) -> &[i16] {
            let start = index * self.attrs_per_node;
            self.attrs
                .get(start..start + self.attrs_per_node)
                .unwrap_or(&[])
        }

        pub fn glyph_ids(&self) -> impl Iterator<Item = GlyphId> + '_ {
            self.nodes.iter().map(|n| n.glyph)
        }
    }

    /// The optional feature settings active for one shaping call
    ///
    /// Settings are kept sorted by tag, one value per tag (the last one
    /// given wins), so equality does not depend on the order they came in.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct FeatureValues(Vec<(String, u32)>);

    impl FeatureValues {
        pub fn new(mut values: Vec<(String, u32)>) -> Self {
            values.sort_by(|a, b| a.0.cmp(&b.0));
            let mut settings: Vec<(String, u32)> = Vec::with_capacity(values.len());
            for (tag, value) in values {
                match settings.last_mut() {
                    Some(last) if last.0 == tag => last.1 = value,
                    _ => settings.push((tag, value)),
                }
            }
            Self(settings)
        }

        pub fn values(&self) -> &[(String, u32)] {
            &self.0
        }

        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// Value of feature `tag`, if set
        pub fn get(&self, tag: &str) -> Option<u32> {
            self.0.iter().find(|(t, _)| t == tag).map(|(_, v)| *v)
        }
    }

    impl<S: Into<String>> FromIterator<(S, u32)> for FeatureValues {
        fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
            Self::new(iter.into_iter().map(|(t, v)| (t.into(), v)).collect())
        }
    }

    /// A finished glyph as callers see it, relations flattened to positions
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ShapedGlyph {
        pub glyph: GlyphId,
        pub x: f32,
        pub y: f32,
        pub advance: f32,
        pub original: i32,
        /// Sequence position of the attachment parent
        pub attached_to: Option<usize>,
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;
    use crate::error::RunError;

    #[test]
    fn test_graph_rejects_outside_relations() {
        let mut node = GlyphNode::new(1, 0);
        node.next = Some(NodeId::new(3));
        let err = GlyphGraph::from_parts(vec![node], vec![], 0).unwrap_err();
        assert_eq!(err, RunError::InvalidNode(NodeId::new(3)));
    }

    #[test]
    fn test_graph_rejects_empty() {
        let err = GlyphGraph::from_parts(vec![], vec![], 0).unwrap_err();
        assert_eq!(err, RunError::EmptyReplacement);
    }

    #[test]
    fn test_graph_attrs_slice() {
        let nodes = vec![GlyphNode::new(1, 0), GlyphNode::new(2, 1)];
        let graph = GlyphGraph::from_parts(nodes, vec![1, 2, 3, 4], 2).unwrap();
        assert_eq!(graph.attrs(1), &[3, 4]);
        assert_eq!(graph.glyph_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_offset_chars() {
        let mut node = GlyphNode::new(7, 5);
        node.after = 6;
        node.offset_chars(-5);
        assert_eq!((node.original, node.before, node.after), (0, 0, 1));
    }

    #[test]
    fn test_feature_values_ignore_order() {
        let a: FeatureValues = [("liga", 1), ("kern", 0)].into_iter().collect();
        let b: FeatureValues = [("kern", 0), ("liga", 1)].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.values()[0], ("kern".to_string(), 0));
        assert_eq!(a.get("liga"), Some(1));

        let c: FeatureValues = [("liga", 0), ("kern", 0)].into_iter().collect();
        assert_ne!(a, c);
        let subset: FeatureValues = [("liga", 1)].into_iter().collect();
        assert_ne!(a, subset);
    }

    #[test]
    fn test_feature_values_last_setting_wins() {
        let features = FeatureValues::new(vec![
            ("smcp".to_string(), 1),
            ("liga".to_string(), 1),
            ("smcp".to_string(), 0),
        ]);
        assert_eq!(features.values().len(), 2);
        assert_eq!(features.get("smcp"), Some(0));
    }
}
