//! The contracts between the cache and the code it cooperates with
//!
//! The cache never shapes text, never owns the live run and never parses
//! fonts. It talks to each of those through one trait:
//!
//! - [`GlyphRun`] - the live, mutable glyph sequence being shaped
//! - [`ShapingEngine`] - one script variant's rule passes
//! - [`CharMap`] - the font's code point to glyph mapping

use crate::error::{RunError, ShapingError};
use crate::types::{CharInfo, GlyphGraph, GlyphId, GlyphNode, NodeId};

/// What a run needs to remember to undo [`GlyphRun::set_scope`]
///
/// `before` and `after` are the nodes just outside the scope; `outer_first`
/// and `outer_last` the run's ends at the time the scope was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeState {
    pub outer_first: Option<NodeId>,
    pub outer_last: Option<NodeId>,
    pub before: Option<NodeId>,
    pub after: Option<NodeId>,
    pub outer_chars: usize,
}

/// The live text run: characters in, a linked sequence of glyph nodes out
///
/// Node ids are arena indices that stay valid until the node is removed.
/// While a scope is set, `first_node`/`last_node`/`node_count` describe
/// only the scoped sub-range and the sequence links at its edges are cut.
pub trait GlyphRun {
    /// Characters in the whole run
    fn char_count(&self) -> usize;

    fn char_at(&self, index: usize) -> Option<CharInfo>;

    fn first_node(&self) -> Option<NodeId>;

    fn last_node(&self) -> Option<NodeId>;

    fn node(&self, id: NodeId) -> Option<&GlyphNode>;

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GlyphNode>;

    /// Sequence successor of `id`
    fn next_node(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next)
    }

    /// Nodes reachable from `first_node` in the active scope
    fn node_count(&self) -> usize;

    /// User attribute slots per node (fixed per script variant)
    fn attrs_per_node(&self) -> usize;

    fn node_attrs(&self, id: NodeId) -> &[i16];

    fn node_attrs_mut(&mut self, id: NodeId) -> Option<&mut [i16]>;

    /// Restrict the run to `first..=last`, covering `char_len` characters
    fn set_scope(
        &mut self,
        first: NodeId,
        last: NodeId,
        char_len: usize,
    ) -> Result<ScopeState, RunError>;

    /// Reconnect the scoped range to the rest of the run
    fn restore_scope(&mut self, state: ScopeState) -> Result<(), RunError>;

    /// Replace nodes `first..=last` (characters `char_start..char_start + char_len`)
    /// with a copy of `replacement`, shifting its character indices by `char_start`
    fn splice(
        &mut self,
        char_start: usize,
        char_len: usize,
        first: NodeId,
        last: NodeId,
        replacement: &GlyphGraph,
    ) -> Result<(), RunError>;

    /// Link a new node into the sequence after `after`
    fn insert_after(&mut self, after: NodeId, node: GlyphNode) -> Result<NodeId, RunError>;

    /// Unlink and free a node; its attachments are released
    fn remove(&mut self, id: NodeId) -> Result<(), RunError>;

    /// Attach `child` to `parent`, appending it to the parent's children
    fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), RunError>;
}

/// One script variant's shaping rules
///
/// `run_passes` must only read and write nodes in the run's active scope;
/// the cache relies on that to shape sub-runs independently.
pub trait ShapingEngine: Send + Sync {
    /// Used for debugging and logging
    fn name(&self) -> &'static str;

    /// Total number of rule passes
    fn pass_count(&self) -> usize;

    /// Execute passes `start..end` over the active scope
    fn run_passes(
        &self,
        run: &mut dyn GlyphRun,
        start: usize,
        end: usize,
    ) -> Result<(), ShapingError>;

    /// Boundary class (0-3) of a glyph, used to build the cut table
    fn classify_for_cut(&self, glyph: GlyphId) -> u8;

    /// Whether a glyph begins a contextual sequence
    fn is_context_initial(&self, _glyph: GlyphId) -> bool {
        false
    }
}

/// The font's character map
pub trait CharMap {
    /// Nominal glyph for a code point
    fn map(&self, code_point: u32) -> Option<GlyphId>;

    /// Every `(code_point, glyph)` pair, in increasing code point order
    fn mappings(&self) -> Box<dyn Iterator<Item = (u32, GlyphId)> + '_>;

    /// True when nothing above U+FFFF is mapped
    fn is_bmp_only(&self) -> bool;
}
